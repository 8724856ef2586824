/// Result of one `update` call. `Running` means "call me again next tick".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BtStatus {
    Running,
    Success,
    Failure,
}

impl BtStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BtStatus::Running)
    }

    /// Swaps `Success` and `Failure`; `Running` passes through.
    pub fn invert(self) -> Self {
        match self {
            BtStatus::Running => BtStatus::Running,
            BtStatus::Success => BtStatus::Failure,
            BtStatus::Failure => BtStatus::Success,
        }
    }
}

/// Internal lifecycle of a node between resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Ready,
    Busy,
    Complete,
}

impl From<BtStatus> for Lifecycle {
    fn from(status: BtStatus) -> Self {
        match status {
            BtStatus::Running => Lifecycle::Busy,
            BtStatus::Success | BtStatus::Failure => Lifecycle::Complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_passes_running_through() {
        assert_eq!(BtStatus::Success.invert(), BtStatus::Failure);
        assert_eq!(BtStatus::Failure.invert(), BtStatus::Success);
        assert_eq!(BtStatus::Running.invert(), BtStatus::Running);
    }

    #[test]
    fn lifecycle_follows_status() {
        assert_eq!(Lifecycle::from(BtStatus::Running), Lifecycle::Busy);
        assert_eq!(Lifecycle::from(BtStatus::Failure), Lifecycle::Complete);
        assert_eq!(Lifecycle::default(), Lifecycle::Ready);
    }
}
