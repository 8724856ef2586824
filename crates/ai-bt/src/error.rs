use std::borrow::Cow;

use thiserror::Error;

/// Tree assembly mistakes. These abort construction; they are never absorbed at runtime.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("`end()` called with no open composite or decorator")]
    UnbalancedEnd,

    #[error("decorator `{decorator}` already has a child; cannot attach `{child}`")]
    DecoratorOccupied {
        decorator: Cow<'static, str>,
        child: Cow<'static, str>,
    },

    #[error("leaf `{leaf}` cannot take child `{child}`")]
    LeafChild {
        leaf: Cow<'static, str>,
        child: Cow<'static, str>,
    },

    #[error("repeater `{0}` must repeat at least once")]
    ZeroRepeatCount(Cow<'static, str>),

    #[error("parallel `{name}` requires {required} successes but has {children} children")]
    InvalidParallelThreshold {
        name: Cow<'static, str>,
        required: usize,
        children: usize,
    },

    #[error("`precondition()` called before any node was added")]
    DanglingPrecondition,

    #[error("tree has no nodes")]
    EmptyTree,
}
