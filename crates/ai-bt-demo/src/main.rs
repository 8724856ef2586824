//! bt-demo - drives a guard agent's behavior tree for a fixed number of frames.
//!
//! The guard patrols until an intruder shows up, then sounds the alarm and closes in.
//! `--interrupt-at` makes the intruder appear on a given frame and broadcasts an interrupt
//! so the patrol branch is abandoned immediately.
//!
//! `guard.yaml` next to this crate's manifest is a sample `--config` file:
//!
//! ```text
//! bt-demo --config crates/ai-bt-demo/guard.yaml --interrupt-at 8 --verbose
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use ai_bt::{BehaviorTree, BtBuilder, Interrupt, StructuralError, TreeConfig};
use ai_core::{Action, ActionKey, ActionQueue, ActionStatus, ActionSystem, TickContext};

const WALK_ROUTE: ActionKey = ActionKey("walk_route");
const LOOK_AROUND: ActionKey = ActionKey("look_around");
const SOUND_ALARM: ActionKey = ActionKey("sound_alarm");
const CLOSE_IN: ActionKey = ActionKey("close_in");

#[derive(Parser)]
#[command(name = "bt-demo")]
#[command(about = "Run a guard behavior tree", version)]
struct Cli {
    /// YAML tree configuration (name, time_budget_micros), e.g. guard.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to simulate
    #[arg(long, default_value_t = 30)]
    ticks: u64,

    /// Override the per-tick time budget, in microseconds
    #[arg(long)]
    budget_us: Option<u64>,

    /// Frame on which the intruder appears
    #[arg(long)]
    interrupt_at: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Fixed-duration action used for every guard behavior.
struct Timed {
    remaining: u32,
}

impl Action for Timed {
    fn tick(&mut self, _ctx: &TickContext) -> ActionStatus {
        if self.remaining <= 1 {
            return ActionStatus::Success;
        }
        self.remaining -= 1;
        ActionStatus::Running
    }
}

fn timed(frames: u32) -> impl FnMut() -> Box<dyn Action> {
    move || Box::new(Timed { remaining: frames }) as Box<dyn Action>
}

struct Guard {
    actions: ActionQueue,
    intruder: bool,
}

impl Guard {
    fn new() -> Self {
        let actions = ActionQueue::new()
            .with_action(WALK_ROUTE, timed(3))
            .with_action(LOOK_AROUND, timed(2))
            .with_action(SOUND_ALARM, timed(1))
            .with_action(CLOSE_IN, timed(2));
        Self {
            actions,
            intruder: false,
        }
    }
}

impl ActionSystem for Guard {
    type Action = ActionKey;

    fn start(&mut self, action: &ActionKey) -> anyhow::Result<()> {
        self.actions.start(action)
    }

    fn is_complete(&self, action: &ActionKey) -> bool {
        self.actions.is_complete(action)
    }

    fn has_failed(&self, action: &ActionKey) -> bool {
        self.actions.has_failed(action)
    }

    fn clear_actions(&mut self) {
        self.actions.clear_actions();
    }
}

fn guard_tree(config: TreeConfig) -> Result<BehaviorTree<Guard>, StructuralError> {
    BtBuilder::<Guard>::with_config(config)
        .sequence("respond")
        .condition("sees_intruder", |_, guard| guard.intruder)
        .action("sound_alarm", SOUND_ALARM)
        .repeater("chase", Some(3))
        .action("close_in", CLOSE_IN)
        .root()
        .sequence("patrol")
        .action("walk_route", WALK_ROUTE)
        .action("look_around", LOOK_AROUND)
        .end()
        .build()
}

fn load_config(path: Option<&Path>) -> Result<TreeConfig> {
    let Some(path) = path else {
        return Ok(TreeConfig::default().with_name("guard"));
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: TreeConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;
    Ok(config)
}

fn run(tree: &mut BehaviorTree<Guard>, guard: &mut Guard, ticks: u64, interrupt_at: Option<u64>) {
    let mut ctx = TickContext::new(0, 1.0 / 60.0);
    for _ in 0..ticks {
        if interrupt_at == Some(ctx.tick) {
            guard.intruder = true;
            tree.interrupt(Interrupt::because("intruder spotted"));
        }

        let status = tree.tick(&ctx, guard);
        guard.actions.tick(&ctx);
        tracing::info!(
            tick = ctx.tick,
            ?status,
            action = guard.actions.current_key().map(|key| key.0),
            "frame"
        );
        ctx = ctx.next();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(budget_us) = cli.budget_us {
        config.time_budget_micros = budget_us;
    }

    let mut tree = guard_tree(config).context("Failed to build guard tree")?;
    let mut guard = Guard::new();
    run(&mut tree, &mut guard, cli.ticks, cli.interrupt_at);

    println!("{}", tree.log_tree());
    println!("clear_actions called {} times", guard.actions.clear_count());
    Ok(())
}
