//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "turret", version, about = "Pan/tilt tracking turret CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/turret_config.toml")]
    pub config: PathBuf,

    /// Emit JSON on stdout (and JSON log lines) instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FireAction {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the automatic tracking loop
    Run {
        /// Stop after this many seconds (runs until Ctrl-C if omitted)
        #[arg(long, value_name = "SECONDS")]
        duration_s: Option<u64>,
        /// Arm the firing relay for this run, overriding the config
        #[arg(long, action = ArgAction::SetTrue)]
        armed: bool,
        /// Enable real-time mode (SCHED_FIFO + mlockall, Linux only)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable soft real-time mode on Linux: SCHED_FIFO scheduling plus mlockall to keep servo step timing off the page cache. Needs CAP_SYS_NICE or root; failure degrades to a normal run with a warning."
        )]
        rt: bool,
        /// SCHED_FIFO priority when --rt is enabled (1..=99)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
    },
    /// Move to an absolute pose (manual mode, one shot)
    Move {
        /// Pan angle in degrees
        #[arg(long, allow_hyphen_values = true)]
        pan: f32,
        /// Tilt angle in degrees
        #[arg(long, allow_hyphen_values = true)]
        tilt: f32,
    },
    /// Return to the home pose (manual mode, one shot)
    Home,
    /// Move to a pose and store it as the new home pose
    SetHome {
        /// Pan angle in degrees
        #[arg(long, allow_hyphen_values = true)]
        pan: f32,
        /// Tilt angle in degrees
        #[arg(long, allow_hyphen_values = true)]
        tilt: f32,
    },
    /// Switch the firing relay directly
    Fire {
        #[arg(value_enum)]
        action: FireAction,
    },
    /// Exercise every collaborator once and report readiness
    SelfCheck,
    /// Config and version check for operational monitoring
    Health,
}
