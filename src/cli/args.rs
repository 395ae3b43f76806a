//! CLI argument structures.
//!
//! Mirrors the teacher's `cli::args` shape: a top-level `Cli` carrying
//! global flags plus a `Commands` enum, one variant per subcommand.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Drive a flow-engine-based agent orchestrator against a remote task store.
#[derive(Parser)]
#[command(name = "octopoid")]
#[command(about = "octopoid - agent orchestrator driven by a declarative flow engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project root (defaults to the current directory)
    #[arg(short = 'p', long, global = true)]
    pub path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scaffold `.octopoid/` in the project root: config, agent blueprints,
    /// default and project flows, and a prompts directory.
    Init {
        /// Overwrite files that already exist
        #[arg(long)]
        force: bool,
    },

    /// Start the scheduler loop, ticking until interrupted.
    Run {
        /// Explicit config.yaml path, overriding .octopoid/config.yaml
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seconds to sleep between ticks
        #[arg(long, default_value = "10")]
        interval: u64,
    },

    /// Run exactly one scheduler tick and exit. Used by tests and cron.
    Tick {
        /// Explicit config.yaml path, overriding .octopoid/config.yaml
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Flow inspection and validation.
    Flow {
        #[command(subcommand)]
        command: FlowCommands,
    },
}

#[derive(Subcommand)]
pub enum FlowCommands {
    /// List the flows available under .octopoid/flows.
    List,

    /// Load a flow and run its reachability validation.
    Validate {
        /// Flow name (without the .yaml extension)
        name: String,
    },
}
