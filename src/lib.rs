//! # Octopoid
//!
//! Agent orchestrator: a declarative flow engine drives tasks through a
//! remote task store by spawning short-lived `claude -p` subprocess agents,
//! observing their results, and applying state transitions.
//!
//! ## Usage
//!
//! ```bash
//! octopoid init
//! octopoid run
//! octopoid tick
//! octopoid flow validate default
//! ```
//!
//! ## Modules
//!
//! - `app` - logging, config, and fatal-error handling for the CLI entry point
//! - `cli` - argument parsing and command routing
//! - `client` - remote task-store HTTP facade
//! - `config` - `.octopoid/{config,agents}.yaml` loading
//! - `error` - crate-wide aggregate error type
//! - `flow` - declarative flow/transition/condition model
//! - `init` - `.octopoid/` scaffold generation
//! - `message_dispatch` - human-to-agent action-command dispatch loop
//! - `prompt` - prompt template rendering
//! - `repo` - git/gh operations for a task's worktree
//! - `result_handler` - outcome classification and flow-driven transitions
//! - `scheduler` - the per-tick agent-pool loop
//! - `steps` - the named step library agents and flows invoke
//! - `subprocess` - process-spawning abstraction used for both agents and git/gh
//! - `task_thread` - per-task rejection/feedback thread log

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod init;
pub mod message_dispatch;
pub mod prompt;
pub mod repo;
pub mod result_handler;
pub mod scheduler;
pub mod steps;
pub mod subprocess;
pub mod task_thread;
