//! Subprocess abstraction layer for external tool integration.
//!
//! Every shell-out in Octopoid (`git`, `gh`, `claude`) goes through this
//! layer rather than `std::process::Command` directly, so that:
//! - every invocation carries an explicit timeout (the orchestrator never
//!   blocks forever on a hung subprocess)
//! - tests can substitute [`MockProcessRunner`] for the real runner and
//!   assert on exact argv without touching the filesystem or network
//!
//! # Architecture
//!
//! - [`ProcessRunner`] - core trait for process execution
//! - [`SubprocessManager`] - high-level manager handing out specialized
//!   runners
//! - [`ClaudeRunner`] - the agent-runtime-specific runner used by the
//!   scheduler and message dispatcher
//!
//! # Examples
//!
//! ```rust
//! use octopoid::subprocess::SubprocessManager;
//!
//! let subprocess = SubprocessManager::production();
//! let claude = subprocess.claude();
//! ```

pub mod builder;
pub mod claude;
pub mod error;
pub mod mock;
pub mod runner;

pub use builder::ProcessCommandBuilder;
pub use claude::ClaudeRunner;
pub use error::ProcessError;
pub use mock::{MockCommandConfig, MockProcessRunner};
pub use runner::ProcessCommand;
pub use runner::{ExitStatusHelper, ProcessOutput, ProcessRunner, ProcessStream};

use std::sync::Arc;

/// Central manager for subprocess operations across Octopoid.
///
/// Uses dependency injection with the [`ProcessRunner`] trait so the
/// scheduler, repository manager, and message dispatcher can all be
/// constructed against a mock runner in tests.
#[derive(Clone)]
pub struct SubprocessManager {
    runner: Arc<dyn ProcessRunner>,
}

impl SubprocessManager {
    /// Create a subprocess manager around an arbitrary runner.
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Create a production subprocess manager backed by `tokio::process`.
    pub fn production() -> Self {
        Self::new(Arc::new(runner::TokioProcessRunner))
    }

    /// Create a mock subprocess manager for testing.
    ///
    /// Returns both the manager and the mock runner so the test can
    /// configure expected commands before handing the manager to the
    /// code under test.
    pub fn mock() -> (Self, MockProcessRunner) {
        let mock = MockProcessRunner::new();
        let runner = Arc::new(mock.clone()) as Arc<dyn ProcessRunner>;
        (Self::new(runner), mock)
    }

    /// Get the underlying process runner.
    ///
    /// Used by the repository manager, which builds its own `git`/`gh`
    /// commands rather than going through a specialized wrapper.
    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }

    /// Create a Claude CLI-specific runner.
    pub fn claude(&self) -> claude::ClaudeRunnerImpl {
        claude::ClaudeRunnerImpl::new(Arc::clone(&self.runner))
    }
}
