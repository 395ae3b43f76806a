//! Runtime initialization and setup
//!
//! This module handles application startup: logging, then anything that
//! needs to happen before a command runs.

use crate::app::{config::AppConfig, logging::init_logging};
use anyhow::Result;

/// Initialize the application with proper logging and configuration.
pub async fn initialize_app(config: AppConfig) -> Result<()> {
    init_logging(&config);
    Ok(())
}
