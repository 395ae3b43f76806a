//! Error handling utilities
//!
//! Centralized fatal-error reporting for the CLI entry point.

use tracing::error;

/// Handle a fatal error and exit with an appropriate status code.
///
/// `verbose = 0` prints just the error message; `verbose >= 1` prints the
/// full `anyhow` cause chain as well.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("fatal error: {}", error);
    eprintln!("Error: {error}");

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    let exit_code = if error.to_string().contains("required") || error.to_string().contains("Please specify") {
        2 // argument error
    } else {
        1 // general error
    };

    std::process::exit(exit_code)
}
