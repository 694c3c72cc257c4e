//! Ctrl+C handling bound to the stream cancellation token.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static TOKEN: OnceLock<CancellationToken> = OnceLock::new();

#[derive(Debug)]
pub struct InterruptedError;

impl std::fmt::Display for InterruptedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interrupted")
    }
}

impl std::error::Error for InterruptedError {}

/// Installs the Ctrl+C handler and returns the token it cancels.
///
/// The handler only cancels the token; the caller decides what to print.
/// A second Ctrl+C exits immediately with status 130.
///
/// # Errors
/// Returns an error if registering the handler fails.
pub fn init() -> Result<CancellationToken> {
    let token = token();
    ctrlc::set_handler(trigger_ctrl_c).context("Error setting Ctrl+C handler")?;
    Ok(token)
}

/// Returns the process-wide cancellation token.
pub fn token() -> CancellationToken {
    TOKEN.get_or_init(CancellationToken::new).clone()
}

/// Cancels the token, force-exiting on a second Ctrl+C.
pub fn trigger_ctrl_c() {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        std::process::exit(130);
    }
    token().cancel();
}
