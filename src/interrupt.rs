//! SIGINT handling for mid-stream cancellation.
//!
//! A single atomic flag is set from the signal context and polled
//! cooperatively by the agent loop while a turn is streaming. One writer and
//! one reader, so no locking is needed. The loop clears the flag at the
//! start of each send so a stale Ctrl+C never cancels the next turn.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Global cancel flag, registered once with SIGINT.
static CANCEL_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Source of cancellation polled by the agent loop.
///
/// Abstracted behind a trait so tests can drive cancellation without
/// delivering real signals.
pub trait CancelSource {
    /// True once cancellation has been requested.
    fn is_cancelled(&self) -> bool;

    /// Rearm: forget any previous request. Called at the start of each send.
    fn reset(&self);
}

/// Production [`CancelSource`] backed by the process SIGINT flag.
#[derive(Debug, Default, Clone, Copy)]
pub struct SigintCancelSource;

impl CancelSource for SigintCancelSource {
    fn is_cancelled(&self) -> bool {
        CANCEL_FLAG
            .get()
            .map(|f| f.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn reset(&self) {
        if let Some(flag) = CANCEL_FLAG.get() {
            flag.store(false, Ordering::SeqCst);
        }
    }
}

/// Register the SIGINT handler. Call once at process start.
///
/// The first Ctrl+C raises the cancel flag; a second one while the flag is
/// still raised force-exits with the conventional interrupt status.
pub fn register_signal_handler() -> Result<()> {
    let flag = Arc::clone(CANCEL_FLAG.get_or_init(|| Arc::new(AtomicBool::new(false))));
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGINT, move || {
            if flag.swap(true, Ordering::SeqCst) {
                std::process::exit(130);
            }
        })?;
    }
    Ok(())
}
