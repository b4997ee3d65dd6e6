//! Narrator adapters
//!
//! - [`PacedNarrator`] speaks nothing; it holds each line for as long as
//!   reading it aloud would take, so pacing and interrupts behave as they
//!   would with real audio.
//! - [`CommandNarrator`] runs an external text-to-speech program per line.

mod command;
mod paced;

pub use command::CommandNarrator;
pub use paced::PacedNarrator;

use crate::config::{FileNarratorConfig, NarratorBackend};
use duet_application::Narrator;
use std::sync::Arc;
use tokio::sync::Notify;

/// Build the narrator selected by `[narrator]`.
///
/// Unknown backend names fall back to the paced narrator; validation has
/// already reported them.
pub fn from_config(config: &FileNarratorConfig) -> Arc<dyn Narrator> {
    match config.parse_backend().0 {
        NarratorBackend::Paced => Arc::new(PacedNarrator::new(config.words_per_minute)),
        NarratorBackend::Command => Arc::new(CommandNarrator::new(
            config.command.clone(),
            config.args.clone(),
        )),
    }
}

/// Wait for the next `stop()`.
///
/// The waiter is registered before this returns, so a stop issued after
/// playback starts is never missed.
async fn stopped(signal: &Notify) {
    let notified = signal.notified();
    tokio::pin!(notified);
    notified.as_mut().enable();
    notified.await;
}
