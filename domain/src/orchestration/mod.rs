//! Turn orchestration domain
//!
//! Epoch-based cancellation, the discussion state machine, narration items
//! and the status projection shown to users.

pub mod discussion;
pub mod epoch;
pub mod mode;
pub mod narration;
pub mod status;
pub mod turn_limit;
