//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub(crate) mod discussion;
pub mod interrupt;
pub mod narration_queue;
pub mod orchestrator;
pub(crate) mod podcast;
pub mod shared;
pub(crate) mod turn;

#[cfg(test)]
mod test_support;
