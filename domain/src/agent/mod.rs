//! Agent domain
//!
//! Agents, their personas and the roster that keeps their ids dense.

pub mod entities;
pub mod model_kind;
pub mod roster;
