//! Progress rendering

pub mod console;
