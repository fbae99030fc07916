//! Domain layer: pure types and logic, no I/O.

pub mod billing;
pub mod foundation;
