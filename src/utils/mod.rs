//! The `utils` module provides shared pieces used across the relay:
//! the crate-wide error type and logging initialisation.

pub mod error;
pub mod logging;
