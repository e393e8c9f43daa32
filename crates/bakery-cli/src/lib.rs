//! Bakery CLI library.
//!
//! Command implementations and input loading for the `bakery` binary.

pub mod commands;
pub mod input;
pub mod logging;
