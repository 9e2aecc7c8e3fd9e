//! cbfvec CLI library.
//!
//! Command implementations, configuration file loading, and log setup for
//! the `cbfvec` binary.

pub mod commands;
pub mod config;
pub mod logging;
