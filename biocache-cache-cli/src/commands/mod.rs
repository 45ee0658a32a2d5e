//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (get, set, list, path, init)
//! - [`qid`] - Query store management (put, get, reap, stats, clear)

pub mod config;
pub mod qid;
