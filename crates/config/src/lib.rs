//! Configuration management for keylens
//!
//! Settings are layered: built-in defaults, then the JSON config file, then
//! `KEYLENS_*` environment variables, then command line flags.

pub mod config;
pub mod loader;

pub use config::*;
pub use loader::*;
