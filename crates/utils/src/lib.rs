//! Shared utilities for keylens
//!
//! Tracing setup, throttled progress reporting for long report runs, and the
//! XDG directories where configuration and snapshots live.

pub mod tracing;
pub mod xdg;

pub use self::tracing::*;
pub use xdg::*;
