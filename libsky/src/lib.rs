//! Shared utilities used by both the engine library and its binary entry
//! points (the `taskd` daemon and the `taskd-worker` child process).

pub mod util;

use std::error::Error;

/// A generic boxed-error result, used at the outermost edges (binary
/// entry-point plumbing) where a concrete error type would be overkill.
pub type TResult<T> = Result<T, Box<dyn Error>>;

/// The crate version, printed at startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
