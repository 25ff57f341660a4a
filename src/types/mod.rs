//! Type definitions for screentrack

mod error;
mod usage;

pub use error::*;
pub use usage::*;
