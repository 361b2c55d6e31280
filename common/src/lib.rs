//! xrate Common Types
//!
//! Shared vocabulary for the xrate crates: currency codes, display symbols
//! and the clock abstraction used for snapshot timestamps.

pub mod currency;
pub mod time;

pub use currency::*;
pub use time::*;
