//! Utils Module - Helper Functions & Shared Utilities
//!
//! Constants, display-name generation and block reference parsing.

pub mod blocks;
pub mod constants;
pub mod names;

pub use blocks::*;
pub use constants::*;
pub use names::*;
