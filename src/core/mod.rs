//! Core Module - Analysis Engines
//!
//! Bytecode risk analysis, holder reconstruction, identity linking and the
//! profile aggregator that ties them together.

pub mod bytecode;
pub mod holders;
pub mod identity;
pub mod opcodes;
pub mod profile;

pub use bytecode::*;
pub use holders::*;
pub use identity::*;
pub use profile::*;
