//! Providers Module - External Data Sources
//!
//! The ledger interface, its JSON-RPC implementation and an in-memory
//! implementation for tests and replays.

pub mod ledger;
pub mod metadata;
pub mod rpc;
pub mod static_ledger;

pub use ledger::*;
pub use metadata::*;
pub use rpc::*;
pub use static_ledger::*;
