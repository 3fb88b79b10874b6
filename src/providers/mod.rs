//! Providers Module - External Data Sources
//!
//! Outbound HTTP plumbing and the Solana JSON-RPC client.

pub mod http;
pub mod solana;

pub use http::*;
pub use solana::*;
