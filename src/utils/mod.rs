//! Utils Module - Helper Functions & Shared Utilities
//!
//! Constants and the binary account decoder used across the gateway.

pub mod constants;
pub mod decoder;

pub use constants::*;
pub use decoder::*;
