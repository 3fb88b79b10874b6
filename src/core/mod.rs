//! Core Module - Gateway Logic
//!
//! URL guard, backend proxy, on-chain fallback, response normalizer and
//! the scan orchestration that ties them together.

pub mod fallback;
pub mod normalize;
pub mod proxy;
pub mod scan;
pub mod url_guard;

pub use fallback::*;
pub use normalize::*;
pub use proxy::*;
pub use scan::*;
pub use url_guard::*;
