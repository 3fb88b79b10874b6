//! Shield Gateway API Module
//! HTTP surface: scan, apply forwarding, health and launchpad ping

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

pub use handlers::AppState;
pub use routes::create_router;
pub use types::*;
