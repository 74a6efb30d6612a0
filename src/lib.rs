// Registration, moderation and login gating for the kitchen delivery platform.
// The binary in main.rs only wires these modules into an HTTP server.

pub mod approval;
pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod events;
pub mod extractors;
pub mod kafka;
pub mod logger;
pub mod middleware;
pub mod models;
pub mod moderation;
pub mod routes;
pub mod services;
pub mod store;

// Re-export common types
pub use crate::config::AppConfig;
pub use crate::errors::ApiError;
pub use crate::events::EventPublisher;
pub use crate::models::{Account, ApprovalState, Role};
pub use crate::store::IdentityStore;
