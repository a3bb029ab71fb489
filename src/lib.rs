//! Warden Core - multi-tenant OAuth2/OIDC lifecycle and grant persistence
//!
//! This crate manages security domains (tenants) with cascading deletion of
//! the resources they own, and stores the OAuth2 grants (access tokens,
//! refresh tokens and authorization codes) the protocol endpoints rely on.

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod migration;
pub mod repository;
pub mod server;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
