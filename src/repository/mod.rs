//! Data access layer (Repository pattern)

pub mod access_token;
pub mod authorization_code;
pub mod certificate;
pub mod client;
pub mod domain;
pub mod identity_provider;
pub mod refresh_token;
pub mod role;
pub mod user;

pub use access_token::{AccessTokenRepository, AccessTokenRepositoryImpl};
pub use authorization_code::{AuthorizationCodeRepository, AuthorizationCodeRepositoryImpl};
pub use certificate::{CertificateRepository, CertificateRepositoryImpl};
pub use client::{ClientRepository, ClientRepositoryImpl};
pub use domain::{DomainRepository, DomainRepositoryImpl};
pub use identity_provider::{IdentityProviderRepository, IdentityProviderRepositoryImpl};
pub use refresh_token::{RefreshTokenRepository, RefreshTokenRepositoryImpl};
pub use role::{RoleRepository, RoleRepositoryImpl};
pub use user::{UserRepository, UserRepositoryImpl};

/// MySQL duplicate-key error code
const ER_DUP_ENTRY: &str = "1062";

/// Whether `err` is a primary/unique key collision
pub(crate) fn is_duplicate_key(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == ER_DUP_ENTRY)
        .unwrap_or(false)
}

/// Serialize a JSON column value
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> crate::error::Result<String> {
    serde_json::to_string(value).map_err(|e| crate::error::AppError::Internal(e.into()))
}
