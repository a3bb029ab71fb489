//! Single-use authorization codes

use crate::domain::{AuthorizationCode, OAuth2Authentication};
use crate::error::{AppError, Result};
use crate::repository::AuthorizationCodeRepository;
use crate::telemetry::metrics::{record_grant_operation, AUTHORIZATION_CODE_REJECTED};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use rand::Rng;
use std::sync::Arc;
use tracing::warn;

const AUTHORIZATION_CODE: &str = "authorization_code";

pub struct AuthorizationCodeService<R: AuthorizationCodeRepository> {
    repo: Arc<R>,
    ttl: Duration,
}

impl<R: AuthorizationCodeRepository> AuthorizationCodeService<R> {
    pub fn new(repo: Arc<R>, ttl_secs: i64) -> Self {
        Self {
            repo,
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Persist `code`, expiring one TTL after now.
    pub async fn store(
        &self,
        code: &str,
        authentication: &OAuth2Authentication,
    ) -> Result<AuthorizationCode> {
        let code = AuthorizationCode::new(code, authentication, self.ttl);
        self.repo.create(&code).await?;
        record_grant_operation(AUTHORIZATION_CODE, "store");
        Ok(code)
    }

    /// Generate, store and return a fresh code for `authentication`.
    pub async fn create_authorization_code(
        &self,
        authentication: &OAuth2Authentication,
    ) -> Result<String> {
        let code = generate_code();
        self.store(&code, authentication).await?;
        Ok(code)
    }

    /// Redeem a code exactly once.
    ///
    /// Fails with [`AppError::InvalidGrant`] when the code is unknown, expired
    /// or already redeemed, including when a concurrent caller won the race.
    pub async fn consume(&self, code: &str) -> Result<OAuth2Authentication> {
        match self.repo.consume(code, Utc::now()).await? {
            Some(consumed) => {
                record_grant_operation(AUTHORIZATION_CODE, "consume");
                Ok(consumed.authentication)
            }
            None => {
                counter!(AUTHORIZATION_CODE_REJECTED).increment(1);
                warn!("Rejected unknown, expired or replayed authorization code");
                Err(AppError::InvalidGrant(
                    "Invalid authorization code".to_string(),
                ))
            }
        }
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.repo.delete_expired(now).await
    }
}

/// 256 random bits, URL-safe base64 without padding
fn generate_code() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
