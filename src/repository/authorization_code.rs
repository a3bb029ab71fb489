//! Authorization code repository

use super::to_json;
use crate::domain::AuthorizationCode;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorizationCodeRepository: Send + Sync {
    async fn create(&self, code: &AuthorizationCode) -> Result<()>;

    /// Atomically mark `code` consumed at `now`.
    ///
    /// Returns the stored code only to the single caller whose write flipped
    /// it from unconsumed to consumed while unexpired. Every other caller,
    /// including the losers of a concurrent race, gets `None`.
    async fn consume(&self, code: &str, now: DateTime<Utc>) -> Result<Option<AuthorizationCode>>;

    /// Remove codes expired at `now`. Consumed codes are kept until they expire.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

pub struct AuthorizationCodeRepositoryImpl {
    pool: MySqlPool,
}

impl AuthorizationCodeRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationCodeRepository for AuthorizationCodeRepositoryImpl {
    async fn create(&self, code: &AuthorizationCode) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO authorization_codes (code, client_id, subject, authentication, created_at, expires_at, consumed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&code.code)
        .bind(&code.client_id)
        .bind(&code.subject)
        .bind(to_json(&code.authentication)?)
        .bind(code.created_at)
        .bind(code.expires_at)
        .bind(code.consumed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume(&self, code: &str, now: DateTime<Utc>) -> Result<Option<AuthorizationCode>> {
        let stored = sqlx::query_as::<_, AuthorizationCode>(
            r#"
            SELECT code, client_id, subject, authentication, created_at, expires_at, consumed_at
            FROM authorization_codes
            WHERE code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut stored) = stored else {
            return Ok(None);
        };

        // Conditional write on the consumed marker; the row lock makes it single-winner
        let result = sqlx::query(
            r#"
            UPDATE authorization_codes
            SET consumed_at = ?
            WHERE code = ? AND consumed_at IS NULL AND expires_at > ?
            "#,
        )
        .bind(now)
        .bind(code)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() != 1 {
            return Ok(None);
        }

        stored.consumed_at = Some(now);
        Ok(Some(stored))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        // Consumed rows stay until expiry; the primary key then blocks reissuing the code
        let result = sqlx::query("DELETE FROM authorization_codes WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
