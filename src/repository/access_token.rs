//! Access token repository

use super::to_json;
use crate::domain::AccessToken;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessTokenRepository: Send + Sync {
    async fn create(&self, token: &AccessToken) -> Result<()>;
    async fn find_by_token(&self, token: &str) -> Result<Option<AccessToken>>;
    /// Most recent token issued for a session key
    async fn find_by_authentication_key(&self, key: &str) -> Result<Option<AccessToken>>;
    /// Every token sharing a session key, newest first
    async fn find_all_by_authentication_key(&self, key: &str) -> Result<Vec<AccessToken>>;
    async fn find_by_client_id(&self, client_id: &str) -> Result<Vec<AccessToken>>;
    async fn find_by_subject(&self, subject: &str) -> Result<Vec<AccessToken>>;
    async fn find_by_client_id_and_subject(
        &self,
        client_id: &str,
        subject: &str,
    ) -> Result<Vec<AccessToken>>;
    /// Idempotent: removing an absent token succeeds
    async fn delete(&self, token: &str) -> Result<()>;
    async fn delete_by_refresh_token(&self, refresh_token: &str) -> Result<u64>;
    async fn delete_by_authentication_key(&self, key: &str) -> Result<u64>;
    async fn delete_by_subject(&self, subject: &str) -> Result<u64>;
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

pub struct AccessTokenRepositoryImpl {
    pool: MySqlPool,
}

impl AccessTokenRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessTokenRepository for AccessTokenRepositoryImpl {
    async fn create(&self, token: &AccessToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO access_tokens (token, client_id, subject, scope, authentication_key,
                                       authentication, refresh_token, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.token)
        .bind(&token.client_id)
        .bind(&token.subject)
        .bind(to_json(&token.scope)?)
        .bind(&token.authentication_key)
        .bind(to_json(&token.authentication)?)
        .bind(&token.refresh_token)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<AccessToken>> {
        let token = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT token, client_id, subject, scope, authentication_key, authentication,
                   refresh_token, created_at, expires_at
            FROM access_tokens
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn find_by_authentication_key(&self, key: &str) -> Result<Option<AccessToken>> {
        let token = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT token, client_id, subject, scope, authentication_key, authentication,
                   refresh_token, created_at, expires_at
            FROM access_tokens
            WHERE authentication_key = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn find_all_by_authentication_key(&self, key: &str) -> Result<Vec<AccessToken>> {
        let tokens = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT token, client_id, subject, scope, authentication_key, authentication,
                   refresh_token, created_at, expires_at
            FROM access_tokens
            WHERE authentication_key = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await?;

        Ok(tokens)
    }

    async fn find_by_client_id(&self, client_id: &str) -> Result<Vec<AccessToken>> {
        let tokens = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT token, client_id, subject, scope, authentication_key, authentication,
                   refresh_token, created_at, expires_at
            FROM access_tokens
            WHERE client_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tokens)
    }

    async fn find_by_subject(&self, subject: &str) -> Result<Vec<AccessToken>> {
        let tokens = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT token, client_id, subject, scope, authentication_key, authentication,
                   refresh_token, created_at, expires_at
            FROM access_tokens
            WHERE subject = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(subject)
        .fetch_all(&self.pool)
        .await?;

        Ok(tokens)
    }

    async fn find_by_client_id_and_subject(
        &self,
        client_id: &str,
        subject: &str,
    ) -> Result<Vec<AccessToken>> {
        let tokens = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT token, client_id, subject, scope, authentication_key, authentication,
                   refresh_token, created_at, expires_at
            FROM access_tokens
            WHERE client_id = ? AND subject = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(client_id)
        .bind(subject)
        .fetch_all(&self.pool)
        .await?;

        Ok(tokens)
    }

    async fn delete(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM access_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_by_refresh_token(&self, refresh_token: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE refresh_token = ?")
            .bind(refresh_token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_by_authentication_key(&self, key: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE authentication_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_by_subject(&self, subject: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE subject = ?")
            .bind(subject)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
