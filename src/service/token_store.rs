//! Access and refresh token storage

use crate::config::ReissuePolicy;
use crate::domain::{AccessToken, OAuth2Authentication, RefreshToken};
use crate::error::Result;
use crate::repository::{AccessTokenRepository, RefreshTokenRepository};
use crate::telemetry::metrics::record_grant_operation;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

const ACCESS_TOKEN: &str = "access_token";
const REFRESH_TOKEN: &str = "refresh_token";

/// Token store backing the OAuth2 protocol endpoints.
///
/// Expired tokens read by value or by session key are deleted on the spot and
/// reported absent. Storage failures propagate unchanged.
pub struct TokenStore<A: AccessTokenRepository, F: RefreshTokenRepository> {
    access_tokens: Arc<A>,
    refresh_tokens: Arc<F>,
    reissue_policy: ReissuePolicy,
}

impl<A: AccessTokenRepository, F: RefreshTokenRepository> TokenStore<A, F> {
    pub fn new(access_tokens: Arc<A>, refresh_tokens: Arc<F>, reissue_policy: ReissuePolicy) -> Self {
        Self {
            access_tokens,
            refresh_tokens,
            reissue_policy,
        }
    }

    // ==================== Access tokens ====================

    /// Persist `token` for `authentication`.
    ///
    /// When the reissue policy applies, the live token of the same session
    /// key is removed first together with its refresh token. A refresh token
    /// the new token still links to is kept.
    pub async fn store_access_token(
        &self,
        mut token: AccessToken,
        authentication: &OAuth2Authentication,
    ) -> Result<()> {
        token.authentication_key = authentication.authentication_key();
        token.authentication = authentication.clone();

        // Storing the same value twice overwrites it
        self.access_tokens.delete(&token.token).await?;

        let grant_type = authentication.request.grant_type.as_deref();
        if self.reissue_policy.replaces(grant_type) {
            if let Some(previous) = self
                .access_tokens
                .find_by_authentication_key(&token.authentication_key)
                .await?
            {
                self.access_tokens.delete(&previous.token).await?;
                if let Some(refresh) = previous.refresh_token.as_deref() {
                    if token.refresh_token.as_deref() != Some(refresh) {
                        self.refresh_tokens.delete(refresh).await?;
                    }
                }
                debug!(client_id = %token.client_id, "Replaced access token of session");
            }
        }

        self.access_tokens.create(&token).await?;
        record_grant_operation(ACCESS_TOKEN, "store");
        Ok(())
    }

    pub async fn read_access_token(&self, value: &str) -> Result<Option<AccessToken>> {
        let token = self.access_tokens.find_by_token(value).await?;
        self.live_access_token(token).await
    }

    /// Authentication an access token was issued for
    pub async fn read_authentication(&self, value: &str) -> Result<Option<OAuth2Authentication>> {
        Ok(self
            .read_access_token(value)
            .await?
            .map(|token| token.authentication))
    }

    /// Live access token of the session `authentication` belongs to
    pub async fn get_access_token(
        &self,
        authentication: &OAuth2Authentication,
    ) -> Result<Option<AccessToken>> {
        let token = self
            .access_tokens
            .find_by_authentication_key(&authentication.authentication_key())
            .await?;
        self.live_access_token(token).await
    }

    /// Revoke an access token. Revoking an absent token succeeds.
    pub async fn remove_access_token(&self, value: &str) -> Result<()> {
        self.access_tokens.delete(value).await?;
        record_grant_operation(ACCESS_TOKEN, "remove");
        Ok(())
    }

    /// Revoke every access token of the session `authentication` belongs to,
    /// together with the refresh tokens they link to
    pub async fn remove_access_token_for(&self, authentication: &OAuth2Authentication) -> Result<()> {
        let key = authentication.authentication_key();
        let tokens = self.access_tokens.find_all_by_authentication_key(&key).await?;
        if tokens.is_empty() {
            return Ok(());
        }

        let removed = self.access_tokens.delete_by_authentication_key(&key).await?;
        let mut refresh: Vec<&str> = tokens
            .iter()
            .filter_map(|token| token.refresh_token.as_deref())
            .collect();
        refresh.sort_unstable();
        refresh.dedup();
        for value in refresh {
            self.refresh_tokens.delete(value).await?;
        }

        debug!(removed, "Revoked access tokens of session");
        record_grant_operation(ACCESS_TOKEN, "remove");
        Ok(())
    }

    /// Revoke every access token obtained with a refresh token
    pub async fn remove_access_token_using_refresh_token(&self, refresh_token: &str) -> Result<u64> {
        let removed = self
            .access_tokens
            .delete_by_refresh_token(refresh_token)
            .await?;
        record_grant_operation(ACCESS_TOKEN, "remove");
        Ok(removed)
    }

    async fn live_access_token(&self, token: Option<AccessToken>) -> Result<Option<AccessToken>> {
        match token {
            Some(token) if token.is_expired() => {
                debug!(client_id = %token.client_id, "Discarding expired access token");
                self.access_tokens.delete(&token.token).await?;
                Ok(None)
            }
            token => Ok(token),
        }
    }

    // ==================== Refresh tokens ====================

    pub async fn store_refresh_token(
        &self,
        mut token: RefreshToken,
        authentication: &OAuth2Authentication,
    ) -> Result<()> {
        token.authentication = authentication.clone();

        self.refresh_tokens.delete(&token.token).await?;
        self.refresh_tokens.create(&token).await?;
        record_grant_operation(REFRESH_TOKEN, "store");
        Ok(())
    }

    pub async fn read_refresh_token(&self, value: &str) -> Result<Option<RefreshToken>> {
        match self.refresh_tokens.find_by_token(value).await? {
            Some(token) if token.is_expired() => {
                debug!(client_id = %token.client_id, "Discarding expired refresh token");
                self.refresh_tokens.delete(&token.token).await?;
                Ok(None)
            }
            token => Ok(token),
        }
    }

    pub async fn read_authentication_for_refresh_token(
        &self,
        value: &str,
    ) -> Result<Option<OAuth2Authentication>> {
        Ok(self
            .read_refresh_token(value)
            .await?
            .map(|token| token.authentication))
    }

    /// Revoke a refresh token and every access token still linked to it.
    pub async fn remove_refresh_token(&self, value: &str) -> Result<()> {
        let (_, linked) = tokio::try_join!(
            self.refresh_tokens.delete(value),
            self.access_tokens.delete_by_refresh_token(value)
        )?;

        debug!(linked_access_tokens = linked, "Removed refresh token");
        record_grant_operation(REFRESH_TOKEN, "remove");
        Ok(())
    }

    // ==================== Enumeration ====================

    pub async fn find_tokens_by_client_id(&self, client_id: &str) -> Result<Vec<AccessToken>> {
        let tokens = self.access_tokens.find_by_client_id(client_id).await?;
        Ok(live(tokens))
    }

    pub async fn find_tokens_by_user(&self, user: &str) -> Result<Vec<AccessToken>> {
        let tokens = self.access_tokens.find_by_subject(user).await?;
        Ok(live(tokens))
    }

    pub async fn find_tokens_by_client_id_and_user(
        &self,
        client_id: &str,
        user: &str,
    ) -> Result<Vec<AccessToken>> {
        let tokens = self
            .access_tokens
            .find_by_client_id_and_subject(client_id, user)
            .await?;
        Ok(live(tokens))
    }

    /// Log a user out everywhere: drop all access and refresh tokens of `user`.
    pub async fn revoke_user_tokens(&self, user: &str) -> Result<u64> {
        let (access, refresh) = tokio::try_join!(
            self.access_tokens.delete_by_subject(user),
            self.refresh_tokens.delete_by_subject(user)
        )?;

        info!(
            user = %user,
            access_tokens = access,
            refresh_tokens = refresh,
            "Revoked user tokens"
        );
        record_grant_operation(ACCESS_TOKEN, "revoke_user");
        Ok(access + refresh)
    }

    /// Delete tokens expired at `now`; returns (access, refresh) counts
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<(u64, u64)> {
        let counts = tokio::try_join!(
            self.access_tokens.delete_expired(now),
            self.refresh_tokens.delete_expired(now)
        )?;
        Ok(counts)
    }
}

fn live(tokens: Vec<AccessToken>) -> Vec<AccessToken> {
    let now = Utc::now();
    tokens
        .into_iter()
        .filter(|token| !token.is_expired_at(now))
        .collect()
}
