//! User approvals backed by the token store

use super::token_store::TokenStore;
use crate::domain::{AccessToken, Approval, OAuth2Authentication};
use crate::error::Result;
use crate::repository::{AccessTokenRepository, RefreshTokenRepository};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

/// Approvals are not stored on their own: a scope counts as approved while a
/// live access token of the user and client carries it.
pub struct ApprovalService<A: AccessTokenRepository, F: RefreshTokenRepository> {
    tokens: Arc<TokenStore<A, F>>,
}

impl<A: AccessTokenRepository, F: RefreshTokenRepository> ApprovalService<A, F> {
    pub fn new(tokens: Arc<TokenStore<A, F>>) -> Self {
        Self { tokens }
    }

    /// One approval per scope granted to `client_id` by `user_id`
    pub async fn get_approvals(&self, user_id: &str, client_id: &str) -> Result<Vec<Approval>> {
        let tokens = self
            .tokens
            .find_tokens_by_client_id_and_user(client_id, user_id)
            .await?;

        // A scope carried by several tokens is approved until the latest expiry
        let mut expiries: BTreeMap<&str, DateTime<Utc>> = BTreeMap::new();
        for token in &tokens {
            for scope in &token.scope {
                let expiry = expiries.entry(scope.as_str()).or_insert(token.expires_at);
                *expiry = (*expiry).max(token.expires_at);
            }
        }

        Ok(expiries
            .into_iter()
            .map(|(scope, expires_at)| Approval::approved(user_id, client_id, scope, expires_at))
            .collect())
    }

    /// Withdraw approvals by revoking every token that carries one of their scopes.
    ///
    /// Returns the number of access tokens revoked.
    pub async fn revoke_approvals(&self, approvals: &[Approval]) -> Result<usize> {
        let mut revoked_scopes: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();
        for approval in approvals {
            revoked_scopes
                .entry((approval.user_id.as_str(), approval.client_id.as_str()))
                .or_default()
                .insert(approval.scope.as_str());
        }

        let mut revoked = 0;
        for ((user_id, client_id), scopes) in revoked_scopes {
            let tokens = self
                .tokens
                .find_tokens_by_client_id_and_user(client_id, user_id)
                .await?;

            for token in tokens.iter().filter(|t| carries_any(t, &scopes)) {
                self.tokens.remove_access_token(&token.token).await?;
                if let Some(refresh) = token.refresh_token.as_deref() {
                    self.tokens.remove_refresh_token(refresh).await?;
                }
                revoked += 1;
            }

            info!(user = %user_id, client_id = %client_id, "Revoked approvals");
        }

        Ok(revoked)
    }

    /// Whether the requested scopes are already covered by a live token of the
    /// same session, so the consent step can be skipped.
    pub async fn is_approved(&self, authentication: &OAuth2Authentication) -> Result<bool> {
        if authentication.request.approved {
            return Ok(true);
        }
        if authentication.is_client_only() {
            return Ok(false);
        }

        let approved = self
            .tokens
            .get_access_token(authentication)
            .await?
            .is_some_and(|token| authentication.scope().is_subset(&token.scope));
        Ok(approved)
    }
}

fn carries_any(token: &AccessToken, scopes: &BTreeSet<&str>) -> bool {
    token.scope.iter().any(|s| scopes.contains(s.as_str()))
}
