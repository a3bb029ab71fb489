//! OAuth2 grants: access tokens, refresh tokens and authorization codes

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use std::collections::BTreeSet;

/// The authorization request a grant was issued for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OAuth2Request {
    pub client_id: String,
    #[serde(default)]
    pub scope: BTreeSet<String>,
    pub grant_type: Option<String>,
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub response_types: BTreeSet<String>,
    pub state: Option<String>,
    /// PKCE challenge, verified by the protocol layer at code exchange
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    #[serde(default)]
    pub approved: bool,
}

impl OAuth2Request {
    pub fn new<I, S>(client_id: impl Into<String>, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client_id: client_id.into(),
            scope: scope.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_grant_type(mut self, grant_type: impl Into<String>) -> Self {
        self.grant_type = Some(grant_type.into());
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }
}

/// Authenticated request: the client request plus the end user, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Authentication {
    pub request: OAuth2Request,
    /// Absent for client-only grants such as `client_credentials`
    pub user: Option<String>,
}

impl OAuth2Authentication {
    pub fn new(request: OAuth2Request, user: Option<String>) -> Self {
        Self { request, user }
    }

    pub fn client_id(&self) -> &str {
        &self.request.client_id
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn scope(&self) -> &BTreeSet<String> {
        &self.request.scope
    }

    pub fn is_client_only(&self) -> bool {
        self.user.is_none()
    }

    /// Session key of this authentication.
    ///
    /// Hex encoded SHA-256 over the client id, the username and the sorted
    /// scope set. Two authentications of the same user for the same client
    /// and scopes share a key, whatever else differs in their requests.
    pub fn authentication_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"client_id=");
        hasher.update(self.client_id().as_bytes());
        if let Some(username) = self.username() {
            hasher.update(b"&username=");
            hasher.update(username.as_bytes());
        }
        hasher.update(b"&scope=");
        // BTreeSet iterates in sorted order
        let scope: Vec<&str> = self.request.scope.iter().map(String::as_str).collect();
        hasher.update(scope.join(" ").as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AccessToken {
    /// Opaque token value, also the identifier
    pub token: String,
    pub client_id: String,
    pub subject: Option<String>,
    #[sqlx(json)]
    pub scope: BTreeSet<String>,
    pub authentication_key: String,
    #[sqlx(json)]
    pub authentication: OAuth2Authentication,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Build a token for `authentication` that expires `ttl` from now.
    pub fn new(token: impl Into<String>, authentication: &OAuth2Authentication, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            token: token.into(),
            client_id: authentication.client_id().to_string(),
            subject: authentication.user.clone(),
            scope: authentication.scope().clone(),
            authentication_key: authentication.authentication_key(),
            authentication: authentication.clone(),
            refresh_token: None,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Remaining lifetime in seconds, never negative
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub client_id: String,
    pub subject: Option<String>,
    #[sqlx(json)]
    pub authentication: OAuth2Authentication,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn new(token: impl Into<String>, authentication: &OAuth2Authentication, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            token: token.into(),
            client_id: authentication.client_id().to_string(),
            subject: authentication.user.clone(),
            authentication: authentication.clone(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Single-use, short-lived authorization code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub subject: Option<String>,
    #[sqlx(json)]
    pub authentication: OAuth2Authentication,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set once, by the single successful consumption
    pub consumed_at: Option<DateTime<Utc>>,
}

impl AuthorizationCode {
    pub fn new(code: impl Into<String>, authentication: &OAuth2Authentication, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            code: code.into(),
            client_id: authentication.client_id().to_string(),
            subject: authentication.user.clone(),
            authentication: authentication.clone(),
            created_at: now,
            expires_at: now + ttl,
            consumed_at: None,
        }
    }

    /// Whether the code may still be exchanged at `now`
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && self.expires_at > now
    }
}
