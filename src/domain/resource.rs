//! Resources owned by a domain

use super::common::new_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Resource families removed together with their domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Client,
    Certificate,
    IdentityProvider,
    Role,
    User,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Client => "client",
            ResourceKind::Certificate => "certificate",
            ResourceKind::IdentityProvider => "identity_provider",
            ResourceKind::Role => "role",
            ResourceKind::User => "user",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record that belongs to exactly one domain
pub trait DomainResource: Send + Sync {
    fn id(&self) -> &str;
    fn domain(&self) -> &str;
}

macro_rules! impl_domain_resource {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl DomainResource for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn domain(&self) -> &str {
                    &self.domain
                }
            }
        )+
    };
}

impl_domain_resource!(Client, Certificate, IdentityProvider, Role, User);

/// OAuth2 client registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: String,
    pub domain: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    #[sqlx(json)]
    pub redirect_uris: Vec<String>,
    #[sqlx(json)]
    pub authorized_grant_types: Vec<String>,
    #[sqlx(json)]
    pub scopes: Vec<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(domain: impl Into<String>, client_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            domain: domain.into(),
            client_id: client_id.into(),
            client_secret: None,
            redirect_uris: Vec::new(),
            authorized_grant_types: vec!["authorization_code".to_string()],
            scopes: Vec::new(),
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Signing certificate configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Certificate {
    pub id: String,
    pub domain: String,
    pub name: String,
    /// Plugin type, e.g. `javakeystore-am-certificate`
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    /// Plugin configuration as a JSON document
    pub configuration: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Certificate {
    pub fn new(domain: impl Into<String>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            domain: domain.into(),
            name: name.into(),
            kind: kind.into(),
            configuration: "{}".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// External identity provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IdentityProvider {
    pub id: String,
    pub domain: String,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub configuration: String,
    pub external: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityProvider {
    pub fn new(domain: impl Into<String>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            domain: domain.into(),
            name: name.into(),
            kind: kind.into(),
            configuration: "{}".to_string(),
            external: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: String,
    pub domain: String,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(json)]
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(domain: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            domain: domain.into(),
            name: name.into(),
            description: None,
            permissions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub domain: String,
    pub username: String,
    pub email: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(domain: impl Into<String>, username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            domain: domain.into(),
            username: username.into(),
            email: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}
