//! Security domain (tenant) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlRow;
use sqlx::Row;
use validator::Validate;

/// Login page customisation of a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoginForm {
    pub enabled: bool,
    /// Template source
    pub content: Option<String>,
    pub assets: Option<String>,
}

/// Tenant boundary of the authorization server.
///
/// Dependent resources (clients, certificates, identity providers, roles and
/// users) reference a domain through its `id` and are discovered by query;
/// the domain never holds them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    /// Bootstrap domain, deletion protected
    pub master: bool,
    pub login_form: Option<LoginForm>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Domain {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: String::new(),
            description: None,
            enabled: true,
            master: false,
            login_form: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl<'r> sqlx::FromRow<'r, MySqlRow> for Domain {
    fn from_row(row: &'r MySqlRow) -> Result<Self, sqlx::Error> {
        let login_form_enabled: Option<bool> = row.try_get("login_form_enabled")?;
        let login_form = match login_form_enabled {
            Some(enabled) => Some(LoginForm {
                enabled,
                content: row.try_get("login_form_content")?,
                assets: row.try_get("login_form_assets")?,
            }),
            None => None,
        };

        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            enabled: row.try_get("enabled")?,
            master: row.try_get("master")?,
            login_form,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Input for creating a new domain
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDomain {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
}

/// Input for updating a domain. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDomain {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

/// Input for replacing the login form of a domain
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLoginForm {
    pub enabled: bool,
    #[validate(length(max = 65536))]
    pub content: Option<String>,
    pub assets: Option<String>,
}

impl UpdateDomain {
    /// Apply the present fields onto `domain`.
    pub fn apply(&self, domain: &mut Domain) {
        if let Some(name) = &self.name {
            domain.name = name.clone();
        }
        if let Some(description) = &self.description {
            domain.description = Some(description.clone());
        }
        if let Some(enabled) = self.enabled {
            domain.enabled = enabled;
        }
    }
}

impl From<UpdateLoginForm> for LoginForm {
    fn from(input: UpdateLoginForm) -> Self {
        Self {
            enabled: input.enabled,
            content: input.content,
            assets: input.assets,
        }
    }
}
