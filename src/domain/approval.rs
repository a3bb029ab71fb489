//! User approvals derived from issued tokens

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    #[default]
    Approved,
    Denied,
}

/// One scope a user granted to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub user_id: String,
    pub client_id: String,
    pub scope: String,
    pub status: ApprovalStatus,
    pub expires_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl Approval {
    pub fn approved(
        user_id: impl Into<String>,
        client_id: impl Into<String>,
        scope: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            client_id: client_id.into(),
            scope: scope.into(),
            status: ApprovalStatus::Approved,
            expires_at,
            last_updated_at: Utc::now(),
        }
    }
}
