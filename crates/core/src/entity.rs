//! Attribution carried by every persisted record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Creation and modification attribution shared by every persisted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub created_by_id: UserId,
    pub created_by_name: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by_id: Option<UserId>,
    pub updated_by_name: Option<String>,
}

impl Audit {
    /// Attribution for a freshly created entity.
    pub fn created_by(actor: UserId, actor_name: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            created_at: at,
            created_by_id: actor,
            created_by_name: actor_name,
            updated_at: None,
            updated_by_id: None,
            updated_by_name: None,
        }
    }

    /// Attribution used for rows written by the service itself (seeding, bootstrap).
    pub fn system(at: DateTime<Utc>) -> Self {
        Self::created_by(UserId::nil(), Some("system".to_string()), at)
    }

    pub fn touch(&mut self, actor: Option<UserId>, actor_name: Option<String>, at: DateTime<Utc>) {
        self.updated_at = Some(at);
        self.updated_by_id = actor;
        self.updated_by_name = actor_name;
    }
}
