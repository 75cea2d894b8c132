use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{Entity, UserId};

/// Local mirror of an identity-provider user, keyed by the provider's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub external_id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(external_id: impl Into<String>, email: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            external_id: external_id.into(),
            email,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh the mirrored profile; identity and creation time are kept.
    pub fn refreshed(&self, email: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            email,
            updated_at: now,
            ..self.clone()
        }
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
