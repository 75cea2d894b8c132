use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainError, DomainResult, Entity};

use crate::validate::required_text;

/// Grouping of items (e.g. "Elektronik", "ATK").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
}

impl NewCategory {
    pub fn into_category(self, id: CategoryId, now: DateTime<Utc>) -> DomainResult<Category> {
        Ok(Category {
            id,
            name: required_text("name", &self.name)?,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
}

impl Category {
    pub fn patched(&self, patch: CategoryPatch) -> DomainResult<Category> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = required_text("name", &name)?;
        }
        Ok(next)
    }

    /// A category can only be removed once no item references it.
    pub fn ensure_deletable(&self, referencing_items: usize) -> DomainResult<()> {
        if referencing_items > 0 {
            return Err(DomainError::conflict(format!(
                "category '{}' is still used by {} item(s)",
                self.name, referencing_items
            )));
        }
        Ok(())
    }
}
