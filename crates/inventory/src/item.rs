use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainResult, Entity, ItemId, StockInId};

use crate::ledger::StockInRecord;
use crate::reconcile::{StockLevel, StockSnapshot};
use crate::validate::{non_negative, optional_text, required_text};

/// Supplier label used for the stock-in entry recorded when an item is added.
pub const INITIAL_STOCK_SUPPLIER: &str = "Initial Stock";

/// Note attached to the stock-in entry recorded when an item is added.
pub const INITIAL_STOCK_NOTE: &str = "Opening stock recorded when the item was added";

/// A stocked good.
///
/// `stock` is the item's base quantity: an opening balance that is not backed
/// by any ledger entry. Items created through [`NewItem::into_item`] always
/// start at zero and carry their initial quantity as a stock-in entry instead,
/// so the remaining quantity is `stock + stock-ins - stock-outs` without
/// counting anything twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub code: String,
    pub name: String,
    pub category_id: CategoryId,
    pub unit: String,
    pub location: Option<String>,
    pub stock: i64,
    pub min_stock: i64,
    pub created_at: DateTime<Utc>,
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Input for creating an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub code: String,
    pub name: String,
    pub category_id: CategoryId,
    pub unit: String,
    pub location: Option<String>,
    /// Quantity on hand when the item is added.
    pub initial_stock: i64,
    pub min_stock: i64,
}

/// An item together with the opening stock-in entry created alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedItem {
    pub item: Item,
    pub opening_entry: Option<StockInRecord>,
}

impl NewItem {
    /// Validate and build the item plus, for a nonzero initial quantity, exactly
    /// one stock-in entry of that quantity.
    pub fn into_item(self, id: ItemId, now: DateTime<Utc>) -> DomainResult<CreatedItem> {
        let initial_stock = non_negative("stock", self.initial_stock)?;

        let item = Item {
            id,
            code: required_text("code", &self.code)?,
            name: required_text("name", &self.name)?,
            category_id: self.category_id,
            unit: required_text("unit", &self.unit)?,
            location: optional_text(self.location),
            stock: 0,
            min_stock: non_negative("minStock", self.min_stock)?,
            created_at: now,
        };

        let opening_entry = (initial_stock > 0).then(|| StockInRecord {
            id: StockInId::new(),
            item_id: id,
            quantity: initial_stock,
            supplier: Some(INITIAL_STOCK_SUPPLIER.to_string()),
            notes: Some(INITIAL_STOCK_NOTE.to_string()),
            date: now,
            created_at: now,
        });

        Ok(CreatedItem { item, opening_entry })
    }
}

/// Partial update of an item. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub unit: Option<String>,
    /// `Some("")` clears the location.
    pub location: Option<String>,
    /// Manual correction of the base quantity.
    pub stock: Option<i64>,
    pub min_stock: Option<i64>,
}

impl Item {
    /// Apply a patch, re-validating every touched field.
    pub fn patched(&self, patch: ItemPatch) -> DomainResult<Item> {
        let mut next = self.clone();
        if let Some(code) = patch.code {
            next.code = required_text("code", &code)?;
        }
        if let Some(name) = patch.name {
            next.name = required_text("name", &name)?;
        }
        if let Some(category_id) = patch.category_id {
            next.category_id = category_id;
        }
        if let Some(unit) = patch.unit {
            next.unit = required_text("unit", &unit)?;
        }
        if patch.location.is_some() {
            next.location = optional_text(patch.location);
        }
        if let Some(stock) = patch.stock {
            next.stock = non_negative("stock", stock)?;
        }
        if let Some(min_stock) = patch.min_stock {
            next.min_stock = non_negative("minStock", min_stock)?;
        }
        Ok(next)
    }
}

/// Catalogue query used by the items listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Case-insensitive substring of the name or code.
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub low_stock_only: bool,
}

impl ItemFilter {
    pub fn matches(&self, snapshot: &StockSnapshot) -> bool {
        let item = &snapshot.item;

        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                item.name.to_lowercase().contains(&term) || item.code.to_lowercase().contains(&term)
            }
        };
        let matches_category = self.category_id.is_none_or(|c| c == item.category_id);
        let matches_level = !self.low_stock_only || snapshot.level == StockLevel::Low;

        matches_search && matches_category && matches_level
    }
}
