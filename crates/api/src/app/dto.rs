//! Request/response DTOs and JSON mapping helpers.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, ItemId};
use stockroom_infra::InventorySnapshot;
use stockroom_inventory::{
    Category, CategoryPatch, Item, ItemFilter, ItemPatch, NewCategory, NewItem, NewStockIn,
    NewStockOut, StockInPatch, StockInRecord, StockLevel, StockOutPatch, StockOutRecord,
    StockReconciler,
};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
}

impl From<CreateCategoryRequest> for NewCategory {
    fn from(body: CreateCategoryRequest) -> Self {
        NewCategory { name: body.name }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
}

impl From<UpdateCategoryRequest> for CategoryPatch {
    fn from(body: UpdateCategoryRequest) -> Self {
        CategoryPatch { name: body.name }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub code: String,
    pub name: String,
    pub category_id: CategoryId,
    pub unit: String,
    pub location: Option<String>,
    /// Initial quantity on hand; recorded as a stock-in entry.
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub min_stock: i64,
}

impl From<CreateItemRequest> for NewItem {
    fn from(body: CreateItemRequest) -> Self {
        NewItem {
            code: body.code,
            name: body.name,
            category_id: body.category_id,
            unit: body.unit,
            location: body.location,
            initial_stock: body.stock,
            min_stock: body.min_stock,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub stock: Option<i64>,
    pub min_stock: Option<i64>,
}

impl From<UpdateItemRequest> for ItemPatch {
    fn from(body: UpdateItemRequest) -> Self {
        ItemPatch {
            code: body.code,
            name: body.name,
            category_id: body.category_id,
            unit: body.unit,
            location: body.location,
            stock: body.stock,
            min_stock: body.min_stock,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStockInRequest {
    pub item_id: ItemId,
    pub quantity: i64,
    pub supplier: Option<String>,
    pub notes: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`.
    pub date: Option<String>,
}

impl CreateStockInRequest {
    pub fn into_new(self) -> Result<NewStockIn, Response> {
        Ok(NewStockIn {
            item_id: self.item_id,
            quantity: self.quantity,
            supplier: self.supplier,
            notes: self.notes,
            date: parse_optional_date(self.date.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStockInRequest {
    pub quantity: Option<i64>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
    pub date: Option<String>,
}

impl UpdateStockInRequest {
    pub fn into_patch(self) -> Result<StockInPatch, Response> {
        Ok(StockInPatch {
            quantity: self.quantity,
            supplier: self.supplier,
            notes: self.notes,
            date: parse_optional_date(self.date.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStockOutRequest {
    pub item_id: ItemId,
    pub quantity: i64,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub date: Option<String>,
}

impl CreateStockOutRequest {
    pub fn into_new(self) -> Result<NewStockOut, Response> {
        Ok(NewStockOut {
            item_id: self.item_id,
            quantity: self.quantity,
            purpose: self.purpose,
            notes: self.notes,
            date: parse_optional_date(self.date.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStockOutRequest {
    pub quantity: Option<i64>,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub date: Option<String>,
}

impl UpdateStockOutRequest {
    pub fn into_patch(self) -> Result<StockOutPatch, Response> {
        Ok(StockOutPatch {
            quantity: self.quantity,
            purpose: self.purpose,
            notes: self.notes,
            date: parse_optional_date(self.date.as_deref())?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsQuery {
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub low_stock: Option<String>,
}

impl ItemsQuery {
    pub fn into_filter(self) -> Result<ItemFilter, Response> {
        let category_id = match self.category_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<CategoryId>()
                    .map_err(|_| errors::invalid_id("category"))?,
            ),
        };
        let low_stock_only = match self.low_stock.as_deref().map(str::trim) {
            None | Some("") | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_query",
                    format!("lowStock must be true or false, got '{other}'"),
                ));
            }
        };
        Ok(ItemFilter {
            search: self.search,
            category_id,
            low_stock_only,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub date: Option<String>,
    pub search: Option<String>,
}

/// Accept a full RFC 3339 timestamp or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, Response> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    parse_day(raw).map(|day| day.and_time(chrono::NaiveTime::MIN).and_utc())
}

pub fn parse_day(raw: &str) -> Result<NaiveDate, Response> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_date",
            format!("invalid date '{raw}' (expected RFC 3339 or YYYY-MM-DD)"),
        )
    })
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, Response> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_date(raw).map(Some),
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub category: Option<Category>,
    pub stock_ins: Vec<StockInRecord>,
    pub stock_outs: Vec<StockOutRecord>,
    pub remaining_stock: i64,
    pub status: StockLevel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: Category,
    pub items: Vec<Item>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryView<R: Serialize> {
    #[serde(flatten)]
    pub record: R,
    pub item: Option<Item>,
    /// Item's remaining quantity as of this response.
    pub remaining_stock: Option<i64>,
}

/// Joins a snapshot's tables for the response views.
pub struct Views<'a> {
    snapshot: &'a InventorySnapshot,
    reconciler: StockReconciler,
    categories: HashMap<CategoryId, &'a Category>,
    items: HashMap<ItemId, &'a Item>,
}

impl<'a> Views<'a> {
    pub fn new(snapshot: &'a InventorySnapshot) -> Self {
        Self {
            reconciler: StockReconciler::new(&snapshot.stock_ins, &snapshot.stock_outs),
            categories: snapshot.categories.iter().map(|c| (c.id, c)).collect(),
            items: snapshot.items.iter().map(|i| (i.id, i)).collect(),
            snapshot,
        }
    }

    pub fn item(&self, id: ItemId) -> Option<ItemView> {
        self.items.get(&id).map(|item| self.item_view(item))
    }

    pub fn items(&self, filter: &ItemFilter) -> Vec<ItemView> {
        self.snapshot
            .items
            .iter()
            .filter(|item| filter.matches(&self.reconciler.snapshot(item)))
            .map(|item| self.item_view(item))
            .collect()
    }

    fn item_view(&self, item: &Item) -> ItemView {
        let snapshot = self.reconciler.snapshot(item);
        ItemView {
            category: self.categories.get(&item.category_id).map(|c| (*c).clone()),
            stock_ins: self
                .snapshot
                .stock_ins
                .iter()
                .filter(|r| r.item_id == item.id)
                .cloned()
                .collect(),
            stock_outs: self
                .snapshot
                .stock_outs
                .iter()
                .filter(|r| r.item_id == item.id)
                .cloned()
                .collect(),
            remaining_stock: snapshot.remaining,
            status: snapshot.level,
            item: snapshot.item,
        }
    }

    pub fn category(&self, id: CategoryId) -> Option<CategoryView> {
        self.categories.get(&id).map(|c| self.category_view(c))
    }

    pub fn categories(&self) -> Vec<CategoryView> {
        self.snapshot
            .categories
            .iter()
            .map(|c| self.category_view(c))
            .collect()
    }

    fn category_view(&self, category: &Category) -> CategoryView {
        CategoryView {
            category: category.clone(),
            items: self
                .snapshot
                .items
                .iter()
                .filter(|i| i.category_id == category.id)
                .cloned()
                .collect(),
        }
    }

    pub fn entry<R: Serialize>(&self, record: R, item_id: ItemId) -> LedgerEntryView<R> {
        let item = self.items.get(&item_id).copied();
        LedgerEntryView {
            record,
            remaining_stock: item.map(|i| self.reconciler.remaining(i)),
            item: item.cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_rfc3339_and_plain_dates() {
        let ts = parse_date("2024-05-02T10:30:00+07:00").unwrap();
        assert_eq!(ts.hour(), 3);

        let day = parse_date("2024-05-02").unwrap();
        assert_eq!((day.year(), day.month(), day.day(), day.hour()), (2024, 5, 2, 0));

        assert!(parse_date("02/05/2024").is_err());
    }

    #[test]
    fn items_query_rejects_bad_flags() {
        let query = ItemsQuery {
            low_stock: Some("sometimes".to_string()),
            ..ItemsQuery::default()
        };
        assert!(query.into_filter().is_err());

        let query = ItemsQuery {
            category_id: Some(" ".to_string()),
            low_stock: Some("true".to_string()),
            ..ItemsQuery::default()
        };
        let filter = query.into_filter().unwrap();
        assert!(filter.low_stock_only);
        assert_eq!(filter.category_id, None);
    }
}
