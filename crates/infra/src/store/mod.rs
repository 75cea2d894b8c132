//! Inventory persistence.
//!
//! `InventoryStore` is the only way handlers touch stored state. Every
//! mutation that moves an item's remaining quantity is a single atomic
//! check-and-write, so concurrent stock-outs can never take an item below zero:
//!
//! - `InMemoryInventoryStore` holds one write lock across check and write;
//! - `PostgresInventoryStore` locks the item row (`SELECT ... FOR UPDATE`)
//!   inside a transaction before re-reading the ledger sums.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use stockroom_auth::User;
use stockroom_core::{CategoryId, DomainError, ItemId, StockInId, StockOutId};
use stockroom_inventory::{
    Category, CategoryPatch, CreatedItem, Item, ItemPatch, NewCategory, NewItem, NewStockIn,
    NewStockOut, StockInPatch, StockInRecord, StockOutPatch, StockOutRecord,
};

pub use memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;

/// Store errors.
///
/// Domain rule violations pass through unchanged so callers can classify
/// them; anything else is a backend failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure in {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        StoreError::Backend {
            operation,
            message: message.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything the aggregate views need, read at one point in time.
#[derive(Debug, Clone, Default)]
pub struct InventorySnapshot {
    pub categories: Vec<Category>,
    pub items: Vec<Item>,
    pub stock_ins: Vec<StockInRecord>,
    pub stock_outs: Vec<StockOutRecord>,
}

/// Async persistence boundary for the inventory service.
///
/// Lookups of a missing record fail with `DomainError::NotFound`. Listing
/// order: categories by name, items by creation time, ledger entries newest
/// first.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn get_category(&self, id: CategoryId) -> StoreResult<Category>;
    /// Fails with a conflict when the name is taken.
    async fn create_category(&self, input: NewCategory) -> StoreResult<Category>;
    async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> StoreResult<Category>;
    /// Fails with a conflict while any item references the category.
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()>;

    async fn list_items(&self) -> StoreResult<Vec<Item>>;
    async fn get_item(&self, id: ItemId) -> StoreResult<Item>;
    /// Insert the item and, for a nonzero initial quantity, its opening
    /// stock-in entry in one step.
    async fn create_item(&self, input: NewItem) -> StoreResult<CreatedItem>;
    /// A base-quantity correction must not leave the item below zero.
    async fn update_item(&self, id: ItemId, patch: ItemPatch) -> StoreResult<Item>;
    /// Removes the item's ledger entries with it.
    async fn delete_item(&self, id: ItemId) -> StoreResult<()>;

    async fn list_stock_ins(&self) -> StoreResult<Vec<StockInRecord>>;
    async fn get_stock_in(&self, id: StockInId) -> StoreResult<StockInRecord>;
    async fn create_stock_in(&self, input: NewStockIn) -> StoreResult<StockInRecord>;
    async fn update_stock_in(&self, id: StockInId, patch: StockInPatch)
    -> StoreResult<StockInRecord>;
    async fn delete_stock_in(&self, id: StockInId) -> StoreResult<()>;

    async fn list_stock_outs(&self) -> StoreResult<Vec<StockOutRecord>>;
    async fn get_stock_out(&self, id: StockOutId) -> StoreResult<StockOutRecord>;
    /// Fails with `InsufficientStock` when the quantity exceeds what remains.
    async fn create_stock_out(&self, input: NewStockOut) -> StoreResult<StockOutRecord>;
    async fn update_stock_out(
        &self,
        id: StockOutId,
        patch: StockOutPatch,
    ) -> StoreResult<StockOutRecord>;
    async fn delete_stock_out(&self, id: StockOutId) -> StoreResult<()>;

    async fn snapshot(&self) -> StoreResult<InventorySnapshot>;

    /// Insert or refresh the local mirror of an identity-provider user.
    async fn upsert_user(&self, external_id: &str, email: Option<String>) -> StoreResult<User>;
}

#[cfg(test)]
mod tests;
