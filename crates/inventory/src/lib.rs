//! Inventory domain module.
//!
//! Items, categories, the stock-in/stock-out ledgers and the derived views
//! built on top of them. Pure, deterministic logic (no IO, no HTTP, no storage).

pub mod category;
pub mod dashboard;
pub mod history;
pub mod item;
pub mod ledger;
pub mod reconcile;

mod validate;

pub use category::{Category, CategoryPatch, NewCategory};
pub use dashboard::DashboardSummary;
pub use history::{HistoryEntry, HistoryFilter, HistoryView, build_history};
pub use item::{
    CreatedItem, INITIAL_STOCK_NOTE, INITIAL_STOCK_SUPPLIER, Item, ItemFilter, ItemPatch, NewItem,
};
pub use ledger::{
    LedgerEntry, NewStockIn, NewStockOut, StockInPatch, StockInRecord, StockOutPatch,
    StockOutRecord, StockTransaction, TransactionKind, merged_transactions,
};
pub use reconcile::{
    StockLevel, StockReconciler, StockSnapshot, apply_delta, classify, ledger_total,
    remaining_stock, sum_quantities,
};
pub use validate::MAX_QUANTITY;
