//! Postgres-backed inventory store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Domain(Conflict)` | Duplicate category name or item code |
//! | Database (foreign key violation) | `23503` | `Domain(NotFound)` | Referenced category/item vanished mid-request |
//! | Database (check constraint violation) | `23514` | `Domain(Validation)` | Negative quantity slipped past validation |
//! | RowNotFound | N/A | `Domain(NotFound)` | Unexpected missing row |
//! | Other | N/A | `Backend` | Network errors, pool closed, etc. |
//!
//! ## Ledger Mutations
//!
//! Every operation that moves an item's remaining quantity runs in one
//! transaction that first locks the item row with `SELECT ... FOR UPDATE`,
//! then re-reads the ledger sums, checks the result, and writes. Concurrent
//! mutations of the same item serialise on that row lock.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use stockroom_auth::User;
use stockroom_core::{CategoryId, DomainError, ItemId, StockInId, StockOutId, UserId};
use stockroom_inventory::{
    Category, CategoryPatch, CreatedItem, Item, ItemPatch, NewCategory, NewItem, NewStockIn,
    NewStockOut, StockInPatch, StockInRecord, StockOutPatch, StockOutRecord, apply_delta,
};

use super::{InventorySnapshot, InventoryStore, StoreError, StoreResult};

const SCHEMA: &str = include_str!("schema.sql");

const CATEGORY_COLUMNS: &str = "id, name, created_at";
const ITEM_COLUMNS: &str =
    "id, code, name, category_id, unit, location, stock, min_stock, created_at";
const STOCK_IN_COLUMNS: &str = "id, item_id, quantity, supplier, notes, effective_date, created_at";
const STOCK_OUT_COLUMNS: &str = "id, item_id, quantity, purpose, notes, effective_date, created_at";

/// Postgres-backed inventory store.
///
/// `Send + Sync`; share it behind an `Arc`. All connection handling is left
/// to the SQLx pool.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema. Safe to run on every start.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

async fn commit(tx: Transaction<'_, Postgres>) -> StoreResult<()> {
    tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
}

/// Load and lock an item row for the rest of the transaction.
async fn lock_item(tx: &mut Transaction<'_, Postgres>, id: ItemId) -> StoreResult<Item> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(*id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_item", e))?
        .ok_or(DomainError::not_found("item"))?;
    Ok(decode::<ItemRow>(&row)?.into())
}

/// Remaining quantity of a locked item, read inside the same transaction.
async fn remaining_locked(tx: &mut Transaction<'_, Postgres>, item: &Item) -> StoreResult<i64> {
    let row = sqlx::query(
        r#"
        SELECT
            COALESCE((SELECT SUM(quantity) FROM stock_ins WHERE item_id = $1), 0)::BIGINT AS total_in,
            COALESCE((SELECT SUM(quantity) FROM stock_outs WHERE item_id = $1), 0)::BIGINT AS total_out
        "#,
    )
    .bind(*item.id.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("ledger_totals", e))?;

    let total_in: i64 = row
        .try_get("total_in")
        .map_err(|e| map_sqlx_error("ledger_totals", e))?;
    let total_out: i64 = row
        .try_get("total_out")
        .map_err(|e| map_sqlx_error("ledger_totals", e))?;
    Ok(item.stock.saturating_add(total_in).saturating_sub(total_out))
}

/// Lock `item_id` and check that moving its remaining quantity by `delta`
/// keeps it at or above zero.
async fn guard_delta(
    tx: &mut Transaction<'_, Postgres>,
    item_id: ItemId,
    delta: i64,
) -> StoreResult<()> {
    let item = lock_item(tx, item_id).await?;
    let remaining = remaining_locked(tx, &item).await?;
    apply_delta(remaining, delta)?;
    Ok(())
}

async fn insert_stock_in(
    tx: &mut Transaction<'_, Postgres>,
    record: &StockInRecord,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_ins (id, item_id, quantity, supplier, notes, effective_date, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(*record.id.as_uuid())
    .bind(*record.item_id.as_uuid())
    .bind(record.quantity)
    .bind(&record.supplier)
    .bind(&record.notes)
    .bind(record.date)
    .bind(record.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_stock_in", e))?;
    Ok(())
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self), err)]
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        decode_all::<CategoryRow, Category>(&rows)
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn get_category(&self, id: CategoryId) -> StoreResult<Category> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?
            .ok_or(DomainError::not_found("category"))?;
        Ok(decode::<CategoryRow>(&row)?.into())
    }

    #[instrument(skip(self, input), err)]
    async fn create_category(&self, input: NewCategory) -> StoreResult<Category> {
        let category = input.into_category(CategoryId::new(), Utc::now())?;
        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(*category.id.as_uuid())
            .bind(&category.name)
            .bind(category.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_category", e))?;
        Ok(category)
    }

    #[instrument(skip(self, patch), fields(category_id = %id), err)]
    async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> StoreResult<Category> {
        let mut tx = self.begin().await?;
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_category", e))?
            .ok_or(DomainError::not_found("category"))?;
        let next = Category::from(decode::<CategoryRow>(&row)?).patched(patch)?;

        sqlx::query("UPDATE categories SET name = $2 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(&next.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_category", e))?;
        commit(tx).await?;
        Ok(next)
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?
            .ok_or(DomainError::not_found("category"))?;
        let category: Category = decode::<CategoryRow>(&row)?.into();

        let referencing: i64 = sqlx::query("SELECT COUNT(*) FROM items WHERE category_id = $1")
            .bind(*id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get(0))
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        category.ensure_deletable(usize::try_from(referencing).unwrap_or(usize::MAX))?;

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        commit(tx).await
    }

    #[instrument(skip(self), err)]
    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;
        decode_all::<ItemRow, Item>(&rows)
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn get_item(&self, id: ItemId) -> StoreResult<Item> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?
            .ok_or(DomainError::not_found("item"))?;
        Ok(decode::<ItemRow>(&row)?.into())
    }

    #[instrument(skip(self, input), err)]
    async fn create_item(&self, input: NewItem) -> StoreResult<CreatedItem> {
        let created = input.into_item(ItemId::new(), Utc::now())?;
        let item = &created.item;

        let mut tx = self.begin().await?;
        let category_exists: bool =
            sqlx::query("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
                .bind(*item.category_id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .and_then(|row| row.try_get(0))
                .map_err(|e| map_sqlx_error("create_item", e))?;
        if !category_exists {
            return Err(DomainError::not_found("category").into());
        }

        sqlx::query(
            r#"
            INSERT INTO items (id, code, name, category_id, unit, location, stock, min_stock, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(*item.id.as_uuid())
        .bind(&item.code)
        .bind(&item.name)
        .bind(*item.category_id.as_uuid())
        .bind(&item.unit)
        .bind(&item.location)
        .bind(item.stock)
        .bind(item.min_stock)
        .bind(item.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_item", e))?;

        if let Some(entry) = &created.opening_entry {
            insert_stock_in(&mut tx, entry).await?;
        }
        commit(tx).await?;
        Ok(created)
    }

    #[instrument(skip(self, patch), fields(item_id = %id), err)]
    async fn update_item(&self, id: ItemId, patch: ItemPatch) -> StoreResult<Item> {
        let mut tx = self.begin().await?;
        let current = lock_item(&mut tx, id).await?;
        let next = current.patched(patch)?;

        if next.stock != current.stock {
            let remaining = remaining_locked(&mut tx, &current).await?;
            apply_delta(remaining, next.stock - current.stock)?;
        }

        sqlx::query(
            r#"
            UPDATE items
            SET code = $2, name = $3, category_id = $4, unit = $5, location = $6,
                stock = $7, min_stock = $8
            WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .bind(&next.code)
        .bind(&next.name)
        .bind(*next.category_id.as_uuid())
        .bind(&next.unit)
        .bind(&next.location)
        .bind(next.stock)
        .bind(next.min_stock)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;
        commit(tx).await?;
        Ok(next)
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        // Ledger rows go with the item via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("item").into());
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_stock_ins(&self) -> StoreResult<Vec<StockInRecord>> {
        let sql =
            format!("SELECT {STOCK_IN_COLUMNS} FROM stock_ins ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_stock_ins", e))?;
        decode_all::<StockInRow, StockInRecord>(&rows)
    }

    #[instrument(skip(self), fields(stock_in_id = %id), err)]
    async fn get_stock_in(&self, id: StockInId) -> StoreResult<StockInRecord> {
        let sql = format!("SELECT {STOCK_IN_COLUMNS} FROM stock_ins WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_stock_in", e))?
            .ok_or(DomainError::not_found("stock-in entry"))?;
        Ok(decode::<StockInRow>(&row)?.into())
    }

    #[instrument(skip(self, input), fields(item_id = %input.item_id), err)]
    async fn create_stock_in(&self, input: NewStockIn) -> StoreResult<StockInRecord> {
        let record = input.into_record(StockInId::new(), Utc::now())?;
        let mut tx = self.begin().await?;
        lock_item(&mut tx, record.item_id).await?;
        insert_stock_in(&mut tx, &record).await?;
        commit(tx).await?;
        Ok(record)
    }

    #[instrument(skip(self, patch), fields(stock_in_id = %id), err)]
    async fn update_stock_in(
        &self,
        id: StockInId,
        patch: StockInPatch,
    ) -> StoreResult<StockInRecord> {
        let mut tx = self.begin().await?;
        let current = self.stock_in_in_tx(&mut tx, id).await?;
        let next = current.patched(patch)?;
        guard_delta(&mut tx, next.item_id, next.quantity - current.quantity).await?;

        sqlx::query(
            r#"
            UPDATE stock_ins
            SET quantity = $2, supplier = $3, notes = $4, effective_date = $5
            WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .bind(next.quantity)
        .bind(&next.supplier)
        .bind(&next.notes)
        .bind(next.date)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_stock_in", e))?;
        commit(tx).await?;
        Ok(next)
    }

    #[instrument(skip(self), fields(stock_in_id = %id), err)]
    async fn delete_stock_in(&self, id: StockInId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let current = self.stock_in_in_tx(&mut tx, id).await?;
        guard_delta(&mut tx, current.item_id, -current.quantity).await?;

        sqlx::query("DELETE FROM stock_ins WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_stock_in", e))?;
        commit(tx).await
    }

    #[instrument(skip(self), err)]
    async fn list_stock_outs(&self) -> StoreResult<Vec<StockOutRecord>> {
        let sql =
            format!("SELECT {STOCK_OUT_COLUMNS} FROM stock_outs ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_stock_outs", e))?;
        decode_all::<StockOutRow, StockOutRecord>(&rows)
    }

    #[instrument(skip(self), fields(stock_out_id = %id), err)]
    async fn get_stock_out(&self, id: StockOutId) -> StoreResult<StockOutRecord> {
        let sql = format!("SELECT {STOCK_OUT_COLUMNS} FROM stock_outs WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_stock_out", e))?
            .ok_or(DomainError::not_found("stock-out entry"))?;
        Ok(decode::<StockOutRow>(&row)?.into())
    }

    #[instrument(
        skip(self, input),
        fields(item_id = %input.item_id, quantity = input.quantity),
        err
    )]
    async fn create_stock_out(&self, input: NewStockOut) -> StoreResult<StockOutRecord> {
        let record = input.into_record(StockOutId::new(), Utc::now())?;
        let mut tx = self.begin().await?;
        guard_delta(&mut tx, record.item_id, -record.quantity).await?;

        sqlx::query(
            r#"
            INSERT INTO stock_outs (id, item_id, quantity, purpose, notes, effective_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*record.id.as_uuid())
        .bind(*record.item_id.as_uuid())
        .bind(record.quantity)
        .bind(&record.purpose)
        .bind(&record.notes)
        .bind(record.date)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_stock_out", e))?;
        commit(tx).await?;
        Ok(record)
    }

    #[instrument(skip(self, patch), fields(stock_out_id = %id), err)]
    async fn update_stock_out(
        &self,
        id: StockOutId,
        patch: StockOutPatch,
    ) -> StoreResult<StockOutRecord> {
        let mut tx = self.begin().await?;
        let current = self.stock_out_in_tx(&mut tx, id).await?;
        let next = current.patched(patch)?;
        guard_delta(&mut tx, next.item_id, current.quantity - next.quantity).await?;

        sqlx::query(
            r#"
            UPDATE stock_outs
            SET quantity = $2, purpose = $3, notes = $4, effective_date = $5
            WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .bind(next.quantity)
        .bind(&next.purpose)
        .bind(&next.notes)
        .bind(next.date)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_stock_out", e))?;
        commit(tx).await?;
        Ok(next)
    }

    #[instrument(skip(self), fields(stock_out_id = %id), err)]
    async fn delete_stock_out(&self, id: StockOutId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM stock_outs WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_stock_out", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("stock-out entry").into());
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn snapshot(&self) -> StoreResult<InventorySnapshot> {
        let mut tx = self.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("snapshot", e))?;

        let categories = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC"
        ))
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("snapshot", e))?;
        let items = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("snapshot", e))?;
        let stock_ins = sqlx::query(&format!(
            "SELECT {STOCK_IN_COLUMNS} FROM stock_ins ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("snapshot", e))?;
        let stock_outs = sqlx::query(&format!(
            "SELECT {STOCK_OUT_COLUMNS} FROM stock_outs ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("snapshot", e))?;
        commit(tx).await?;

        Ok(InventorySnapshot {
            categories: decode_all::<CategoryRow, Category>(&categories)?,
            items: decode_all::<ItemRow, Item>(&items)?,
            stock_ins: decode_all::<StockInRow, StockInRecord>(&stock_ins)?,
            stock_outs: decode_all::<StockOutRow, StockOutRecord>(&stock_outs)?,
        })
    }

    #[instrument(skip(self, email), err)]
    async fn upsert_user(&self, external_id: &str, email: Option<String>) -> StoreResult<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, external_id, email, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (external_id)
            DO UPDATE SET
                email = EXCLUDED.email,
                updated_at = NOW()
            RETURNING id, external_id, email, created_at, updated_at
            "#,
        )
        .bind(*UserId::new().as_uuid())
        .bind(external_id)
        .bind(&email)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_user", e))?;
        Ok(decode::<UserRow>(&row)?.into())
    }
}

impl PostgresInventoryStore {
    async fn stock_in_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: StockInId,
    ) -> StoreResult<StockInRecord> {
        let sql = format!("SELECT {STOCK_IN_COLUMNS} FROM stock_ins WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("get_stock_in", e))?
            .ok_or(DomainError::not_found("stock-in entry"))?;
        Ok(decode::<StockInRow>(&row)?.into())
    }

    async fn stock_out_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: StockOutId,
    ) -> StoreResult<StockOutRecord> {
        let sql = format!("SELECT {STOCK_OUT_COLUMNS} FROM stock_outs WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("get_stock_out", e))?
            .ok_or(DomainError::not_found("stock-out entry"))?;
        Ok(decode::<StockOutRow>(&row)?.into())
    }
}

/// Map SQLx errors to store errors.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => {
                    let what = match db_err.constraint() {
                        Some("categories_name_key") => "category name already exists".to_string(),
                        Some("items_code_key") => "item code already exists".to_string(),
                        _ => format!("duplicate entry in {operation}"),
                    };
                    DomainError::conflict(what).into()
                }
                Some("23503") => DomainError::not_found("referenced record").into(),
                Some("23514") => DomainError::validation(msg).into(),
                _ => StoreError::backend(operation, msg),
            }
        }
        sqlx::Error::RowNotFound => DomainError::not_found("record").into(),
        other => StoreError::backend(operation, other.to_string()),
    }
}

fn decode<'r, R: FromRow<'r, PgRow>>(row: &'r PgRow) -> StoreResult<R> {
    R::from_row(row).map_err(|e| StoreError::backend("decode_row", e.to_string()))
}

fn decode_all<'r, R, T>(rows: &'r [PgRow]) -> StoreResult<Vec<T>>
where
    R: FromRow<'r, PgRow> + Into<T>,
{
    rows.iter().map(|row| decode::<R>(row).map(Into::into)).collect()
}

// SQLx row types

#[derive(Debug)]
struct CategoryRow {
    id: uuid::Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId::from_uuid(row.id),
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct ItemRow {
    id: uuid::Uuid,
    code: String,
    name: String,
    category_id: uuid::Uuid,
    unit: String,
    location: Option<String>,
    stock: i64,
    min_stock: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            category_id: row.try_get("category_id")?,
            unit: row.try_get("unit")?,
            location: row.try_get("location")?,
            stock: row.try_get("stock")?,
            min_stock: row.try_get("min_stock")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: ItemId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            category_id: CategoryId::from_uuid(row.category_id),
            unit: row.unit,
            location: row.location,
            stock: row.stock,
            min_stock: row.min_stock,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct StockInRow {
    id: uuid::Uuid,
    item_id: uuid::Uuid,
    quantity: i64,
    supplier: Option<String>,
    notes: Option<String>,
    effective_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for StockInRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StockInRow {
            id: row.try_get("id")?,
            item_id: row.try_get("item_id")?,
            quantity: row.try_get("quantity")?,
            supplier: row.try_get("supplier")?,
            notes: row.try_get("notes")?,
            effective_date: row.try_get("effective_date")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<StockInRow> for StockInRecord {
    fn from(row: StockInRow) -> Self {
        StockInRecord {
            id: StockInId::from_uuid(row.id),
            item_id: ItemId::from_uuid(row.item_id),
            quantity: row.quantity,
            supplier: row.supplier,
            notes: row.notes,
            date: row.effective_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct StockOutRow {
    id: uuid::Uuid,
    item_id: uuid::Uuid,
    quantity: i64,
    purpose: Option<String>,
    notes: Option<String>,
    effective_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for StockOutRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StockOutRow {
            id: row.try_get("id")?,
            item_id: row.try_get("item_id")?,
            quantity: row.try_get("quantity")?,
            purpose: row.try_get("purpose")?,
            notes: row.try_get("notes")?,
            effective_date: row.try_get("effective_date")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<StockOutRow> for StockOutRecord {
    fn from(row: StockOutRow) -> Self {
        StockOutRecord {
            id: StockOutId::from_uuid(row.id),
            item_id: ItemId::from_uuid(row.item_id),
            quantity: row.quantity,
            purpose: row.purpose,
            notes: row.notes,
            date: row.effective_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct UserRow {
    id: uuid::Uuid,
    external_id: String,
    email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            external_id: row.try_get("external_id")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::from_uuid(row.id),
            external_id: row.external_id,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
