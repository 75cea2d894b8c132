use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use stockroom_auth::User;
use stockroom_core::{CategoryId, DomainError, Entity, ItemId, StockInId, StockOutId};
use stockroom_inventory::{
    Category, CategoryPatch, CreatedItem, Item, ItemPatch, NewCategory, NewItem, NewStockIn,
    NewStockOut, StockInPatch, StockInRecord, StockOutPatch, StockOutRecord, apply_delta,
    remaining_stock,
};

use super::{InventorySnapshot, InventoryStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    categories: HashMap<CategoryId, Category>,
    items: HashMap<ItemId, Item>,
    stock_ins: HashMap<StockInId, StockInRecord>,
    stock_outs: HashMap<StockOutId, StockOutRecord>,
    users: HashMap<String, User>,
}

fn find<'a, E: Entity>(
    map: &'a HashMap<E::Id, E>,
    id: E::Id,
    what: &'static str,
) -> StoreResult<&'a E> {
    map.get(&id).ok_or_else(|| DomainError::not_found(what).into())
}

/// Values sorted oldest first.
fn by_creation<E: Entity + Clone>(map: &HashMap<E::Id, E>) -> Vec<E>
where
    E::Id: Ord,
{
    let mut all: Vec<E> = map.values().cloned().collect();
    all.sort_by_key(|e| (e.created_at(), e.id()));
    all
}

/// Values sorted newest first.
fn newest_first<E: Entity + Clone>(map: &HashMap<E::Id, E>) -> Vec<E>
where
    E::Id: Ord,
{
    let mut all = by_creation(map);
    all.reverse();
    all
}

impl State {
    fn remaining(&self, item: &Item) -> i64 {
        remaining_stock(item, self.stock_ins.values(), self.stock_outs.values())
    }

    /// Check that moving `item_id`'s remaining quantity by `delta` keeps it at
    /// or above zero.
    fn guard_delta(&self, item_id: ItemId, delta: i64) -> StoreResult<()> {
        let item = find(&self.items, item_id, "item")?;
        apply_delta(self.remaining(item), delta)?;
        Ok(())
    }

    fn ensure_category_name_free(&self, name: &str, except: Option<CategoryId>) -> StoreResult<()> {
        let taken = self
            .categories
            .values()
            .any(|c| c.name == name && Some(c.id) != except);
        if taken {
            return Err(DomainError::conflict(format!("category '{name}' already exists")).into());
        }
        Ok(())
    }

    fn ensure_item_code_free(&self, code: &str, except: Option<ItemId>) -> StoreResult<()> {
        let taken = self
            .items
            .values()
            .any(|i| i.code == code && Some(i.id) != except);
        if taken {
            return Err(DomainError::conflict(format!("item code '{code}' already exists")).into());
        }
        Ok(())
    }
}

/// In-memory inventory store.
///
/// Intended for tests/dev. All state sits behind one lock, so every
/// operation is trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    state: RwLock<State>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::backend("read", "lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::backend("write", "lock poisoned"))
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let state = self.read()?;
        let mut all: Vec<Category> = state.categories.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Category> {
        let state = self.read()?;
        find(&state.categories, id, "category").cloned()
    }

    async fn create_category(&self, input: NewCategory) -> StoreResult<Category> {
        let category = input.into_category(CategoryId::new(), Utc::now())?;
        let mut state = self.write()?;
        state.ensure_category_name_free(&category.name, None)?;
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> StoreResult<Category> {
        let mut state = self.write()?;
        let next = find(&state.categories, id, "category")?.patched(patch)?;
        state.ensure_category_name_free(&next.name, Some(id))?;
        state.categories.insert(id, next.clone());
        Ok(next)
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let mut state = self.write()?;
        let category = find(&state.categories, id, "category")?;
        let referencing = state.items.values().filter(|i| i.category_id == id).count();
        category.ensure_deletable(referencing)?;
        state.categories.remove(&id);
        Ok(())
    }

    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        Ok(by_creation(&self.read()?.items))
    }

    async fn get_item(&self, id: ItemId) -> StoreResult<Item> {
        let state = self.read()?;
        find(&state.items, id, "item").cloned()
    }

    async fn create_item(&self, input: NewItem) -> StoreResult<CreatedItem> {
        let created = input.into_item(ItemId::new(), Utc::now())?;
        let mut state = self.write()?;
        find(&state.categories, created.item.category_id, "category")?;
        state.ensure_item_code_free(&created.item.code, None)?;

        state.items.insert(created.item.id, created.item.clone());
        if let Some(entry) = &created.opening_entry {
            state.stock_ins.insert(entry.id, entry.clone());
        }
        Ok(created)
    }

    async fn update_item(&self, id: ItemId, patch: ItemPatch) -> StoreResult<Item> {
        let mut state = self.write()?;
        let current = find(&state.items, id, "item")?;
        let next = current.patched(patch)?;

        if next.category_id != current.category_id {
            find(&state.categories, next.category_id, "category")?;
        }
        state.ensure_item_code_free(&next.code, Some(id))?;
        state.guard_delta(id, next.stock - current.stock)?;

        state.items.insert(id, next.clone());
        Ok(next)
    }

    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.items.remove(&id).is_none() {
            return Err(DomainError::not_found("item").into());
        }
        state.stock_ins.retain(|_, r| r.item_id != id);
        state.stock_outs.retain(|_, r| r.item_id != id);
        Ok(())
    }

    async fn list_stock_ins(&self) -> StoreResult<Vec<StockInRecord>> {
        Ok(newest_first(&self.read()?.stock_ins))
    }

    async fn get_stock_in(&self, id: StockInId) -> StoreResult<StockInRecord> {
        let state = self.read()?;
        find(&state.stock_ins, id, "stock-in entry").cloned()
    }

    async fn create_stock_in(&self, input: NewStockIn) -> StoreResult<StockInRecord> {
        let record = input.into_record(StockInId::new(), Utc::now())?;
        let mut state = self.write()?;
        find(&state.items, record.item_id, "item")?;
        state.stock_ins.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_stock_in(
        &self,
        id: StockInId,
        patch: StockInPatch,
    ) -> StoreResult<StockInRecord> {
        let mut state = self.write()?;
        let current = find(&state.stock_ins, id, "stock-in entry")?;
        let next = current.patched(patch)?;
        state.guard_delta(next.item_id, next.quantity - current.quantity)?;
        state.stock_ins.insert(id, next.clone());
        Ok(next)
    }

    async fn delete_stock_in(&self, id: StockInId) -> StoreResult<()> {
        let mut state = self.write()?;
        let current = find(&state.stock_ins, id, "stock-in entry")?;
        state.guard_delta(current.item_id, -current.quantity)?;
        state.stock_ins.remove(&id);
        Ok(())
    }

    async fn list_stock_outs(&self) -> StoreResult<Vec<StockOutRecord>> {
        Ok(newest_first(&self.read()?.stock_outs))
    }

    async fn get_stock_out(&self, id: StockOutId) -> StoreResult<StockOutRecord> {
        let state = self.read()?;
        find(&state.stock_outs, id, "stock-out entry").cloned()
    }

    async fn create_stock_out(&self, input: NewStockOut) -> StoreResult<StockOutRecord> {
        let record = input.into_record(StockOutId::new(), Utc::now())?;
        let mut state = self.write()?;
        state.guard_delta(record.item_id, -record.quantity)?;
        state.stock_outs.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_stock_out(
        &self,
        id: StockOutId,
        patch: StockOutPatch,
    ) -> StoreResult<StockOutRecord> {
        let mut state = self.write()?;
        let current = find(&state.stock_outs, id, "stock-out entry")?;
        let next = current.patched(patch)?;
        state.guard_delta(next.item_id, current.quantity - next.quantity)?;
        state.stock_outs.insert(id, next.clone());
        Ok(next)
    }

    async fn delete_stock_out(&self, id: StockOutId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.stock_outs.remove(&id).is_none() {
            return Err(DomainError::not_found("stock-out entry").into());
        }
        Ok(())
    }

    async fn snapshot(&self) -> StoreResult<InventorySnapshot> {
        let state = self.read()?;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(InventorySnapshot {
            categories,
            items: by_creation(&state.items),
            stock_ins: newest_first(&state.stock_ins),
            stock_outs: newest_first(&state.stock_outs),
        })
    }

    async fn upsert_user(&self, external_id: &str, email: Option<String>) -> StoreResult<User> {
        let now = Utc::now();
        let mut state = self.write()?;
        let user = match state.users.get(external_id) {
            Some(existing) => existing.refreshed(email, now),
            None => User::new(external_id, email, now),
        };
        state.users.insert(external_id.to_string(), user.clone());
        Ok(user)
    }
}
