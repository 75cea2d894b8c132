use std::sync::Arc;

use stockroom_core::{CategoryId, DomainError};
use stockroom_inventory::{
    CategoryPatch, INITIAL_STOCK_SUPPLIER, Item, ItemPatch, MAX_QUANTITY, NewCategory, NewItem,
    NewStockIn, NewStockOut, StockInPatch, StockOutPatch, remaining_stock,
};

use super::{InMemoryInventoryStore, InventoryStore, StoreError};

fn domain(err: StoreError) -> DomainError {
    match err {
        StoreError::Domain(e) => e,
        other => panic!("expected domain error, got {other:?}"),
    }
}

async fn category(store: &dyn InventoryStore, name: &str) -> CategoryId {
    store
        .create_category(NewCategory {
            name: name.to_string(),
        })
        .await
        .unwrap()
        .id
}

async fn item(store: &dyn InventoryStore, code: &str, initial_stock: i64) -> Item {
    let category_id = category(store, &format!("cat-{code}")).await;
    store
        .create_item(NewItem {
            code: code.to_string(),
            name: format!("Barang {code}"),
            category_id,
            unit: "pcs".to_string(),
            location: None,
            initial_stock,
            min_stock: 2,
        })
        .await
        .unwrap()
        .item
}

async fn remaining(store: &dyn InventoryStore, item: &Item) -> i64 {
    let snap = store.snapshot().await.unwrap();
    let item = snap.items.iter().find(|i| i.id == item.id).unwrap();
    remaining_stock(item, &snap.stock_ins, &snap.stock_outs)
}

fn stock_out(item: &Item, quantity: i64) -> NewStockOut {
    NewStockOut {
        item_id: item.id,
        quantity,
        purpose: None,
        notes: None,
        date: None,
    }
}

#[tokio::test]
async fn creating_item_records_exactly_one_opening_entry() {
    let store = InMemoryInventoryStore::new();
    let it = item(&store, "BRG-001", 25).await;

    let ins = store.list_stock_ins().await.unwrap();
    assert_eq!(ins.len(), 1);
    assert_eq!(ins[0].item_id, it.id);
    assert_eq!(ins[0].quantity, 25);
    assert_eq!(ins[0].supplier.as_deref(), Some(INITIAL_STOCK_SUPPLIER));
    assert_eq!(remaining(&store, &it).await, 25);
}

#[tokio::test]
async fn item_requires_existing_category() {
    let store = InMemoryInventoryStore::new();
    let err = store
        .create_item(NewItem {
            code: "X".to_string(),
            name: "X".to_string(),
            category_id: CategoryId::new(),
            unit: "pcs".to_string(),
            location: None,
            initial_stock: 0,
            min_stock: 0,
        })
        .await
        .unwrap_err();
    assert_eq!(domain(err), DomainError::NotFound("category"));
}

#[tokio::test]
async fn duplicate_code_and_category_name_conflict() {
    let store = InMemoryInventoryStore::new();
    let it = item(&store, "BRG-001", 0).await;

    let err = store
        .create_item(NewItem {
            code: "BRG-001".to_string(),
            name: "Lain".to_string(),
            category_id: it.category_id,
            unit: "pcs".to_string(),
            location: None,
            initial_stock: 0,
            min_stock: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));

    let err = store
        .create_category(NewCategory {
            name: "cat-BRG-001".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));
}

#[tokio::test]
async fn category_in_use_cannot_be_deleted() {
    let store = InMemoryInventoryStore::new();
    let it = item(&store, "BRG-002", 0).await;

    let err = store.delete_category(it.category_id).await.unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));

    store.delete_item(it.id).await.unwrap();
    store.delete_category(it.category_id).await.unwrap();
    assert_eq!(
        domain(store.get_category(it.category_id).await.unwrap_err()),
        DomainError::NotFound("category")
    );
}

#[tokio::test]
async fn stock_in_for_missing_item_is_not_found() {
    let store = InMemoryInventoryStore::new();
    let err = store
        .create_stock_in(NewStockIn {
            item_id: stockroom_core::ItemId::new(),
            quantity: 3,
            supplier: None,
            notes: None,
            date: None,
        })
        .await
        .unwrap_err();
    assert_eq!(domain(err), DomainError::NotFound("item"));
}

#[tokio::test]
async fn stock_out_cannot_exceed_remaining() {
    let store = InMemoryInventoryStore::new();
    let it = item(&store, "BRG-003", 5).await;

    store.create_stock_out(stock_out(&it, 4)).await.unwrap();
    let err = store.create_stock_out(stock_out(&it, 2)).await.unwrap_err();
    assert_eq!(
        domain(err),
        DomainError::InsufficientStock {
            available: 1,
            requested: 2
        }
    );
    assert_eq!(remaining(&store, &it).await, 1);
}

#[tokio::test]
async fn ledger_edits_keep_remaining_non_negative() {
    let store = InMemoryInventoryStore::new();
    let it = item(&store, "BRG-004", 10).await;
    let out = store.create_stock_out(stock_out(&it, 8)).await.unwrap();
    let opening = store.list_stock_ins().await.unwrap().remove(0);

    // Shrinking the opening entry below what was issued would oversell.
    let err = store
        .update_stock_in(
            opening.id,
            StockInPatch {
                quantity: Some(5),
                ..StockInPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::InsufficientStock { .. }));
    assert!(store.delete_stock_in(opening.id).await.is_err());

    let err = store
        .update_stock_out(
            out.id,
            StockOutPatch {
                quantity: Some(11),
                ..StockOutPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::InsufficientStock { .. }));

    store
        .update_stock_out(
            out.id,
            StockOutPatch {
                quantity: Some(10),
                ..StockOutPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(remaining(&store, &it).await, 0);
}

#[tokio::test]
async fn base_correction_is_checked_against_ledger() {
    let store = InMemoryInventoryStore::new();
    let it = item(&store, "BRG-005", 0).await;

    let patched = store
        .update_item(
            it.id,
            ItemPatch {
                stock: Some(7),
                ..ItemPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.stock, 7);
    store.create_stock_out(stock_out(&it, 6)).await.unwrap();

    let err = store
        .update_item(
            it.id,
            ItemPatch {
                stock: Some(5),
                ..ItemPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::InsufficientStock { .. }));
}

#[tokio::test]
async fn deleting_item_removes_its_ledger_entries() {
    let store = InMemoryInventoryStore::new();
    let keep = item(&store, "BRG-006", 3).await;
    let gone = item(&store, "BRG-007", 9).await;
    store.create_stock_out(stock_out(&gone, 2)).await.unwrap();

    store.delete_item(gone.id).await.unwrap();

    let snap = store.snapshot().await.unwrap();
    assert_eq!(snap.items.len(), 1);
    assert!(snap.stock_ins.iter().all(|r| r.item_id == keep.id));
    assert!(snap.stock_outs.is_empty());
    assert_eq!(
        domain(store.delete_item(gone.id).await.unwrap_err()),
        DomainError::NotFound("item")
    );
}

#[tokio::test]
async fn category_rename_rejects_taken_name() {
    let store = InMemoryInventoryStore::new();
    let a = category(&store, "ATK").await;
    category(&store, "Elektronik").await;

    let err = store
        .update_category(
            a,
            CategoryPatch {
                name: Some("Elektronik".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::Conflict(_)));

    let names: Vec<String> = store
        .list_categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["ATK".to_string(), "Elektronik".to_string()]);
}

#[tokio::test]
async fn upsert_user_refreshes_existing_row() {
    let store = InMemoryInventoryStore::new();
    let first = store
        .upsert_user("user_1", Some("a@example.com".to_string()))
        .await
        .unwrap();
    let second = store
        .upsert_user("user_1", Some("b@example.com".to_string()))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.email.as_deref(), Some("b@example.com"));
    assert_eq!(second.created_at, first.created_at);
}

fn stock_in(item: &Item, quantity: i64) -> NewStockIn {
    NewStockIn {
        item_id: item.id,
        quantity,
        supplier: None,
        notes: None,
        date: None,
    }
}

#[tokio::test]
async fn oversized_quantities_are_rejected_and_store_stays_usable() {
    let store = Arc::new(InMemoryInventoryStore::new());
    let it = item(store.as_ref(), "BRG-009", 0).await;

    let err = store
        .create_stock_in(stock_in(&it, i64::MAX))
        .await
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::Validation(_)));

    store
        .create_stock_in(stock_in(&it, MAX_QUANTITY))
        .await
        .unwrap();
    store
        .create_stock_in(stock_in(&it, MAX_QUANTITY))
        .await
        .unwrap();

    let out = {
        let store = Arc::clone(&store);
        let input = stock_out(&it, 1);
        tokio::spawn(async move { store.create_stock_out(input).await })
    };
    out.await.unwrap().unwrap();

    assert_eq!(store.list_items().await.unwrap().len(), 1);
    assert_eq!(remaining(store.as_ref(), &it).await, 2 * MAX_QUANTITY - 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_stock_outs_never_oversell() {
    let store = Arc::new(InMemoryInventoryStore::new());
    let it = item(store.as_ref(), "BRG-008", 10).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let store = Arc::clone(&store);
            let input = stock_out(&it, 1);
            tokio::spawn(async move { store.create_stock_out(input).await.is_ok() })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 10);
    assert_eq!(remaining(store.as_ref(), &it).await, 0);
}
