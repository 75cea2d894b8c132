//! Stock reconciliation: remaining quantity and stock-level classification.
//!
//! Every view that shows an item's quantity goes through this module, so the
//! arithmetic lives in exactly one place:
//!
//! ```text
//! remaining = item.stock + Σ stock-in(item) - Σ stock-out(item)
//! ```
//!
//! `item.stock` is the opening balance (zero for items created through the
//! API, whose initial quantity is recorded as a stock-in entry instead).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ItemId};

use crate::item::Item;
use crate::ledger::{LedgerEntry, StockInRecord, StockOutRecord};

/// Stock level relative to the item's minimum threshold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    /// At or below the threshold.
    Low,
    Normal,
    /// More than three times the threshold.
    High,
}

/// Saturating sum of ledger quantities.
pub fn sum_quantities(quantities: impl IntoIterator<Item = i64>) -> i64 {
    quantities.into_iter().fold(0, i64::saturating_add)
}

/// Sum of the quantities in `entries` that belong to `item_id`.
pub fn ledger_total<'a, E>(item_id: ItemId, entries: impl IntoIterator<Item = &'a E>) -> i64
where
    E: LedgerEntry + 'a,
{
    sum_quantities(
        entries
            .into_iter()
            .filter(|e| e.item_id() == item_id)
            .map(|e| e.quantity()),
    )
}

fn reconciled(base: i64, total_in: i64, total_out: i64) -> i64 {
    base.saturating_add(total_in).saturating_sub(total_out)
}

/// Remaining quantity of one item given the full (system-wide) ledgers.
///
/// Entries for other items are ignored; empty ledgers contribute zero.
pub fn remaining_stock<'a>(
    item: &Item,
    stock_ins: impl IntoIterator<Item = &'a StockInRecord>,
    stock_outs: impl IntoIterator<Item = &'a StockOutRecord>,
) -> i64 {
    reconciled(
        item.stock,
        ledger_total(item.id, stock_ins),
        ledger_total(item.id, stock_outs),
    )
}

/// Classify a remaining quantity against a minimum threshold.
///
/// LOW iff `remaining <= min_stock`, HIGH iff `remaining > 3 * min_stock`,
/// NORMAL otherwise.
pub fn classify(remaining: i64, min_stock: i64) -> StockLevel {
    if remaining <= min_stock {
        StockLevel::Low
    } else if remaining > min_stock.saturating_mul(3) {
        StockLevel::High
    } else {
        StockLevel::Normal
    }
}

/// Reject a ledger change that would take an item below zero.
///
/// `available` is the remaining quantity before the change, `delta` the signed
/// effect of the change on it. Returns the new remaining quantity.
pub fn apply_delta(available: i64, delta: i64) -> DomainResult<i64> {
    let after = available
        .checked_add(delta)
        .ok_or_else(|| DomainError::validation("stock quantity out of range"))?;
    if after < 0 {
        return Err(DomainError::InsufficientStock {
            available,
            requested: delta.saturating_neg(),
        });
    }
    Ok(after)
}

/// An item with its reconciled quantity and level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    pub item: Item,
    pub remaining: i64,
    pub level: StockLevel,
}

impl StockSnapshot {
    pub fn new(item: Item, remaining: i64) -> Self {
        let level = classify(remaining, item.min_stock);
        Self {
            item,
            remaining,
            level,
        }
    }
}

/// Reconciles many items against one snapshot of both ledgers.
///
/// Totals are aggregated per item once up front, so reconciling a whole
/// catalogue is linear in the number of ledger entries.
#[derive(Debug, Clone, Default)]
pub struct StockReconciler {
    totals: HashMap<ItemId, (i64, i64)>,
}

impl StockReconciler {
    pub fn new(stock_ins: &[StockInRecord], stock_outs: &[StockOutRecord]) -> Self {
        let mut totals: HashMap<ItemId, (i64, i64)> = HashMap::new();
        for e in stock_ins {
            let t = totals.entry(e.item_id).or_default();
            t.0 = t.0.saturating_add(e.quantity);
        }
        for e in stock_outs {
            let t = totals.entry(e.item_id).or_default();
            t.1 = t.1.saturating_add(e.quantity);
        }
        Self { totals }
    }

    pub fn stock_in_total(&self, item_id: ItemId) -> i64 {
        self.totals.get(&item_id).map_or(0, |t| t.0)
    }

    pub fn stock_out_total(&self, item_id: ItemId) -> i64 {
        self.totals.get(&item_id).map_or(0, |t| t.1)
    }

    pub fn remaining(&self, item: &Item) -> i64 {
        reconciled(
            item.stock,
            self.stock_in_total(item.id),
            self.stock_out_total(item.id),
        )
    }

    pub fn snapshot(&self, item: &Item) -> StockSnapshot {
        StockSnapshot::new(item.clone(), self.remaining(item))
    }

    pub fn snapshots<'a>(&self, items: impl IntoIterator<Item = &'a Item>) -> Vec<StockSnapshot> {
        items.into_iter().map(|i| self.snapshot(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use stockroom_core::{CategoryId, StockInId, StockOutId};

    fn item(stock: i64, min_stock: i64) -> Item {
        Item {
            id: ItemId::new(),
            code: "BRG-001".to_string(),
            name: "Kabel NYM".to_string(),
            category_id: CategoryId::new(),
            unit: "roll".to_string(),
            location: None,
            stock,
            min_stock,
            created_at: Utc::now(),
        }
    }

    fn stock_in(item_id: ItemId, quantity: i64) -> StockInRecord {
        let now = Utc::now();
        StockInRecord {
            id: StockInId::new(),
            item_id,
            quantity,
            supplier: None,
            notes: None,
            date: now,
            created_at: now,
        }
    }

    fn stock_out(item_id: ItemId, quantity: i64) -> StockOutRecord {
        let now = Utc::now();
        StockOutRecord {
            id: StockOutId::new(),
            item_id,
            quantity,
            purpose: None,
            notes: None,
            date: now,
            created_at: now,
        }
    }

    fn no_ins() -> Vec<StockInRecord> {
        Vec::new()
    }

    fn no_outs() -> Vec<StockOutRecord> {
        Vec::new()
    }

    #[test]
    fn worked_example_is_high() {
        let it = item(10, 5);
        let ins = vec![stock_in(it.id, 5), stock_in(it.id, 3)];
        let outs = vec![stock_out(it.id, 4)];

        let remaining = remaining_stock(&it, &ins, &outs);
        assert_eq!(remaining, 14);
        assert_eq!(classify(remaining, 5), StockLevel::High);
    }

    #[test]
    fn empty_item_is_low_at_zero_threshold() {
        let it = item(0, 0);
        let remaining = remaining_stock(&it, &no_ins(), &no_outs());
        assert_eq!(remaining, 0);
        assert_eq!(classify(remaining, 0), StockLevel::Low);
    }

    #[test]
    fn other_items_entries_are_ignored() {
        let it = item(2, 1);
        let other = ItemId::new();
        let ins = vec![stock_in(other, 100), stock_in(it.id, 1)];
        let outs = vec![stock_out(other, 50)];
        assert_eq!(remaining_stock(&it, &ins, &outs), 3);
    }

    #[test]
    fn classify_boundaries() {
        assert_eq!(classify(5, 5), StockLevel::Low);
        assert_eq!(classify(6, 5), StockLevel::Normal);
        assert_eq!(classify(15, 5), StockLevel::Normal);
        assert_eq!(classify(16, 5), StockLevel::High);
    }

    #[test]
    fn classify_does_not_overflow_on_huge_threshold() {
        assert_eq!(classify(i64::MAX, i64::MAX / 2), StockLevel::Normal);
    }

    #[test]
    fn apply_delta_rejects_overdraw() {
        assert_eq!(apply_delta(10, -10).unwrap(), 0);
        let err = apply_delta(3, -4).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: 3,
                requested: 4
            }
        );
    }

    #[test]
    fn apply_delta_reports_overflow_as_validation() {
        let err = apply_delta(i64::MAX, 1).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = apply_delta(0, i64::MIN).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: 0,
                requested: i64::MAX
            }
        );
    }

    #[test]
    fn huge_ledgers_saturate_instead_of_wrapping() {
        let it = item(0, 0);
        let ins = vec![stock_in(it.id, i64::MAX), stock_in(it.id, 1)];
        let outs = vec![stock_out(it.id, 1)];

        assert_eq!(ledger_total(it.id, &ins), i64::MAX);
        assert_eq!(remaining_stock(&it, &ins, &outs), i64::MAX - 1);

        let r = StockReconciler::new(&ins, &outs);
        assert_eq!(r.stock_in_total(it.id), i64::MAX);
        assert_eq!(r.remaining(&it), i64::MAX - 1);
        assert_eq!(sum_quantities([i64::MAX, i64::MAX]), i64::MAX);
    }

    #[test]
    fn reconciler_agrees_with_per_item_function() {
        let a = item(1, 2);
        let b = item(0, 0);
        let ins = vec![stock_in(a.id, 4), stock_in(b.id, 7), stock_in(a.id, 1)];
        let outs = vec![stock_out(b.id, 2)];

        let r = StockReconciler::new(&ins, &outs);
        assert_eq!(r.remaining(&a), remaining_stock(&a, &ins, &outs));
        assert_eq!(r.remaining(&b), remaining_stock(&b, &ins, &outs));

        let snap = r.snapshot(&a);
        assert_eq!(snap.remaining, 6);
        assert_eq!(snap.level, StockLevel::Normal);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// With no ledger entries the remaining quantity is the base quantity.
        #[test]
        fn no_transactions_means_base(base in 0i64..1_000_000) {
            let it = item(base, 0);
            prop_assert_eq!(remaining_stock(&it, &no_ins(), &no_outs()), base);
        }

        /// Growing any single stock-in never lowers the result; growing any
        /// single stock-out never raises it.
        #[test]
        fn monotone_in_each_entry(
            base in 0i64..10_000,
            ins in prop::collection::vec(1i64..1_000, 0..8),
            outs in prop::collection::vec(1i64..1_000, 1..8),
            bump in 1i64..1_000,
            pick in any::<prop::sample::Index>(),
        ) {
            let it = item(base, 0);
            let in_records: Vec<_> = ins.iter().map(|q| stock_in(it.id, *q)).collect();
            let out_records: Vec<_> = outs.iter().map(|q| stock_out(it.id, *q)).collect();
            let before = remaining_stock(&it, &in_records, &out_records);

            let mut more_in = in_records.clone();
            more_in.push(stock_in(it.id, 0));
            let i = pick.index(more_in.len());
            more_in[i].quantity += bump;
            prop_assert!(remaining_stock(&it, &more_in, &out_records) >= before);

            let mut more_out = out_records.clone();
            let j = pick.index(more_out.len());
            more_out[j].quantity += bump;
            prop_assert!(remaining_stock(&it, &in_records, &more_out) <= before);
        }

        /// The three levels partition the non-negative domain exactly.
        #[test]
        fn classify_partitions(x in 0i64..100_000, m in 0i64..100_000) {
            let level = classify(x, m);
            prop_assert_eq!(level == StockLevel::Low, x <= m);
            prop_assert_eq!(level == StockLevel::High, x > 3 * m);
            prop_assert_eq!(level == StockLevel::Normal, x > m && x <= 3 * m);
        }
    }
}
