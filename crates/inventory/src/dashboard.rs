//! Dashboard aggregation over the catalogue and both ledgers.

use serde::Serialize;

use crate::item::Item;
use crate::ledger::{StockInRecord, StockOutRecord, StockTransaction, merged_transactions};
use crate::reconcile::{StockLevel, StockReconciler, StockSnapshot, sum_quantities};

pub const RECENT_TRANSACTIONS: usize = 5;
pub const TOP_ITEMS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_items: usize,
    pub total_categories: usize,
    pub total_stock_in: i64,
    pub total_stock_out: i64,
    /// Items at or below their minimum, lowest remaining first.
    pub low_stock_items: Vec<StockSnapshot>,
    pub recent_transactions: Vec<StockTransaction>,
    /// Items with the most remaining stock.
    pub top_items: Vec<StockSnapshot>,
}

impl DashboardSummary {
    pub fn compute(
        items: &[Item],
        total_categories: usize,
        stock_ins: &[StockInRecord],
        stock_outs: &[StockOutRecord],
    ) -> Self {
        let reconciler = StockReconciler::new(stock_ins, stock_outs);
        let snapshots = reconciler.snapshots(items);

        let mut low_stock_items: Vec<StockSnapshot> = snapshots
            .iter()
            .filter(|s| s.level == StockLevel::Low)
            .cloned()
            .collect();
        low_stock_items.sort_by(|a, b| {
            a.remaining
                .cmp(&b.remaining)
                .then_with(|| a.item.name.cmp(&b.item.name))
        });

        let mut top_items = snapshots;
        top_items.sort_by(|a, b| {
            b.remaining
                .cmp(&a.remaining)
                .then_with(|| a.item.name.cmp(&b.item.name))
        });
        top_items.truncate(TOP_ITEMS);

        let mut recent_transactions = merged_transactions(stock_ins, stock_outs);
        recent_transactions.truncate(RECENT_TRANSACTIONS);

        Self {
            total_items: items.len(),
            total_categories,
            total_stock_in: sum_quantities(stock_ins.iter().map(|r| r.quantity)),
            total_stock_out: sum_quantities(stock_outs.iter().map(|r| r.quantity)),
            low_stock_items,
            recent_transactions,
            top_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use stockroom_core::{CategoryId, ItemId, StockInId, StockOutId};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    fn item(name: &str, min_stock: i64) -> Item {
        Item {
            id: ItemId::new(),
            code: name.to_uppercase(),
            name: name.to_string(),
            category_id: CategoryId::new(),
            unit: "pcs".to_string(),
            location: None,
            stock: 0,
            min_stock,
            created_at: t0(),
        }
    }

    fn stock_in(item_id: ItemId, quantity: i64, minutes: i64) -> StockInRecord {
        StockInRecord {
            id: StockInId::new(),
            item_id,
            quantity,
            supplier: None,
            notes: None,
            date: t0() + Duration::minutes(minutes),
            created_at: t0() + Duration::minutes(minutes),
        }
    }

    fn stock_out(item_id: ItemId, quantity: i64, minutes: i64) -> StockOutRecord {
        StockOutRecord {
            id: StockOutId::new(),
            item_id,
            quantity,
            purpose: None,
            notes: None,
            date: t0() + Duration::minutes(minutes),
            created_at: t0() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn totals_and_low_stock() {
        let pen = item("pen", 10);
        let tape = item("tape", 2);
        let ins = vec![stock_in(pen.id, 8, 0), stock_in(tape.id, 20, 1)];
        let outs = vec![stock_out(tape.id, 5, 2)];

        let summary = DashboardSummary::compute(&[pen.clone(), tape.clone()], 1, &ins, &outs);

        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.total_categories, 1);
        assert_eq!(summary.total_stock_in, 28);
        assert_eq!(summary.total_stock_out, 5);
        assert_eq!(summary.low_stock_items.len(), 1);
        assert_eq!(summary.low_stock_items[0].item.id, pen.id);
        assert_eq!(summary.top_items[0].item.id, tape.id);
        assert_eq!(summary.top_items[0].remaining, 15);
    }

    #[test]
    fn recent_and_top_lists_are_capped() {
        let items: Vec<Item> = (0..8).map(|i| item(&format!("item-{i}"), 0)).collect();
        let ins: Vec<StockInRecord> = items
            .iter()
            .enumerate()
            .map(|(i, it)| stock_in(it.id, i as i64 + 1, i as i64))
            .collect();

        let summary = DashboardSummary::compute(&items, 0, &ins, &[]);

        assert_eq!(summary.recent_transactions.len(), RECENT_TRANSACTIONS);
        assert_eq!(summary.recent_transactions[0].quantity, 8);
        assert_eq!(summary.top_items.len(), TOP_ITEMS);
        assert_eq!(summary.top_items[0].remaining, 8);
        assert_eq!(summary.top_items[4].remaining, 4);
    }
}
