//! Transaction history: merged ledgers with type/date/text filtering.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use stockroom_core::ItemId;

use crate::item::Item;
use crate::ledger::{
    StockInRecord, StockOutRecord, StockTransaction, TransactionKind, merged_transactions,
};
use crate::reconcile::sum_quantities;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// `None` keeps both ledgers.
    pub kind: Option<TransactionKind>,
    /// Calendar day (UTC) of the effective date.
    pub date: Option<NaiveDate>,
    /// Case-insensitive substring of item name, item code, supplier or purpose.
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub transaction: StockTransaction,
    pub item_name: Option<String>,
    pub item_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryView {
    pub entries: Vec<HistoryEntry>,
    /// Totals across the unfiltered ledgers.
    pub total_in: i64,
    pub total_out: i64,
}

impl HistoryFilter {
    fn matches(&self, entry: &HistoryEntry) -> bool {
        let tx = &entry.transaction;

        if self.kind.is_some_and(|k| k != tx.kind) {
            return false;
        }
        if self.date.is_some_and(|d| d != tx.date.date_naive()) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                [
                    entry.item_name.as_deref(),
                    entry.item_code.as_deref(),
                    tx.counterparty.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&term))
            }
        }
    }
}

/// Build the history listing, newest effective date first.
pub fn build_history(
    items: &[Item],
    stock_ins: &[StockInRecord],
    stock_outs: &[StockOutRecord],
    filter: &HistoryFilter,
) -> HistoryView {
    let by_id: HashMap<ItemId, &Item> = items.iter().map(|i| (i.id, i)).collect();

    let entries = merged_transactions(stock_ins, stock_outs)
        .into_iter()
        .map(|transaction| {
            let item = by_id.get(&transaction.item_id);
            HistoryEntry {
                item_name: item.map(|i| i.name.clone()),
                item_code: item.map(|i| i.code.clone()),
                transaction,
            }
        })
        .filter(|e| filter.matches(e))
        .collect();

    HistoryView {
        entries,
        total_in: sum_quantities(stock_ins.iter().map(|r| r.quantity)),
        total_out: sum_quantities(stock_outs.iter().map(|r| r.quantity)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use stockroom_core::{CategoryId, StockInId, StockOutId};

    fn day(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, d, h, 0, 0).unwrap()
    }

    fn item(name: &str, code: &str) -> Item {
        Item {
            id: ItemId::new(),
            code: code.to_string(),
            name: name.to_string(),
            category_id: CategoryId::new(),
            unit: "pcs".to_string(),
            location: None,
            stock: 0,
            min_stock: 0,
            created_at: day(1, 0),
        }
    }

    fn fixture() -> (Vec<Item>, Vec<StockInRecord>, Vec<StockOutRecord>) {
        let paper = item("Kertas A4", "ATK-01");
        let toner = item("Toner", "PRN-07");
        let ins = vec![
            StockInRecord {
                id: StockInId::new(),
                item_id: paper.id,
                quantity: 50,
                supplier: Some("CV Kertas Jaya".to_string()),
                notes: None,
                date: day(2, 9),
                created_at: day(2, 9),
            },
            StockInRecord {
                id: StockInId::new(),
                item_id: toner.id,
                quantity: 4,
                supplier: None,
                notes: None,
                date: day(3, 9),
                created_at: day(3, 9),
            },
        ];
        let outs = vec![StockOutRecord {
            id: StockOutId::new(),
            item_id: paper.id,
            quantity: 10,
            purpose: Some("Rapat bulanan".to_string()),
            notes: None,
            date: day(3, 15),
            created_at: day(3, 15),
        }];
        (vec![paper, toner], ins, outs)
    }

    #[test]
    fn unfiltered_history_is_newest_first_with_totals() {
        let (items, ins, outs) = fixture();
        let view = build_history(&items, &ins, &outs, &HistoryFilter::default());

        assert_eq!(view.entries.len(), 3);
        assert_eq!(view.entries[0].transaction.kind, TransactionKind::Out);
        assert_eq!(view.entries[0].item_code.as_deref(), Some("ATK-01"));
        assert_eq!(view.total_in, 54);
        assert_eq!(view.total_out, 10);
    }

    #[test]
    fn filters_by_kind_and_day() {
        let (items, ins, outs) = fixture();
        let filter = HistoryFilter {
            kind: Some(TransactionKind::In),
            date: NaiveDate::from_ymd_opt(2024, 7, 3),
            search: None,
        };
        let view = build_history(&items, &ins, &outs, &filter);

        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].item_name.as_deref(), Some("Toner"));
    }

    #[test]
    fn search_covers_code_supplier_and_purpose() {
        let (items, ins, outs) = fixture();
        let search = |term: &str| {
            let filter = HistoryFilter {
                search: Some(term.to_string()),
                ..HistoryFilter::default()
            };
            build_history(&items, &ins, &outs, &filter).entries.len()
        };

        assert_eq!(search("prn"), 1);
        assert_eq!(search("kertas jaya"), 1);
        assert_eq!(search("RAPAT"), 1);
        assert_eq!(search("kertas"), 2);
        assert_eq!(search("   "), 3);
    }
}
