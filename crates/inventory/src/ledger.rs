//! Append-only stock ledgers: stock-in and stock-out entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockroom_core::{DomainResult, Entity, ItemId, StockInId, StockOutId};

use crate::validate::{optional_text, positive};

/// Common view over both ledgers.
pub trait LedgerEntry {
    fn item_id(&self) -> ItemId;
    fn quantity(&self) -> i64;
}

/// Goods received for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInRecord {
    pub id: StockInId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub supplier: Option<String>,
    pub notes: Option<String>,
    /// Effective date of the movement.
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Goods issued from an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockOutRecord {
    pub id: StockOutId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry for StockInRecord {
    fn item_id(&self) -> ItemId {
        self.item_id
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }
}

impl LedgerEntry for StockOutRecord {
    fn item_id(&self) -> ItemId {
        self.item_id
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }
}

impl Entity for StockInRecord {
    type Id = StockInId;

    fn id(&self) -> StockInId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for StockOutRecord {
    type Id = StockOutId;

    fn id(&self) -> StockOutId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockIn {
    pub item_id: ItemId,
    pub quantity: i64,
    pub supplier: Option<String>,
    pub notes: Option<String>,
    /// Defaults to the creation time.
    pub date: Option<DateTime<Utc>>,
}

impl NewStockIn {
    pub fn into_record(self, id: StockInId, now: DateTime<Utc>) -> DomainResult<StockInRecord> {
        Ok(StockInRecord {
            id,
            item_id: self.item_id,
            quantity: positive("quantity", self.quantity)?,
            supplier: optional_text(self.supplier),
            notes: optional_text(self.notes),
            date: self.date.unwrap_or(now),
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockOut {
    pub item_id: ItemId,
    pub quantity: i64,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl NewStockOut {
    pub fn into_record(self, id: StockOutId, now: DateTime<Utc>) -> DomainResult<StockOutRecord> {
        Ok(StockOutRecord {
            id,
            item_id: self.item_id,
            quantity: positive("quantity", self.quantity)?,
            purpose: optional_text(self.purpose),
            notes: optional_text(self.notes),
            date: self.date.unwrap_or(now),
            created_at: now,
        })
    }
}

/// Edit of a stock-in entry. The item reference is fixed once recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockInPatch {
    pub quantity: Option<i64>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl StockInRecord {
    pub fn patched(&self, patch: StockInPatch) -> DomainResult<StockInRecord> {
        let mut next = self.clone();
        if let Some(quantity) = patch.quantity {
            next.quantity = positive("quantity", quantity)?;
        }
        if patch.supplier.is_some() {
            next.supplier = optional_text(patch.supplier);
        }
        if patch.notes.is_some() {
            next.notes = optional_text(patch.notes);
        }
        if let Some(date) = patch.date {
            next.date = date;
        }
        Ok(next)
    }
}

/// Edit of a stock-out entry. The item reference is fixed once recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockOutPatch {
    pub quantity: Option<i64>,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl StockOutRecord {
    pub fn patched(&self, patch: StockOutPatch) -> DomainResult<StockOutRecord> {
        let mut next = self.clone();
        if let Some(quantity) = patch.quantity {
            next.quantity = positive("quantity", quantity)?;
        }
        if patch.purpose.is_some() {
            next.purpose = optional_text(patch.purpose);
        }
        if patch.notes.is_some() {
            next.notes = optional_text(patch.notes);
        }
        if let Some(date) = patch.date {
            next.date = date;
        }
        Ok(next)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    In,
    Out,
}

impl core::str::FromStr for TransactionKind {
    type Err = stockroom_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" => Ok(TransactionKind::In),
            "out" => Ok(TransactionKind::Out),
            other => Err(stockroom_core::DomainError::validation(format!(
                "transaction type must be 'in' or 'out', got '{other}'"
            ))),
        }
    }
}

/// One movement from either ledger, flattened for merged listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub id: Uuid,
    pub item_id: ItemId,
    pub quantity: i64,
    /// Supplier for stock-in, purpose for stock-out.
    pub counterparty: Option<String>,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&StockInRecord> for StockTransaction {
    fn from(r: &StockInRecord) -> Self {
        Self {
            kind: TransactionKind::In,
            id: *r.id.as_uuid(),
            item_id: r.item_id,
            quantity: r.quantity,
            counterparty: r.supplier.clone(),
            notes: r.notes.clone(),
            date: r.date,
            created_at: r.created_at,
        }
    }
}

impl From<&StockOutRecord> for StockTransaction {
    fn from(r: &StockOutRecord) -> Self {
        Self {
            kind: TransactionKind::Out,
            id: *r.id.as_uuid(),
            item_id: r.item_id,
            quantity: r.quantity,
            counterparty: r.purpose.clone(),
            notes: r.notes.clone(),
            date: r.date,
            created_at: r.created_at,
        }
    }
}

/// Both ledgers merged, newest effective date first.
pub fn merged_transactions(
    stock_ins: &[StockInRecord],
    stock_outs: &[StockOutRecord],
) -> Vec<StockTransaction> {
    let mut all: Vec<StockTransaction> = stock_ins
        .iter()
        .map(StockTransaction::from)
        .chain(stock_outs.iter().map(StockTransaction::from))
        .collect();
    all.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.created_at.cmp(&a.created_at)));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use stockroom_core::DomainError;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn stock_in_requires_positive_quantity() {
        let input = NewStockIn {
            item_id: ItemId::new(),
            quantity: 0,
            supplier: None,
            notes: None,
            date: None,
        };
        let err = input.into_record(StockInId::new(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn missing_date_defaults_to_now() {
        let now = at(5);
        let record = NewStockOut {
            item_id: ItemId::new(),
            quantity: 2,
            purpose: Some("".to_string()),
            notes: None,
            date: None,
        }
        .into_record(StockOutId::new(), now)
        .unwrap();
        assert_eq!(record.date, now);
        assert_eq!(record.purpose, None);
    }

    #[test]
    fn patch_keeps_item_reference() {
        let record = NewStockIn {
            item_id: ItemId::new(),
            quantity: 4,
            supplier: Some("CV Sumber".to_string()),
            notes: None,
            date: Some(at(1)),
        }
        .into_record(StockInId::new(), at(1))
        .unwrap();

        let patched = record
            .patched(StockInPatch {
                quantity: Some(6),
                ..StockInPatch::default()
            })
            .unwrap();
        assert_eq!(patched.quantity, 6);
        assert_eq!(patched.item_id, record.item_id);
        assert_eq!(patched.supplier, record.supplier);
    }

    #[test]
    fn merged_transactions_are_newest_first() {
        let item = ItemId::new();
        let ins = vec![StockInRecord {
            id: StockInId::new(),
            item_id: item,
            quantity: 3,
            supplier: None,
            notes: None,
            date: at(1),
            created_at: at(1),
        }];
        let outs = vec![StockOutRecord {
            id: StockOutId::new(),
            item_id: item,
            quantity: 1,
            purpose: Some("Produksi".to_string()),
            notes: None,
            date: at(2),
            created_at: at(1) + Duration::minutes(1),
        }];

        let merged = merged_transactions(&ins, &outs);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].kind, TransactionKind::Out);
        assert_eq!(merged[0].counterparty.as_deref(), Some("Produksi"));
        assert_eq!(merged[1].kind, TransactionKind::In);
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("IN".parse::<TransactionKind>().unwrap(), TransactionKind::In);
        assert_eq!("out".parse::<TransactionKind>().unwrap(), TransactionKind::Out);
        assert!("all".parse::<TransactionKind>().is_err());
    }
}
