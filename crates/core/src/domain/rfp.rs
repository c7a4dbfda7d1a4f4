use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RfpId(pub String);

impl RfpId {
    /// Mint an identity for a record extracted from an uploaded document.
    /// Unique within a processing run.
    pub fn uploaded() -> Self {
        Self(format!("RFP-UPLOAD-{}", Uuid::new_v4().simple()))
    }
}

/// Where a record entered the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    Catalog,
    Uploaded,
    Unknown,
}

/// One requested line of an RFP's scope of supply.
///
/// `item_id` is 1-based and order-preserving within the record. `specs` is a
/// bag of numeric attributes keyed by the active [`SpecSchema`]; unknown
/// attributes carry sentinel defaults rather than being rejected.
///
/// [`SpecSchema`]: crate::specs::SpecSchema
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_id: u32,
    pub description: String,
    pub qty: u32,
    pub specs: BTreeMap<String, Decimal>,
}

impl LineItem {
    pub fn spec(&self, key: &str) -> Decimal {
        self.specs.get(key).copied().unwrap_or(Decimal::ZERO)
    }
}

/// A normalized Request for Proposal, ready for the decision pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfpRecord {
    pub id: RfpId,
    pub title: String,
    pub due_date: NaiveDate,
    pub items: Vec<LineItem>,
    pub tests: Vec<String>,
    pub issuing_entity: String,
    pub origin: RecordOrigin,
    pub record_type: String,
    pub source_url: Option<String>,
}

impl RfpRecord {
    /// A record is processable once it carries at least one line item.
    pub fn is_processable(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.qty)).sum()
    }

    /// Condensed summary of the first `count` items, used to keep the
    /// qualification prompt small.
    pub fn scope_digest(&self, count: usize) -> String {
        self.items
            .iter()
            .take(count)
            .map(|item| format!("{} (Qty: {})", item.description, item.qty))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
