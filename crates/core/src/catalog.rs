//! Catalog-mode intake: pre-structured RFP records with relative due dates.
//!
//! Catalog records carry a `due_date_offset_days` relative to "today" so the
//! same dataset stays current across runs; resolution pins the offset to a
//! concrete date and normalizes the scope against the active spec schema.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Deserialize;

use crate::domain::rfp::{LineItem, RecordOrigin, RfpId, RfpRecord};
use crate::specs::SpecSchema;

#[derive(Clone, Debug, Deserialize)]
pub struct CatalogRecord {
    pub title: String,
    #[serde(default)]
    pub due_date_offset_days: i64,
    pub scope: Vec<LineItem>,
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default)]
    pub origin_url: Option<String>,
    #[serde(default)]
    pub issuing_entity: Option<String>,
    #[serde(default)]
    pub executor: Option<String>,
    #[serde(rename = "type", default)]
    pub record_type: Option<String>,
}

/// Parse a catalog file: a JSON object keyed by record identity.
pub fn load_catalog(json: &str) -> Result<BTreeMap<String, CatalogRecord>, serde_json::Error> {
    serde_json::from_str(json)
}

impl CatalogRecord {
    /// Pin this record to a concrete due date and normalize its scope.
    pub fn resolve(&self, id: &str, today: NaiveDate, schema: &SpecSchema) -> RfpRecord {
        let items = self
            .scope
            .iter()
            .map(|item| LineItem {
                item_id: item.item_id,
                description: item.description.clone(),
                qty: item.qty.max(1),
                specs: schema.normalize(&item.specs),
            })
            .collect();

        RfpRecord {
            id: RfpId(id.to_owned()),
            title: self.title.clone(),
            due_date: today + Duration::days(self.due_date_offset_days),
            items,
            tests: self.tests.clone(),
            issuing_entity: self.issuing_entity.clone().unwrap_or_else(|| "Unknown".to_owned()),
            origin: RecordOrigin::Catalog,
            record_type: self.record_type.clone().unwrap_or_else(|| "Unknown".to_owned()),
            source_url: self.origin_url.clone(),
        }
    }
}
