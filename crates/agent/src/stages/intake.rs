//! Document intake: freeform RFP text to a normalized record.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::{info, warn};

use tenderdesk_core::domain::rfp::{LineItem, RecordOrigin, RfpId, RfpRecord};
use tenderdesk_core::errors::StageError;
use tenderdesk_core::specs::SpecSchema;

use crate::extract;
use crate::llm::CompletionClient;
use crate::prompts::PromptLibrary;
use crate::stages::render_failure;

/// Caller-supplied metadata used to fill fields the model omits.
#[derive(Clone, Debug)]
pub struct IntakeSeed {
    pub title: String,
    pub issuing_entity: String,
    pub record_type: String,
    pub due_date: NaiveDate,
}

pub struct DocumentIntakeStage {
    client: Arc<dyn CompletionClient>,
    prompts: Arc<PromptLibrary>,
    schema: SpecSchema,
    max_input_chars: usize,
    temperature: f32,
}

impl DocumentIntakeStage {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        prompts: Arc<PromptLibrary>,
        schema: SpecSchema,
        max_input_chars: usize,
        temperature: f32,
    ) -> Self {
        Self { client, prompts, schema, max_input_chars, temperature }
    }

    /// Turn raw document text into a normalized record.
    ///
    /// One completion, one extraction, no retries: any failure is returned
    /// to the caller, which owns whatever retry or manual-entry path exists
    /// around this core.
    pub async fn extract(&self, text: &str, seed: &IntakeSeed) -> Result<RfpRecord, StageError> {
        let document = condense_text(text, self.max_input_chars);
        let request = self
            .prompts
            .intake(&document, &self.schema, self.temperature)
            .map_err(render_failure)?;

        let raw = self.client.complete(&request).await.map_err(|error| {
            warn!(
                event_name = "intake.completion_failed",
                error = %error,
                "document extraction completion failed"
            );
            StageError::from(error)
        })?;

        let map = extract::decode_object(&raw)?;
        let record = self.normalize(&map, seed)?;

        info!(
            event_name = "intake.record_extracted",
            rfp_id = %record.id.0,
            items = record.items.len(),
            "document extracted into a processable record"
        );
        Ok(record)
    }

    fn normalize(&self, map: &Map<String, Value>, seed: &IntakeSeed) -> Result<RfpRecord, StageError> {
        let mut items: Vec<LineItem> = extract::object_list(map, "scope")
            .into_iter()
            .enumerate()
            .map(|(index, entry)| LineItem {
                item_id: extract::u32_or(entry, "item_id", index as u32 + 1),
                description: extract::str_or(entry, "description", "Line Item"),
                qty: coerce_quantity(entry.get("qty")),
                specs: self.schema.normalize(&coerce_specs(entry.get("specs"))),
            })
            .collect();

        if items.is_empty() {
            return Err(StageError::NoItemsExtracted);
        }
        reindex_if_needed(&mut items);

        let due_date = map
            .get("due_date")
            .and_then(Value::as_str)
            .and_then(|text| NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok())
            .unwrap_or(seed.due_date);

        Ok(RfpRecord {
            id: RfpId::uploaded(),
            title: extract::str_or(map, "title", &seed.title),
            due_date,
            items,
            tests: extract::string_list(map, "tests"),
            issuing_entity: extract::str_or(map, "issuing_entity", &seed.issuing_entity),
            origin: RecordOrigin::Uploaded,
            record_type: seed.record_type.clone(),
            source_url: Some("uploaded-pdf".to_owned()),
        })
    }
}

/// Quantity is a positive integer; anything unparseable becomes 1.
fn coerce_quantity(value: Option<&Value>) -> u32 {
    let quantity = match value {
        Some(Value::Number(number)) => number.as_u64().unwrap_or(1),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(1),
        _ => 1,
    };
    u32::try_from(quantity).unwrap_or(u32::MAX).max(1)
}

fn coerce_specs(value: Option<&Value>) -> BTreeMap<String, rust_decimal::Decimal> {
    let mut specs = BTreeMap::new();
    if let Some(Value::Object(entries)) = value {
        for key in entries.keys() {
            if let Some(decimal) = extract::decimal_field(entries, key) {
                specs.insert(key.clone(), decimal);
            }
        }
    }
    specs
}

/// Model-assigned indices are kept when they form a unique set; otherwise
/// the whole scope is renumbered sequentially.
fn reindex_if_needed(items: &mut [LineItem]) {
    let mut seen = std::collections::BTreeSet::new();
    let unique = items.iter().all(|item| item.item_id > 0 && seen.insert(item.item_id));
    if !unique {
        for (index, item) in items.iter_mut().enumerate() {
            item.item_id = index as u32 + 1;
        }
    }
}

/// Pre-clean document text: normalized line endings, collapsed runs of
/// horizontal whitespace, capped to the configured budget. Oversized
/// documents are truncated, not rejected.
pub fn condense_text(text: &str, max_chars: usize) -> String {
    let condensed = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n");

    if condensed.chars().count() <= max_chars {
        condensed
    } else {
        condensed.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use tenderdesk_core::errors::StageError;
    use tenderdesk_core::specs::SpecSchema;

    use super::{condense_text, DocumentIntakeStage, IntakeSeed};
    use crate::llm::{CompletionError, ScriptedClient};
    use crate::prompts::PromptLibrary;

    fn stage(client: ScriptedClient) -> DocumentIntakeStage {
        DocumentIntakeStage::new(
            Arc::new(client),
            Arc::new(PromptLibrary::embedded()),
            SpecSchema::cable_v1(),
            15_000,
            0.2,
        )
    }

    fn seed() -> IntakeSeed {
        IntakeSeed {
            title: "Uploaded RFP".to_owned(),
            issuing_entity: "Unknown".to_owned(),
            record_type: "PDF".to_owned(),
            due_date: NaiveDate::from_ymd_opt(2026, 8, 20).expect("date"),
        }
    }

    #[test]
    fn condense_normalizes_endings_and_collapses_runs() {
        let cleaned = condense_text("Item  1\t 11kV\r\nQty:   4\rEnd", 100);
        assert_eq!(cleaned, "Item 1 11kV\nQty: 4\nEnd");
    }

    #[test]
    fn oversized_documents_are_truncated_not_rejected() {
        let text = "x".repeat(200);
        assert_eq!(condense_text(&text, 50).chars().count(), 50);
    }

    #[tokio::test]
    async fn extracts_and_normalizes_a_fenced_response() {
        let response = r#"```json
{
  "title": "Supply of 11kV XLPE cables",
  "due_date": "2026-09-30",
  "issuing_entity": "City Metro Rail",
  "scope": [
    {"description": "11kV 3C x 35 mm2 XLPE cable", "qty": "4",
     "specs": {"conductor_size_mm2": 35, "voltage_kv": 11}},
    {"description": "LV control cable", "specs": {}}
  ],
  "tests": ["High voltage test"]
}
```"#;
        let stage = stage(ScriptedClient::new(vec![Ok(response.to_owned())]));

        let record = stage.extract("raw pdf text", &seed()).await.expect("extracts");

        assert_eq!(record.title, "Supply of 11kV XLPE cables");
        assert_eq!(record.due_date, NaiveDate::from_ymd_opt(2026, 9, 30).expect("date"));
        assert_eq!(record.items.len(), 2);
        // indices assigned sequentially when the model omits them
        assert_eq!(record.items[0].item_id, 1);
        assert_eq!(record.items[1].item_id, 2);
        // quantity parsed from a string, defaulted when absent
        assert_eq!(record.items[0].qty, 4);
        assert_eq!(record.items[1].qty, 1);
        // schema sentinels fill unspecified attributes
        assert_eq!(record.items[0].spec("insulation_mm"), Decimal::ONE);
        assert_eq!(record.items[1].spec("conductor_size_mm2"), Decimal::from(4));
        assert!(record.id.0.starts_with("RFP-UPLOAD-"));
    }

    #[tokio::test]
    async fn empty_scope_is_a_failed_outcome() {
        let response = r#"{"title": "Empty", "scope": []}"#;
        let stage = stage(ScriptedClient::new(vec![Ok(response.to_owned())]));

        let error = stage.extract("text", &seed()).await.expect_err("must fail");
        assert_eq!(error, StageError::NoItemsExtracted);
    }

    #[tokio::test]
    async fn completion_failure_is_reported_without_retry() {
        let client = ScriptedClient::new(vec![Err(CompletionError::Timeout(30))]);
        let stage = stage(client);

        let error = stage.extract("text", &seed()).await.expect_err("must fail");
        assert!(matches!(error, StageError::CompletionFailed(_)));
    }

    #[tokio::test]
    async fn undecodable_response_is_an_extraction_failure() {
        let stage = stage(ScriptedClient::new(vec![Ok("no json to be found".to_owned())]));

        let error = stage.extract("text", &seed()).await.expect_err("must fail");
        assert!(matches!(error, StageError::ExtractionFailed(_)));
    }

    #[tokio::test]
    async fn duplicate_model_indices_are_renumbered() {
        let response = r#"{"scope": [
            {"item_id": 1, "description": "a", "qty": 1, "specs": {}},
            {"item_id": 1, "description": "b", "qty": 1, "specs": {}}
        ]}"#;
        let stage = stage(ScriptedClient::new(vec![Ok(response.to_owned())]));

        let record = stage.extract("text", &seed()).await.expect("extracts");
        let ids: Vec<u32> = record.items.iter().map(|item| item.item_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
