//! Final synthesis: one GO/REVIEW/REJECT call over the three assessments.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use tenderdesk_core::domain::decision::{DecisionDraft, DecisionOutcome};
use tenderdesk_core::domain::matching::MatchResult;
use tenderdesk_core::domain::pricing::PricingResult;
use tenderdesk_core::domain::qualification::QualificationResult;
use tenderdesk_core::errors::StageError;

use crate::extract;
use crate::llm::CompletionClient;
use crate::prompts::PromptLibrary;
use crate::stages::render_failure;

pub struct SynthesisStage {
    client: Arc<dyn CompletionClient>,
    prompts: Arc<PromptLibrary>,
    temperature: f32,
}

impl SynthesisStage {
    pub fn new(client: Arc<dyn CompletionClient>, prompts: Arc<PromptLibrary>, temperature: f32) -> Self {
        Self { client, prompts, temperature }
    }

    pub async fn synthesize(
        &self,
        qualification: &QualificationResult,
        matching: &MatchResult,
        pricing: &PricingResult,
        due_date: NaiveDate,
    ) -> DecisionDraft {
        match self.run_model(qualification, matching, pricing, due_date).await {
            Ok(draft) => {
                info!(
                    event_name = "synthesis.completed",
                    outcome = ?draft.outcome,
                    confidence = draft.confidence,
                    "final decision synthesized"
                );
                draft
            }
            Err(error) => {
                warn!(
                    event_name = "synthesis.fallback",
                    error = %error,
                    "synthesis fell back to manual review"
                );
                manual_review_fallback()
            }
        }
    }

    async fn run_model(
        &self,
        qualification: &QualificationResult,
        matching: &MatchResult,
        pricing: &PricingResult,
        due_date: NaiveDate,
    ) -> Result<DecisionDraft, StageError> {
        let request = self
            .prompts
            .synthesis(
                &to_pretty_json(qualification),
                &to_pretty_json(matching),
                &to_pretty_json(pricing),
                &due_date.to_string(),
                self.temperature,
            )
            .map_err(render_failure)?;
        let raw = self.client.complete(&request).await?;
        let map = extract::decode_object(&raw)?;

        let outcome = map
            .get("decision")
            .and_then(serde_json::Value::as_str)
            .and_then(parse_outcome)
            .ok_or_else(|| extract::missing("decision"))?;

        Ok(DecisionDraft {
            outcome,
            confidence: extract::pct_or(&map, "confidence", 60),
            risks: extract::string_list(&map, "risks"),
            next_steps: extract::string_list(&map, "next_steps"),
            timeline: extract::str_or(&map, "timeline", "To be determined"),
            approvals_required: extract::string_list(&map, "approvals_required"),
            executive_summary: extract::str_or(&map, "executive_summary", ""),
        })
    }
}

fn parse_outcome(text: &str) -> Option<DecisionOutcome> {
    match text.to_ascii_lowercase().as_str() {
        "proceed" => Some(DecisionOutcome::Proceed),
        "review" => Some(DecisionOutcome::Review),
        "reject" => Some(DecisionOutcome::Reject),
        _ => None,
    }
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_owned())
}

/// The escape hatch: an unanalyzable RFP is routed to a human, never to a
/// false accept or false reject.
pub fn manual_review_fallback() -> DecisionDraft {
    DecisionDraft {
        outcome: DecisionOutcome::Review,
        confidence: 60,
        risks: vec!["AI analysis incomplete - manual review required".to_owned()],
        next_steps: vec![
            "Manual review by bid team".to_owned(),
            "Verify specifications".to_owned(),
            "Calculate pricing manually".to_owned(),
        ],
        timeline: "2-3 days".to_owned(),
        approvals_required: vec!["Bid Manager".to_owned()],
        executive_summary: "RFP requires manual review due to AI processing limitations."
            .to_owned(),
    }
}
