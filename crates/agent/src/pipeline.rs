//! The pipeline controller.
//!
//! Drives Qualification → (short-circuit on reject) → Matching → Pricing →
//! Synthesis, timing each stage, and always terminates in exactly one
//! [`Decision`]. Stages run strictly in sequence: nothing downstream of
//! qualification is spent on a record that will not be bid.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use tenderdesk_core::capabilities::CapabilityCatalog;
use tenderdesk_core::config::AppConfig;
use tenderdesk_core::domain::decision::{Decision, DecisionOutcome, StageTimings};
use tenderdesk_core::domain::qualification::QualificationResult;
use tenderdesk_core::domain::rfp::RfpRecord;
use tenderdesk_core::errors::StageError;
use tenderdesk_core::specs::SpecSchema;

use crate::llm::CompletionClient;
use crate::prompts::PromptLibrary;
use crate::stages::intake::{DocumentIntakeStage, IntakeSeed};
use crate::stages::matching::SpecMatchStage;
use crate::stages::pricing::PricingStage;
use crate::stages::qualify::QualificationStage;
use crate::stages::synthesis::{manual_review_fallback, SynthesisStage};

#[derive(Clone, Copy, Debug)]
pub struct PipelineOptions {
    /// Skip matching and pricing when qualification says no. On by default;
    /// disabling it lets synthesis weigh an unqualified record anyway.
    pub short_circuit_on_unqualified: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { short_circuit_on_unqualified: true }
    }
}

pub struct RfpPipeline {
    intake: DocumentIntakeStage,
    qualification: QualificationStage,
    matching: SpecMatchStage,
    pricing: PricingStage,
    synthesis: SynthesisStage,
    options: PipelineOptions,
}

impl RfpPipeline {
    /// Build a pipeline for the built-in cable domain.
    pub fn new(client: Arc<dyn CompletionClient>, config: &AppConfig) -> Self {
        Self::with_domain(client, config, SpecSchema::cable_v1(), CapabilityCatalog::standard())
    }

    /// Build a pipeline for an explicit spec schema and capability catalog.
    pub fn with_domain(
        client: Arc<dyn CompletionClient>,
        config: &AppConfig,
        schema: SpecSchema,
        catalog: CapabilityCatalog,
    ) -> Self {
        let prompts = Arc::new(PromptLibrary::embedded());
        let analysis = config.llm.analysis_temperature;

        Self {
            intake: DocumentIntakeStage::new(
                Arc::clone(&client),
                Arc::clone(&prompts),
                schema.clone(),
                config.intake.max_input_chars,
                config.llm.extraction_temperature,
            ),
            qualification: QualificationStage::new(
                Arc::clone(&client),
                Arc::clone(&prompts),
                analysis,
            ),
            matching: SpecMatchStage::new(
                Arc::clone(&client),
                Arc::clone(&prompts),
                catalog,
                schema.clone(),
                analysis,
            ),
            pricing: PricingStage::new(
                Arc::clone(&client),
                Arc::clone(&prompts),
                schema,
                config.pricing.default_customer_class.clone(),
                analysis,
            ),
            synthesis: SynthesisStage::new(client, prompts, analysis),
            options: PipelineOptions {
                short_circuit_on_unqualified: config.pipeline.short_circuit_on_unqualified,
            },
        }
    }

    /// Extract a processable record from uploaded document text. Failure is
    /// the caller's to handle; the decision pipeline never sees a record
    /// without line items.
    pub async fn extract_document(
        &self,
        text: &str,
        seed: &IntakeSeed,
    ) -> Result<RfpRecord, StageError> {
        self.intake.extract(text, seed).await
    }

    /// Run the decision pipeline over a normalized record.
    ///
    /// Every code path terminates in a `Decision`: stage failures resolve to
    /// stage fallbacks, and anything that escapes a stage anyway is caught
    /// here and converted to a manual-review decision carrying the failure
    /// cause.
    pub async fn process(&self, record: &RfpRecord) -> Decision {
        info!(
            event_name = "pipeline.started",
            rfp_id = %record.id.0,
            items = record.items.len(),
            "processing record"
        );

        let decision = match self.run(record).await {
            Ok(decision) => decision,
            Err(cause) => {
                error!(
                    event_name = "pipeline.guard_triggered",
                    rfp_id = %record.id.0,
                    error = %cause,
                    "stage failure escaped its fallback; routing to manual review"
                );
                let mut decision = Decision::from_draft(
                    manual_review_fallback(),
                    None,
                    None,
                    None,
                    StageTimings::default(),
                );
                decision.failure_cause = Some(cause.to_string());
                decision
            }
        };

        info!(
            event_name = "pipeline.completed",
            rfp_id = %record.id.0,
            outcome = ?decision.outcome,
            total_ms = decision.timings.total_ms,
            "record processed"
        );
        decision
    }

    async fn run(&self, record: &RfpRecord) -> Result<Decision, StageError> {
        let qualification_start = Instant::now();
        let qualification = self.qualification.evaluate(record).await;
        let qualification_ms = elapsed_ms(qualification_start);

        if !qualification.qualified && self.options.short_circuit_on_unqualified {
            info!(
                event_name = "pipeline.short_circuited",
                rfp_id = %record.id.0,
                "record failed qualification; matching and pricing skipped"
            );
            let timings = StageTimings::new(qualification_ms, 0, 0, 0);
            return Ok(rejected_decision(record, qualification, timings));
        }

        let matching_start = Instant::now();
        let matching = self.matching.match_items(&record.items).await;
        let matching_ms = elapsed_ms(matching_start);
        // Defense in depth: a fallback that broke the counting invariants
        // would poison everything downstream, so check it again here.
        matching.validate_against(&record.items)?;

        let pricing_start = Instant::now();
        let pricing = self.pricing.price(&record.items, &record.issuing_entity).await;
        let pricing_ms = elapsed_ms(pricing_start);

        let synthesis_start = Instant::now();
        let draft =
            self.synthesis.synthesize(&qualification, &matching, &pricing, record.due_date).await;
        let synthesis_ms = elapsed_ms(synthesis_start);

        let timings = StageTimings::new(qualification_ms, matching_ms, pricing_ms, synthesis_ms);
        Ok(Decision::from_draft(
            draft,
            Some(qualification),
            Some(matching),
            Some(pricing),
            timings,
        ))
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Terminal decision for a record that failed qualification, built purely
/// from the qualification reasoning; matching and pricing never ran.
fn rejected_decision(
    record: &RfpRecord,
    qualification: QualificationResult,
    timings: StageTimings,
) -> Decision {
    Decision {
        outcome: DecisionOutcome::Reject,
        confidence: 90,
        risks: vec!["Not qualified by sales assessment".to_owned()],
        next_steps: vec!["Document rejection reasons".to_owned(), "Archive RFP".to_owned()],
        timeline: "Immediate".to_owned(),
        approvals_required: Vec::new(),
        executive_summary: format!(
            "RFP {} rejected based on sales qualification. {}",
            record.id.0, qualification.reasoning
        ),
        qualification: Some(qualification),
        matching: None,
        pricing: None,
        timings,
        failure_cause: None,
    }
}
