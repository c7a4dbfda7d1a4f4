use serde::{Deserialize, Serialize};

use crate::domain::matching::MatchResult;
use crate::domain::pricing::PricingResult;
use crate::domain::qualification::QualificationResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionOutcome {
    Proceed,
    Review,
    Reject,
}

/// Wall-clock milliseconds spent in each stage of one pipeline invocation.
///
/// `total_ms` is the sum of the stage durations — stages run sequentially on
/// a single path, so the sum is the invocation's working time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub qualification_ms: u64,
    pub matching_ms: u64,
    pub pricing_ms: u64,
    pub synthesis_ms: u64,
    pub total_ms: u64,
}

impl StageTimings {
    pub fn new(qualification_ms: u64, matching_ms: u64, pricing_ms: u64, synthesis_ms: u64) -> Self {
        Self {
            qualification_ms,
            matching_ms,
            pricing_ms,
            synthesis_ms,
            total_ms: qualification_ms + matching_ms + pricing_ms + synthesis_ms,
        }
    }
}

/// The synthesized judgment fields of a [`Decision`], before the controller
/// attaches stage sub-results and timings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionDraft {
    pub outcome: DecisionOutcome,
    /// Confidence in the recommendation, 0–100.
    pub confidence: u8,
    pub risks: Vec<String>,
    pub next_steps: Vec<String>,
    pub timeline: String,
    pub approvals_required: Vec<String>,
    pub executive_summary: String,
}

/// The single artifact a pipeline invocation hands back to its caller.
///
/// Always present, whatever happened upstream: at worst it recommends manual
/// review. Sub-results are `None` when the invocation short-circuited before
/// the producing stage ran. `failure_cause` is set only by the controller's
/// outer guard, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub outcome: DecisionOutcome,
    pub confidence: u8,
    pub risks: Vec<String>,
    pub next_steps: Vec<String>,
    pub timeline: String,
    pub approvals_required: Vec<String>,
    pub executive_summary: String,
    pub qualification: Option<QualificationResult>,
    pub matching: Option<MatchResult>,
    pub pricing: Option<PricingResult>,
    pub timings: StageTimings,
    pub failure_cause: Option<String>,
}

impl Decision {
    pub fn from_draft(
        draft: DecisionDraft,
        qualification: Option<QualificationResult>,
        matching: Option<MatchResult>,
        pricing: Option<PricingResult>,
        timings: StageTimings,
    ) -> Self {
        Self {
            outcome: draft.outcome,
            confidence: draft.confidence,
            risks: draft.risks,
            next_steps: draft.next_steps,
            timeline: draft.timeline,
            approvals_required: draft.approvals_required,
            executive_summary: draft.executive_summary,
            qualification,
            matching,
            pricing,
            timings,
            failure_cause: None,
        }
    }
}
