//! The four analysis stages plus document intake.
//!
//! Every stage issues exactly one completion and one extraction per
//! invocation — no retries — and converts its own failures into a
//! deterministic fallback. Only intake reports failure to the caller, since
//! an RFP without line items cannot enter the pipeline at all.

pub mod intake;
pub mod matching;
pub mod pricing;
pub mod qualify;
pub mod synthesis;

use tenderdesk_core::domain::rfp::LineItem;
use tenderdesk_core::errors::StageError;

/// Line items as pretty JSON, the way the matching and pricing prompts
/// present them to the model.
pub(crate) fn items_json(items: &[LineItem]) -> String {
    serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_owned())
}

/// A template that fails to render means the completion never happened.
pub(crate) fn render_failure(error: tera::Error) -> StageError {
    StageError::CompletionFailed(format!("prompt render failed: {error}"))
}
