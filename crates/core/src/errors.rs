use thiserror::Error;

/// Failures a pipeline stage can encounter while talking to the model or
/// decoding its output.
///
/// Stages never let these escape: qualification, matching, pricing, and
/// synthesis each convert their own failures into a deterministic fallback
/// result. Document intake is the exception — its `Err` outcome is part of
/// its contract, because a record without line items cannot be processed at
/// all.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("model completion failed: {0}")]
    CompletionFailed(String),
    #[error("model output could not be decoded: {0}")]
    ExtractionFailed(String),
    #[error("document extraction yielded no usable line items")]
    NoItemsExtracted,
    #[error("stage invariant violation: {0}")]
    InvariantViolation(String),
}
