use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Verdict of the qualification stage: is this RFP worth pursuing?
///
/// Immutable once produced; the controller reads only `qualified` to decide
/// whether the remaining stages run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationResult {
    pub qualified: bool,
    pub priority: Priority,
    /// Estimated win chance, 0–100.
    pub win_probability: u8,
    pub reasoning: String,
    pub key_factors: Vec<String>,
}
