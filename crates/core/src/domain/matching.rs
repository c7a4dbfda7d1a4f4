use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::rfp::LineItem;
use crate::errors::StageError;

/// How well a catalog capability satisfies one requested line item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Exact,
    Near,
    Gap,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMatch {
    pub item_id: u32,
    pub tier: MatchTier,
    /// Description of the capability matched against the item.
    pub capability: String,
}

/// Outcome of matching an RFP's line items against the capability catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Aggregate match score, 0–100.
    pub confidence: u8,
    pub matched_items: u32,
    pub total_items: u32,
    pub matches: Vec<ItemMatch>,
    pub gaps: Vec<String>,
    pub recommendation: String,
}

impl MatchResult {
    /// Check the structural invariants against the items that were matched:
    /// `matched_items <= total_items == items.len()`, and every per-item
    /// record references an index present in the input.
    pub fn validate_against(&self, items: &[LineItem]) -> Result<(), StageError> {
        if self.total_items as usize != items.len() {
            return Err(StageError::InvariantViolation(format!(
                "total_items {} does not cover the {} input items",
                self.total_items,
                items.len()
            )));
        }
        if self.matched_items > self.total_items {
            return Err(StageError::InvariantViolation(format!(
                "matched_items {} exceeds total_items {}",
                self.matched_items, self.total_items
            )));
        }

        let known: BTreeSet<u32> = items.iter().map(|item| item.item_id).collect();
        for entry in &self.matches {
            if !known.contains(&entry.item_id) {
                return Err(StageError::InvariantViolation(format!(
                    "match references unknown item_id {}",
                    entry.item_id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{ItemMatch, MatchResult, MatchTier};
    use crate::domain::rfp::LineItem;
    use crate::errors::StageError;

    fn items(count: u32) -> Vec<LineItem> {
        (1..=count)
            .map(|item_id| LineItem {
                item_id,
                description: format!("item {item_id}"),
                qty: 1,
                specs: BTreeMap::new(),
            })
            .collect()
    }

    fn result(matched: u32, total: u32, matches: Vec<ItemMatch>) -> MatchResult {
        MatchResult {
            confidence: 90,
            matched_items: matched,
            total_items: total,
            matches,
            gaps: Vec::new(),
            recommendation: String::new(),
        }
    }

    #[test]
    fn valid_result_passes() {
        let result = result(
            2,
            2,
            vec![
                ItemMatch { item_id: 1, tier: MatchTier::Exact, capability: "LV 4mm²".to_owned() },
                ItemMatch { item_id: 2, tier: MatchTier::Near, capability: "MV 35mm²".to_owned() },
            ],
        );
        assert!(result.validate_against(&items(2)).is_ok());
    }

    #[test]
    fn matched_count_cannot_exceed_total() {
        let error = result(3, 2, Vec::new()).validate_against(&items(2)).expect_err("must reject");
        assert!(matches!(error, StageError::InvariantViolation(_)));
    }

    #[test]
    fn total_must_cover_input_items() {
        let error = result(1, 1, Vec::new()).validate_against(&items(2)).expect_err("must reject");
        assert!(matches!(error, StageError::InvariantViolation(_)));
    }

    #[test]
    fn matches_must_reference_known_items() {
        let result = result(
            1,
            1,
            vec![ItemMatch { item_id: 9, tier: MatchTier::Gap, capability: String::new() }],
        );
        let error = result.validate_against(&items(1)).expect_err("must reject");
        assert!(error.to_string().contains("unknown item_id 9"));
    }

    #[test]
    fn tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MatchTier::Exact).expect("serialize"), "\"exact\"");
    }
}
