//! Versioned specification vocabularies.
//!
//! The platform handles RFPs from different product domains, each with its
//! own set of numeric specification attributes. Rather than encoding the
//! vocabulary in prompt prose alone, each attribute is declared once here
//! and reused by extraction prompts, spec-bag normalization, and the
//! deterministic cost model.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One recognized specification attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecAttribute {
    /// Key used in spec bags and model JSON (`conductor_size_mm2`).
    pub key: String,
    /// Human label used in prompts ("conductor size").
    pub label: String,
    /// Display unit ("mm²").
    pub unit: String,
    /// Neutral value substituted when the attribute is absent or unparseable.
    pub sentinel: Decimal,
    /// Per-unit material cost rate used by the linear cost model.
    pub unit_rate: Decimal,
    /// Values above this mark the item for manual review in portfolio metrics.
    pub review_threshold: Option<Decimal>,
}

/// A versioned set of specification attributes for one RFP domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecSchema {
    pub id: String,
    pub attributes: Vec<SpecAttribute>,
}

impl SpecSchema {
    /// The built-in cable-manufacturing vocabulary.
    pub fn cable_v1() -> Self {
        Self {
            id: "cable-v1".to_owned(),
            attributes: vec![
                SpecAttribute {
                    key: "conductor_size_mm2".to_owned(),
                    label: "conductor size".to_owned(),
                    unit: "mm²".to_owned(),
                    sentinel: Decimal::from(4),
                    unit_rate: Decimal::from(120),
                    review_threshold: None,
                },
                SpecAttribute {
                    key: "voltage_kv".to_owned(),
                    label: "voltage rating".to_owned(),
                    unit: "kV".to_owned(),
                    sentinel: Decimal::ONE,
                    unit_rate: Decimal::from(45),
                    review_threshold: Some(Decimal::from(10)),
                },
                SpecAttribute {
                    key: "insulation_mm".to_owned(),
                    label: "insulation thickness".to_owned(),
                    unit: "mm".to_owned(),
                    sentinel: Decimal::ONE,
                    unit_rate: Decimal::from(30),
                    review_threshold: Some(Decimal::new(12, 1)),
                },
            ],
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&SpecAttribute> {
        self.attributes.iter().find(|attribute| attribute.key == key)
    }

    /// Fill every schema attribute from `raw`, substituting sentinels for
    /// absent values. Keys the schema does not recognize are preserved as-is;
    /// they simply carry no cost rate.
    pub fn normalize(&self, raw: &BTreeMap<String, Decimal>) -> BTreeMap<String, Decimal> {
        let mut specs = raw.clone();
        for attribute in &self.attributes {
            specs.entry(attribute.key.clone()).or_insert(attribute.sentinel);
        }
        specs
    }

    /// Spec-key instructions rendered into the extraction prompt, one line
    /// per attribute.
    pub fn prompt_lines(&self) -> String {
        self.attributes
            .iter()
            .map(|attribute| {
                format!(
                    "- \"{}\": {} in {} (use {} when the document does not state one)",
                    attribute.key, attribute.label, attribute.unit, attribute.sentinel
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Cost-model lines rendered into the pricing prompt.
    pub fn cost_lines(&self) -> String {
        self.attributes
            .iter()
            .map(|attribute| {
                format!("- {}: {} × {} per unit", attribute.label, attribute.key, attribute.unit_rate)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
