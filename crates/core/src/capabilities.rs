//! The producer's capability catalog.
//!
//! Feeds the matching prompt a digest of what the plant can build, and
//! synthesizes per-item capability descriptions for the matching fallback.

use serde::{Deserialize, Serialize};

use crate::domain::rfp::LineItem;
use crate::specs::SpecSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDomain {
    pub name: String,
    /// Free-text capability envelope ("1.1 kV rating, conductor sizes 4–25 mm²").
    pub envelope: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityCatalog {
    /// Noun used when describing a catalog product ("cable").
    pub product_noun: String,
    pub domains: Vec<CapabilityDomain>,
    /// Test benches available in-house.
    pub tests: Vec<String>,
}

impl CapabilityCatalog {
    /// The cable plant's standard capability set.
    pub fn standard() -> Self {
        Self {
            product_noun: "cable".to_owned(),
            domains: vec![
                CapabilityDomain {
                    name: "LV Cables".to_owned(),
                    envelope: "1.1 kV rating, conductor sizes 4-25 mm², copper/aluminum".to_owned(),
                },
                CapabilityDomain {
                    name: "MV Cables".to_owned(),
                    envelope: "11 kV rating, conductor sizes 16-50 mm², primarily copper".to_owned(),
                },
                CapabilityDomain {
                    name: "Insulation".to_owned(),
                    envelope: "PVC/XLPE, thickness 0.8-2.0 mm".to_owned(),
                },
            ],
            tests: vec![
                "Insulation test".to_owned(),
                "High voltage test".to_owned(),
                "Dimensional check".to_owned(),
            ],
        }
    }

    /// Bulleted digest rendered into the matching prompt.
    pub fn prompt_digest(&self) -> String {
        let mut lines: Vec<String> =
            self.domains.iter().map(|domain| format!("- {}: {}", domain.name, domain.envelope)).collect();
        lines.push(format!("- Tests: {}", self.tests.join(", ")));
        lines.join("\n")
    }

    /// Describe the standard catalog product covering `item`, from the item's
    /// own leading specification attributes.
    pub fn describe_item(&self, schema: &SpecSchema, item: &LineItem) -> String {
        let specs: Vec<String> = schema
            .attributes
            .iter()
            .take(2)
            .map(|attribute| format!("{}{}", item.spec(&attribute.key).normalize(), attribute.unit))
            .collect();
        format!("Standard {} {}", specs.join(" "), self.product_noun)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use super::CapabilityCatalog;
    use crate::domain::rfp::LineItem;
    use crate::specs::SpecSchema;

    #[test]
    fn digest_covers_every_domain_and_the_test_benches() {
        let digest = CapabilityCatalog::standard().prompt_digest();
        assert!(digest.contains("LV Cables"));
        assert!(digest.contains("MV Cables"));
        assert!(digest.contains("High voltage test"));
    }

    #[test]
    fn item_description_uses_leading_spec_attributes() {
        let catalog = CapabilityCatalog::standard();
        let schema = SpecSchema::cable_v1();
        let item = LineItem {
            item_id: 1,
            description: "power cable".to_owned(),
            qty: 10,
            specs: BTreeMap::from([
                ("conductor_size_mm2".to_owned(), Decimal::from(16)),
                ("voltage_kv".to_owned(), Decimal::from(11)),
                ("insulation_mm".to_owned(), Decimal::ONE),
            ]),
        };

        assert_eq!(catalog.describe_item(&schema, &item), "Standard 16mm² 11kV cable");
    }
}
