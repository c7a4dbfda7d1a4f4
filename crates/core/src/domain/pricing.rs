use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Assumed competition intensity for a bid, derived from the buyer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Competition {
    High,
    Medium,
}

impl Competition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
        }
    }
}

/// Customer classification consumed by the pricing stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub class: String,
    pub competition: Competition,
}

const PUBLIC_SECTOR_MARKERS: &[&str] = &["psu", "government", "ministry", "municipal"];

/// Derive the customer classification from the issuing entity. Public-sector
/// buyers tender openly, so competition is assumed high; everyone else gets
/// the configured default class and medium competition.
pub fn classify_customer(issuing_entity: &str, default_class: &str) -> CustomerProfile {
    let normalized = issuing_entity.to_ascii_lowercase();
    if PUBLIC_SECTOR_MARKERS.iter().any(|marker| normalized.contains(marker)) {
        CustomerProfile { class: "PSU".to_owned(), competition: Competition::High }
    } else {
        CustomerProfile { class: default_class.to_owned(), competition: Competition::Medium }
    }
}

/// Cost, margin, and bid-price recommendation for one RFP.
///
/// Invariants: `final_bid_price >= material_cost + overhead_cost` whenever
/// the margin is non-negative, and `price_per_unit` is the bid divided by
/// the summed line-item quantities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub material_cost: Decimal,
    pub overhead_cost: Decimal,
    /// Recommended margin percentage, typically 15–25.
    pub recommended_margin_pct: Decimal,
    pub final_bid_price: Decimal,
    pub price_per_unit: Decimal,
    pub competitive_analysis: String,
    pub margin_justification: String,
}
