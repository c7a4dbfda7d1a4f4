//! Deterministic cost model.
//!
//! The same linear model is described to the pricing model in its prompt and
//! reimplemented here in closed form, so the pricing fallback stays
//! numerically defensible instead of being a canned constant.

use rust_decimal::Decimal;

use crate::domain::rfp::LineItem;
use crate::specs::SpecSchema;

/// Manufacturing overhead applied on top of material cost.
pub fn overhead_rate() -> Decimal {
    Decimal::new(25, 2)
}

/// Margin percentage applied when no model-recommended margin is available.
pub fn standard_margin_pct() -> Decimal {
    Decimal::from(18)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CostBreakdown {
    pub material_cost: Decimal,
    pub overhead_cost: Decimal,
    pub margin_pct: Decimal,
    pub final_bid_price: Decimal,
    pub price_per_unit: Decimal,
}

/// Material cost of one line: `qty × Σ rate_k × value_k` over the schema's
/// attributes. Attributes absent from the item contribute nothing.
pub fn line_material_cost(schema: &SpecSchema, item: &LineItem) -> Decimal {
    let per_unit: Decimal = schema
        .attributes
        .iter()
        .map(|attribute| attribute.unit_rate * item.spec(&attribute.key))
        .sum();
    per_unit * Decimal::from(item.qty)
}

pub fn material_cost(schema: &SpecSchema, items: &[LineItem]) -> Decimal {
    items.iter().map(|item| line_material_cost(schema, item)).sum()
}

/// Price a scope of supply with the standard overhead and margin:
/// `bid = (material + 0.25 × material) × 1.18`.
pub fn price_line_items(schema: &SpecSchema, items: &[LineItem]) -> CostBreakdown {
    let material = material_cost(schema, items);
    let overhead = material * overhead_rate();
    let margin_pct = standard_margin_pct();
    let bid = (material + overhead) * (Decimal::ONE + margin_pct / Decimal::ONE_HUNDRED);

    let total_quantity: u64 = items.iter().map(|item| u64::from(item.qty)).sum();
    let price_per_unit = if total_quantity == 0 {
        Decimal::ZERO
    } else {
        bid / Decimal::from(total_quantity)
    };

    CostBreakdown {
        material_cost: material,
        overhead_cost: overhead,
        margin_pct,
        final_bid_price: bid,
        price_per_unit,
    }
}
