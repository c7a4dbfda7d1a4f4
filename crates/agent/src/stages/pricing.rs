//! Cost, margin, and bid-price recommendation.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use tenderdesk_core::costing;
use tenderdesk_core::domain::pricing::{classify_customer, CustomerProfile, PricingResult};
use tenderdesk_core::domain::rfp::LineItem;
use tenderdesk_core::errors::StageError;
use tenderdesk_core::specs::SpecSchema;

use crate::extract;
use crate::llm::CompletionClient;
use crate::prompts::PromptLibrary;
use crate::stages::{items_json, render_failure};

pub struct PricingStage {
    client: Arc<dyn CompletionClient>,
    prompts: Arc<PromptLibrary>,
    schema: SpecSchema,
    default_customer_class: String,
    temperature: f32,
}

impl PricingStage {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        prompts: Arc<PromptLibrary>,
        schema: SpecSchema,
        default_customer_class: String,
        temperature: f32,
    ) -> Self {
        Self { client, prompts, schema, default_customer_class, temperature }
    }

    pub async fn price(&self, items: &[LineItem], issuing_entity: &str) -> PricingResult {
        let profile = classify_customer(issuing_entity, &self.default_customer_class);
        match self.run_model(items, &profile).await {
            Ok(result) => {
                info!(
                    event_name = "pricing.completed",
                    customer_class = %profile.class,
                    final_bid_price = %result.final_bid_price,
                    "pricing recommendation produced"
                );
                result
            }
            Err(error) => {
                warn!(
                    event_name = "pricing.fallback",
                    error = %error,
                    "pricing fell back to the closed-form cost model"
                );
                self.fallback(items)
            }
        }
    }

    async fn run_model(
        &self,
        items: &[LineItem],
        profile: &CustomerProfile,
    ) -> Result<PricingResult, StageError> {
        let total_quantity: u64 = items.iter().map(|item| u64::from(item.qty)).sum();
        let request = self
            .prompts
            .pricing(&items_json(items), &self.schema, profile, total_quantity, self.temperature)
            .map_err(render_failure)?;
        let raw = self.client.complete(&request).await?;
        let map = extract::decode_object(&raw)?;

        // Without the cost and bid numbers there is nothing to defend.
        let material_cost = extract::decimal_field(&map, "material_cost")
            .ok_or_else(|| extract::missing("material_cost"))?;
        let final_bid_price = extract::decimal_field(&map, "final_bid_price")
            .ok_or_else(|| extract::missing("final_bid_price"))?;

        let derived_unit_price = if total_quantity == 0 {
            Decimal::ZERO
        } else {
            final_bid_price / Decimal::from(total_quantity)
        };

        Ok(PricingResult {
            material_cost,
            overhead_cost: extract::decimal_or(
                &map,
                "overhead_cost",
                material_cost * costing::overhead_rate(),
            ),
            recommended_margin_pct: extract::decimal_or(
                &map,
                "recommended_margin_pct",
                costing::standard_margin_pct(),
            ),
            final_bid_price,
            price_per_unit: extract::decimal_or(&map, "price_per_unit", derived_unit_price),
            competitive_analysis: extract::str_or(&map, "competitive_analysis", ""),
            margin_justification: extract::str_or(&map, "margin_justification", ""),
        })
    }

    /// Closed-form pricing from the same linear cost model the prompt
    /// documents: 25% overhead on material, 18% margin on the total.
    pub fn fallback(&self, items: &[LineItem]) -> PricingResult {
        let breakdown = costing::price_line_items(&self.schema, items);
        PricingResult {
            material_cost: breakdown.material_cost,
            overhead_cost: breakdown.overhead_cost,
            recommended_margin_pct: breakdown.margin_pct,
            final_bid_price: breakdown.final_bid_price,
            price_per_unit: breakdown.price_per_unit,
            competitive_analysis: "Standard competitive pricing applied with 18% margin for \
                                   balanced competitiveness and profitability."
                .to_owned(),
            margin_justification: "Medium margin appropriate for standard products with good \
                                   volume."
                .to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use tenderdesk_core::domain::rfp::LineItem;
    use tenderdesk_core::specs::SpecSchema;

    use super::PricingStage;
    use crate::llm::ScriptedClient;
    use crate::prompts::PromptLibrary;

    fn stage(client: ScriptedClient) -> PricingStage {
        PricingStage::new(
            Arc::new(client),
            Arc::new(PromptLibrary::embedded()),
            SpecSchema::cable_v1(),
            "PSU".to_owned(),
            0.7,
        )
    }

    fn scenario_items() -> Vec<LineItem> {
        vec![LineItem {
            item_id: 1,
            description: "11kV cable".to_owned(),
            qty: 2,
            specs: BTreeMap::from([
                ("conductor_size_mm2".to_owned(), Decimal::from(16)),
                ("voltage_kv".to_owned(), Decimal::from(11)),
                ("insulation_mm".to_owned(), Decimal::ZERO),
            ]),
        }]
    }

    #[tokio::test]
    async fn fallback_prices_follow_the_documented_formula() {
        let stage = stage(ScriptedClient::always_failing());

        let result = stage.price(&scenario_items(), "State Power PSU").await;

        assert_eq!(result.material_cost, Decimal::from(4830));
        assert_eq!(result.overhead_cost, Decimal::new(12075, 1));
        assert_eq!(result.recommended_margin_pct, Decimal::from(18));
        assert_eq!(result.final_bid_price, Decimal::new(712425, 2));
        assert_eq!(result.price_per_unit, Decimal::new(3562125, 3));
    }

    #[tokio::test]
    async fn decodes_a_model_recommendation() {
        let response = r#"{"material_cost": 5000, "overhead_cost": 1250,
            "recommended_margin_pct": 22, "final_bid_price": 7625, "price_per_unit": 3812.5,
            "competitive_analysis": "Aggressive but profitable.",
            "margin_justification": "Low competition."}"#;
        let stage = stage(ScriptedClient::new(vec![Ok(response.to_owned())]));

        let result = stage.price(&scenario_items(), "Acme Ltd").await;

        assert_eq!(result.final_bid_price, Decimal::from(7625));
        assert_eq!(result.recommended_margin_pct, Decimal::from(22));
        assert_eq!(result.competitive_analysis, "Aggressive but profitable.");
    }

    #[tokio::test]
    async fn missing_secondary_fields_are_derived() {
        let response = r#"{"material_cost": 4000, "final_bid_price": 5900}"#;
        let stage = stage(ScriptedClient::new(vec![Ok(response.to_owned())]));

        let result = stage.price(&scenario_items(), "Acme Ltd").await;

        assert_eq!(result.overhead_cost, Decimal::from(1000));
        assert_eq!(result.recommended_margin_pct, Decimal::from(18));
        // 5900 over 2 units
        assert_eq!(result.price_per_unit, Decimal::from(2950));
    }

    #[tokio::test]
    async fn missing_essential_numbers_resolve_to_the_fallback() {
        let response = r#"{"recommended_margin_pct": 20, "competitive_analysis": "no numbers"}"#;
        let stage = stage(ScriptedClient::new(vec![Ok(response.to_owned())]));

        let result = stage.price(&scenario_items(), "Acme Ltd").await;

        // the closed-form numbers, not the partial model output
        assert_eq!(result.material_cost, Decimal::from(4830));
        assert_eq!(result.recommended_margin_pct, Decimal::from(18));
    }

    #[tokio::test]
    async fn bid_covers_cost_plus_overhead_on_fallback() {
        let stage = stage(ScriptedClient::always_failing());
        let result = stage.price(&scenario_items(), "Acme Ltd").await;
        assert!(result.final_bid_price >= result.material_cost + result.overhead_cost);
    }
}
