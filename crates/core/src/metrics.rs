//! Portfolio metrics over a set of parsed RFP records.
//!
//! Pure summary arithmetic consumed by reporting collaborators; nothing here
//! feeds back into the decision pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::rfp::{LineItem, RecordOrigin, RfpRecord};
use crate::specs::SpecSchema;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub website: usize,
    pub email: usize,
    pub uploaded: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub awaiting_review: usize,
    /// Mean spec-completeness estimate across records, as a percentage.
    pub avg_match_accuracy_pct: u32,
    /// Share of items carrying a complete specification set, as a percentage.
    pub catalog_coverage_pct: u32,
    /// Items whose specs exceed a review threshold and need a manual pass.
    pub manual_overrides: usize,
    pub sources: SourceBreakdown,
    pub total_items: usize,
}

fn has_complete_specs(schema: &SpecSchema, item: &LineItem) -> bool {
    schema.attributes.iter().all(|attribute| item.spec(&attribute.key) > Decimal::ZERO)
}

fn needs_manual_override(schema: &SpecSchema, item: &LineItem) -> bool {
    schema.attributes.iter().any(|attribute| {
        attribute
            .review_threshold
            .map(|threshold| item.spec(&attribute.key) > threshold)
            .unwrap_or(false)
    })
}

fn tally_source(sources: &mut SourceBreakdown, record: &RfpRecord) {
    let url = record.source_url.as_deref().unwrap_or("");
    if record.origin == RecordOrigin::Uploaded || url.contains("uploaded-pdf") {
        sources.uploaded += 1;
    } else if url.contains("mailto") || url.contains("email") {
        sources.email += 1;
    } else if url.starts_with("http") || url.contains("www") {
        sources.website += 1;
    }
}

pub fn portfolio_metrics(schema: &SpecSchema, records: &[RfpRecord]) -> PortfolioMetrics {
    if records.is_empty() {
        return PortfolioMetrics::default();
    }

    let total_items: usize = records.iter().map(|record| record.items.len()).sum();
    let complete_items: usize = records
        .iter()
        .flat_map(|record| &record.items)
        .filter(|item| has_complete_specs(schema, item))
        .count();
    let manual_overrides = records
        .iter()
        .flat_map(|record| &record.items)
        .filter(|item| needs_manual_override(schema, item))
        .count();

    // Per-record accuracy estimate: 0.92 for a fully specified item, 0.75 otherwise.
    let accuracy_sum: f64 = records
        .iter()
        .filter(|record| !record.items.is_empty())
        .map(|record| {
            let item_sum: f64 = record
                .items
                .iter()
                .map(|item| if has_complete_specs(schema, item) { 0.92 } else { 0.75 })
                .sum();
            item_sum / record.items.len() as f64
        })
        .sum();

    let mut sources = SourceBreakdown::default();
    for record in records {
        tally_source(&mut sources, record);
    }

    PortfolioMetrics {
        awaiting_review: records.len(),
        avg_match_accuracy_pct: ((accuracy_sum / records.len() as f64) * 100.0).round() as u32,
        catalog_coverage_pct: if total_items == 0 {
            0
        } else {
            ((complete_items as f64 / total_items as f64) * 100.0).round() as u32
        },
        manual_overrides,
        sources,
        total_items,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::portfolio_metrics;
    use crate::domain::rfp::{LineItem, RecordOrigin, RfpId, RfpRecord};
    use crate::specs::SpecSchema;

    fn item(voltage: i64, insulation: Decimal) -> LineItem {
        LineItem {
            item_id: 1,
            description: "cable".to_owned(),
            qty: 1,
            specs: BTreeMap::from([
                ("conductor_size_mm2".to_owned(), Decimal::from(16)),
                ("voltage_kv".to_owned(), Decimal::from(voltage)),
                ("insulation_mm".to_owned(), insulation),
            ]),
        }
    }

    fn record(id: &str, items: Vec<LineItem>, origin: RecordOrigin, url: Option<&str>) -> RfpRecord {
        RfpRecord {
            id: RfpId(id.to_owned()),
            title: "t".to_owned(),
            due_date: NaiveDate::from_ymd_opt(2026, 9, 1).expect("date"),
            items,
            tests: Vec::new(),
            issuing_entity: "Entity".to_owned(),
            origin,
            record_type: "Supply".to_owned(),
            source_url: url.map(str::to_owned),
        }
    }

    #[test]
    fn empty_portfolio_yields_zeroes() {
        let metrics = portfolio_metrics(&SpecSchema::cable_v1(), &[]);
        assert_eq!(metrics.awaiting_review, 0);
        assert_eq!(metrics.total_items, 0);
    }

    #[test]
    fn fully_specified_portfolio_scores_ninety_two() {
        let schema = SpecSchema::cable_v1();
        let records = vec![record(
            "R1",
            vec![item(11, Decimal::ONE)],
            RecordOrigin::Catalog,
            Some("https://etenders.example.gov/psu/1"),
        )];

        let metrics = portfolio_metrics(&schema, &records);

        assert_eq!(metrics.avg_match_accuracy_pct, 92);
        assert_eq!(metrics.catalog_coverage_pct, 100);
        assert_eq!(metrics.sources.website, 1);
    }

    #[test]
    fn incomplete_specs_drop_coverage_and_accuracy() {
        let schema = SpecSchema::cable_v1();
        let incomplete = item(0, Decimal::ONE);
        let records = vec![record("R1", vec![incomplete, item(1, Decimal::ONE)], RecordOrigin::Unknown, None)];

        let metrics = portfolio_metrics(&schema, &records);

        assert_eq!(metrics.catalog_coverage_pct, 50);
        // mean of 0.75 and 0.92, rounded
        assert_eq!(metrics.avg_match_accuracy_pct, 84);
    }

    #[test]
    fn out_of_range_specs_count_as_manual_overrides() {
        let schema = SpecSchema::cable_v1();
        let records = vec![record(
            "R1",
            vec![item(33, Decimal::ONE), item(1, Decimal::new(15, 1))],
            RecordOrigin::Catalog,
            None,
        )];

        // 33 kV exceeds the voltage threshold, 1.5 mm exceeds the insulation one
        assert_eq!(portfolio_metrics(&schema, &records).manual_overrides, 2);
    }

    #[test]
    fn uploaded_records_bucket_by_origin() {
        let schema = SpecSchema::cable_v1();
        let records = vec![
            record("R1", vec![item(1, Decimal::ONE)], RecordOrigin::Uploaded, Some("uploaded-pdf")),
            record("R2", vec![item(1, Decimal::ONE)], RecordOrigin::Catalog, Some("mailto:bids@example.com")),
        ];

        let sources = portfolio_metrics(&schema, &records).sources;
        assert_eq!(sources.uploaded, 1);
        assert_eq!(sources.email, 1);
        assert_eq!(sources.website, 0);
    }
}
