//! Domain core of the tenderdesk RFP platform.
//!
//! Everything deterministic lives here: the RFP data model, the versioned
//! specification vocabulary, the capability catalog, the closed-form cost
//! model, catalog-record resolution, portfolio metrics, configuration, and
//! the stage error taxonomy. The model-facing orchestration (prompts,
//! completions, extraction, the pipeline itself) lives in `tenderdesk-agent`
//! and builds on these types.

pub mod capabilities;
pub mod catalog;
pub mod config;
pub mod costing;
pub mod domain;
pub mod errors;
pub mod metrics;
pub mod specs;
pub mod telemetry;

pub use capabilities::{CapabilityCatalog, CapabilityDomain};
pub use catalog::{load_catalog, CatalogRecord};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::decision::{Decision, DecisionDraft, DecisionOutcome, StageTimings};
pub use domain::matching::{ItemMatch, MatchResult, MatchTier};
pub use domain::pricing::{classify_customer, Competition, CustomerProfile, PricingResult};
pub use domain::qualification::{Priority, QualificationResult};
pub use domain::rfp::{LineItem, RecordOrigin, RfpId, RfpRecord};
pub use errors::StageError;
pub use specs::{SpecAttribute, SpecSchema};
