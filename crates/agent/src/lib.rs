//! Agent orchestration for the tenderdesk RFP platform.
//!
//! This crate turns an RFP record (or the raw text of an uploaded document)
//! into one final bid decision by driving four model-backed analysis stages:
//!
//! 1. **Qualification** - is this worth bidding on at all?
//! 2. **Matching** - which catalog capabilities cover the requested items?
//! 3. **Pricing** - what should the bid cost, and at what margin?
//! 4. **Synthesis** - one GO/REVIEW/REJECT call over the three assessments.
//!
//! # Key Types
//!
//! - `RfpPipeline` - the controller sequencing the stages (see `pipeline`)
//! - `CompletionClient` - pluggable model endpoint (HTTP client + scripted
//!   test double in `llm`)
//! - `PromptLibrary` - pure, embedded instruction templates (`prompts`)
//!
//! # Reliability Principle
//!
//! The model is an unreliable free-text generator; every stage decodes its
//! output tolerantly and owns a deterministic fallback. A pipeline
//! invocation therefore always returns a complete, typed `Decision` - at
//! worst one that routes the RFP to manual review.

pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod stages;

pub use llm::{CompletionClient, CompletionError, CompletionRequest, GenerativeHttpClient, ScriptedClient};
pub use pipeline::{PipelineOptions, RfpPipeline};
pub use prompts::PromptLibrary;
pub use stages::intake::{DocumentIntakeStage, IntakeSeed};
pub use stages::matching::SpecMatchStage;
pub use stages::pricing::PricingStage;
pub use stages::qualify::QualificationStage;
pub use stages::synthesis::SynthesisStage;
