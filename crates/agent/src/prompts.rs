//! Instruction templates for every stage.
//!
//! Pure data: rendering never talks to the model, so prompt content is
//! testable on its own. Templates are embedded at compile time and rendered
//! through one `Tera` instance per library.

use tera::{Context, Tera};

use tenderdesk_core::capabilities::CapabilityCatalog;
use tenderdesk_core::domain::pricing::CustomerProfile;
use tenderdesk_core::domain::rfp::RfpRecord;
use tenderdesk_core::specs::SpecSchema;

use crate::llm::CompletionRequest;

pub struct PromptLibrary {
    tera: Tera,
}

impl PromptLibrary {
    pub fn embedded() -> Self {
        let mut tera = Tera::default();
        let templates = [
            ("intake_system.txt.tera", include_str!("../templates/intake_system.txt.tera")),
            ("intake_user.txt.tera", include_str!("../templates/intake_user.txt.tera")),
            ("qualify_system.txt.tera", include_str!("../templates/qualify_system.txt.tera")),
            ("qualify_user.txt.tera", include_str!("../templates/qualify_user.txt.tera")),
            ("match_system.txt.tera", include_str!("../templates/match_system.txt.tera")),
            ("match_user.txt.tera", include_str!("../templates/match_user.txt.tera")),
            ("price_system.txt.tera", include_str!("../templates/price_system.txt.tera")),
            ("price_user.txt.tera", include_str!("../templates/price_user.txt.tera")),
            ("synthesis_system.txt.tera", include_str!("../templates/synthesis_system.txt.tera")),
            ("synthesis_user.txt.tera", include_str!("../templates/synthesis_user.txt.tera")),
        ];
        for (name, body) in templates {
            tera.add_raw_template(name, body)
                .unwrap_or_else(|error| panic!("embedded template {name} failed to load: {error}"));
        }
        Self { tera }
    }

    pub fn intake(
        &self,
        document: &str,
        schema: &SpecSchema,
        temperature: f32,
    ) -> Result<CompletionRequest, tera::Error> {
        let mut system_context = Context::new();
        system_context.insert("spec_keys", &schema.prompt_lines());

        let mut user_context = Context::new();
        user_context.insert("document", document);

        Ok(CompletionRequest {
            system: self.tera.render("intake_system.txt.tera", &system_context)?,
            prompt: self.tera.render("intake_user.txt.tera", &user_context)?,
            temperature,
        })
    }

    pub fn qualification(
        &self,
        record: &RfpRecord,
        scope_digest: &str,
        temperature: f32,
    ) -> Result<CompletionRequest, tera::Error> {
        let mut context = Context::new();
        context.insert("title", &record.title);
        context.insert("entity", &record.issuing_entity);
        context.insert("record_type", &record.record_type);
        context.insert("due_date", &record.due_date.to_string());
        context.insert("scope", scope_digest);

        Ok(CompletionRequest {
            system: self.tera.render("qualify_system.txt.tera", &Context::new())?,
            prompt: self.tera.render("qualify_user.txt.tera", &context)?,
            temperature,
        })
    }

    pub fn matching(
        &self,
        items_json: &str,
        catalog: &CapabilityCatalog,
        temperature: f32,
    ) -> Result<CompletionRequest, tera::Error> {
        let mut system_context = Context::new();
        system_context.insert("capabilities", &catalog.prompt_digest());

        let mut user_context = Context::new();
        user_context.insert("items", items_json);

        Ok(CompletionRequest {
            system: self.tera.render("match_system.txt.tera", &system_context)?,
            prompt: self.tera.render("match_user.txt.tera", &user_context)?,
            temperature,
        })
    }

    pub fn pricing(
        &self,
        items_json: &str,
        schema: &SpecSchema,
        profile: &CustomerProfile,
        total_quantity: u64,
        temperature: f32,
    ) -> Result<CompletionRequest, tera::Error> {
        let mut system_context = Context::new();
        system_context.insert("cost_lines", &schema.cost_lines());

        let mut user_context = Context::new();
        user_context.insert("items", items_json);
        user_context.insert("customer_class", &profile.class);
        user_context.insert("total_qty", &total_quantity);
        user_context.insert("competition", profile.competition.as_str());

        Ok(CompletionRequest {
            system: self.tera.render("price_system.txt.tera", &system_context)?,
            prompt: self.tera.render("price_user.txt.tera", &user_context)?,
            temperature,
        })
    }

    pub fn synthesis(
        &self,
        sales_json: &str,
        tech_json: &str,
        pricing_json: &str,
        due_date: &str,
        temperature: f32,
    ) -> Result<CompletionRequest, tera::Error> {
        let mut context = Context::new();
        context.insert("sales", sales_json);
        context.insert("tech", tech_json);
        context.insert("pricing", pricing_json);
        context.insert("due_date", due_date);

        Ok(CompletionRequest {
            system: self.tera.render("synthesis_system.txt.tera", &Context::new())?,
            prompt: self.tera.render("synthesis_user.txt.tera", &context)?,
            temperature,
        })
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::embedded()
    }
}
