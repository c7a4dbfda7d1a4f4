use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub intake: IntakeConfig,
    pub pricing: PricingConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    /// Sampling temperature for document extraction (low: we want fidelity).
    pub extraction_temperature: f32,
    /// Sampling temperature for the qualitative analysis stages.
    pub analysis_temperature: f32,
    /// Per-call budget; expiry surfaces as a completion failure, never a hang.
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct IntakeConfig {
    /// Documents longer than this are truncated before prompting, not rejected.
    pub max_input_chars: usize,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    /// Customer class assumed when the issuing entity gives no signal.
    pub default_customer_class: String,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Skip matching and pricing for records that fail qualification.
    pub short_circuit_on_unqualified: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub log_level: Option<String>,
    pub short_circuit_on_unqualified: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
                model: "gemini-1.5-flash-latest".to_string(),
                extraction_temperature: 0.2,
                analysis_temperature: 0.7,
                timeout_secs: 30,
            },
            intake: IntakeConfig { max_input_chars: 15_000 },
            pricing: PricingConfig { default_customer_class: "PSU".to_string() },
            pipeline: PipelineConfig { short_circuit_on_unqualified: true },
            logging: LoggingConfig { level: "info".to_string() },
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tenderdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(api_key_value.into());
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(extraction_temperature) = llm.extraction_temperature {
                self.llm.extraction_temperature = extraction_temperature;
            }
            if let Some(analysis_temperature) = llm.analysis_temperature {
                self.llm.analysis_temperature = analysis_temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(intake) = patch.intake {
            if let Some(max_input_chars) = intake.max_input_chars {
                self.intake.max_input_chars = max_input_chars;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(default_customer_class) = pricing.default_customer_class {
                self.pricing.default_customer_class = default_customer_class;
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(short_circuit) = pipeline.short_circuit_on_unqualified {
                self.pipeline.short_circuit_on_unqualified = short_circuit;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TENDERDESK_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("TENDERDESK_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("TENDERDESK_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("TENDERDESK_LLM_EXTRACTION_TEMPERATURE") {
            self.llm.extraction_temperature =
                parse_f32("TENDERDESK_LLM_EXTRACTION_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("TENDERDESK_LLM_ANALYSIS_TEMPERATURE") {
            self.llm.analysis_temperature =
                parse_f32("TENDERDESK_LLM_ANALYSIS_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("TENDERDESK_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("TENDERDESK_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TENDERDESK_INTAKE_MAX_INPUT_CHARS") {
            self.intake.max_input_chars = parse_usize("TENDERDESK_INTAKE_MAX_INPUT_CHARS", &value)?;
        }

        if let Some(value) = read_env("TENDERDESK_PRICING_DEFAULT_CUSTOMER_CLASS") {
            self.pricing.default_customer_class = value;
        }

        if let Some(value) = read_env("TENDERDESK_PIPELINE_SHORT_CIRCUIT") {
            self.pipeline.short_circuit_on_unqualified =
                parse_bool("TENDERDESK_PIPELINE_SHORT_CIRCUIT", &value)?;
        }

        let log_level =
            read_env("TENDERDESK_LOGGING_LEVEL").or_else(|| read_env("TENDERDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(llm_api_key.into());
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(short_circuit) = overrides.short_circuit_on_unqualified {
            self.pipeline.short_circuit_on_unqualified = short_circuit;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_intake(&self.intake)?;
        validate_pricing(&self.pricing)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tenderdesk.toml"), PathBuf::from("config/tenderdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    for (name, temperature) in [
        ("llm.extraction_temperature", llm.extraction_temperature),
        ("llm.analysis_temperature", llm.analysis_temperature),
    ] {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Validation(format!("{name} must be in range 0.0..=2.0")));
        }
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if let Some(api_key) = &llm.api_key {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "llm.api_key is set but empty; unset it or provide a key".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_intake(intake: &IntakeConfig) -> Result<(), ConfigError> {
    if intake.max_input_chars == 0 {
        return Err(ConfigError::Validation(
            "intake.max_input_chars must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.default_customer_class.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pricing.default_customer_class must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    intake: Option<IntakePatch>,
    pricing: Option<PricingPatch>,
    pipeline: Option<PipelinePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    extraction_temperature: Option<f32>,
    analysis_temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct IntakePatch {
    max_input_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    default_customer_class: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    short_circuit_on_unqualified: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
}
