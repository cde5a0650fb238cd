use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ai_gateway::types::AIGatewayConfig, secrets::SecretStoreConfig};

const SCHEMA_FILE_NAME: &str = "mathsage.schema.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub ai_gateway: AIGatewayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tutor: TutorConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/mathsage")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

fn default_classifier_temperature() -> f32 {
    0.3
}

fn default_classifier_max_output_tokens() -> u64 {
    500
}

fn default_reply_temperature() -> f32 {
    0.7
}

fn default_reply_max_output_tokens() -> u64 {
    1_000
}

fn default_secret_cache_ttl_ms() -> u64 {
    300_000
}

/// State classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// When false only the local heuristics run.
    #[serde(default = "default_enabled_true")]
    pub llm_assisted: bool,
    #[serde(default = "default_classifier_temperature")]
    pub temperature: f32,
    #[serde(default = "default_classifier_max_output_tokens")]
    pub max_output_tokens: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            llm_assisted: true,
            temperature: default_classifier_temperature(),
            max_output_tokens: default_classifier_max_output_tokens(),
        }
    }
}

/// Draft and regeneration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    #[serde(default = "default_reply_temperature")]
    pub temperature: f32,
    #[serde(default = "default_reply_max_output_tokens")]
    pub max_output_tokens: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            temperature: default_reply_temperature(),
            max_output_tokens: default_reply_max_output_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TutorConfig {
    /// Gateway route for every completion call; `None` uses the `default` alias.
    #[serde(default)]
    pub route: Option<String>,
    /// Per-attempt timeout override for tutor calls.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    #[serde(default = "default_secret_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default)]
    pub store: Option<SecretStoreConfig>,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: default_secret_cache_ttl_ms(),
            store: None,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize config")?;

        if let Some(SecretStoreConfig::JsonFile { path }) = &mut config.secrets.store
            && !path.is_absolute()
        {
            *path = config_base.join(&*path);
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join(SCHEMA_FILE_NAME);
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or {SCHEMA_FILE_NAME} next to it"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
