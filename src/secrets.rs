//! Secret store access for the completion-service credential.
//!
//! Secrets are fetched through a [`SecretStore`] and memoized in an injected
//! [`SecretCache`] so concurrent requests do not hammer the store.

use std::{
    collections::HashMap,
    env,
    future::Future,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

const BOM: char = '\u{feff}';

/// Field names tried, in order, when a secret is stored as a JSON object.
const CREDENTIAL_FIELDS: [&str; 6] = [
    "apiKey",
    "api_key",
    "OPENAI_API_KEY",
    "openai_api_key",
    "value",
    "key",
];

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("secret value is empty or invalid for {0}")]
    Empty(String),

    #[error("no usable credential in secret JSON object; available keys: {0}")]
    NoCredentialField(String),

    #[error("secret store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the raw stored value; callers normalize it.
    async fn fetch(&self, name: &str) -> Result<String, SecretError>;
}

/// Reads each secret from the environment variable of the same name.
#[derive(Default)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn fetch(&self, name: &str) -> Result<String, SecretError> {
        env::var(name).map_err(|_| SecretError::NotFound(name.to_string()))
    }
}

/// A JSON object file mapping secret names to string or object values.
pub struct JsonFileSecretStore {
    path: PathBuf,
}

impl JsonFileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SecretStore for JsonFileSecretStore {
    async fn fetch(&self, name: &str) -> Result<String, SecretError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let document: Value = serde_json::from_str(content.trim_start_matches(BOM))?;
        let object = document.as_object().ok_or_else(|| {
            SecretError::Store(format!(
                "secret file {} must contain a JSON object",
                self.path.display()
            ))
        })?;

        match object.get(name) {
            Some(Value::String(raw)) => Ok(raw.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(SecretError::NotFound(name.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedSecret {
    value: String,
    expires_at: Instant,
}

/// Process-lifetime secret cache with a fixed time-to-live.
pub struct SecretCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedSecret>>,
}

impl SecretCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, name: &str) -> Option<String> {
        let guard = self.entries.lock().await;
        guard
            .get(name)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, name: &str, value: String) {
        let mut guard = self.entries.lock().await;
        guard.insert(
            name.to_string(),
            CachedSecret {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Returns the cached value or runs `fetch` and caches its success.
    ///
    /// The lock is released while `fetch` runs, so two callers racing on a
    /// cold entry may both fetch; the later insert wins.
    pub async fn get_or_fetch<F, Fut>(&self, name: &str, fetch: F) -> Result<String, SecretError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, SecretError>>,
    {
        if let Some(value) = self.get(name).await {
            tracing::trace!(target: "secrets", name = name, "secret_cache_hit");
            return Ok(value);
        }

        let value = fetch().await?;
        self.insert(name, value.clone()).await;
        tracing::debug!(
            target: "secrets",
            name = name,
            ttl_ms = self.ttl.as_millis() as u64,
            "secret_cached"
        );
        Ok(value)
    }

    pub async fn invalidate(&self, name: Option<&str>) {
        let mut guard = self.entries.lock().await;
        match name {
            Some(name) => {
                guard.remove(name);
            }
            None => guard.clear(),
        }
    }
}

/// Strips a leading UTF-8 byte order mark and surrounding whitespace.
pub fn normalize_secret(raw: &str) -> String {
    raw.trim_start_matches(BOM).trim().to_string()
}

/// Turns a raw stored value into a usable credential string.
pub fn extract_credential(name: &str, raw: &str) -> Result<String, SecretError> {
    let cleaned = normalize_secret(raw);

    let value = match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::String(inner)) => normalize_secret(&inner),
        Ok(Value::Object(object)) => {
            let field = CREDENTIAL_FIELDS
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_str))
                .or_else(|| object.values().find_map(Value::as_str));
            match field {
                Some(field) => normalize_secret(field),
                None => {
                    let keys = object.keys().cloned().collect::<Vec<_>>().join(", ");
                    return Err(SecretError::NoCredentialField(keys));
                }
            }
        }
        Ok(Value::Null) => String::new(),
        Ok(other) => normalize_secret(&other.to_string()),
        Err(_) => cleaned,
    };

    if value.is_empty() {
        return Err(SecretError::Empty(name.to_string()));
    }
    Ok(value)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretStoreConfig {
    #[default]
    Env,
    JsonFile {
        path: PathBuf,
    },
}

pub fn build_secret_store(config: &SecretStoreConfig) -> Arc<dyn SecretStore> {
    match config {
        SecretStoreConfig::Env => Arc::new(EnvSecretStore),
        SecretStoreConfig::JsonFile { path } => Arc::new(JsonFileSecretStore::new(path.clone())),
    }
}
