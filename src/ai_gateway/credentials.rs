use std::{env, sync::Arc};

use async_trait::async_trait;

use crate::{
    ai_gateway::{
        error::{GatewayError, GatewayErrorKind},
        types::{BackendProfile, CredentialRef, ResolvedCredential},
    },
    secrets::{SecretCache, SecretStore, extract_credential, normalize_secret},
};

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(
        &self,
        reference: &CredentialRef,
        backend: &BackendProfile,
    ) -> Result<ResolvedCredential, GatewayError>;
}

/// Resolves env, inline and secret-store credentials.
///
/// Without a secret store, `secret` references only succeed through their
/// `env_fallback` variable.
#[derive(Default, Clone)]
pub struct DefaultCredentialProvider {
    secrets: Option<(Arc<dyn SecretStore>, Arc<SecretCache>)>,
}

impl DefaultCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret_store(store: Arc<dyn SecretStore>, cache: Arc<SecretCache>) -> Self {
        Self {
            secrets: Some((store, cache)),
        }
    }

    async fn resolve_secret(&self, name: &str) -> Result<String, String> {
        let Some((store, cache)) = &self.secrets else {
            return Err("no secret store configured".to_string());
        };

        cache
            .get_or_fetch(name, || async {
                let raw = store.fetch(name).await?;
                extract_credential(name, &raw)
            })
            .await
            .map_err(|err| err.to_string())
    }
}

#[async_trait]
impl CredentialProvider for DefaultCredentialProvider {
    async fn resolve(
        &self,
        reference: &CredentialRef,
        backend: &BackendProfile,
    ) -> Result<ResolvedCredential, GatewayError> {
        match reference {
            CredentialRef::Env { var } => {
                let token = read_env_token(var).ok_or_else(|| {
                    missing_credential(
                        backend,
                        format!(
                            "missing credential environment variable {} for backend {}",
                            var, backend.id
                        ),
                    )
                })?;
                Ok(ResolvedCredential::Bearer(token))
            }
            CredentialRef::InlineToken { token } => {
                let token = normalize_secret(token);
                if token.is_empty() {
                    return Err(GatewayError::invalid_request("inline credential token cannot be empty"));
                }
                Ok(ResolvedCredential::Bearer(token))
            }
            CredentialRef::Secret { name, env_fallback } => {
                match self.resolve_secret(name).await {
                    Ok(token) => Ok(ResolvedCredential::Bearer(token)),
                    Err(reason) => {
                        tracing::warn!(
                            target: "secrets",
                            name = %name,
                            backend_id = %backend.id,
                            env_fallback = env_fallback.as_deref().unwrap_or("-"),
                            reason = %reason,
                            "secret_resolution_failed"
                        );
                        let token = env_fallback
                            .as_deref()
                            .and_then(read_env_token)
                            .ok_or_else(|| {
                                missing_credential(
                                    backend,
                                    format!(
                                        "failed to retrieve secret {} for backend {}: {}",
                                        name, backend.id, reason
                                    ),
                                )
                            })?;
                        Ok(ResolvedCredential::Bearer(token))
                    }
                }
            }
            CredentialRef::None => Ok(ResolvedCredential::Anonymous),
        }
    }
}

fn read_env_token(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|raw| normalize_secret(&raw))
        .filter(|token| !token.is_empty())
}

fn missing_credential(backend: &BackendProfile, message: String) -> GatewayError {
    GatewayError::new(GatewayErrorKind::Authentication, message).with_backend_id(&backend.id)
}
