use std::collections::{BTreeMap, HashMap};

use crate::ai_gateway::{
    error::GatewayError,
    types::{AIGatewayConfig, BackendProfile, CanonicalRequest, DEFAULT_ROUTE_ALIAS, ModelTarget},
};

#[derive(Clone)]
pub struct BackendRouter {
    backends: HashMap<String, BackendProfile>,
    route_aliases: BTreeMap<String, ModelTarget>,
}

#[derive(Debug, Clone)]
pub struct SelectedBackend {
    pub backend_id: String,
    pub profile: BackendProfile,
    pub resolved_model: String,
}

impl BackendRouter {
    pub fn new(config: &AIGatewayConfig) -> Result<Self, GatewayError> {
        if config.backends.is_empty() {
            return Err(GatewayError::invalid_request("ai_gateway.backends must not be empty"));
        }

        let mut backends = HashMap::new();
        for profile in &config.backends {
            if profile.models.is_empty() {
                return Err(GatewayError::invalid_request(format!(
                    "backend '{}' must declare at least one model",
                    profile.id
                )));
            }
            if backends
                .insert(profile.id.clone(), profile.clone())
                .is_some()
            {
                return Err(GatewayError::invalid_request(format!(
                    "duplicate backend id '{}' in ai_gateway.backends",
                    profile.id
                )));
            }
        }

        for (alias, target) in &config.route_aliases {
            let Some(profile) = backends.get(&target.backend_id) else {
                return Err(GatewayError::invalid_request(format!(
                    "route alias '{}' points to unknown backend '{}'",
                    alias, target.backend_id
                )));
            };
            if !profile.serves(&target.model_id) {
                return Err(GatewayError::invalid_request(format!(
                    "route alias '{}' points to unknown model '{}' on backend '{}'",
                    alias, target.model_id, target.backend_id
                )));
            }
        }

        if !config.route_aliases.contains_key(DEFAULT_ROUTE_ALIAS) {
            return Err(GatewayError::invalid_request(format!(
                "ai_gateway.route_aliases must define '{}'",
                DEFAULT_ROUTE_ALIAS
            )));
        }

        Ok(Self {
            backends,
            route_aliases: config.route_aliases.clone(),
        })
    }

    /// Resolves the route hint, which is either an alias or `backend/model`.
    pub fn select(&self, req: &CanonicalRequest) -> Result<SelectedBackend, GatewayError> {
        let route = req
            .route_hint
            .as_deref()
            .map(str::trim)
            .filter(|route| !route.is_empty())
            .unwrap_or(DEFAULT_ROUTE_ALIAS);

        let target = match self.route_aliases.get(route) {
            Some(target) => target.clone(),
            None => parse_direct_route(route)?,
        };

        let profile = self.backends.get(&target.backend_id).ok_or_else(|| {
            GatewayError::invalid_request(format!(
                "selected backend '{}' does not exist",
                target.backend_id
            ))
        })?;

        if !profile.serves(&target.model_id) {
            return Err(GatewayError::invalid_request(format!(
                "model '{}' is not declared for backend '{}'",
                target.model_id, target.backend_id
            )));
        }

        Ok(SelectedBackend {
            backend_id: target.backend_id,
            profile: profile.clone(),
            resolved_model: target.model_id,
        })
    }
}

fn parse_direct_route(route: &str) -> Result<ModelTarget, GatewayError> {
    let Some((backend_id, model_id)) = route.split_once('/') else {
        return Err(GatewayError::invalid_request(format!("unknown route alias '{}'", route)));
    };
    if backend_id.is_empty() || model_id.is_empty() {
        return Err(GatewayError::invalid_request(format!("malformed route '{}'", route)));
    }
    Ok(ModelTarget {
        backend_id: backend_id.to_string(),
        model_id: model_id.to_string(),
    })
}
