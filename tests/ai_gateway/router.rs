use mathsage::ai_gateway::{
    error::GatewayErrorKind,
    router::BackendRouter,
    types::{BackendDialect, ReliabilityConfig},
};

use crate::support::{backend, canonical_request, gateway_config, target};

#[test]
fn given_no_route_when_selecting_then_default_alias_is_used() {
    let router = BackendRouter::new(&gateway_config(ReliabilityConfig::default()))
        .expect("router should build");

    let selected = router
        .select(&canonical_request(None))
        .expect("default alias should resolve");
    assert_eq!(selected.backend_id, "primary");
    assert_eq!(selected.resolved_model, "m1");
    assert_eq!(selected.profile.dialect, BackendDialect::OpenAiCompatible);
}

#[test]
fn given_blank_route_when_selecting_then_default_alias_is_used() {
    let router = BackendRouter::new(&gateway_config(ReliabilityConfig::default()))
        .expect("router should build");

    let selected = router
        .select(&canonical_request(Some("   ")))
        .expect("blank route falls back to default");
    assert_eq!(selected.backend_id, "primary");
}

#[test]
fn given_alias_or_direct_route_when_selecting_then_target_is_resolved() {
    let router = BackendRouter::new(&gateway_config(ReliabilityConfig::default()))
        .expect("router should build");

    let via_alias = router
        .select(&canonical_request(Some("offline")))
        .expect("alias should resolve");
    assert_eq!(via_alias.backend_id, "local");
    assert_eq!(via_alias.resolved_model, "llama3");

    let direct = router
        .select(&canonical_request(Some("local/llama3")))
        .expect("direct route should resolve");
    assert_eq!(direct.backend_id, "local");
    assert_eq!(direct.profile.dialect, BackendDialect::Ollama);
}

#[test]
fn given_unknown_targets_when_selecting_then_invalid_request_is_returned() {
    let router = BackendRouter::new(&gateway_config(ReliabilityConfig::default()))
        .expect("router should build");

    for route in ["unknown-alias", "ghost/m1", "primary/not-declared", "primary/"] {
        let err = router
            .select(&canonical_request(Some(route)))
            .expect_err("route should be rejected");
        assert_eq!(err.kind, GatewayErrorKind::InvalidRequest, "route {route}");
    }
}

#[test]
fn given_config_without_default_alias_when_building_then_error_is_returned() {
    let mut config = gateway_config(ReliabilityConfig::default());
    config.route_aliases.remove("default");

    let err = match BackendRouter::new(&config) {
        Ok(_) => panic!("missing default alias should fail"),
        Err(err) => err,
    };
    assert!(err.message.contains("'default'"), "{err}");
}

#[test]
fn given_invalid_backends_when_building_then_errors_name_the_problem() {
    let mut duplicate = gateway_config(ReliabilityConfig::default());
    duplicate.backends.push(backend(
        "primary",
        BackendDialect::OpenAiCompatible,
        None,
        "m1",
    ));
    let err = BackendRouter::new(&duplicate).err().expect("duplicate id");
    assert!(err.message.contains("duplicate backend id"), "{err}");

    let mut no_models = gateway_config(ReliabilityConfig::default());
    no_models.backends[1].models.clear();
    let err = BackendRouter::new(&no_models).err().expect("empty models");
    assert!(err.message.contains("at least one model"), "{err}");

    let mut dangling = gateway_config(ReliabilityConfig::default());
    dangling
        .route_aliases
        .insert("fast".to_string(), target("primary", "m9"));
    let err = BackendRouter::new(&dangling).err().expect("unknown model");
    assert!(err.message.contains("unknown model 'm9'"), "{err}");

    let mut empty = gateway_config(ReliabilityConfig::default());
    empty.backends.clear();
    let err = BackendRouter::new(&empty).err().expect("no backends");
    assert_eq!(err.kind, GatewayErrorKind::InvalidRequest);
}
