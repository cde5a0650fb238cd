use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use uuid::Uuid;

use mathsage::{
    ai_gateway::{
        credentials::{CredentialProvider, DefaultCredentialProvider},
        error::GatewayErrorKind,
        types::{BackendDialect, CredentialRef, ResolvedCredential},
    },
    secrets::{JsonFileSecretStore, SecretCache},
};

use crate::support::backend;

fn secret_file(contents: &str) -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("mathsage-credentials-test-{}", Uuid::now_v7()));
    fs::create_dir_all(&dir).expect("temp dir should be created");
    let path = dir.join("secrets.json");
    fs::write(&path, contents).expect("secret file should be written");
    (dir, path)
}

fn file_provider(path: &PathBuf) -> DefaultCredentialProvider {
    DefaultCredentialProvider::with_secret_store(
        Arc::new(JsonFileSecretStore::new(path.clone())),
        Arc::new(SecretCache::new(Duration::from_secs(300))),
    )
}

fn secret_ref(name: &str, env_fallback: Option<&str>) -> CredentialRef {
    CredentialRef::Secret {
        name: name.to_string(),
        env_fallback: env_fallback.map(str::to_string),
    }
}

#[tokio::test]
async fn given_secret_object_with_bom_when_resolving_then_bearer_uses_api_key_field() {
    let (dir, path) = secret_file("\u{feff}{\"OPENAI\": {\"apiKey\": \"  sk-from-file \\n\"}}");
    let provider = file_provider(&path);
    let profile = backend("primary", BackendDialect::OpenAiCompatible, None, "m1");

    let credential = provider
        .resolve(&secret_ref("OPENAI", None), &profile)
        .await
        .expect("secret should resolve");
    assert_eq!(credential, ResolvedCredential::Bearer("sk-from-file".to_string()));

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn given_cached_secret_when_store_disappears_then_cached_value_is_reused() {
    let (dir, path) = secret_file(r#"{"OPENAI": "sk-cached"}"#);
    let provider = file_provider(&path);
    let profile = backend("primary", BackendDialect::OpenAiCompatible, None, "m1");

    provider
        .resolve(&secret_ref("OPENAI", None), &profile)
        .await
        .expect("first resolve should hit the store");
    fs::remove_file(&path).expect("secret file should be removed");

    let credential = provider
        .resolve(&secret_ref("OPENAI", None), &profile)
        .await
        .expect("second resolve should hit the cache");
    assert_eq!(credential, ResolvedCredential::Bearer("sk-cached".to_string()));

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn given_missing_secret_with_env_fallback_when_resolving_then_env_token_is_used() {
    let (dir, path) = secret_file(r#"{"OTHER": "unused"}"#);
    let provider = file_provider(&path);
    let profile = backend("primary", BackendDialect::OpenAiCompatible, None, "m1");
    let var = format!("MATHSAGE_TEST_FALLBACK_{}", Uuid::now_v7().simple());
    // SAFETY: the variable name is unique to this test.
    unsafe { std::env::set_var(&var, "sk-from-env") };

    let credential = provider
        .resolve(&secret_ref("OPENAI", Some(&var)), &profile)
        .await
        .expect("env fallback should resolve");
    assert_eq!(credential, ResolvedCredential::Bearer("sk-from-env".to_string()));

    unsafe { std::env::remove_var(&var) };
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn given_missing_secret_without_fallback_when_resolving_then_authentication_error() {
    let (dir, path) = secret_file(r#"{"OTHER": "unused"}"#);
    let provider = file_provider(&path);
    let profile = backend("primary", BackendDialect::OpenAiCompatible, None, "m1");

    let err = provider
        .resolve(&secret_ref("OPENAI", None), &profile)
        .await
        .expect_err("missing secret should fail");
    assert_eq!(err.kind, GatewayErrorKind::Authentication);
    assert_eq!(err.backend_id.as_deref(), Some("primary"));
    assert!(err.message.contains("OPENAI"), "{err}");

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn given_no_secret_store_when_resolving_secret_then_error_mentions_missing_store() {
    let provider = DefaultCredentialProvider::new();
    let profile = backend("primary", BackendDialect::OpenAiCompatible, None, "m1");

    let err = provider
        .resolve(&secret_ref("OPENAI", None), &profile)
        .await
        .expect_err("no store and no fallback should fail");
    assert!(err.message.contains("no secret store configured"), "{err}");
}

#[tokio::test]
async fn given_env_and_inline_references_when_resolving_then_tokens_are_validated() {
    let provider = DefaultCredentialProvider::new();
    let profile = backend("primary", BackendDialect::OpenAiCompatible, None, "m1");

    let missing_var = format!("MATHSAGE_TEST_MISSING_{}", Uuid::now_v7().simple());
    let err = provider
        .resolve(&CredentialRef::Env { var: missing_var }, &profile)
        .await
        .expect_err("unset env var should fail");
    assert_eq!(err.kind, GatewayErrorKind::Authentication);

    let err = provider
        .resolve(
            &CredentialRef::InlineToken {
                token: "   ".to_string(),
            },
            &profile,
        )
        .await
        .expect_err("blank inline token should fail");
    assert_eq!(err.kind, GatewayErrorKind::InvalidRequest);

    let credential = provider
        .resolve(
            &CredentialRef::InlineToken {
                token: "sk-inline".to_string(),
            },
            &profile,
        )
        .await
        .expect("inline token should resolve");
    assert_eq!(credential, ResolvedCredential::Bearer("sk-inline".to_string()));

    let credential = provider
        .resolve(&CredentialRef::None, &profile)
        .await
        .expect("none needs no token");
    assert_eq!(credential, ResolvedCredential::Anonymous);
}
