use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use mathsage::{
    ai_gateway::error::{GatewayError, GatewayErrorKind},
    config::{Config, TutorConfig},
    tutor::{
        Tutor,
        error::{CompletionStage, TutorErrorKind},
        testing::ScriptedCompletion,
        types::{ClassificationSource, RegenerationPath, StrategyName, StudentState},
    },
};

use crate::support::{dont_know_transcript, first_turn_transcript, heuristic_only_config};

const GOOD_REPLY: &str = "Let's take it one step at a time. What is being added to 2x?";

fn config_value(default_backend: &str) -> serde_json::Value {
    json!({
        "ai_gateway": {
            "backends": [{
                "id": "local",
                "dialect": "ollama",
                "endpoint": "http://127.0.0.1:11434",
                "credential": { "type": "none" },
                "models": ["llama3.1"]
            }],
            "route_aliases": {
                "default": { "backend_id": default_backend, "model_id": "llama3.1" }
            }
        }
    })
}

#[tokio::test]
async fn repeated_dont_know_gets_empathic_concrete_reply() {
    let port = Arc::new(ScriptedCompletion::new().reply(CompletionStage::Draft, GOOD_REPLY));
    let tutor = Tutor::new(port.clone(), &heuristic_only_config());

    let reply = tutor
        .respond(&dont_know_transcript(4), None, &CancellationToken::new())
        .await
        .expect("reply should be produced");

    assert_eq!(reply.state.state, StudentState::Frustrated);
    assert_eq!(reply.state.source, ClassificationSource::Heuristic);
    assert_eq!(reply.strategy, StrategyName::EmpathySimplification);
    assert_eq!(reply.path, RegenerationPath::None);
    assert_eq!(reply.completion_calls, 1);
    assert_eq!(reply.text, GOOD_REPLY);

    let calls = port.calls();
    assert_eq!(calls.len(), 1);
    let prompt = &calls[0].messages[0].content;
    assert!(prompt.contains("FRUSTRATION ESCALATION RULES:"));
    assert!(prompt.contains("- Hint Level: concrete"));
}

#[tokio::test]
async fn first_turn_with_llm_classification_explores() {
    let port = Arc::new(
        ScriptedCompletion::new()
            .reply(
                CompletionStage::Classification,
                "STATE: ready_to_learn\nCONFIDENCE: 0.9\nEVIDENCE:\n- stated the problem",
            )
            .reply(
                CompletionStage::Draft,
                "What do you think the first step might be?",
            ),
    );
    let tutor = Tutor::new(port.clone(), &TutorConfig::default());

    let reply = tutor
        .respond(
            &first_turn_transcript(),
            Some("Solve: 2x + 5 = 13"),
            &CancellationToken::new(),
        )
        .await
        .expect("reply should be produced");

    assert_eq!(reply.state.source, ClassificationSource::Llm);
    assert_eq!(reply.strategy, StrategyName::DeepExploration);
    assert_eq!(reply.path, RegenerationPath::None);
    assert_eq!(reply.completion_calls, 1);
    assert_eq!(port.calls().len(), 2);

    let draft = &port.calls_for(CompletionStage::Draft)[0];
    assert!(draft.messages[0].content.contains("PROBLEM CONTEXT:\nSolve: 2x + 5 = 13"));
}

#[tokio::test]
async fn classification_failure_still_produces_a_reply() {
    let port = Arc::new(
        ScriptedCompletion::new()
            .fail(
                CompletionStage::Classification,
                GatewayError::new(GatewayErrorKind::ProtocolViolation, "garbage"),
            )
            .reply(CompletionStage::Draft, GOOD_REPLY),
    );
    let tutor = Tutor::new(port, &TutorConfig::default());

    let reply = tutor
        .respond(&dont_know_transcript(4), None, &CancellationToken::new())
        .await
        .expect("heuristics should cover the classification failure");

    assert_eq!(reply.state.source, ClassificationSource::Heuristic);
    assert_eq!(reply.state.state, StudentState::Frustrated);
}

#[tokio::test]
async fn draft_failure_maps_to_user_message() {
    let port = Arc::new(ScriptedCompletion::new().fail(
        CompletionStage::Draft,
        GatewayError::new(GatewayErrorKind::Authentication, "invalid api key"),
    ));
    let tutor = Tutor::new(port, &heuristic_only_config());

    let err = match tutor
        .respond(&first_turn_transcript(), None, &CancellationToken::new())
        .await
    {
        Ok(reply) => panic!("draft failure should surface, got {:?}", reply.text),
        Err(err) => err,
    };

    assert_eq!(err.kind, TutorErrorKind::Auth);
    assert_eq!(err.stage, CompletionStage::Draft);
    assert!(err.user_message().starts_with("Authentication"));
    assert!(err.to_string().starts_with("draft failed:"));
}

#[tokio::test]
async fn cancelled_request_makes_no_calls() {
    let port = Arc::new(ScriptedCompletion::new());
    let tutor = Tutor::new(port.clone(), &TutorConfig::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = match tutor.respond(&first_turn_transcript(), None, &cancel).await {
        Ok(reply) => panic!("cancelled request should fail, got {:?}", reply.text),
        Err(err) => err,
    };

    assert_eq!(err.kind, TutorErrorKind::Cancelled);
    assert!(port.calls().is_empty());
}

#[tokio::test]
async fn reply_serializes_with_snake_case_labels() {
    let port = Arc::new(ScriptedCompletion::new().reply(CompletionStage::Draft, GOOD_REPLY));
    let tutor = Tutor::new(port, &heuristic_only_config());

    let reply = tutor
        .respond(&first_turn_transcript(), None, &CancellationToken::new())
        .await
        .expect("reply should be produced");
    let value = serde_json::to_value(&reply).expect("reply should serialize");

    assert_eq!(value["path"], json!("none"));
    assert_eq!(value["strategy"], json!("deep_exploration"));
    assert_eq!(value["state"]["state"], json!("ready_to_learn"));
    assert_eq!(value["completion_calls"], json!(1));
}

#[test]
fn tutor_is_wired_from_config() {
    let config: Config =
        serde_json::from_value(config_value("local")).expect("config should deserialize");
    assert!(Tutor::from_config(&config).is_ok());

    let broken: Config =
        serde_json::from_value(config_value("missing")).expect("config should deserialize");
    match Tutor::from_config(&broken) {
        Ok(_) => panic!("unknown default backend should be rejected"),
        Err(err) => assert_eq!(err.kind, GatewayErrorKind::InvalidRequest),
    }
}
