use mathsage::tutor::{
    assembler::{assemble_prompt, summarize_recent_conversation},
    classifier::{fallback_classify, parse_state_analysis},
    strategy::select_strategy,
    types::Message,
};

use crate::support::{context_with_turns, dont_know_transcript, first_turn_transcript};

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("prompt should contain {needle:?}"))
}

#[test]
fn blocks_appear_in_fixed_order() {
    let transcript = first_turn_transcript();
    let detected = fallback_classify(&transcript);
    let strategy = select_strategy(&detected);

    let prompt = assemble_prompt(&detected, &strategy, &transcript, Some("Solve: 2x + 5 = 13"));

    let order = [
        "ABSOLUTE RULES - NEVER VIOLATE THESE:",
        "CURRENT CONTEXT:",
        "SELECTED STRATEGY:",
        "ADAPTIVE INSTRUCTIONS FOR THIS SITUATION:",
        "RESPONSE REQUIREMENTS:",
        "CONVERSATION CONTEXT:",
        "PROBLEM CONTEXT:",
        "Remember: The goal is deep understanding",
    ];
    let positions = order.map(|needle| position(&prompt, needle));
    assert!(
        positions.windows(2).all(|pair| pair[0] < pair[1]),
        "{positions:?}"
    );
}

#[test]
fn context_block_reports_rounded_confidence_and_strategy() {
    let analysis = "STATE: knowledge_gap\nCONFIDENCE: 0.846\nEVIDENCE:\n- said no";
    let detected = parse_state_analysis(analysis, context_with_turns(2));
    let strategy = select_strategy(&detected);

    let prompt = assemble_prompt(&detected, &strategy, &[], None);

    assert!(prompt.contains("- Student State: knowledge_gap (confidence: 85%)"));
    assert!(prompt.contains("- Evidence: said no"));
    assert!(prompt.contains("- Strategy: method_discovery"));
    assert!(prompt.contains("- Hint Level: subtle"));
    assert!(!prompt.contains("- Problem Type:"));
    assert!(prompt.contains("CRITICAL - CONVERSATION CONTINUITY:"));
    assert!(!prompt.contains("FRUSTRATION ESCALATION RULES:"));
    assert!(!prompt.contains("PROBLEM CONTEXT:"));
}

#[test]
fn frustration_block_counts_help_requests_from_evidence() {
    let transcript = dont_know_transcript(4);
    let detected = fallback_classify(&transcript);
    let strategy = select_strategy(&detected);

    let prompt = assemble_prompt(&detected, &strategy, &transcript, None);

    assert!(prompt.contains("FRUSTRATION ESCALATION RULES:"));
    assert!(prompt.contains("Student has asked for help 1 times"));
    assert!(prompt.contains("After 3+ turns"));
    assert!(prompt.contains("- Hint Level: concrete"));
    assert!(!prompt.contains("CRITICAL - CONVERSATION CONTINUITY:"));
}

#[test]
fn summary_keeps_last_six_messages_truncated() {
    let mut transcript = (1..=7)
        .map(|index| Message::user(format!("note {index}")))
        .collect::<Vec<_>>();
    transcript.push(Message::assistant("y".repeat(200)));

    let summary = summarize_recent_conversation(&transcript);

    assert!(summary.starts_with("Recent conversation:\n"));
    assert!(!summary.contains("note 2"));
    assert!(summary.contains("1. Student: note 3"));
    assert!(summary.contains(&format!("6. Tutor: {}...", "y".repeat(150))));
    assert!(!summary.contains(&"y".repeat(151)));
}

#[test]
fn empty_transcript_is_the_beginning() {
    assert_eq!(
        summarize_recent_conversation(&[]),
        "This is the beginning of the conversation."
    );
}

#[test]
fn assembly_is_deterministic() {
    let transcript = dont_know_transcript(2);
    let detected = fallback_classify(&transcript);
    let strategy = select_strategy(&detected);

    let first = assemble_prompt(&detected, &strategy, &transcript, Some("2x + 5 = 13"));
    let second = assemble_prompt(&detected, &strategy, &transcript, Some("2x + 5 = 13"));
    assert_eq!(first, second);
}
