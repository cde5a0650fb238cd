use mathsage::tutor::{
    classifier::fallback_classify,
    strategy::{select_strategy, select_strategy_for_label, strategy_config, strategy_for_state},
    types::{HintLevel, QuestionStyle, StrategyName, StudentState, Tone},
};

use crate::support::{context_with_turns, dont_know_transcript};

#[test]
fn every_state_maps_to_its_strategy() {
    let expected = [
        (StudentState::KnowledgeGap, StrategyName::MethodDiscovery),
        (StudentState::Stuck, StrategyName::ProgressiveHints),
        (StudentState::Confused, StrategyName::ClarificationFirst),
        (StudentState::MakingProgress, StrategyName::EncouragementChallenge),
        (StudentState::Frustrated, StrategyName::EmpathySimplification),
        (StudentState::ReadyToLearn, StrategyName::DeepExploration),
    ];

    for (state, name) in expected {
        assert_eq!(strategy_for_state(state), name, "{state}");
    }
}

#[test]
fn stuck_hints_escalate_at_turn_three() {
    let early = select_strategy_for_label("stuck", &context_with_turns(2));
    assert_eq!(early.name, StrategyName::ProgressiveHints);
    assert_eq!(early.hint_level, HintLevel::Subtle);
    assert_eq!(early.question_style, QuestionStyle::Probing);
    assert_eq!(early.tone, Tone::Supportive);

    let later = select_strategy_for_label("stuck", &context_with_turns(3));
    assert_eq!(later.hint_level, HintLevel::Moderate);
    assert!(later.instructions.contains("turn 3 - use moderate hints"), "{}", later.instructions);
}

#[test]
fn labels_are_case_insensitive_and_unknown_labels_explore() {
    let upper = select_strategy_for_label("STUCK", &context_with_turns(1));
    assert_eq!(upper.name, StrategyName::ProgressiveHints);

    let unknown = select_strategy_for_label("bored", &context_with_turns(1));
    assert_eq!(unknown.name, StrategyName::DeepExploration);
    assert_eq!(unknown.hint_level, HintLevel::Subtle);
    assert_eq!(unknown.question_style, QuestionStyle::Discovery);
}

#[test]
fn frustrated_students_get_concrete_empathic_help() {
    let detected = fallback_classify(&dont_know_transcript(4));
    let strategy = select_strategy(&detected);

    assert_eq!(strategy.name, StrategyName::EmpathySimplification);
    assert_eq!(strategy.hint_level, HintLevel::Concrete);
    assert_eq!(strategy.question_style, QuestionStyle::Clarifying);
    assert_eq!(strategy.tone, Tone::Empathic);
    assert!(strategy.approach.contains("Acknowledge frustration"));
}

#[test]
fn confused_students_get_no_hints() {
    let strategy = strategy_config(StrategyName::ClarificationFirst, &context_with_turns(5));
    assert_eq!(strategy.hint_level, HintLevel::None);
    assert!(!strategy.instructions.is_empty());
}
