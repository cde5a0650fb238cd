use crate::tutor::{
    prompts,
    types::{
        ConversationContext, DetectedState, HintLevel, QuestionStyle, StrategyConfig, StrategyName,
        StudentState, Tone,
    },
};

/// Turn count at which stuck students move from subtle to moderate hints.
const HINT_ESCALATION_TURN: usize = 3;

pub fn strategy_for_state(state: StudentState) -> StrategyName {
    match state {
        StudentState::KnowledgeGap => StrategyName::MethodDiscovery,
        StudentState::Stuck => StrategyName::ProgressiveHints,
        StudentState::Confused => StrategyName::ClarificationFirst,
        StudentState::MakingProgress => StrategyName::EncouragementChallenge,
        StudentState::Frustrated => StrategyName::EmpathySimplification,
        StudentState::ReadyToLearn => StrategyName::DeepExploration,
    }
}

pub fn select_strategy(detected: &DetectedState) -> StrategyConfig {
    strategy_config(strategy_for_state(detected.state), &detected.context)
}

/// Resolves a raw state label; unknown labels get `deep_exploration`.
pub fn select_strategy_for_label(label: &str, context: &ConversationContext) -> StrategyConfig {
    let name = StudentState::from_label(label)
        .map(strategy_for_state)
        .unwrap_or(StrategyName::DeepExploration);
    strategy_config(name, context)
}

pub fn strategy_config(name: StrategyName, context: &ConversationContext) -> StrategyConfig {
    let (instructions, hint_level, question_style, tone) = match name {
        StrategyName::MethodDiscovery => (
            prompts::method_discovery_instructions().to_string(),
            HintLevel::Subtle,
            QuestionStyle::Discovery,
            Tone::Encouraging,
        ),
        StrategyName::ProgressiveHints => {
            let hint_level = progressive_hint_level(context.turn_count);
            (
                prompts::progressive_hints_instructions(context.turn_count, hint_level.as_str()),
                hint_level,
                QuestionStyle::Probing,
                Tone::Supportive,
            )
        }
        StrategyName::ClarificationFirst => (
            prompts::clarification_first_instructions().to_string(),
            HintLevel::None,
            QuestionStyle::Clarifying,
            Tone::Supportive,
        ),
        StrategyName::EncouragementChallenge => (
            prompts::encouragement_challenge_instructions().to_string(),
            HintLevel::Subtle,
            QuestionStyle::Challenging,
            Tone::Encouraging,
        ),
        StrategyName::EmpathySimplification => (
            prompts::empathy_simplification_instructions().to_string(),
            HintLevel::Concrete,
            QuestionStyle::Clarifying,
            Tone::Empathic,
        ),
        StrategyName::DeepExploration => (
            prompts::deep_exploration_instructions().to_string(),
            HintLevel::Subtle,
            QuestionStyle::Discovery,
            Tone::Encouraging,
        ),
    };

    StrategyConfig {
        name,
        approach: prompts::strategy_approach(name).to_string(),
        instructions,
        hint_level,
        question_style,
        tone,
    }
}

fn progressive_hint_level(turn_count: usize) -> HintLevel {
    if turn_count >= HINT_ESCALATION_TURN {
        HintLevel::Moderate
    } else {
        HintLevel::Subtle
    }
}
