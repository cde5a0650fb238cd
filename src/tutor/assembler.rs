use crate::tutor::{
    prompts,
    types::{
        DetectedState, HintLevel, Message, QuestionStyle, Role, StrategyConfig, StudentState, Tone,
    },
};

const SUMMARY_WINDOW: usize = 6;
const SUMMARY_CONTENT_CHARS: usize = 150;

/// Builds the system prompt for one reply. Pure; block order is fixed.
pub fn assemble_prompt(
    state: &DetectedState,
    strategy: &StrategyConfig,
    transcript: &[Message],
    problem_context: Option<&str>,
) -> String {
    [
        prompts::base_tutor_rules(),
        context_block(state, strategy),
        adaptive_instructions(state, strategy),
        conversation_block(transcript, problem_context),
        prompts::closing_reminder().to_string(),
    ]
    .join("\n\n")
}

fn context_block(state: &DetectedState, strategy: &StrategyConfig) -> String {
    let mut lines = vec![
        "CURRENT CONTEXT:".to_string(),
        format!(
            "- Student State: {} (confidence: {}%)",
            state.state,
            (state.confidence * 100.0).round() as i64
        ),
        format!("- Evidence: {}", state.evidence.join("; ")),
        format!("- Turn Count: {}", state.context.turn_count),
        format!(
            "- Student Sentiment: {}",
            state.context.student_sentiment.as_str()
        ),
    ];
    if let Some(problem_type) = state.context.problem_type {
        lines.push(format!("- Problem Type: {}", problem_type.as_str()));
    }

    lines.extend([
        String::new(),
        "SELECTED STRATEGY:".to_string(),
        format!("- Strategy: {}", strategy.name),
        format!("- Approach: {}", strategy.approach),
        format!("- Hint Level: {}", strategy.hint_level.as_str()),
        format!("- Question Style: {}", strategy.question_style.as_str()),
        format!("- Tone: {}", strategy.tone.as_str()),
    ]);
    lines.join("\n")
}

fn adaptive_instructions(state: &DetectedState, strategy: &StrategyConfig) -> String {
    let mut sections = vec![format!(
        "ADAPTIVE INSTRUCTIONS FOR THIS SITUATION:\n{}",
        strategy.instructions
    )];

    match state.state {
        StudentState::KnowledgeGap => {
            sections.push(prompts::knowledge_gap_continuity_block().to_string());
        }
        StudentState::Frustrated => {
            let help_requests = state
                .evidence
                .iter()
                .map(|item| item.to_lowercase())
                .filter(|item| item.contains("don't know") || item.contains("tell me"))
                .count();
            sections.push(prompts::frustration_escalation_block(
                state.context.turn_count,
                help_requests,
            ));
        }
        _ => {}
    }

    sections.push(format!(
        "RESPONSE REQUIREMENTS:\n- Hint Level: {}\n- Question Style: {}\n- Tone: {}",
        describe_hint_level(strategy.hint_level),
        describe_question_style(strategy.question_style),
        describe_tone(strategy.tone),
    ));
    sections.join("\n\n")
}

fn describe_hint_level(level: HintLevel) -> &'static str {
    match level {
        HintLevel::None => "No hints yet, just clarifying questions",
        HintLevel::Subtle => "Very subtle hints that guide thinking",
        HintLevel::Moderate => "Moderate hints that point in the right direction",
        HintLevel::Concrete => "Concrete hints that break down into smaller steps",
    }
}

fn describe_question_style(style: QuestionStyle) -> &'static str {
    match style {
        QuestionStyle::Discovery => "Discovery questions that help students explore",
        QuestionStyle::Probing => "Probing questions to understand where they're stuck",
        QuestionStyle::Clarifying => "Clarifying questions to ensure understanding",
        QuestionStyle::Challenging => "Challenging questions that push thinking forward",
    }
}

fn describe_tone(tone: Tone) -> &'static str {
    match tone {
        Tone::Encouraging => "Warm, encouraging, celebrating effort",
        Tone::Supportive => "Supportive, patient, understanding",
        Tone::Challenging => "Challenging but supportive, pushing thinking",
        Tone::Empathic => "Empathic, understanding, normalizing struggle",
    }
}

fn conversation_block(transcript: &[Message], problem_context: Option<&str>) -> String {
    let mut block = format!(
        "CONVERSATION CONTEXT:\n{}",
        summarize_recent_conversation(transcript)
    );
    if let Some(problem) = problem_context {
        block.push_str("\n\nPROBLEM CONTEXT:\n");
        block.push_str(problem);
    }
    block
}

pub fn summarize_recent_conversation(transcript: &[Message]) -> String {
    let recent = &transcript[transcript.len().saturating_sub(SUMMARY_WINDOW)..];
    if recent.is_empty() {
        return "This is the beginning of the conversation.".to_string();
    }

    let lines = recent
        .iter()
        .enumerate()
        .map(|(index, message)| {
            let speaker = match message.role {
                Role::User => "Student",
                Role::Assistant | Role::System => "Tutor",
            };
            format!(
                "{}. {}: {}",
                index + 1,
                speaker,
                truncate_chars(&message.content, SUMMARY_CONTENT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("Recent conversation:\n{}", lines)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
