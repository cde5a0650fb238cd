use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ClassifierConfig,
    tutor::{
        error::CompletionStage,
        ports::{CompletionPort, CompletionRequest},
        prompts,
        types::{
            ClassificationSource, ConversationContext, DetectedState, Message, ProblemType, Role,
            Sentiment, StudentState,
        },
    },
};

const ANALYSIS_WINDOW: usize = 6;
const ANALYSIS_CONTENT_CHARS: usize = 200;
const ERROR_WINDOW: usize = 5;
const FRUSTRATION_WINDOW: usize = 3;
const DEFAULT_CONFIDENCE: f64 = 0.7;
const NO_EVIDENCE: &str = "No specific evidence provided";

static DONT_KNOW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"don'?t know|dont know|not sure|no idea").expect("valid regex"));
static TELL_ME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"tell me|just tell|please tell").expect("valid regex"));
static NEGATIVE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:can't|too hard|impossible|frustrat\w*|don't understand|stuck|not sure|",
        r"don't know|dont know|tell me|just tell|please tell|give me|no idea|give up)\b"
    ))
    .expect("valid regex")
});
static POSITIVE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:great|thanks|yes|got it|understand|makes sense|i see|ah)\b")
        .expect("valid regex")
});

static STATE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[\s*_#>-]*STATE[*_]*:[*_\s]*(\w+)").expect("valid regex"));
static CONFIDENCE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s*_#>-]*CONFIDENCE[*_]*:[*_\s]*([0-9.]+)").expect("valid regex")
});
static EVIDENCE_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ims)^[\s*_#>-]*EVIDENCE[*_]*:[*_]*(.*)").expect("valid regex")
});
static LABELLED_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s*_#>-]*(?:STATE|CONFIDENCE|EVIDENCE)[*_]*:").expect("valid regex")
});
static BULLET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*•]+|\d+[.)])\s*").expect("valid regex"));

/// Lowercases and folds typographic apostrophes into ASCII ones.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

pub fn detect_sentiment(message: &str) -> Sentiment {
    let message = normalize_text(message);

    if DONT_KNOW.find_iter(&message).count() >= 2 || TELL_ME.find_iter(&message).count() >= 2 {
        return Sentiment::Negative;
    }
    if NEGATIVE_WORDS.is_match(&message) {
        return Sentiment::Negative;
    }
    if POSITIVE_WORDS.is_match(&message) {
        return Sentiment::Positive;
    }
    Sentiment::Neutral
}

pub fn detect_problem_type(transcript: &[Message]) -> Option<ProblemType> {
    let all_text = normalize_text(
        &transcript
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    );
    let has_any = |needles: &[&str]| needles.iter().any(|needle| all_text.contains(needle));

    if has_any(&["quadratic", "x²"]) {
        Some(ProblemType::QuadraticEquation)
    } else if has_any(&["linear", "slope"]) {
        Some(ProblemType::LinearEquation)
    } else if has_any(&["area", "perimeter"]) {
        Some(ProblemType::Geometry)
    } else if has_any(&["fraction", "divide"]) {
        Some(ProblemType::Fractions)
    } else {
        None
    }
}

pub fn derive_context(transcript: &[Message]) -> ConversationContext {
    let student_messages = student_messages(transcript);
    let last_student = student_messages.last().copied().unwrap_or_default();

    let recent_errors = transcript[transcript.len().saturating_sub(ERROR_WINDOW)..]
        .iter()
        .filter(|message| {
            message.role == Role::Assistant && message.content.to_lowercase().contains("error")
        })
        .map(|message| message.content.clone())
        .collect();

    ConversationContext {
        turn_count: student_messages.len(),
        problem_type: detect_problem_type(transcript),
        recent_errors,
        student_sentiment: detect_sentiment(last_student),
        conversation_length: transcript.len(),
    }
}

/// Deterministic classification from transcript patterns alone.
pub fn fallback_classify(transcript: &[Message]) -> DetectedState {
    let context = derive_context(transcript);
    classify_with_heuristics(transcript, context)
}

fn classify_with_heuristics(transcript: &[Message], context: ConversationContext) -> DetectedState {
    let students = student_messages(transcript);
    let last = normalize_text(students.last().copied().unwrap_or_default());
    let recent = students[students.len().saturating_sub(FRUSTRATION_WINDOW)..]
        .iter()
        .map(|message| normalize_text(message))
        .collect::<Vec<_>>();
    let previous_tutor = transcript
        .iter()
        .rev()
        .find(|message| message.role == Role::Assistant)
        .map(|message| normalize_text(&message.content))
        .unwrap_or_default();

    let dont_know_count = recent.iter().filter(|m| DONT_KNOW.is_match(m)).count();
    let tell_me_count = recent.iter().filter(|m| TELL_ME.is_match(m)).count();
    let contains_any = |needles: &[&str]| needles.iter().any(|needle| last.contains(needle));

    let state = |state, confidence, evidence: Vec<String>| DetectedState {
        state,
        confidence,
        evidence,
        context: context.clone(),
        source: ClassificationSource::Heuristic,
    };

    let explicit_frustration =
        contains_any(&["frustrated", "frustrating", "tell me now", "just tell"]);
    let repeated_requests =
        context.turn_count >= 3 && (dont_know_count >= 2 || tell_me_count >= 2);
    let prolonged_negativity =
        context.turn_count >= 4 && context.student_sentiment == Sentiment::Negative;
    if explicit_frustration || repeated_requests || prolonged_negativity {
        return state(
            StudentState::Frustrated,
            0.85,
            vec![
                format!("Turn count: {}", context.turn_count),
                format!(
                    "Multiple \"I don't know\" or \"tell me\" requests: {}",
                    dont_know_count + tell_me_count
                ),
                format!("Sentiment: {}", context.student_sentiment.as_str()),
            ],
        );
    }

    let simple_no = matches!(last.trim(), "no" | "nope" | "not really");
    let asked_about_knowledge = [
        "do you remember",
        "do you know",
        "are you familiar",
        "have you learned",
        "recall",
    ]
    .iter()
    .any(|probe| previous_tutor.contains(probe));
    if simple_no && asked_about_knowledge {
        return state(
            StudentState::KnowledgeGap,
            0.85,
            vec!["Student responded \"no\" to knowledge question".to_string()],
        );
    }

    if contains_any(&[
        "don't know",
        "dont know",
        "not aware",
        "no idea",
        "not sure",
        "i don't remember",
    ]) {
        if context.turn_count >= 3 {
            return state(
                StudentState::Frustrated,
                0.75,
                vec!["Multiple turns with \"I don't know\" responses".to_string()],
            );
        }
        return state(
            StudentState::KnowledgeGap,
            0.8,
            vec!["Student expressed lack of knowledge".to_string()],
        );
    }

    if contains_any(&["stuck", "can't proceed"]) {
        return state(
            StudentState::Stuck,
            0.8,
            vec!["Student expressed being stuck".to_string()],
        );
    }

    if contains_any(&["don't understand", "confused"]) {
        return state(
            StudentState::Confused,
            0.8,
            vec!["Student expressed confusion".to_string()],
        );
    }

    state(
        StudentState::ReadyToLearn,
        0.6,
        vec!["No specific indicators detected".to_string()],
    )
}

/// Parses a `STATE:` / `CONFIDENCE:` / `EVIDENCE:` analysis, coercing bad values.
pub fn parse_state_analysis(analysis: &str, context: ConversationContext) -> DetectedState {
    let state = STATE_LINE
        .captures(analysis)
        .and_then(|caps| StudentState::from_label(&caps[1]))
        .unwrap_or(StudentState::ReadyToLearn);

    let confidence = CONFIDENCE_LINE
        .captures(analysis)
        .and_then(|caps| caps[1].trim_end_matches('.').parse::<f64>().ok())
        .filter(|value| !value.is_nan())
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);

    // The section ends at the first blank line or the next labelled field.
    let mut evidence = EVIDENCE_SECTION
        .captures(analysis)
        .map(|caps| {
            caps[1]
                .trim_start()
                .lines()
                .map(str::trim)
                .take_while(|line| !line.is_empty() && !LABELLED_FIELD.is_match(line))
                .map(|line| BULLET_PREFIX.replace(line, "").trim().to_string())
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    if evidence.is_empty() {
        evidence.push(NO_EVIDENCE.to_string());
    }

    DetectedState {
        state,
        confidence,
        evidence,
        context,
        source: ClassificationSource::Llm,
    }
}

#[derive(Serialize)]
struct AnalysisMessage {
    role: Role,
    content: String,
}

pub fn build_analysis_prompt(
    transcript: &[Message],
    problem_context: Option<&str>,
    context: &ConversationContext,
) -> String {
    let recent = transcript[transcript.len().saturating_sub(ANALYSIS_WINDOW)..]
        .iter()
        .map(|message| AnalysisMessage {
            role: message.role,
            content: message.content.chars().take(ANALYSIS_CONTENT_CHARS).collect(),
        })
        .collect::<Vec<_>>();
    let recent_json = serde_json::to_string_pretty(&recent).unwrap_or_else(|_| "[]".to_string());

    prompts::build_state_analysis_prompt(
        context.turn_count,
        context.conversation_length,
        context.student_sentiment.as_str(),
        context.problem_type.map(ProblemType::as_str),
        &recent_json,
        problem_context,
    )
}

pub struct StateClassifier {
    port: Arc<dyn CompletionPort>,
    config: ClassifierConfig,
}

impl StateClassifier {
    pub fn new(port: Arc<dyn CompletionPort>, config: ClassifierConfig) -> Self {
        Self { port, config }
    }

    /// Classifies the transcript. Never fails: completion errors and
    /// cancellation fall back to the heuristic path.
    pub async fn classify(
        &self,
        transcript: &[Message],
        problem_context: Option<&str>,
        cancel: &CancellationToken,
    ) -> DetectedState {
        let context = derive_context(transcript);
        if !self.config.llm_assisted {
            return classify_with_heuristics(transcript, context);
        }

        let request = CompletionRequest {
            stage: CompletionStage::Classification,
            messages: vec![
                Message::system(prompts::state_analyst_system_prompt()),
                Message::user(build_analysis_prompt(transcript, problem_context, &context)),
            ],
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            result = self.port.complete(request) => Some(result),
        };

        match outcome {
            Some(Ok(analysis)) => parse_state_analysis(&analysis, context),
            Some(Err(err)) => {
                tracing::warn!(
                    target: "tutor",
                    error_kind = ?err.kind,
                    error = %err,
                    "state_classification_fell_back"
                );
                classify_with_heuristics(transcript, context)
            }
            None => {
                tracing::debug!(target: "tutor", "state_classification_cancelled");
                classify_with_heuristics(transcript, context)
            }
        }
    }
}

fn student_messages(transcript: &[Message]) -> Vec<&str> {
    transcript
        .iter()
        .filter(|message| message.role == Role::User)
        .map(|message| message.content.as_str())
        .collect()
}
