//! Deterministic feedback on a student's written work.
//!
//! Which steps are wrong is decided by the caller; this module splits the
//! work into steps, classifies each flagged step and phrases guidance.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Calculation,
    Conceptual,
    Procedural,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAnalysis {
    pub steps: Vec<String>,
    /// 1-based index of the first incorrect step.
    pub error_step: Option<usize>,
    pub correct_steps: Vec<usize>,
    pub incorrect_steps: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub error_type: ErrorType,
    /// 1-based step number.
    pub step: usize,
    pub location: String,
    pub misconception: Option<String>,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackAnalysis {
    pub has_error: bool,
    pub error_analyses: Vec<ErrorAnalysis>,
    pub misconception: Option<String>,
    pub guidance: String,
    pub encouragement: String,
    pub next_steps: Vec<String>,
}

static NUMBERED_STEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+[.)]\s*[^\d]+").expect("valid regex"));
static STEP_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s*").expect("valid regex"));

static CALCULATION_LOCATION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d+\s*[+\-*/]\s*\d+\s*=\s*\d+",
        r"calculation|arithmetic|compute|calculate",
        r"\b\d+\s*[+\-*/=]",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});
static CONCEPTUAL_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"concept|understand|meaning|definition|principle").expect("valid regex")
});
static CONCEPTUAL_RESPONSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"doesn't make sense|confused|wrong idea").expect("valid regex")
});
static PROCEDURAL_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"method|approach|procedure|process|steps|algorithm").expect("valid regex")
});
static PROCEDURAL_RESPONSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"wrong way|incorrect method|should use").expect("valid regex")
});

static MISCONCEPTIONS: LazyLock<Vec<(&'static str, Vec<Regex>)>> = LazyLock::new(|| {
    let table: [(&'static str, &[&str]); 4] = [
        (
            "negative-signs",
            &[r"(?i)negative.*negative.*positive", r"-.*-.*\+", r"(?i)subtracting.*negative"],
        ),
        (
            "order-of-operations",
            &[r"(?i)left.*right", r"(?i)order.*operations", r"(?i)pemdas", r"(?i)bodmas"],
        ),
        (
            "fractions",
            &[r"(?i)add.*numerator.*denominator", r"(?i)multiply.*fractions"],
        ),
        ("equations", &[r"(?i)move.*side", r"(?i)change.*sign"]),
    ];
    table
        .into_iter()
        .map(|(name, patterns)| {
            (
                name,
                patterns
                    .iter()
                    .map(|pattern| Regex::new(pattern).expect("valid regex"))
                    .collect(),
            )
        })
        .collect()
});

const ENCOURAGEMENTS: [&str; 4] = [
    "Don't worry - mistakes help us learn! Let's work through this together.",
    "You're on the right track! Let's figure this out step by step.",
    "Great effort! Every mistake is a learning opportunity.",
    "I appreciate your persistence! Let's tackle this together.",
];

/// Splits work into numbered items, then lines, then a single step.
pub fn parse_steps(response: &str) -> Vec<String> {
    let numbered = NUMBERED_STEP
        .find_iter(response)
        .map(|found| STEP_NUMBER.replace(found.as_str(), "").trim().to_string())
        .collect::<Vec<_>>();
    if numbered.len() > 1 {
        return numbered;
    }

    let lines = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if lines.len() > 1 {
        return lines;
    }

    vec![response.trim().to_string()]
}

pub fn analyze_steps(student_response: &str, incorrect_steps: &[usize]) -> StepAnalysis {
    let steps = parse_steps(student_response);
    let mut incorrect = incorrect_steps
        .iter()
        .copied()
        .filter(|index| *index < steps.len())
        .collect::<Vec<_>>();
    incorrect.sort_unstable();
    incorrect.dedup();
    let correct = (0..steps.len())
        .filter(|index| !incorrect.contains(index))
        .collect();

    StepAnalysis {
        error_step: incorrect.first().map(|index| index + 1),
        steps,
        correct_steps: correct,
        incorrect_steps: incorrect,
    }
}

pub fn classify_error(error_location: &str, student_response: &str) -> ErrorType {
    let location = error_location.to_lowercase();
    let response = student_response.to_lowercase();

    if CALCULATION_LOCATION
        .iter()
        .any(|pattern| pattern.is_match(&location))
    {
        ErrorType::Calculation
    } else if CONCEPTUAL_LOCATION.is_match(&location) || CONCEPTUAL_RESPONSE.is_match(&response) {
        ErrorType::Conceptual
    } else if PROCEDURAL_LOCATION.is_match(&location) || PROCEDURAL_RESPONSE.is_match(&response) {
        ErrorType::Procedural
    } else {
        ErrorType::Unknown
    }
}

pub fn detect_misconception(error_location: &str, student_response: &str) -> Option<String> {
    MISCONCEPTIONS
        .iter()
        .find(|(_, patterns)| {
            patterns
                .iter()
                .any(|pattern| pattern.is_match(student_response) || pattern.is_match(error_location))
        })
        .map(|(name, _)| name.to_string())
}

/// `incorrect_steps` are 0-based indices into the parsed steps.
pub fn analyze_feedback(
    student_response: &str,
    problem_context: &str,
    incorrect_steps: &[usize],
) -> FeedbackAnalysis {
    let step_analysis = analyze_steps(student_response, incorrect_steps);

    let error_analyses = step_analysis
        .incorrect_steps
        .iter()
        .map(|&index| {
            let location = step_analysis.steps[index].clone();
            ErrorAnalysis {
                error_type: classify_error(&location, student_response),
                step: index + 1,
                misconception: detect_misconception(&location, student_response),
                reasoning: format!("Error detected in step {}", index + 1),
                location,
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        target: "tutor",
        steps = step_analysis.steps.len(),
        errors = error_analyses.len(),
        problem_chars = problem_context.chars().count(),
        "feedback_analyzed"
    );

    let primary = error_analyses.first();
    FeedbackAnalysis {
        has_error: primary.is_some(),
        misconception: primary.and_then(|error| error.misconception.clone()),
        guidance: guidance(primary).to_string(),
        encouragement: encouragement(error_analyses.len()).to_string(),
        next_steps: next_steps(primary),
        error_analyses,
    }
}

fn guidance(primary: Option<&ErrorAnalysis>) -> &'static str {
    match primary.map(|error| error.error_type) {
        None => "Great work! You're on the right track.",
        Some(ErrorType::Calculation) => {
            "I notice there might be a calculation error. Let's check your arithmetic step by step. What operation are you performing here?"
        }
        Some(ErrorType::Conceptual) => {
            "It looks like there might be a misunderstanding of the concept. Let's think about what this problem is really asking. Can you explain what you understand so far?"
        }
        Some(ErrorType::Procedural) => {
            "Your approach might need adjustment. Let's think about what method would work best here. What strategies have you learned for this type of problem?"
        }
        Some(ErrorType::Unknown) => {
            "Let's review this step together. Can you walk me through what you're thinking?"
        }
    }
}

fn encouragement(error_count: usize) -> &'static str {
    if error_count == 0 {
        return "Excellent thinking! You're making great progress.";
    }
    ENCOURAGEMENTS[(error_count - 1) % ENCOURAGEMENTS.len()]
}

fn next_steps(primary: Option<&ErrorAnalysis>) -> Vec<String> {
    let Some(primary) = primary else {
        return [
            "Continue with the next step",
            "Review your work",
            "Check your final answer",
        ]
        .map(String::from)
        .to_vec();
    };

    let mut steps = match primary.error_type {
        ErrorType::Calculation => vec![
            "Double-check your arithmetic",
            "Review the operation you're performing",
            "Verify each calculation step",
        ],
        ErrorType::Conceptual => vec![
            "Review the core concept",
            "Think about what the problem is asking",
            "Consider similar problems you've solved",
        ],
        ErrorType::Procedural => vec![
            "Consider alternative approaches",
            "Review the steps you've learned",
            "Think about what method fits this problem",
        ],
        ErrorType::Unknown => Vec::new(),
    }
    .into_iter()
    .map(String::from)
    .collect::<Vec<_>>();

    if let Some(misconception) = &primary.misconception {
        steps.push(format!("Address the misconception: {}", misconception));
    }
    steps
}
