use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One transcript entry. Extra fields such as `id` or `timestamp` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentState {
    KnowledgeGap,
    Stuck,
    Confused,
    MakingProgress,
    Frustrated,
    ReadyToLearn,
}

impl StudentState {
    pub const ALL: [StudentState; 6] = [
        StudentState::KnowledgeGap,
        StudentState::Stuck,
        StudentState::Confused,
        StudentState::MakingProgress,
        StudentState::Frustrated,
        StudentState::ReadyToLearn,
    ];

    /// Exact, case-insensitive label match.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|state| state.as_str() == label)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StudentState::KnowledgeGap => "knowledge_gap",
            StudentState::Stuck => "stuck",
            StudentState::Confused => "confused",
            StudentState::MakingProgress => "making_progress",
            StudentState::Frustrated => "frustrated",
            StudentState::ReadyToLearn => "ready_to_learn",
        }
    }
}

impl fmt::Display for StudentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    QuadraticEquation,
    LinearEquation,
    Geometry,
    Fractions,
}

impl ProblemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProblemType::QuadraticEquation => "quadratic_equation",
            ProblemType::LinearEquation => "linear_equation",
            ProblemType::Geometry => "geometry",
            ProblemType::Fractions => "fractions",
        }
    }
}

/// Facts derived from the transcript for one classification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub turn_count: usize,
    pub problem_type: Option<ProblemType>,
    pub recent_errors: Vec<String>,
    pub student_sentiment: Sentiment,
    pub conversation_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Llm,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedState {
    pub state: StudentState,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub context: ConversationContext,
    pub source: ClassificationSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyName {
    MethodDiscovery,
    ProgressiveHints,
    ClarificationFirst,
    EncouragementChallenge,
    EmpathySimplification,
    DeepExploration,
}

impl StrategyName {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyName::MethodDiscovery => "method_discovery",
            StrategyName::ProgressiveHints => "progressive_hints",
            StrategyName::ClarificationFirst => "clarification_first",
            StrategyName::EncouragementChallenge => "encouragement_challenge",
            StrategyName::EmpathySimplification => "empathy_simplification",
            StrategyName::DeepExploration => "deep_exploration",
        }
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directness of hints, ordered from least to most direct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintLevel {
    None,
    Subtle,
    Moderate,
    Concrete,
}

impl HintLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            HintLevel::None => "none",
            HintLevel::Subtle => "subtle",
            HintLevel::Moderate => "moderate",
            HintLevel::Concrete => "concrete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStyle {
    Discovery,
    Probing,
    Clarifying,
    Challenging,
}

impl QuestionStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionStyle::Discovery => "discovery",
            QuestionStyle::Probing => "probing",
            QuestionStyle::Clarifying => "clarifying",
            QuestionStyle::Challenging => "challenging",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Encouraging,
    Supportive,
    Challenging,
    Empathic,
}

impl Tone {
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Encouraging => "encouraging",
            Tone::Supportive => "supportive",
            Tone::Challenging => "challenging",
            Tone::Empathic => "empathic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: StrategyName,
    pub approach: String,
    pub instructions: String,
    pub hint_level: HintLevel,
    pub question_style: QuestionStyle,
    pub tone: Tone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodViolation {
    DirectAnswer,
    DirectFormula,
    NoGuidingQuestion,
    ImperativeOpening,
}

impl MethodViolation {
    pub fn reason(self) -> &'static str {
        match self {
            MethodViolation::DirectAnswer => "Direct answer detected",
            MethodViolation::DirectFormula => "Direct formula or method stated",
            MethodViolation::NoGuidingQuestion => {
                "No guiding questions found - must use Socratic method"
            }
            MethodViolation::ImperativeOpening => {
                "Imperative statement detected - must ask questions instead"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodCheck {
    pub is_valid: bool,
    pub reason: Option<MethodViolation>,
}

impl MethodCheck {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn violation(reason: MethodViolation) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccuracyCheck {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenerationPath {
    None,
    Accuracy,
    Compliance,
    AccuracyAndCompliance,
}

impl RegenerationPath {
    pub fn from_flags(accuracy: bool, compliance: bool) -> Self {
        match (accuracy, compliance) {
            (false, false) => RegenerationPath::None,
            (true, false) => RegenerationPath::Accuracy,
            (false, true) => RegenerationPath::Compliance,
            (true, true) => RegenerationPath::AccuracyAndCompliance,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RegenerationPath::None => "none",
            RegenerationPath::Accuracy => "accuracy",
            RegenerationPath::Compliance => "compliance",
            RegenerationPath::AccuracyAndCompliance => "accuracy_and_compliance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorReply {
    pub text: String,
    pub path: RegenerationPath,
    pub state: DetectedState,
    pub strategy: StrategyName,
    pub completion_calls: u32,
}

/// Concept catalog entry. Mastery tracking is not implemented yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathConcept {
    pub id: String,
    pub name: String,
    pub category: String,
    pub prerequisites: Vec<String>,
    pub difficulty: u8,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptMastery {
    pub concept_id: String,
    pub mastery: f64,
    pub attempts: u32,
    pub success_rate: f64,
    /// Unix epoch milliseconds.
    pub last_interaction_ms: u64,
    #[serde(default)]
    pub next_review_ms: Option<u64>,
}
