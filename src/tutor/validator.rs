//! Policy checks applied to a tutor draft before it is returned.

use std::sync::LazyLock;

use regex::Regex;

use crate::tutor::{
    classifier::normalize_text,
    types::{AccuracyCheck, MethodCheck, MethodViolation},
};

pub const INACCURATE_ANALOGY_SUGGESTION: &str = "Response contains mathematically inaccurate analogies. Use accurate definitions that precisely represent the mathematical concept.";
pub const ACKNOWLEDGE_CORRECTION_SUGGESTION: &str =
    "Student may have pointed out an inaccuracy. Acknowledge and correct it explicitly.";

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("valid regex"))
        .collect()
}

static DIRECT_ANSWER: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"the answer is\s+\d+",
        r"the solution is\s+\d+",
        r"equals\s+\d+\s*$",
        r"the result is\s+\d+",
        r"^x\s*=\s*\d+",
        r"final answer:\s*\d+",
        r"the answer\s+is",
    ])
});

static DIRECT_FORMULA: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"\b(formula|equation|is|equals|multiply|divide|add|subtract)\s+(length|width|height|base|radius|diameter|area|perimeter|volume)\s*(times|by|multiplied|×|\*)",
        r"\barea\s+(of|is|equals)\s+(length|width|height|base|radius|diameter)\s*(times|by|multiplied|×|\*)",
        r"\bperimeter\s+(of|is|equals)\s+.*\s*(times|by|multiplied|×|\*)",
        r"\bvolume\s+(of|is|equals)\s+.*\s*(times|by|multiplied|×|\*)",
        r"\bthe\s+(area|perimeter|volume|formula|equation)\s+is",
        r"\bfound\s+by\s+(multiplying|dividing|adding|subtracting)",
        r"\bmultiply\s+\d+\s+by\s+\d+",
        r"\bdivide\s+\d+\s+by\s+\d+",
        r"\badd\s+\d+\s+and\s+\d+",
        r"\bsubtract\s+\d+\s+from\s+\d+",
        r"\b(recall|remember|think about|do you know)\s+(how|what)\s+(to|we|you)\s+(calculate|find|compute|multiply|divide)",
        r"\bhow\s+(do|might|can)\s+(we|you)\s+(calculate|find|compute|multiply|divide)",
        r"\busing\s+(its|the)\s+(length|width|height|base|radius|diameter)",
    ])
});

static IMPERATIVE_OPENING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(multiply|divide|add|subtract|calculate|compute|find|solve)")
        .expect("valid regex")
});

struct InaccuratePattern {
    pattern: Regex,
    context: Option<Regex>,
    issue: &'static str,
}

static INACCURATE_ANALOGIES: LazyLock<Vec<InaccuratePattern>> = LazyLock::new(|| {
    let entry = |pattern: &str, context: Option<&str>, issue: &'static str| InaccuratePattern {
        pattern: Regex::new(pattern).expect("valid regex"),
        context: context.map(|context| Regex::new(context).expect("valid regex")),
        issue,
    };
    vec![
        entry(
            r"area.*paint|paint.*area",
            None,
            "Area is NOT the amount of paint needed. Area is a measure of 2D space (cm², m²). Paint amount depends on thickness, which is volume (cm³, m³).",
        ),
        entry(
            r"area.*equals.*paint|paint.*equals.*area",
            None,
            "Area ≠ paint needed. Area measures 2D space, not material quantity.",
        ),
        entry(
            r"area.*amount of paint|amount of paint.*area",
            None,
            "Inaccurate: Area measures 2D space, not paint quantity.",
        ),
        entry(
            r"volume.*weight|weight.*volume",
            None,
            "Volume ≠ weight. Volume measures 3D space (cm³), weight measures mass (kg).",
        ),
        entry(
            r"perimeter.*area|area.*perimeter",
            Some(r"confuse|same|equal|like"),
            "Perimeter and area are different concepts. Perimeter is distance around, area is space inside.",
        ),
    ]
});

static CORRECTION_ACKNOWLEDGEMENT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"you're right|you're correct|thank you for|good catch|you caught",
        r"let me correct|i was wrong|that was inaccurate|i made an error",
        r"actually.*area|actually.*volume|actually.*perimeter",
    ])
});

static STUDENT_CORRECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)inaccurate|wrong|not.*equal|not.*same|not.*correct").expect("valid regex")
});

/// Rejects drafts that give away answers or formulas, or that fail to ask.
pub fn check_method_compliance(text: &str) -> MethodCheck {
    let lower = normalize_text(text);

    if DIRECT_ANSWER.iter().any(|pattern| pattern.is_match(&lower)) {
        return MethodCheck::violation(MethodViolation::DirectAnswer);
    }
    if DIRECT_FORMULA.iter().any(|pattern| pattern.is_match(&lower)) {
        return MethodCheck::violation(MethodViolation::DirectFormula);
    }

    let question_count = text.matches('?').count();
    let sentence_count = text.matches(['.', '!', '?']).count();
    if sentence_count > 1 && question_count == 0 {
        return MethodCheck::violation(MethodViolation::NoGuidingQuestion);
    }

    if IMPERATIVE_OPENING.is_match(text.trim()) {
        return MethodCheck::violation(MethodViolation::ImperativeOpening);
    }

    MethodCheck::valid()
}

pub fn acknowledges_correction(text: &str) -> bool {
    let lower = normalize_text(text);
    CORRECTION_ACKNOWLEDGEMENT
        .iter()
        .any(|pattern| pattern.is_match(&lower))
}

pub fn check_accuracy(text: &str) -> AccuracyCheck {
    let lower = normalize_text(text);
    let issues = INACCURATE_ANALOGIES
        .iter()
        .filter(|entry| entry.pattern.is_match(&lower))
        .filter(|entry| {
            entry
                .context
                .as_ref()
                .is_none_or(|context| context.is_match(&lower))
        })
        .map(|entry| entry.issue.to_string())
        .collect::<Vec<_>>();

    let mut suggestions = Vec::new();
    if !issues.is_empty() {
        suggestions.push(INACCURATE_ANALOGY_SUGGESTION.to_string());
        if !acknowledges_correction(text) {
            suggestions.push(ACKNOWLEDGE_CORRECTION_SUGGESTION.to_string());
        }
    }

    AccuracyCheck {
        is_valid: issues.is_empty(),
        issues,
        suggestions,
    }
}

pub fn student_flagged_inaccuracy(last_student_message: &str) -> bool {
    STUDENT_CORRECTION.is_match(last_student_message)
}
