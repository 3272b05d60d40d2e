//! Pre-flight readiness analysis of free-text system descriptions.
//!
//! [`validate`] decides whether a description is worth sending to the diagram
//! generator. It never fails: every degenerate input ends up as a populated
//! [`ValidationReport`] with at least one error finding.

use std::fmt;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::keywords::{
    self, COMMON_WORDS, EXTERNAL_INDICATORS, RELATIONSHIP_INDICATORS, SYSTEM_INDICATORS,
    USER_INDICATORS,
};

/// Descriptions with fewer whitespace-delimited tokens are rejected outright.
pub const MIN_WORDS: usize = 3;

pub const CATEGORY_INPUT: &str = "Input";
pub const CATEGORY_CONTENT_LENGTH: &str = "Content Length";
pub const CATEGORY_SYSTEM: &str = "System Not Identified";
pub const CATEGORY_USERS: &str = "Users Not Specified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFinding {
    pub severity: Severity,
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationFinding {
    pub fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Structural hints found in the description.
///
/// `has_external_systems` and `has_relationships` are reported for callers
/// that want them; they never influence validity or score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessSignals {
    pub has_system: bool,
    pub has_users: bool,
    pub has_external_systems: bool,
    pub has_relationships: bool,
}

impl ReadinessSignals {
    pub fn detect(text_lower: &str) -> Self {
        Self {
            has_system: keywords::mentions_any(text_lower, SYSTEM_INDICATORS),
            has_users: keywords::mentions_any(text_lower, USER_INDICATORS),
            has_external_systems: keywords::mentions_any(text_lower, EXTERNAL_INDICATORS),
            has_relationships: keywords::mentions_any(text_lower, RELATIONSHIP_INDICATORS),
        }
    }
}

/// Findings of one validation run, grouped by severity in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<ValidationFinding>,
    warnings: Vec<ValidationFinding>,
    info: Vec<ValidationFinding>,
    signals: ReadinessSignals,
}

impl ValidationReport {
    /// Build a report from an arbitrary set of findings.
    pub fn from_findings(findings: impl IntoIterator<Item = ValidationFinding>) -> Self {
        let mut report = Self::default();
        for finding in findings {
            report.push(finding);
        }
        report
    }

    fn push(&mut self, finding: ValidationFinding) {
        match finding.severity {
            Severity::Error => self.errors.push(finding),
            Severity::Warning => self.warnings.push(finding),
            Severity::Info => self.info.push(finding),
        }
    }

    pub fn errors(&self) -> &[ValidationFinding] {
        &self.errors
    }

    pub fn warnings(&self) -> &[ValidationFinding] {
        &self.warnings
    }

    pub fn info(&self) -> &[ValidationFinding] {
        &self.info
    }

    /// All findings, errors first.
    pub fn findings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.errors.iter().chain(&self.warnings).chain(&self.info)
    }

    pub fn signals(&self) -> ReadinessSignals {
        self.signals
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Readiness score in `0..=100`, derived only from the finding counts.
    pub fn score(&self) -> u32 {
        let penalty = self.errors.len() * 25 + self.warnings.len() * 10 + self.info.len() * 2;
        100u32.saturating_sub(u32::try_from(penalty).unwrap_or(u32::MAX))
    }

    pub fn summary(&self) -> String {
        let status = if self.is_valid() { "VALID" } else { "INVALID" };
        format!(
            "{status} - C4 Diagram Generation Readiness: {}/100\nErrors: {}\nWarnings: {}\nInfo: {}",
            self.score(),
            self.errors.len(),
            self.warnings.len(),
            self.info.len()
        )
    }

    pub fn to_payload(&self) -> ValidationPayload {
        ValidationPayload {
            is_valid: self.is_valid(),
            score: self.score(),
            errors: self.errors.clone(),
            warnings: self.warnings.clone(),
            info: self.info.clone(),
            signals: self.signals,
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        let sections = [
            ("ERRORS (must fix)", &self.errors),
            ("WARNINGS (should fix)", &self.warnings),
            ("INFORMATION (optional)", &self.info),
        ];
        for (title, findings) in sections {
            if findings.is_empty() {
                continue;
            }
            write!(f, "\n{title}:\n")?;
            for (i, finding) in findings.iter().enumerate() {
                write!(f, "\n{}. [{}]\n   {}\n", i + 1, finding.category, finding.message)?;
                if let Some(suggestion) = &finding.suggestion {
                    writeln!(f, "   Hint: {suggestion}")?;
                }
            }
        }
        Ok(())
    }
}

/// Serializable view of a report, including its derived fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationPayload {
    pub is_valid: bool,
    pub score: u32,
    #[serde(default)]
    pub errors: Vec<ValidationFinding>,
    #[serde(default)]
    pub warnings: Vec<ValidationFinding>,
    #[serde(default)]
    pub info: Vec<ValidationFinding>,
    #[serde(default)]
    pub signals: ReadinessSignals,
}

/// Number of whitespace-delimited tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Score `text` for diagram-generation readiness.
pub fn validate(text: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    if text.trim().is_empty() {
        report.push(
            ValidationFinding::new(Severity::Error, CATEGORY_INPUT, "Empty input provided")
                .with_suggestion("Please describe what you want to build"),
        );
        return report;
    }

    if word_count(text) < MIN_WORDS {
        report.push(
            ValidationFinding::new(Severity::Error, CATEGORY_CONTENT_LENGTH, "Input too short")
                .with_suggestion("Please provide at least a brief description"),
        );
        return report;
    }

    if is_gibberish(text) {
        report.push(
            ValidationFinding::new(
                Severity::Error,
                CATEGORY_CONTENT_LENGTH,
                "Input appears to be gibberish or lacks technical context",
            )
            .with_suggestion("Please describe a real system or application using clear language"),
        );
        return report;
    }

    let text_lower = text.to_lowercase();
    report.signals = ReadinessSignals::detect(&text_lower);

    if !report.signals.has_system {
        report.push(
            ValidationFinding::new(
                Severity::Error,
                CATEGORY_SYSTEM,
                "Cannot identify what system/application you want to build",
            )
            .with_suggestion(
                "Please specify what you want to create (e.g., \"web app\", \"mobile app\", \"system\", \"service\")",
            ),
        );
    } else if !report.signals.has_users {
        report.push(
            ValidationFinding::new(Severity::Warning, CATEGORY_USERS, "Who will use this system?")
                .with_suggestion(
                    "Consider adding: \"Users access...\", \"Customers use...\", \"Admins manage...\", etc.",
                ),
        );
    }

    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        score = report.score();
        "validated description"
    );
    report
}

// --- Gibberish heuristics ---

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u'];
const CONSONANTS: &str = "bcdfghjklmnpqrstvwxyz";

/// True when `text` is statistically unlikely to be a natural-language description.
pub fn is_gibberish(text: &str) -> bool {
    let text_lower = text.to_lowercase();
    has_repeated_unit(text)
        || suspicious_word_ratio(&text_lower) > 0.2
        || alphabetic_ratio(text).is_some_and(|r| r < 0.8)
        || has_letter_run(&text_lower, 20)
        || lacks_common_words(text)
}

/// Longest repeated unit considered; keeps the scan linear in line length.
const MAX_REPEAT_UNIT: usize = 32;

/// A unit of two to [`MAX_REPEAT_UNIT`] characters repeated at least four
/// times in a row. Units never span a line break.
fn has_repeated_unit(text: &str) -> bool {
    text.split(['\n', '\r', '\u{2028}', '\u{2029}']).any(|line| {
        let chars: Vec<char> = line.chars().collect();
        let n = chars.len();
        (0..n).any(|start| {
            (2..=((n - start) / 4).min(MAX_REPEAT_UNIT)).any(|unit| {
                let first = &chars[start..start + unit];
                (1..4).all(|rep| {
                    let at = start + rep * unit;
                    &chars[at..at + unit] == first
                })
            })
        })
    })
}

/// Share of words (three characters or longer) that look like key mashing.
/// A word can be counted twice when it trips both checks.
fn suspicious_word_ratio(text_lower: &str) -> f64 {
    let mut considered = 0usize;
    let mut suspicious = 0usize;
    for word in text_lower.split_whitespace() {
        let len = word.chars().count();
        if len < 3 {
            continue;
        }
        considered += 1;
        let vowels = word.chars().filter(|c| VOWELS.contains(c)).count();
        if len > 5 && vowels < 2 {
            suspicious += 1;
        }
        if longest_consonant_run(word) >= 5 {
            suspicious += 1;
        }
    }
    if considered == 0 {
        return 0.0;
    }
    suspicious as f64 / considered as f64
}

fn longest_consonant_run(word: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in word.chars() {
        if CONSONANTS.contains(c) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// ASCII letters over all non-whitespace characters; `None` when there are none.
fn alphabetic_ratio(text: &str) -> Option<f64> {
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return None;
    }
    let alpha = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    Some(alpha as f64 / total as f64)
}

fn has_letter_run(text_lower: &str, min: usize) -> bool {
    let mut run = 0;
    for c in text_lower.chars() {
        if c.is_ascii_lowercase() {
            run += 1;
            if run >= min {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

fn common_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = COMMON_WORDS.join("|");
        Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("common word pattern is valid")
    })
}

fn lacks_common_words(text: &str) -> bool {
    let total = word_count(text);
    let common = common_word_regex().find_iter(text).count();
    if total > 10 && common < 3 {
        return true;
    }
    total > 5 && (common as f64 / total as f64) < 0.15
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn single_error(report: &ValidationReport) -> &ValidationFinding {
        assert_eq!(report.errors().len(), 1, "{report}");
        &report.errors()[0]
    }

    #[test]
    fn blank_input_is_rejected_as_input_error() {
        for text in ["", "   ", "\n\t  \n"] {
            let report = validate(text);
            assert!(!report.is_valid());
            assert_eq!(single_error(&report).category, CATEGORY_INPUT);
        }
    }

    #[test]
    fn two_words_are_too_short() {
        let report = validate("web app");
        assert!(!report.is_valid());
        let err = single_error(&report);
        assert_eq!(err.category, CATEGORY_CONTENT_LENGTH);
        assert_eq!(err.message, "Input too short");
        assert!(report.warnings().is_empty());
    }

    #[test]
    fn online_store_is_ready() {
        let report = validate("We are building an online store used by customers.");
        assert!(report.is_valid(), "{report}");
        assert!(report.errors().is_empty());
        assert!(report.warnings().len() <= 1);
        assert_eq!(report.score(), 100);
        assert!(report.signals().has_system);
        assert!(report.signals().has_users);
    }

    #[test]
    fn key_mashing_is_rejected() {
        assert!(!validate("asdasdasdasdasd").is_valid());
        assert!(!validate("xqzvbnmpqrst").is_valid());
        assert!(is_gibberish("asdasdasdasdasd"));
        assert!(is_gibberish("xqzvbnmpqrst"));
    }

    #[test]
    fn repeated_unit_needs_four_copies() {
        assert!(has_repeated_unit("we said abababab to them"));
        assert!(!has_repeated_unit("we said ababab to them"));
        assert!(!has_repeated_unit("ab\nab\nab\nab"));
    }

    #[test]
    fn consonant_heavy_words_trip_the_ratio() {
        assert!(suspicious_word_ratio("build the grrrrrt system") > 0.2);
        assert_eq!(suspicious_word_ratio("build the web application"), 0.0);
        // "system" has a single vowel in six letters
        assert!(suspicious_word_ratio("system") > 0.2);
        assert_eq!(longest_consonant_run("strength"), 4);
    }

    #[test]
    fn long_multi_word_gibberish_is_rejected() {
        let report = validate("qwp zxv plk mnb gfd trw vcx lkj hgf dsa rew build");
        assert!(!report.is_valid());
        assert_eq!(single_error(&report).category, CATEGORY_CONTENT_LENGTH);
        assert!(single_error(&report).message.contains("gibberish"));
    }

    #[test]
    fn repeated_units_longer_than_the_cap_are_ignored() {
        let unit = "service gateway routes orders to billing ";
        assert!(unit.chars().count() > MAX_REPEAT_UNIT);
        assert!(!has_repeated_unit(&unit.repeat(4)));
        assert!(has_repeated_unit("asdasdasdasd"));
        assert!(has_repeated_unit(&"ab".repeat(4)));
    }

    #[test]
    fn very_long_single_line_is_scanned() {
        let line: String = (0..8000).map(|i| format!("w{i} ")).collect();
        assert!(line.len() > 40_000);
        assert!(!line.contains('\n'));
        assert!(!has_repeated_unit(&line));
    }

    #[test]
    fn short_text_with_few_common_words_is_gibberish() {
        let sparse = "Kubernetes operators reconcile cluster state and controllers";
        assert_eq!(word_count(sparse), 7);
        assert!(lacks_common_words(sparse));
        assert!(is_gibberish(sparse));

        let denser = "Kubernetes operators reconcile the cluster state and controllers";
        assert!(!lacks_common_words(denser));
        assert!(!is_gibberish(denser));
    }

    #[test]
    fn mostly_symbols_are_gibberish() {
        assert!(is_gibberish("build a system ###### $$$$ %%%% 1234 5678"));
    }

    #[test]
    fn unbroken_letter_run_is_gibberish() {
        assert!(is_gibberish("the system is supercalifragilisticexpialidocious"));
    }

    #[test]
    fn common_words_are_counted_whole() {
        assert_eq!(common_word_regex().find_iter("The API and an apple").count(), 4);
    }

    #[test]
    fn missing_system_is_an_error() {
        let report = validate("The quick brown fox jumps over the lazy dog");
        assert!(!report.is_valid(), "{report}");
        let err = single_error(&report);
        assert_eq!(err.category, CATEGORY_SYSTEM);
        assert!(report.warnings().is_empty());
        assert_eq!(report.score(), 75);
    }

    #[test]
    fn missing_users_is_only_a_warning() {
        let report = validate("We want to build a platform that stores data in the cloud");
        assert!(report.is_valid(), "{report}");
        assert_eq!(report.warnings().len(), 1);
        assert_eq!(report.warnings()[0].category, CATEGORY_USERS);
        assert_eq!(report.score(), 90);
    }

    #[test]
    fn signals_do_not_affect_validity() {
        let with = validate("Build a web app where users send orders to Stripe");
        let without = validate("Build a web app for users and their friends");
        assert!(with.signals().has_external_systems);
        assert!(with.signals().has_relationships);
        assert!(!without.signals().has_relationships);
        assert_eq!(with.is_valid(), without.is_valid());
        assert_eq!(with.score(), without.score());
    }

    #[test]
    fn display_lists_findings_with_hints() {
        let rendered = validate("The quick brown fox jumps over the lazy dog").to_string();
        assert!(rendered.starts_with("INVALID - C4 Diagram Generation Readiness: 75/100"));
        assert!(rendered.contains("1. [System Not Identified]"));
        assert!(rendered.contains("Hint: Please specify"));
    }

    #[test]
    fn payload_carries_derived_fields() {
        let payload = validate("web app").to_payload();
        assert!(!payload.is_valid);
        assert_eq!(payload.score, 75);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["errors"][0]["category"], "Content Length");
    }

    fn report_with(errors: usize, warnings: usize, info: usize) -> ValidationReport {
        let make = |severity, n| {
            (0..n).map(move |i| ValidationFinding::new(severity, "Test", format!("finding {i}")))
        };
        ValidationReport::from_findings(
            make(Severity::Error, errors)
                .chain(make(Severity::Warning, warnings))
                .chain(make(Severity::Info, info)),
        )
    }

    proptest! {
        #[test]
        fn score_is_bounded(text in ".{0,200}") {
            let score = validate(&text).score();
            prop_assert!(score <= 100);
        }

        #[test]
        fn short_inputs_have_one_length_error(words in prop::collection::vec("[a-z]{1,12}", 1..3)) {
            let report = validate(&words.join(" "));
            prop_assert!(!report.is_valid());
            prop_assert_eq!(report.errors().len(), 1);
            prop_assert_eq!(report.errors()[0].category.as_str(), CATEGORY_CONTENT_LENGTH);
        }

        #[test]
        fn more_errors_never_score_higher(a in 0usize..4, b in 0usize..4, w in 0usize..3, i in 0usize..3) {
            prop_assume!(a > b);
            let more = report_with(a, w, i);
            let fewer = report_with(b, w, i);
            // Both clamp to zero once the penalty passes 100.
            if fewer.score() > 0 {
                prop_assert!(more.score() < fewer.score());
            } else {
                prop_assert_eq!(more.score(), 0);
            }
        }
    }
}
