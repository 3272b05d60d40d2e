//! Request and response shapes exchanged with the diagram service.
//!
//! Field names on the wire follow the diagram service's REST API
//! (`input_text`, `mermaid_code`, `updated_mermaid`, ...).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validate::{Severity, ValidationFinding, ValidationReport};

pub const DEFAULT_DIAGRAM_TYPE: &str = "context";

fn default_diagram_type() -> String {
    DEFAULT_DIAGRAM_TYPE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerateRequest {
    pub input_text: String,
    #[serde(default = "default_diagram_type")]
    pub diagram_type: String,
}

impl GenerateRequest {
    pub fn new(input_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            diagram_type: default_diagram_type(),
        }
    }
}

/// One finding as the service reports it: either a bare message or an
/// object carrying at least the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum WireFinding {
    Message(String),
    Detailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        severity: Option<Severity>,
        #[serde(default)]
        category: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
}

impl WireFinding {
    pub fn message(&self) -> &str {
        match self {
            WireFinding::Message(message) => message,
            WireFinding::Detailed { message, .. } => message,
        }
    }
}

impl From<&ValidationFinding> for WireFinding {
    fn from(finding: &ValidationFinding) -> Self {
        WireFinding::Detailed {
            severity: Some(finding.severity),
            category: finding.category.clone(),
            message: finding.message.clone(),
            suggestion: finding.suggestion.clone(),
        }
    }
}

/// Validation outcome reported alongside a diagram, shaped like a
/// [`ValidationReport`]. Findings may arrive as plain strings or as objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ServiceValidation {
    #[serde(alias = "isValid")]
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub errors: Vec<WireFinding>,
    #[serde(default)]
    pub warnings: Vec<WireFinding>,
    #[serde(default)]
    pub info: Vec<WireFinding>,
    #[serde(default)]
    pub suggestions: Vec<WireFinding>,
    #[serde(default)]
    pub questions: Vec<String>,
}

impl ServiceValidation {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|f| f.message().to_string()).collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(|f| f.message().to_string()).collect()
    }
}

impl From<&ValidationReport> for ServiceValidation {
    fn from(report: &ValidationReport) -> Self {
        Self {
            is_valid: report.is_valid(),
            score: Some(f64::from(report.score())),
            errors: report.errors().iter().map(WireFinding::from).collect(),
            warnings: report.warnings().iter().map(WireFinding::from).collect(),
            info: report.info().iter().map(WireFinding::from).collect(),
            suggestions: report
                .findings()
                .filter_map(|f| f.suggestion.clone())
                .map(WireFinding::Message)
                .collect(),
            questions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerateResponse {
    #[serde(rename = "mermaid_code")]
    pub diagram_text: String,
    #[serde(default)]
    pub validation: ServiceValidation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SuggestRequest {
    pub input_text: String,
    #[serde(default = "default_diagram_type")]
    pub diagram_type: String,
}

impl SuggestRequest {
    pub fn new(input_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            diagram_type: default_diagram_type(),
        }
    }
}

/// A reworded description the user can adopt in place of theirs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Suggestion {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "improvedText")]
    pub improved_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SuggestResponse {
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RefineRequest {
    #[serde(rename = "current_mermaid")]
    pub current_diagram_text: String,
    pub original_context: String,
    #[serde(rename = "refinement_instruction")]
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RefineResponse {
    #[serde(rename = "updated_mermaid", alias = "updatedMermaid")]
    pub updated_diagram_text: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, alias = "changesMade")]
    pub changes_made: Vec<String>,
}

/// Structured refusal from the service. Each list is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Rejection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl Rejection {
    /// Build a rejection from a local validation report.
    pub fn from_report(report: &ValidationReport) -> Self {
        let suggestions: Vec<String> =
            report.findings().filter_map(|f| f.suggestion.clone()).collect();
        Self {
            message: Some("Validation failed".to_string()),
            errors: Some(report.errors().iter().map(|f| f.message.clone()).collect()),
            questions: None,
            suggestions: Some(suggestions).filter(|s| !s.is_empty()),
        }
    }

    /// Human-readable text: the errors, then numbered questions, then
    /// suggestions. Falls back to `message` when there is no error list.
    pub fn render(&self) -> Option<String> {
        let Some(errors) = &self.errors else {
            return self.message.clone();
        };
        let mut out = errors.join("\n");
        if let Some(questions) = self.questions.as_ref().filter(|q| !q.is_empty()) {
            out.push_str("\n\nPlease provide more information:");
            for (i, q) in questions.iter().enumerate() {
                out.push_str(&format!("\n{}. {q}", i + 1));
            }
        }
        if let Some(suggestions) = self.suggestions.as_ref().filter(|s| !s.is_empty()) {
            out.push_str("\n\nSuggestions:\n");
            out.push_str(&suggestions.join("\n"));
        }
        Some(out)
    }
}
