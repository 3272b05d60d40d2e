pub mod engine;
pub mod http;
mod parse;
mod prompt;
pub mod session;

use async_trait::async_trait;
use log::{debug, warn};

use c4draft_core::api::{
    GenerateRequest, GenerateResponse, RefineRequest, RefineResponse, Rejection, ServiceValidation,
    SuggestRequest, SuggestResponse,
};
use c4draft_core::{ai_configured, validate, AiSettings, ValidationReport};

pub use http::HttpDiagramService;
pub use session::{DiagramSession, FollowUp, SessionError};

/// Shown when the service gave no usable reason for a failure.
pub const GENERIC_FAILURE: &str = "Failed to connect to the diagram service.";

#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    /// The service refused the request and said why.
    #[error("{}", .0.render().unwrap_or_else(|| GENERIC_FAILURE.to_string()))]
    Rejected(Rejection),

    /// Transport, provider or parse failure.
    #[error("{}", .0.as_deref().unwrap_or(GENERIC_FAILURE))]
    Failed(Option<String>),
}

impl ServiceError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(Some(message.into()))
    }
}

/// The three remote operations a diagram session depends on.
#[async_trait]
pub trait DiagramService: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ServiceError>;
    async fn suggest(&self, request: &SuggestRequest) -> Result<SuggestResponse, ServiceError>;
    async fn refine(&self, request: &RefineRequest) -> Result<RefineResponse, ServiceError>;
}

#[async_trait]
impl<T: DiagramService + ?Sized> DiagramService for Box<T> {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ServiceError> {
        (**self).generate(request).await
    }

    async fn suggest(&self, request: &SuggestRequest) -> Result<SuggestResponse, ServiceError> {
        (**self).suggest(request).await
    }

    async fn refine(&self, request: &RefineRequest) -> Result<RefineResponse, ServiceError> {
        (**self).refine(request).await
    }
}

/// Talks to an LLM provider directly, validating locally the way the REST
/// service would.
pub struct LlmDiagramService {
    settings: AiSettings,
}

impl LlmDiagramService {
    pub fn new(settings: AiSettings) -> Self {
        Self { settings }
    }

    async fn complete(&self, system: &str, user_msg: &str) -> Result<String, ServiceError> {
        debug!(
            provider = self.settings.provider.as_str(),
            model = self.settings.model.as_str();
            "sending prompt"
        );
        let raw = engine::generate(&self.settings, system, user_msg)
            .await
            .inspect_err(|e| warn!("LLM request failed: {e}"))?;
        debug!(chars = raw.len(); "received completion");
        Ok(raw)
    }
}

fn too_vague_to_improve(report: &ValidationReport) -> bool {
    report.errors().iter().any(|f| {
        let message = f.message.to_lowercase();
        message.contains("gibberish") || message.contains("too short")
    })
}

#[async_trait]
impl DiagramService for LlmDiagramService {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ServiceError> {
        let report = validate(&request.input_text);
        if !report.is_valid() {
            return Err(ServiceError::Rejected(Rejection::from_report(&report)));
        }

        let raw = self
            .complete(
                &prompt::generate_system_prompt(),
                &prompt::generate_user_message(&request.input_text),
            )
            .await?;
        let diagram_text = parse::strip_code_fences(&raw);
        if diagram_text.is_empty() {
            return Err(ServiceError::failed("model returned no diagram"));
        }

        Ok(GenerateResponse {
            diagram_text,
            validation: ServiceValidation::from(&report),
        })
    }

    async fn suggest(&self, request: &SuggestRequest) -> Result<SuggestResponse, ServiceError> {
        let report = validate(&request.input_text);
        if report.is_valid() {
            return Err(ServiceError::Rejected(Rejection {
                message: Some("Input is already valid. Generate a diagram instead.".to_string()),
                ..Rejection::default()
            }));
        }
        if too_vague_to_improve(&report) {
            let mut rejection = Rejection::from_report(&report);
            rejection.message = Some("Cannot generate suggestions for this input".to_string());
            return Err(ServiceError::Rejected(rejection));
        }

        let issues: Vec<String> = report
            .errors()
            .iter()
            .chain(report.warnings())
            .map(|f| f.message.clone())
            .collect();
        let raw = self
            .complete(
                &prompt::suggest_system_prompt(),
                &prompt::suggest_user_message(&request.input_text, &issues),
            )
            .await?;

        let suggestions = parse::parse_suggestions(&raw);
        if suggestions.is_empty() {
            return Err(ServiceError::failed(
                "Failed to generate suggestions. Please try rephrasing your input.",
            ));
        }
        debug!(count = suggestions.len(); "parsed suggestions");
        Ok(SuggestResponse { suggestions })
    }

    async fn refine(&self, request: &RefineRequest) -> Result<RefineResponse, ServiceError> {
        if request.current_diagram_text.trim().is_empty() || request.instruction.trim().is_empty() {
            return Err(ServiceError::Rejected(Rejection {
                message: Some("Missing required fields".to_string()),
                ..Rejection::default()
            }));
        }

        let raw = self
            .complete(&prompt::refine_system_prompt(), &prompt::refine_user_message(request))
            .await?;
        parse::parse_refinement(&raw)
            .ok_or_else(|| ServiceError::failed("model returned an unreadable refinement"))
    }
}

/// Pick a backend: the REST service when a URL is set, otherwise the LLM
/// provider when configured.
pub fn service_from_settings(settings: &AiSettings) -> Option<Box<dyn DiagramService>> {
    if let Some(url) = settings.backend_url.as_deref().filter(|u| !u.trim().is_empty()) {
        debug!(url = url; "using diagram REST service");
        return Some(Box::new(HttpDiagramService::new(url)));
    }
    if ai_configured(settings) {
        debug!(provider = settings.provider.as_str(); "using LLM provider");
        return Some(Box::new(LlmDiagramService::new(settings.clone())));
    }
    None
}
