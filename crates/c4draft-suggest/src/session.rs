//! One user's editing session: context text, version history and the
//! suggestions last offered for it.

use std::path::{Path, PathBuf};

use log::{debug, info};

use c4draft_core::api::{
    GenerateRequest, RefineRequest, RefineResponse, Rejection, SuggestRequest, Suggestion,
};
use c4draft_core::{
    compute_layout, export_diagram, validate, DiagramVersion, LayoutConfig, RevisionHistory,
    StoreError, ValidationReport, DEFAULT_EXPORT_NAME,
};

use crate::{DiagramService, ServiceError};

const INITIAL_DESCRIPTION: &str = "Initial generation";
const SUGGESTION_DESCRIPTION: &str = "Generated from suggestion";

/// What the caller should do after a generation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// The message already tells the user what to fix.
    ShowAsIs,
    /// The description is on topic but thin; offer reworded alternatives.
    FetchSuggestions,
}

impl FollowUp {
    pub fn classify(message: &str) -> Self {
        const SHOW: [&str; 3] = ["Input too short", "gibberish", "Empty input"];
        const FETCH: [&str; 3] = [
            "Insufficient information",
            "provide more information",
            "Cannot identify",
        ];
        if SHOW.iter().any(|m| message.contains(m)) {
            FollowUp::ShowAsIs
        } else if FETCH.iter().any(|m| message.contains(m)) {
            FollowUp::FetchSuggestions
        } else {
            FollowUp::ShowAsIs
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Please enter a solution context")]
    EmptyContext,

    #[error("{message}")]
    Rejected { message: String, follow_up: FollowUp },

    #[error(transparent)]
    Service(ServiceError),

    #[error("Please describe what you want to change")]
    EmptyInstruction,

    #[error("No diagram to refine")]
    NothingToRefine,

    #[error("No diagram to export")]
    NothingToExport,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    fn rejected(message: String) -> Self {
        let follow_up = FollowUp::classify(&message);
        Self::Rejected { message, follow_up }
    }
}

impl From<ServiceError> for SessionError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Rejected(_) => Self::rejected(err.to_string()),
            ServiceError::Failed(_) => Self::Service(err),
        }
    }
}

/// Drives a [`DiagramService`] for one description and keeps every diagram
/// it produced. Mutating operations take `&mut self`, so at most one request
/// is in flight per session.
pub struct DiagramSession<S> {
    service: S,
    context: String,
    history: RevisionHistory,
    suggestions: Vec<Suggestion>,
    report: Option<ValidationReport>,
}

impl<S: DiagramService> DiagramSession<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            context: String::new(),
            history: RevisionHistory::new(),
            suggestions: Vec::new(),
            report: None,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn history(&self) -> &RevisionHistory {
        &self.history
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Local validation of the last description sent to [`Self::generate`].
    pub fn report(&self) -> Option<&ValidationReport> {
        self.report.as_ref()
    }

    pub fn current(&self) -> Option<&DiagramVersion> {
        self.history.current()
    }

    /// Generate a fresh diagram for `text`, replacing the history.
    ///
    /// Descriptions that fail local validation never reach the service.
    pub async fn generate(&mut self, text: &str) -> Result<&DiagramVersion, SessionError> {
        self.generate_as(text, INITIAL_DESCRIPTION).await
    }

    /// Fetch reworded descriptions for the current context.
    pub async fn suggest(&mut self) -> Result<&[Suggestion], SessionError> {
        if self.context.trim().is_empty() {
            return Err(SessionError::EmptyContext);
        }
        let response = self.service.suggest(&SuggestRequest::new(self.context.as_str())).await?;
        debug!(count = response.suggestions.len(); "received suggestions");
        self.suggestions = response.suggestions;
        Ok(&self.suggestions)
    }

    /// Adopt a suggested description and generate from it.
    pub async fn use_suggestion(
        &mut self,
        improved_text: &str,
    ) -> Result<&DiagramVersion, SessionError> {
        self.generate_as(improved_text, SUGGESTION_DESCRIPTION).await
    }

    async fn generate_as(
        &mut self,
        text: &str,
        description: &str,
    ) -> Result<&DiagramVersion, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyContext);
        }
        self.context = text.to_string();
        self.suggestions.clear();

        let report = validate(text);
        let rejection = (!report.is_valid()).then(|| Rejection::from_report(&report));
        self.report = Some(report);
        if let Some(rejection) = rejection {
            let message = ServiceError::Rejected(rejection).to_string();
            debug!("description refused before generation");
            return Err(SessionError::rejected(message));
        }

        let response = self.service.generate(&GenerateRequest::new(text)).await?;
        self.history.reset();
        let version = self.history.record(response.diagram_text, text, description);
        info!(chars = version.diagram_text.len(); "generated diagram");
        Ok(version)
    }

    /// Apply `instruction` to the version currently displayed.
    ///
    /// The result is recorded after the cursor, so refining after an undo
    /// discards the undone versions.
    pub async fn refine(&mut self, instruction: &str) -> Result<RefineResponse, SessionError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(SessionError::EmptyInstruction);
        }
        let current = self.history.current().ok_or(SessionError::NothingToRefine)?;
        let request = RefineRequest {
            current_diagram_text: current.diagram_text.clone(),
            original_context: self.context.clone(),
            instruction: instruction.to_string(),
        };

        let response = self.service.refine(&request).await?;
        let version = self.history.record(
            response.updated_diagram_text.as_str(),
            self.context.as_str(),
            instruction,
        );
        info!(version = version.index; "refined diagram");
        Ok(response)
    }

    pub fn undo(&mut self) -> Option<&DiagramVersion> {
        self.history.undo()
    }

    pub fn redo(&mut self) -> Option<&DiagramVersion> {
        self.history.redo()
    }

    /// Renderer configuration for the displayed version.
    pub fn layout(&self) -> LayoutConfig {
        self.current()
            .map(|v| compute_layout(&v.diagram_text))
            .unwrap_or_default()
    }

    /// Forget the context, suggestions and every version.
    pub fn clear(&mut self) {
        self.context.clear();
        self.suggestions.clear();
        self.report = None;
        self.history.reset();
    }

    /// Write the displayed diagram text verbatim, to `c4-diagram.mmd` when no
    /// path is given. Returns the path written.
    pub fn export(&self, path: Option<&Path>) -> Result<PathBuf, SessionError> {
        let current = self.current().ok_or(SessionError::NothingToExport)?;
        let path = path.map_or_else(|| PathBuf::from(DEFAULT_EXPORT_NAME), Path::to_path_buf);
        export_diagram(&path, &current.diagram_text)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use c4draft_core::api::{GenerateResponse, SuggestResponse};
    use c4draft_core::DiagramKind;
    use std::sync::Mutex;

    const VALID: &str = "A web application where customers upload invoices to cloud storage";

    #[derive(Default)]
    struct FakeService {
        generated: Mutex<Vec<String>>,
        refined: Mutex<Vec<RefineRequest>>,
        fail_refine: bool,
    }

    #[async_trait]
    impl DiagramService for FakeService {
        async fn generate(
            &self,
            request: &GenerateRequest,
        ) -> Result<GenerateResponse, ServiceError> {
            let mut generated = self.generated.lock().unwrap();
            generated.push(request.input_text.clone());
            Ok(GenerateResponse {
                diagram_text: format!("graph LR\n  A[Draft {}]", generated.len()),
                validation: Default::default(),
            })
        }

        async fn suggest(&self, _request: &SuggestRequest) -> Result<SuggestResponse, ServiceError> {
            Ok(SuggestResponse {
                suggestions: vec![Suggestion {
                    title: "Invoice portal".into(),
                    description: "Adds the system and its users".into(),
                    improved_text: VALID.into(),
                }],
            })
        }

        async fn refine(&self, request: &RefineRequest) -> Result<RefineResponse, ServiceError> {
            if self.fail_refine {
                return Err(ServiceError::Failed(None));
            }
            self.refined.lock().unwrap().push(request.clone());
            Ok(RefineResponse {
                updated_diagram_text: format!(
                    "{}\n  %% {}",
                    request.current_diagram_text, request.instruction
                ),
                explanation: "done".into(),
                changes_made: vec![request.instruction.clone()],
            })
        }
    }

    fn calls(session: &DiagramSession<FakeService>) -> usize {
        session.service().generated.lock().unwrap().len()
    }

    #[test]
    fn follow_up_depends_on_message() {
        assert_eq!(FollowUp::classify("Input too short"), FollowUp::ShowAsIs);
        assert_eq!(
            FollowUp::classify("Input appears to be gibberish or lacks technical context"),
            FollowUp::ShowAsIs
        );
        assert_eq!(FollowUp::classify("Empty input provided"), FollowUp::ShowAsIs);
        assert_eq!(
            FollowUp::classify("Insufficient information for C4 Context diagram"),
            FollowUp::FetchSuggestions
        );
        assert_eq!(
            FollowUp::classify("Cannot identify what system/application you want to build"),
            FollowUp::FetchSuggestions
        );
        assert_eq!(FollowUp::classify("Failed to generate diagram"), FollowUp::ShowAsIs);
    }

    #[tokio::test]
    async fn blank_context_is_refused() {
        let mut session = DiagramSession::new(FakeService::default());
        assert!(matches!(session.generate("   ").await, Err(SessionError::EmptyContext)));
        assert_eq!(calls(&session), 0);
    }

    #[tokio::test]
    async fn invalid_description_never_reaches_the_service() {
        let mut session = DiagramSession::new(FakeService::default());

        match session.generate("web app").await {
            Err(SessionError::Rejected { message, follow_up }) => {
                assert!(message.starts_with("Input too short"));
                assert_eq!(follow_up, FollowUp::ShowAsIs);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        match session.generate("hello there friend").await {
            Err(SessionError::Rejected { follow_up, .. }) => {
                assert_eq!(follow_up, FollowUp::FetchSuggestions);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(calls(&session), 0);
        assert!(session.current().is_none());
        assert_eq!(session.context(), "hello there friend");
    }

    #[tokio::test]
    async fn generate_starts_a_new_history() {
        let mut session = DiagramSession::new(FakeService::default());
        session.generate(VALID).await.unwrap();
        session.refine("add a database").await.unwrap();
        assert_eq!(session.history().len(), 2);

        let version = session.generate(VALID).await.unwrap();
        assert_eq!(version.index, 0);
        assert_eq!(version.description, "Initial generation");
        assert_eq!(version.source_context, VALID);
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn suggestion_replaces_context_and_generates() {
        let mut session = DiagramSession::new(FakeService::default());
        assert!(session.generate("hello there friend").await.is_err());

        let suggestions = session.suggest().await.unwrap().to_vec();
        assert_eq!(suggestions.len(), 1);

        let version = session.use_suggestion(&suggestions[0].improved_text).await.unwrap();
        assert_eq!(version.description, "Generated from suggestion");
        assert_eq!(session.context(), VALID);
        assert!(session.suggestions().is_empty());
    }

    #[tokio::test]
    async fn refine_needs_an_instruction_and_a_diagram() {
        let mut session = DiagramSession::new(FakeService::default());
        assert!(matches!(session.refine("add a cache").await, Err(SessionError::NothingToRefine)));
        session.generate(VALID).await.unwrap();
        assert!(matches!(session.refine("  ").await, Err(SessionError::EmptyInstruction)));
    }

    #[tokio::test]
    async fn refine_after_undo_edits_the_displayed_version() {
        let mut session = DiagramSession::new(FakeService::default());
        session.generate(VALID).await.unwrap();
        let first = session.current().unwrap().diagram_text.clone();
        session.refine("add a cache").await.unwrap();
        session.refine("add a queue").await.unwrap();

        assert_eq!(session.undo().unwrap().index, 1);
        assert_eq!(session.undo().unwrap().diagram_text, first);
        assert!(session.undo().is_none());

        let response = session.refine("rename A").await.unwrap();
        assert_eq!(response.changes_made, vec!["rename A"]);

        let sent = session.service().refined.lock().unwrap().last().cloned().unwrap();
        assert_eq!(sent.current_diagram_text, first);
        assert_eq!(sent.original_context, VALID);

        assert_eq!(session.history().len(), 2);
        assert_eq!(session.current().unwrap().description, "rename A");
        assert!(session.redo().is_none());
    }

    #[tokio::test]
    async fn failed_refine_leaves_history_alone() {
        let mut session = DiagramSession::new(FakeService {
            fail_refine: true,
            ..FakeService::default()
        });
        session.generate(VALID).await.unwrap();
        match session.refine("add a cache").await {
            Err(SessionError::Service(err)) => {
                assert_eq!(err.to_string(), crate::GENERIC_FAILURE)
            }
            other => panic!("expected service failure, got {other:?}"),
        }
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn layout_follows_the_displayed_version() {
        let mut session = DiagramSession::new(FakeService::default());
        assert_eq!(session.layout().kind, DiagramKind::Empty);
        session.generate(VALID).await.unwrap();
        assert_eq!(session.layout().kind, DiagramKind::Flowchart);
    }

    #[tokio::test]
    async fn clear_forgets_everything() {
        let mut session = DiagramSession::new(FakeService::default());
        session.generate(VALID).await.unwrap();
        session.clear();
        assert!(session.context().is_empty());
        assert!(session.history().is_empty());
        assert!(session.report().is_none());
        assert!(matches!(session.export(None), Err(SessionError::NothingToExport)));
    }

    #[tokio::test]
    async fn export_writes_the_displayed_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = DiagramSession::new(FakeService::default());
        session.generate(VALID).await.unwrap();
        session.refine("add a cache").await.unwrap();
        session.undo();

        let target = dir.path().join("nested").join("out.mmd");
        let written = session.export(Some(&target)).unwrap();
        assert_eq!(written, target);
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            session.current().unwrap().diagram_text
        );
    }
}
