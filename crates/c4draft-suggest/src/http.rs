//! Diagram service reached over the REST API (`/api/diagrams/*`).

use async_trait::async_trait;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use c4draft_core::api::{
    GenerateRequest, GenerateResponse, Rejection, RefineRequest, RefineResponse, SuggestRequest,
    SuggestResponse,
};

use crate::{DiagramService, ServiceError};

pub struct HttpDiagramService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDiagramService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/diagrams/{path}", self.base_url)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(url = url.as_str(); "POST");

        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            warn!("request to {url} failed: {e}");
            ServiceError::Failed(None)
        })?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            warn!("reading response from {url} failed: {e}");
            ServiceError::Failed(None)
        })?;

        if !status.is_success() {
            debug!(status = status.as_u16(); "service refused request");
            return Err(rejection_from_body(&bytes));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::failed(format!("unexpected response from {path}: {e}")))
    }
}

#[async_trait]
impl DiagramService for HttpDiagramService {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ServiceError> {
        self.post("generate", request).await
    }

    async fn suggest(&self, request: &SuggestRequest) -> Result<SuggestResponse, ServiceError> {
        self.post("suggest-improvements", request).await
    }

    async fn refine(&self, request: &RefineRequest) -> Result<RefineResponse, ServiceError> {
        self.post("refine", request).await
    }
}

/// Turn an error body into a [`ServiceError`].
///
/// The lists may sit at the top level or under `detail`, depending on which
/// deployment of the service answered.
fn rejection_from_body(body: &[u8]) -> ServiceError {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return ServiceError::Failed(None);
    };
    let detail = value.get("detail");

    let field = |key: &str| value.get(key).or_else(|| detail.and_then(|d| d.get(key)));
    let list = |key: &str| {
        field(key).and_then(|v| serde_json::from_value::<Vec<String>>(v.clone()).ok())
    };
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| detail.and_then(|d| d.get("message")).and_then(Value::as_str))
        .or_else(|| detail.and_then(Value::as_str))
        .map(str::to_string);

    let rejection = Rejection {
        message,
        errors: list("errors"),
        questions: list("questions"),
        suggestions: list("suggestions"),
    };
    if rejection == Rejection::default() {
        ServiceError::Failed(None)
    } else {
        ServiceError::Rejected(rejection)
    }
}
