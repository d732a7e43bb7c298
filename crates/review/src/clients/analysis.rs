use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::api::{
    AlternateExplanation, AlternateLineRequest, AlternateLineResponse, AnalyzeFenRequest,
    AnalyzeGameRequest, ExplainAlternateRequest, ExplainMoveRequest, Explanation, FenEvaluation,
    GameSummary, UploadResponse,
};
use crate::clients::AnalysisService;
use crate::config::ReviewConfig;
use crate::error::FetchError;

/// HTTP client for the analysis service. Every endpoint is a POST under
/// `base_url` with a trailing slash (`/analyze_fen/`, ...).
#[derive(Clone)]
pub struct AnalysisClient {
    client: Client,
    base_url: String,
}

impl AnalysisClient {
    pub fn new(config: &ReviewConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("GameReview/1.0")
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FetchError::Transport(format!("Client build error: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}/", self.base_url, endpoint)
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, FetchError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!(%url, "POST");

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        decode(resp).await
    }
}

impl AnalysisService for AnalysisClient {
    async fn upload_pgn(
        &self,
        file_name: String,
        pgn: String,
    ) -> Result<UploadResponse, FetchError> {
        let url = self.url("upload_pgn");
        debug!(%url, file_name = %file_name, "POST multipart");

        let form = Form::new().part("file", Part::text(pgn).file_name(file_name));
        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        decode(resp).await
    }

    async fn analyze_game(&self, request: AnalyzeGameRequest) -> Result<GameSummary, FetchError> {
        self.post_json("analyze_game", &request).await
    }

    async fn analyze_fen(&self, request: AnalyzeFenRequest) -> Result<FenEvaluation, FetchError> {
        self.post_json("analyze_fen", &request).await
    }

    async fn explain_move(&self, request: ExplainMoveRequest) -> Result<Explanation, FetchError> {
        self.post_json("explain_move", &request).await
    }

    async fn alternate_line(
        &self,
        request: AlternateLineRequest,
    ) -> Result<AlternateLineResponse, FetchError> {
        self.post_json("alternate_line", &request).await
    }

    async fn explain_alternate(
        &self,
        request: ExplainAlternateRequest,
    ) -> Result<AlternateExplanation, FetchError> {
        self.post_json("explain_alternate", &request).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::Service {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    resp.json::<T>()
        .await
        .map_err(|e| FetchError::Decode(e.to_string()))
}

/// Pull the human-readable message out of an error body. The service
/// answers `{"message": ...}`; FastAPI-style `{"detail": ...}` also occurs.
fn error_message(body: &str) -> String {
    if let Ok(data) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = data
            .get("message")
            .or(data.get("detail"))
            .and_then(|v| v.as_str())
        {
            return msg.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "No error message".to_string()
    } else {
        trimmed.to_string()
    }
}
