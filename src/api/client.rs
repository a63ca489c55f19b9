//! HTTP client for the external analysis API.
//!
//! Texts are submitted as JSON, files as a multipart upload. The API
//! answers in snake_case; `ApiAnalysisResponse::into_payload` reshapes
//! that into the payload the aggregator and history store work with.

use crate::api::token_cache::TokenCache;
use crate::models::{
    lenient, lenient_count, lenient_seq, lenient_seq_skip, lenient_text, Keyword, ProcessingTime,
    RawAnalysisPayload, RawReview, SentimentDistribution, Topic,
};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// File extensions the upload endpoint accepts.
pub const UPLOAD_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// Errors talking to the analysis API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error! status: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Analysis rejected by the API: {0}")]
    Rejected(String),

    #[error("No token received from server")]
    MissingToken,

    #[error("Unsupported file type: {0} (expected csv, xlsx or xls)")]
    UnsupportedFile(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Status { status, .. }
            if *status == StatusCode::UNAUTHORIZED.as_u16() || *status == StatusCode::FORBIDDEN.as_u16())
    }
}

/// Connection settings for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Path of the session → access token exchange endpoint.
    pub token_endpoint: String,
    pub timeout_seconds: u64,
}

/// A signed-in user whose session token can be exchanged for access tokens.
#[derive(Debug, Clone)]
pub struct SessionAuth {
    pub user_id: String,
    pub session_token: String,
}

/// Analysis API response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAnalysisResponse {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_reviews: u64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub overall_summary: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sentiment_distribution: SentimentDistribution,
    #[serde(default, deserialize_with = "lenient_seq_skip")]
    pub top_keywords: Vec<Keyword>,
    #[serde(default, deserialize_with = "lenient_seq_skip")]
    pub topic_distribution: Vec<Topic>,
    #[serde(default, deserialize_with = "lenient")]
    pub processing_time: ProcessingTime,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub review_details: Vec<RawReview>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub error: Option<String>,
}

impl ApiAnalysisResponse {
    /// Reshape into the stored/replayed payload.
    ///
    /// Reviews keep only their text, model outputs and keywords.
    pub fn into_payload(self, product_name: &str, analysis_date: &str) -> RawAnalysisPayload {
        RawAnalysisPayload {
            product_name: product_name.to_string(),
            analysis_date: analysis_date.to_string(),
            total_reviews: self.total_reviews,
            processing_time: self.processing_time,
            summary: self.overall_summary,
            overall_summary: None,
            sentiment_distribution: self.sentiment_distribution,
            top_keywords: self.top_keywords,
            topic_distribution: self.topic_distribution,
            review_details: self
                .review_details
                .into_iter()
                .map(|review| RawReview {
                    text: review.text,
                    transformer: review.transformer,
                    ml: review.ml,
                    keywords: review.keywords,
                    ..RawReview::default()
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeTextsRequest<'a> {
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Client for the analysis API.
pub struct AnalysisClient {
    config: ClientConfig,
    http: reqwest::Client,
    tokens: TokenCache,
    session: Option<SessionAuth>,
}

impl AnalysisClient {
    /// Create a client; the token cache is supplied by the caller.
    pub fn new(config: ClientConfig, tokens: TokenCache) -> Result<Self, ApiError> {
        info!("Initializing analysis client for {}", config.base_url);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            config,
            http,
            tokens,
            session: None,
        })
    }

    /// Authenticate requests on behalf of a signed-in user.
    pub fn with_session(mut self, session: SessionAuth) -> Self {
        self.session = Some(session);
        self
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    /// Submit texts for analysis.
    pub async fn analyze_texts(&mut self, texts: &[String]) -> Result<ApiAnalysisResponse, ApiError> {
        let url = self.url("/analyze_texts");
        info!("Submitting {} texts for analysis", texts.len());

        let request = self.http.post(&url).json(&AnalyzeTextsRequest { texts });
        self.send(request, url).await
    }

    /// Upload a CSV or Excel file for analysis.
    pub async fn analyze_file(&mut self, path: &Path) -> Result<ApiAnalysisResponse, ApiError> {
        check_upload_extension(path)?;

        let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());

        let url = self.url("/analyze_csv");
        info!("Uploading {} ({} bytes) for analysis", file_name, bytes.len());

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        let request = self.http.post(&url).multipart(form);
        self.send(request, url).await
    }

    async fn send(
        &mut self,
        request: RequestBuilder,
        url: String,
    ) -> Result<ApiAnalysisResponse, ApiError> {
        let request = match self.access_token().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let result = execute(request, &url).await;

        if let Err(ref e) = result {
            if e.is_auth_failure() {
                if let Some(ref session) = self.session {
                    warn!("Authentication rejected, dropping cached token");
                    self.tokens.invalidate(&session.user_id);
                }
            }
        }

        let response: ApiAnalysisResponse = result?;
        if let Some(error) = response.error.clone() {
            return Err(ApiError::Rejected(error));
        }

        debug!(
            "Received {} review details from {}",
            response.review_details.len(),
            url
        );
        Ok(response)
    }

    /// Access token for the current session, exchanging one if needed.
    async fn access_token(&mut self) -> Result<Option<String>, ApiError> {
        let Some(session) = self.session.clone() else {
            return Ok(None);
        };

        if let Some(token) = self.tokens.get(&session.user_id) {
            debug!("Using cached access token for {}", session.user_id);
            return Ok(Some(token));
        }

        let url = self.url(&self.config.token_endpoint);
        debug!("Exchanging session token for {}", session.user_id);

        let request = self
            .http
            .get(&url)
            .bearer_auth(&session.session_token)
            .header(reqwest::header::ACCEPT, "application/json");

        let response: TokenResponse = execute(request, &url).await?;
        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::MissingToken)?;

        self.tokens.set(&session.user_id, token.clone());
        let dropped = self.tokens.cleanup();
        if dropped > 0 {
            debug!("Dropped {} idle tokens", dropped);
        }

        Ok(Some(token))
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

async fn execute<T: serde::de::DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
) -> Result<T, ApiError> {
    let response = request.send().await.map_err(|source| ApiError::Request {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|source| ApiError::Request {
        url: url.to_string(),
        source,
    })?;

    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Ensure the file has an extension the upload endpoint accepts.
pub fn check_upload_extension(path: &Path) -> Result<(), ApiError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if UPLOAD_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(ApiError::UnsupportedFile(path.display().to_string()))
    }
}

/// Split pasted input into one text per non-blank line.
pub fn split_texts(input: &str) -> Vec<String> {
    input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}
