//! Query building, engine access, and response parsing for lead extraction.
//!
//! A scan goes through three steps in this crate:
//! 1. [`build_request`] assembles the system instruction, task prompt, and
//!    grounding tools from a [`ScanQuery`](leadmatrix_shared::ScanQuery).
//! 2. An [`ExtractionEngine`] (normally [`GeminiClient`]) runs the request
//!    and returns raw text plus a grounding-source count.
//! 3. [`parse_response`] turns the text into [`Business`](leadmatrix_shared::Business)
//!    records.

pub mod contract;
mod parser;
mod prompt;

use std::future::Future;

use leadmatrix_shared::{EngineConfig, GeoBias, LeadMatrixError, RawExtractionResult, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use url::Url;

pub use contract::{LEAD_END, LEAD_START, LeadField};
pub use parser::parse_response;
pub use prompt::{
    ExtractionRequest, GroundingTool, STANDARD_EXTRACTION, boolean_script, build_request,
};

/// User-Agent string for engine requests.
const USER_AGENT: &str = concat!("LeadMatrix/", env!("CARGO_PKG_VERSION"));

/// Maximum characters of an error body echoed back in error messages.
const MAX_ERROR_BODY: usize = 300;

// ---------------------------------------------------------------------------
// Engine abstraction
// ---------------------------------------------------------------------------

/// Something that can run an [`ExtractionRequest`] and return raw text.
///
/// Implementations make exactly one attempt; retry policy belongs to callers.
pub trait ExtractionEngine: Send + Sync {
    fn generate(
        &self,
        request: &ExtractionRequest,
    ) -> impl Future<Output = Result<RawExtractionResult>> + Send;
}

// ---------------------------------------------------------------------------
// Wire types (Generative Language API, generateContent)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    tools: Vec<ToolDeclaration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
enum ToolDeclaration {
    #[serde(rename = "googleMaps")]
    GoogleMaps {},
    #[serde(rename = "googleSearch")]
    GoogleSearch {},
}

impl From<GroundingTool> for ToolDeclaration {
    fn from(tool: GroundingTool) -> Self {
        match tool {
            GroundingTool::GoogleMaps => Self::GoogleMaps {},
            GroundingTool::GoogleSearch => Self::GoogleSearch {},
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    retrieval_config: RetrievalConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalConfig {
    lat_lng: GeoBias,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateContentResponse {
    /// Text of the first candidate, with its parts concatenated.
    fn into_raw(self) -> RawExtractionResult {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return RawExtractionResult::default();
        };

        let text = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();
        let source_count = candidate
            .grounding_metadata
            .map(|m| m.grounding_chunks.len())
            .unwrap_or(0);

        RawExtractionResult { text, source_count }
    }
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// [`ExtractionEngine`] backed by the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: Client,
    endpoint: Url,
    api_key: String,
    temperature: f32,
    model: String,
}

impl GeminiClient {
    /// Build a client for the configured model. No request timeout is set;
    /// the call is bounded only by the transport.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let base = config.base_url.trim_end_matches('/');
        let endpoint = Url::parse(&format!(
            "{base}/v1beta/models/{}:generateContent",
            config.model
        ))
        .map_err(|e| LeadMatrixError::config(format!("invalid engine endpoint: {e}")))?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LeadMatrixError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            model: config.model.clone(),
        })
    }

    /// The resolved `generateContent` URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn wire_request<'a>(&self, request: &'a ExtractionRequest) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            tools: request.tools.iter().copied().map(ToolDeclaration::from).collect(),
            tool_config: request.geo_bias.map(|lat_lng| ToolConfig {
                retrieval_config: RetrievalConfig { lat_lng },
            }),
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

impl ExtractionEngine for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model, biased = request.geo_bias.is_some()))]
    async fn generate(&self, request: &ExtractionRequest) -> Result<RawExtractionResult> {
        let body = self.wire_request(request);

        let response = self
            .http
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LeadMatrixError::extraction(format!("engine request failed: {e}")))?;

        let status = response.status();
        let payload = response.text().await.map_err(|e| {
            LeadMatrixError::extraction(format!("failed to read engine response: {e}"))
        })?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<ErrorEnvelope>(&payload) {
                Ok(envelope) => envelope.error.message,
                Err(_) => payload.chars().take(MAX_ERROR_BODY).collect(),
            };
            warn!(%status, "engine rejected extraction request");
            return Err(LeadMatrixError::extraction(format!("HTTP {status}: {detail}")));
        }

        let decoded: GenerateContentResponse = serde_json::from_str(&payload).map_err(|e| {
            LeadMatrixError::extraction(format!("invalid engine response: {e}"))
        })?;
        let raw = decoded.into_raw();

        info!(
            chars = raw.text.len(),
            sources = raw.source_count,
            "engine response received"
        );

        Ok(raw)
    }
}
