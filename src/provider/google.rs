use super::{Piece, PieceStream, Provider, StartStream};
use crate::prompt::PromptRequest;
use anyhow::{anyhow, Context};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Finish reasons that mean the provider refused to produce (more) text.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Sampling and retry knobs applied to every request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Extra attempts after the first one for transient failures.
    pub max_retries: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.4,
            max_output_tokens: 512,
            max_retries: 2,
        }
    }
}

#[derive(Clone)]
pub struct GoogleProvider {
    http: reqwest::Client,
    api_key: String,
    api_base: Url,
    settings: GenerationSettings,
    backoff_unit: Duration,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base.as_str())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl GoogleProvider {
    pub fn new(
        http: reqwest::Client,
        api_key: String,
        settings: GenerationSettings,
    ) -> anyhow::Result<Self> {
        Self::with_api_base(http, api_key, settings, DEFAULT_API_BASE)
    }

    pub fn with_api_base(
        http: reqwest::Client,
        api_key: String,
        settings: GenerationSettings,
        api_base: &str,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            http,
            api_key,
            api_base: Url::parse(api_base)
                .with_context(|| format!("invalid Gemini API base: {api_base}"))?,
            settings,
            backoff_unit: Duration::from_millis(300),
        })
    }

    #[cfg(test)]
    fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    fn build_url(&self) -> anyhow::Result<Url> {
        // v1beta:streamGenerateContent supports Server-Sent Events with alt=sse.
        let mut url = self.api_base.join(&format!(
            "v1beta/models/{}:streamGenerateContent",
            self.settings.model
        ))?;
        url.query_pairs_mut().append_pair("alt", "sse");
        Ok(url)
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        // Header rather than `?key=` so the key never shows up in error messages.
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| anyhow!(e).context("API key is not a valid header value"))?;
        h.insert("x-goog-api-key", key);
        Ok(h)
    }

    fn request_body(&self, prompt: String) -> StreamGenerateContentRequest {
        StreamGenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
            },
        }
    }

    async fn send_once(
        &self,
        url: Url,
        headers: HeaderMap,
        body: &StreamGenerateContentRequest,
    ) -> Result<reqwest::Response, ProviderError> {
        let resp = self
            .http
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.without_url()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }
        Ok(resp)
    }

    /// Open the SSE response, retrying transient failures with a linear back-off.
    ///
    /// Only the opening request is retried: once pieces have been handed out a
    /// retry would repeat text the caller already has.
    async fn open(&self, body: &StreamGenerateContentRequest) -> anyhow::Result<reqwest::Response> {
        let url = self.build_url()?;
        let headers = self.headers()?;
        let mut attempt = 0u32;

        loop {
            match self.send_once(url.clone(), headers.clone(), body).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_transient() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    let backoff = self.backoff_unit * attempt;
                    tracing::warn!(attempt, ?backoff, error = %e, "transient Gemini failure, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e).context("failed to start Gemini request"));
                }
            }
        }
    }
}

impl Provider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn stream_chat(&self, req: PromptRequest) -> StartStream {
        let this = self.clone();

        Box::pin(async move {
            let body = this.request_body(req.text);
            let resp = this.open(&body).await?;

            let (tx, rx) = mpsc::channel::<anyhow::Result<Piece>>(64);

            tokio::spawn(async move {
                let mut stream = resp.bytes_stream();
                let mut parser = SseParser::new();

                loop {
                    // Stop reading as soon as the consumer is gone, even if the
                    // upstream is stalled between events.
                    let item = tokio::select! {
                        _ = tx.closed() => {
                            tracing::debug!("answer consumer went away, dropping Gemini stream");
                            return;
                        }
                        item = stream.next() => item,
                    };
                    let Some(item) = item else { break };
                    let bytes = match item {
                        Ok(b) => b,
                        Err(e) => {
                            let _ = tx
                                .send(Err(anyhow!(e.without_url()).context("network stream error")))
                                .await;
                            return;
                        }
                    };

                    for ev in parser.push(&bytes) {
                        let data = match ev {
                            Ok(SseEvent::Data(data)) => data,
                            Ok(SseEvent::Other) => continue,
                            Err(e) => {
                                let _ = tx.send(Err(e)).await;
                                return;
                            }
                        };
                        if data.trim().is_empty() {
                            continue;
                        }

                        let parsed = match serde_json::from_str::<StreamGenerateContentResponse>(&data) {
                            Ok(r) => r,
                            Err(e) => {
                                let _ = tx
                                    .send(Err(anyhow!(e).context("failed to parse SSE JSON")))
                                    .await;
                                return;
                            }
                        };

                        if let Some(text) = extract_text(&parsed) {
                            if tx.send(Ok(Piece { text })).await.is_err() {
                                tracing::debug!("answer consumer went away, dropping Gemini stream");
                                return;
                            }
                        }
                        if let Some(reason) = blocked_reason(&parsed) {
                            let _ = tx
                                .send(Err(anyhow!("Gemini blocked the response: {reason}")))
                                .await;
                            return;
                        }
                    }
                }
            });

            Ok(Box::pin(ReceiverStream::new(rx)) as PieceStream)
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum ProviderError {
    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("Gemini API error: HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl ProviderError {
    fn is_transient(&self) -> bool {
        match self {
            ProviderError::Network(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ProviderError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamGenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamGenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

fn extract_text(r: &StreamGenerateContentResponse) -> Option<String> {
    // Concatenate all text parts of the first candidate.
    let cand = r.candidates.first()?;
    let content = cand.content.as_ref()?;
    let mut out = String::new();
    for p in &content.parts {
        if let Some(t) = &p.text {
            out.push_str(t);
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

fn blocked_reason(r: &StreamGenerateContentResponse) -> Option<String> {
    if let Some(reason) = r.prompt_feedback.as_ref().and_then(|f| f.block_reason.clone()) {
        return Some(reason);
    }
    let reason = r.candidates.first()?.finish_reason.as_deref()?;
    BLOCKING_FINISH_REASONS
        .contains(&reason)
        .then(|| reason.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SseEvent {
    Data(String),
    Other,
}

/// Minimal SSE parser.
///
/// - Collects UTF-8 lines
/// - Emits Data events when a blank line ends an event
struct SseParser {
    buf: Vec<u8>,
    cur_data: String,
}

impl SseParser {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            cur_data: String::new(),
        }
    }

    fn push(&mut self, chunk: &[u8]) -> Vec<anyhow::Result<SseEvent>> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line = self.buf.drain(..=pos).collect::<Vec<u8>>();
            line.pop();
            if line.ends_with(b"\r") {
                line.pop();
            }

            if line.is_empty() {
                if !self.cur_data.is_empty() {
                    if self.cur_data.ends_with('\n') {
                        self.cur_data.pop();
                    }
                    out.push(Ok(SseEvent::Data(std::mem::take(&mut self.cur_data))));
                }
                continue;
            }

            let s = match std::str::from_utf8(&line) {
                Ok(s) => s,
                Err(e) => {
                    out.push(Err(anyhow!(e).context("SSE line is not valid UTF-8")));
                    continue;
                }
            };

            if let Some(rest) = s.strip_prefix("data:") {
                let rest = rest.strip_prefix(' ').unwrap_or(rest);
                self.cur_data.push_str(rest);
                self.cur_data.push('\n');
            } else {
                // event:, id:, retry: and comments carry nothing we use.
                out.push(Ok(SseEvent::Other));
            }
        }

        out
    }
}
