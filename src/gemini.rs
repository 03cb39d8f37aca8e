//! Streaming client for the Gemini `streamGenerateContent` endpoint.
//!
//! [`GeminiService`] owns the lazily-built [`GeminiClient`] and exposes
//! [`GeminiService::send_turn`], which formats the prior conversation, streams
//! the reply and collects grounding citations.

use crate::attachment::Attachment;
use crate::config::Config;
use crate::conversation::{GroundingSource, Message};
use crate::history::{build_turn_parts, format_history};
use futures::stream::StreamExt;
use futures::Stream;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

pub const TEMPERATURE: f64 = 0.4;
pub const MAX_OUTPUT_TOKENS: u32 = 4000;

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("API key is missing. Set the {0} environment variable or `api_key` in config.toml.")]
    MissingCredential(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gemini returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed stream chunk: {0}")]
    Decode(#[from] serde_json::Error),
}

// Request side

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Inline image part with the data-URI prefix stripped.
    pub fn inline(attachment: &Attachment) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: attachment.mime_type.clone(),
                data: attachment.payload().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
    generation_config: GenerationConfig,
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize, Default)]
struct GoogleSearch {}

// Response side

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    /// Set when the provider aborts mid-stream with a 200 response.
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

impl ErrorBody {
    /// `STATUS: message`, or just the message when there is no status.
    fn describe(self, fallback: &str) -> String {
        let msg = self.message.unwrap_or_else(|| fallback.to_string());
        match self.status.filter(|s| !s.is_empty()) {
            Some(status) => format!("{status}: {msg}"),
            None => msg,
        }
    }
}

/// One decoded SSE event: the text delta it carried plus any citations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamChunk {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

impl StreamChunk {
    pub fn parse(data: &str) -> Result<Self, GeminiError> {
        let response: GenerateContentResponse = serde_json::from_str(data)?;
        if let Some(error) = response.error {
            let status = error
                .code
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
            return Err(GeminiError::Status {
                status,
                message: error.describe("Gemini aborted the stream"),
            });
        }
        let Some(candidate) = response.candidates.into_iter().next() else {
            return Ok(Self::default());
        };

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        // Entries missing either field are skipped.
        let sources = candidate
            .grounding_metadata
            .map(|meta| {
                meta.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .filter_map(|web| match (web.title, web.uri) {
                        (Some(title), Some(uri)) if !title.is_empty() && !uri.is_empty() => {
                            Some(GroundingSource { title, uri })
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { text, sources })
    }
}

/// First occurrence of each uri wins; order is preserved.
pub fn dedup_sources(sources: Vec<GroundingSource>) -> Vec<GroundingSource> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|source| seen.insert(source.uri.clone()))
        .collect()
}

/// Result of a completed streamed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    system_instruction: String,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            system_instruction: system_instruction.into(),
        }
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Opens a streamed generation for `turn` on top of `history`. Each item
    /// is one decoded SSE event; a decode or transport failure ends the stream.
    pub async fn stream_generate(
        &self,
        history: Vec<Content>,
        turn: Vec<Part>,
    ) -> Result<impl Stream<Item = Result<StreamChunk, GeminiError>>, GeminiError> {
        let mut contents = history;
        contents.push(Content {
            role: "user".to_string(),
            parts: turn,
        });

        let request = GenerateContentRequest {
            contents,
            system_instruction: SystemInstruction {
                parts: vec![Part::text(self.system_instruction.clone())],
            },
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
            tools: vec![Tool::default()],
        };

        tracing::info!(model = %self.model, turns = request.contents.len(), "starting Gemini stream");

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            tracing::warn!(%status, "Gemini request rejected");
            return Err(map_http_error(status, body));
        }

        let stream = response.bytes_stream();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut stream = stream;
            let mut buffer = Vec::new();

            while let Some(chunk_result) = stream.next().await {
                match chunk_result {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);

                        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                            let line_bytes: Vec<u8> = buffer.drain(..=pos).collect();
                            let line = String::from_utf8_lossy(&line_bytes);
                            if let Some(event) = parse_sse_line(&line) {
                                let failed = event.is_err();
                                if tx.send(event).is_err() || failed {
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(GeminiError::Http(e)));
                        return;
                    }
                }
            }

            if !buffer.is_empty() {
                let line = String::from_utf8_lossy(&buffer);
                if let Some(event) = parse_sse_line(&line) {
                    let _ = tx.send(event);
                }
            }
        });

        Ok(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }
}

/// Decodes one SSE line. Anything other than a non-empty `data:` field is
/// ignored.
fn parse_sse_line(line: &str) -> Option<Result<StreamChunk, GeminiError>> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(StreamChunk::parse(data))
}

fn map_http_error(status: StatusCode, body: String) -> GeminiError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| wrapper.error.describe(&body))
        .unwrap_or_else(|_| body.clone());

    GeminiError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Everything needed to build a [`GeminiClient`] on first use.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub system_instruction: String,
}

impl From<&Config> for GeminiSettings {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            api_key_env: config.api_key_env.clone(),
            system_instruction: config.system_instruction.clone(),
        }
    }
}

/// Holds one client handle for the life of the process, built the first
/// time it is needed.
#[derive(Debug)]
pub struct GeminiService {
    settings: GeminiSettings,
    client: OnceLock<GeminiClient>,
}

impl GeminiService {
    pub fn new(settings: GeminiSettings) -> Self {
        Self {
            settings,
            client: OnceLock::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Explicit config value first, then the environment.
    pub fn resolve_api_key(&self) -> Result<String, GeminiError> {
        self.settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.settings.api_key_env)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
            .ok_or_else(|| GeminiError::MissingCredential(self.settings.api_key_env.clone()))
    }

    pub fn client(&self) -> Result<&GeminiClient, GeminiError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let api_key = self.resolve_api_key().inspect_err(|_| {
            tracing::error!(env = %self.settings.api_key_env, "Gemini API key not found");
        })?;

        Ok(self.client.get_or_init(|| {
            tracing::info!(model = %self.settings.model, "initialising Gemini client");
            GeminiClient::new(
                self.settings.base_url.clone(),
                self.settings.model.clone(),
                api_key,
                self.settings.system_instruction.clone(),
            )
        }))
    }

    /// Streams a reply to `text` (plus optional `attachment`) given the
    /// already-settled `history`. `on_chunk` sees every non-empty delta in
    /// arrival order; deltas already delivered stay delivered if the stream
    /// later fails.
    pub async fn send_turn<F>(
        &self,
        text: &str,
        history: &[Message],
        attachment: Option<&Attachment>,
        mut on_chunk: F,
    ) -> Result<TurnReply, GeminiError>
    where
        F: FnMut(&str) + Send,
    {
        let client = self.client()?;
        let contents = format_history(history);
        let parts = build_turn_parts(text, attachment);

        let mut stream = client.stream_generate(contents, parts).await?;

        let mut full_text = String::new();
        let mut sources = Vec::new();
        let mut chunks = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            chunks += 1;
            sources.extend(chunk.sources);
            if !chunk.text.is_empty() {
                full_text.push_str(&chunk.text);
                on_chunk(&chunk.text);
            }
        }

        let sources = dedup_sources(sources);
        tracing::info!(chunks, sources = sources.len(), chars = full_text.len(), "Gemini stream finished");

        Ok(TurnReply {
            text: full_text,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, Role};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base_url: &str) -> GeminiSettings {
        GeminiSettings {
            base_url: base_url.to_string(),
            model: "gemini-test".to_string(),
            api_key: Some("test-key".to_string()),
            api_key_env: "LEGALAI_TEST_UNSET_KEY".to_string(),
            system_instruction: "Be a lawyer".to_string(),
        }
    }

    fn sse(events: &[serde_json::Value]) -> String {
        events
            .iter()
            .map(|e| format!("data: {}\r\n\r\n", e))
            .collect()
    }

    fn text_event(text: &str) -> serde_json::Value {
        json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
    }

    const STREAM_PATH: &str = "/v1beta/models/gemini-test:streamGenerateContent";

    #[test]
    fn test_parse_chunk_text_and_sources() {
        let data = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Sa" }, { "text": "lom" }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://lex.uz/1", "title": "Lex" } },
                        { "web": { "uri": "https://lex.uz/2" } },
                        { "retrievedContext": {} }
                    ]
                }
            }]
        })
        .to_string();

        let chunk = StreamChunk::parse(&data).unwrap();
        assert_eq!(chunk.text, "Salom");
        assert_eq!(
            chunk.sources,
            vec![GroundingSource {
                title: "Lex".to_string(),
                uri: "https://lex.uz/1".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_chunk_skips_thought_parts() {
        let data = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "thinking...", "thought": true },
                { "text": "Javob" }
            ] } }]
        })
        .to_string();
        assert_eq!(StreamChunk::parse(&data).unwrap().text, "Javob");
    }

    #[test]
    fn test_parse_chunk_without_candidates() {
        let chunk = StreamChunk::parse(r#"{"usageMetadata":{"promptTokenCount":3}}"#).unwrap();
        assert_eq!(chunk, StreamChunk::default());
    }

    #[test]
    fn test_dedup_first_occurrence_wins() {
        let src = |t: &str, u: &str| GroundingSource {
            title: t.to_string(),
            uri: u.to_string(),
        };
        let deduped = dedup_sources(vec![src("t1", "u1"), src("t2", "u1"), src("t3", "u2")]);
        assert_eq!(deduped, vec![src("t1", "u1"), src("t3", "u2")]);
    }

    #[test]
    fn test_parse_sse_line_ignores_non_data() {
        assert!(parse_sse_line(": keep-alive").is_none());
        assert!(parse_sse_line("").is_none());
        assert!(parse_sse_line("event: message").is_none());
        assert!(parse_sse_line("data: not json").unwrap().is_err());
    }

    #[test]
    fn test_missing_credential() {
        let mut s = settings("http://localhost");
        s.api_key = None;
        let service = GeminiService::new(s);
        let err = service.client().unwrap_err();
        assert!(matches!(err, GeminiError::MissingCredential(ref env) if env == "LEGALAI_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_client_is_cached() {
        let service = GeminiService::new(settings("http://localhost"));
        let a = service.client().unwrap() as *const GeminiClient;
        let b = service.client().unwrap() as *const GeminiClient;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_send_turn_streams_and_dedups() {
        let mock_server = MockServer::start().await;
        let grounded = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "lom" }] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://lex.uz/docs/1", "title": "Mehnat kodeksi" } },
                    { "web": { "uri": "https://lex.uz/docs/1", "title": "Duplicate" } }
                ] }
            }]
        });

        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse(&[text_event("Sa"), grounded])),
            )
            .mount(&mock_server)
            .await;

        let service = GeminiService::new(settings(&mock_server.uri()));
        let mut deltas = Vec::new();
        let reply = service
            .send_turn("Salom?", &[], None, |d| deltas.push(d.to_string()))
            .await
            .expect("stream should succeed");

        assert_eq!(deltas, vec!["Sa", "lom"]);
        assert_eq!(reply.text, "Salom");
        assert_eq!(reply.sources.len(), 1);
        assert_eq!(reply.sources[0].title, "Mehnat kodeksi");
    }

    #[tokio::test]
    async fn test_request_shape() {
        let mock_server = MockServer::start().await;

        let mut conv = Conversation::new();
        conv.push(Role::User, "Oldingi savol", None);
        conv.push(Role::Model, "Oldingi javob", None);

        let attachment = Attachment {
            mime_type: "image/png".to_string(),
            data: "data:image/png;base64,QUJD".to_string(),
        };

        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .and(body_partial_json(json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "Oldingi savol" }] },
                    { "role": "model", "parts": [{ "text": "Oldingi javob" }] },
                    { "role": "user", "parts": [
                        { "inlineData": { "mimeType": "image/png", "data": "QUJD" } },
                        { "text": "Bu shartnoma" }
                    ] }
                ],
                "systemInstruction": { "parts": [{ "text": "Be a lawyer" }] },
                "generationConfig": { "temperature": 0.4, "maxOutputTokens": 4000 },
                "tools": [{ "googleSearch": {} }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(sse(&[text_event("OK")])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let service = GeminiService::new(settings(&mock_server.uri()));
        let reply = service
            .send_turn("Bu shartnoma", conv.messages(), Some(&attachment), |_| {})
            .await
            .expect("request body should match");
        assert_eq!(reply.text, "OK");
    }

    #[tokio::test]
    async fn test_status_error_carries_provider_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&mock_server)
            .await;

        let service = GeminiService::new(settings(&mock_server.uri()));
        let err = service.send_turn("Hi", &[], None, |_| {}).await.unwrap_err();
        match err {
            GeminiError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "INVALID_ARGUMENT: API key not valid");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_chunk_fails_after_partial_delivery() {
        let mock_server = MockServer::start().await;
        let body = format!("data: {}\n\ndata: {{broken\n\n", text_event("Qisman"));

        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let service = GeminiService::new(settings(&mock_server.uri()));
        let mut deltas = Vec::new();
        let result = service
            .send_turn("Hi", &[], None, |d| deltas.push(d.to_string()))
            .await;

        assert!(matches!(result, Err(GeminiError::Decode(_))));
        assert_eq!(deltas, vec!["Qisman"]);
    }

    #[test]
    fn test_parse_chunk_error_event() {
        let data = json!({
            "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
        })
        .to_string();

        match StreamChunk::parse(&data).unwrap_err() {
            GeminiError::Status { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "UNAVAILABLE: The model is overloaded.");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_event_fails_after_partial_delivery() {
        let mock_server = MockServer::start().await;
        let overloaded = json!({
            "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
        });

        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse(&[text_event("Qisman"), overloaded, text_event("keyin")])),
            )
            .mount(&mock_server)
            .await;

        let service = GeminiService::new(settings(&mock_server.uri()));
        let mut deltas = Vec::new();
        let result = service
            .send_turn("Hi", &[], None, |d| deltas.push(d.to_string()))
            .await;

        assert!(matches!(result, Err(GeminiError::Status { status: 503, .. })));
        assert_eq!(deltas, vec!["Qisman"]);
    }

    #[tokio::test]
    async fn test_sources_dedup_across_events() {
        let mock_server = MockServer::start().await;
        let cited = |text: &str, uri: &str, title: &str| {
            json!({
                "candidates": [{
                    "content": { "parts": [{ "text": text }] },
                    "groundingMetadata": { "groundingChunks": [
                        { "web": { "uri": uri, "title": title } }
                    ] }
                }]
            })
        };

        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse(&[
                        cited("Bir ", "https://lex.uz/docs/1", "Mehnat kodeksi"),
                        cited("ikki ", "https://lex.uz/docs/2", "Oila kodeksi"),
                        cited("uch", "https://lex.uz/docs/1", "Mehnat kodeksi (qayta)"),
                    ])),
            )
            .mount(&mock_server)
            .await;

        let service = GeminiService::new(settings(&mock_server.uri()));
        let reply = service.send_turn("Hi", &[], None, |_| {}).await.unwrap();

        assert_eq!(reply.text, "Bir ikki uch");
        assert_eq!(
            reply.sources,
            vec![
                GroundingSource {
                    title: "Mehnat kodeksi".to_string(),
                    uri: "https://lex.uz/docs/1".to_string()
                },
                GroundingSource {
                    title: "Oila kodeksi".to_string(),
                    uri: "https://lex.uz/docs/2".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let mut s = settings(&mock_server.uri());
        s.api_key = None;
        let service = GeminiService::new(s);
        let result = service.send_turn("Hi", &[], None, |_| {}).await;
        assert!(matches!(result, Err(GeminiError::MissingCredential(_))));
    }
}
