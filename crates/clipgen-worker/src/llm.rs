//! OpenRouter chat-completions client for highlight extraction.
//!
//! The model is asked for a list of notable moments, each a single point in
//! time with a short reason. Moments are widened into clip ranges here.

use std::time::Duration;

use clipgen_models::HighlightDraft;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{WorkerError, WorkerResult};
use crate::sources::AnalysisInput;

/// Length of the clip range built around each moment.
pub const MOMENT_WINDOW_SECS: f64 = 30.0;

/// OpenRouter client configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    /// Sent as `HTTP-Referer` for OpenRouter attribution
    pub referer: String,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemini-2.0-flash-exp:free".to_string(),
            timeout: Duration::from_secs(60),
            referer: "http://localhost:8000".to_string(),
        }
    }

    /// Returns `None` when `OPENROUTER_API_KEY` is unset.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let defaults = Self::new(api_key);

        Some(Self {
            base_url: std::env::var("OPENROUTER_BASE_URL").unwrap_or(defaults.base_url.clone()),
            model: std::env::var("OPENROUTER_MODEL").unwrap_or(defaults.model.clone()),
            referer: std::env::var("PUBLIC_BASE_URL").unwrap_or(defaults.referer.clone()),
            ..defaults
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// One notable moment as returned by the model.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Moment {
    pub seconds: f64,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct MomentsResponse {
    #[serde(default)]
    timestamps: Vec<Moment>,
}

/// OpenRouter API client.
#[derive(Clone)]
pub struct OpenRouterClient {
    http: Client,
    config: LlmConfig,
}

impl OpenRouterClient {
    pub fn new(config: LlmConfig) -> WorkerResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WorkerError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Ask the model for highlight ranges in `input`.
    pub async fn find_highlights(&self, input: &AnalysisInput) -> WorkerResult<Vec<HighlightDraft>> {
        let moments = self.find_moments(input).await?;
        info!(model = %self.config.model, count = moments.len(), "LLM returned moments");
        Ok(moments_to_drafts(moments, input.duration))
    }

    async fn find_moments(&self, input: &AnalysisInput) -> WorkerResult<Vec<Moment>> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(input),
            }],
            temperature: 0.7,
            max_tokens: 2048,
        };

        debug!("Sending analysis request to {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", "ClipGenius")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WorkerError::ai_failed("AI request timed out. Please try again.")
                } else {
                    WorkerError::ai_failed(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WorkerError::ai_failed(e.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(WorkerError::ai_failed(format!("OpenRouter API error: {}", detail)));
        }

        let chat: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| WorkerError::ai_failed(format!("Failed to parse AI response: {}", e)))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| WorkerError::ai_failed("AI response contained no choices"))?;

        parse_moments(&content)
    }
}

fn build_prompt(input: &AnalysisInput) -> String {
    let duration = if input.duration > 0 {
        format!("{} seconds", input.duration)
    } else {
        "unknown".to_string()
    };

    format!(
        r#"You are a video content analyst. Analyze this YouTube video transcript and find the most interesting, important, or notable moments.

TRANSCRIPT (each line is prefixed with its start time in seconds):
{transcript}

VIDEO LENGTH: {duration}

YOUR TASK:
1. Identify 5-8 of the most interesting moments in this video
2. For each moment, provide the timestamp in seconds and a brief explanation

RESPOND IN THIS EXACT JSON FORMAT (no other text):
{{
    "timestamps": [
        {{
            "seconds": 0,
            "time": "0:00",
            "reason": "Brief explanation of why this moment is interesting"
        }}
    ]
}}

RULES:
- Seconds must be a number
- Time must be formatted as "M:SS" or "H:MM:SS"
- Reason should be 10-20 words explaining why this moment matters
- Order timestamps from earliest to latest
- Only return valid JSON, no markdown or other formatting"#,
        transcript = input.transcript,
        duration = duration,
    )
}

/// Parse the model's reply, tolerating a surrounding markdown code fence.
pub fn parse_moments(content: &str) -> WorkerResult<Vec<Moment>> {
    let text = strip_code_fence(content);
    let parsed: MomentsResponse = serde_json::from_str(text)
        .map_err(|e| WorkerError::ai_failed(format!("Failed to parse AI response: {}", e)))?;
    Ok(parsed.timestamps)
}

fn strip_code_fence(content: &str) -> &str {
    let text = content.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    match rest.find("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

/// Widen each moment into `[seconds, seconds + window)`, clipped to the
/// source duration when known. Moments at or past the end produce an empty
/// range and are dropped when highlights are built.
pub fn moments_to_drafts(moments: Vec<Moment>, duration: u32) -> Vec<HighlightDraft> {
    moments
        .into_iter()
        .map(|m| {
            let start = m.seconds.max(0.0);
            let mut end = start + MOMENT_WINDOW_SECS;
            if duration > 0 {
                end = end.min(f64::from(duration));
            }
            HighlightDraft::new(start, end, m.reason)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn input() -> AnalysisInput {
        AnalysisInput {
            transcript: "[0s] hello [30s] the hook ".to_string(),
            max_timestamp: 30,
            duration: 212,
            title: None,
        }
    }

    fn client(server: &MockServer) -> OpenRouterClient {
        let mut config = LlmConfig::new("test-key");
        config.base_url = server.uri();
        OpenRouterClient::new(config).unwrap()
    }

    #[test]
    fn test_parse_plain_json() {
        let moments = parse_moments(r#"{"timestamps":[{"seconds":30,"time":"0:30","reason":"Hook"}]}"#).unwrap();
        assert_eq!(moments.len(), 1);
        assert_eq!(moments[0].seconds, 30.0);
        assert_eq!(moments[0].time.as_deref(), Some("0:30"));
    }

    #[test]
    fn test_parse_strips_code_fence() {
        let content = "```json\n{\"timestamps\":[{\"seconds\":12.5,\"reason\":\"Reveal\"}]}\n```";
        let moments = parse_moments(content).unwrap();
        assert_eq!(moments[0].seconds, 12.5);
        assert_eq!(moments[0].reason, "Reveal");

        let bare_fence = "```\n{\"timestamps\":[]}\n```";
        assert!(parse_moments(bare_fence).unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_fails() {
        let err = parse_moments("Sure! Here are the moments").unwrap_err();
        assert!(err.to_string().contains("Failed to parse AI response"));
    }

    #[test]
    fn test_moments_bounded_by_duration() {
        let moments = vec![
            Moment { seconds: 10.0, time: None, reason: "a".into() },
            Moment { seconds: 200.0, time: None, reason: "b".into() },
            Moment { seconds: 212.0, time: None, reason: "c".into() },
        ];
        let drafts = moments_to_drafts(moments, 212);

        assert_eq!(drafts[0].start_timestamp, 10.0);
        assert_eq!(drafts[0].end_timestamp, 40.0);
        assert_eq!(drafts[1].end_timestamp, 212.0);
        // Empty range, filtered out later
        assert!(drafts[2].clone().into_highlight("dQw4w9WgXcQ").is_none());
    }

    #[test]
    fn test_moments_unknown_duration() {
        let drafts = moments_to_drafts(
            vec![Moment { seconds: 500.0, time: None, reason: "x".into() }],
            0,
        );
        assert_eq!(drafts[0].end_timestamp, 530.0);
    }

    #[tokio::test]
    async fn test_find_highlights_round_trip() {
        let server = MockServer::start().await;
        let content = "```json\n{\"timestamps\":[{\"seconds\":30,\"time\":\"0:30\",\"reason\":\"The hook lands\"}]}\n```";

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("x-title", "ClipGenius"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": content } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let drafts = client(&server).find_highlights(&input()).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].start_timestamp, 30.0);
        assert_eq!(drafts[0].end_timestamp, 60.0);
        assert_eq!(drafts[0].reason, "The hook lands");
    }

    #[tokio::test]
    async fn test_api_error_detail_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit exceeded" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).find_highlights(&input()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "AI analysis failed: OpenRouter API error: Rate limit exceeded"
        );
    }
}
