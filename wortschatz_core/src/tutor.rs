//! External tutor service: word explanations and generated example sentences
//!
//! The core only sees the [`Tutor`] trait. [`LlmTutor`] talks to an
//! OpenAI-compatible chat completions endpoint; tests inject fakes. Callers
//! that must never fail go through [`explain_or_fallback`] and
//! [`example_or_fallback`].

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, warn};

use crate::catalog::{ExampleSentence, WordEntry};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 20_000;
const MAX_RETRIES: usize = 2;
const BASE_BACKOFF_MS: u64 = 200;

pub const OFFLINE_EXPLANATION: &str = "API Key not configured. Using offline mode.";
pub const EMPTY_EXPLANATION: &str = "Açıklama üretilemedi.";
pub const CONNECTION_ERROR: &str = "Bağlantı hatası. Lütfen daha sonra tekrar deneyin.";

pub fn offline_example() -> ExampleSentence {
    ExampleSentence::new("Offline mode", "Offline mod")
}

pub fn failed_example() -> ExampleSentence {
    ExampleSentence::new("Fehler beim Laden.", "Yükleme hatası.")
}

#[derive(Debug, Error)]
pub enum TutorError {
    #[error("tutor not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyResponse,
    #[error("malformed sentence: {0}")]
    MalformedSentence(String),
}

/// Content generation capability for flashcards
pub trait Tutor {
    /// Short native-language explanation of a word, about 50 words
    fn explain(&self, word: &WordEntry) -> impl Future<Output = Result<String, TutorError>> + Send;

    /// A fresh example sentence pitched at the word's level
    fn new_example(
        &self,
        word: &WordEntry,
    ) -> impl Future<Output = Result<ExampleSentence, TutorError>> + Send;
}

/// Explanation text, or a fixed message when the tutor is unavailable
pub async fn explain_or_fallback<T: Tutor + ?Sized>(tutor: &T, word: &WordEntry) -> String {
    match tutor.explain(word).await {
        Ok(text) if text.trim().is_empty() => EMPTY_EXPLANATION.to_string(),
        Ok(text) => text.trim().to_string(),
        Err(TutorError::NotConfigured(_)) => OFFLINE_EXPLANATION.to_string(),
        Err(TutorError::EmptyResponse) => EMPTY_EXPLANATION.to_string(),
        Err(err) => {
            warn!(word = %word.id, error = %err, "explanation failed, using fallback");
            CONNECTION_ERROR.to_string()
        }
    }
}

/// Generated example, or a fixed pair when generation fails
pub async fn example_or_fallback<T: Tutor + ?Sized>(
    tutor: &T,
    word: &WordEntry,
) -> ExampleSentence {
    match tutor.new_example(word).await {
        Ok(example) => example,
        Err(TutorError::NotConfigured(_)) => offline_example(),
        Err(err) => {
            warn!(word = %word.id, error = %err, "example generation failed, using fallback");
            failed_example()
        }
    }
}

/// Parse a generated sentence, tolerating Markdown code fences around the JSON
pub fn parse_sentence(text: &str) -> Result<ExampleSentence, TutorError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(TutorError::EmptyResponse);
    }
    let sentence: ExampleSentence = serde_json::from_str(body)?;
    if sentence.target.trim().is_empty() || sentence.native.trim().is_empty() {
        return Err(TutorError::MalformedSentence(body.to_string()));
    }
    Ok(ExampleSentence::new(sentence.target.trim(), sentence.native.trim()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn explanation_prompt(word: &WordEntry) -> String {
    format!(
        "Provide a concise explanation for the German word \"{}\" ({}).\n\
         Include:\n\
         1. Nuances of meaning.\n\
         2. A common idiom or phrase using this word if applicable.\n\
         3. Keep the explanation under 50 words.\n\
         4. Output in Turkish.",
        word.target,
        word.word_type.as_str()
    )
}

fn sentence_prompt(word: &WordEntry) -> String {
    format!(
        "Generate a simple German sentence using the word \"{}\".\n\
         Target CEFR level: {}.\n\
         Return valid JSON only in this format: {{ \"target\": \"...\", \"native\": \"...\" }} \
         where target is German and native is the Turkish translation.",
        word.target, word.level
    )
}

const SYSTEM_PROMPT: &str = "Act as a German language tutor for a Turkish speaker.";

#[derive(Debug, Clone)]
pub struct TutorConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

impl TutorConfig {
    /// Read `TUTOR_API_KEY` (or `API_KEY`), `TUTOR_MODEL`, `TUTOR_API_ENDPOINT`
    /// and `TUTOR_TIMEOUT_MS`
    pub fn from_env() -> Self {
        let api_key = env_string("TUTOR_API_KEY").or_else(|| env_string("API_KEY"));
        let model = env_string("TUTOR_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_endpoint = normalize_endpoint(
            env_string("TUTOR_API_ENDPOINT").unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
        );
        let timeout =
            Duration::from_millis(env_u64("TUTOR_TIMEOUT_MS").unwrap_or(DEFAULT_TIMEOUT_MS));
        Self {
            api_key,
            model,
            api_endpoint,
            timeout,
        }
    }

    pub fn offline() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Tutor backed by a chat completions API
#[derive(Clone)]
pub struct LlmTutor {
    config: TutorConfig,
    client: reqwest::Client,
}

impl LlmTutor {
    pub fn new(config: TutorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn from_env() -> Self {
        Self::new(TutorConfig::from_env())
    }

    pub fn is_available(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.config.api_key.as_deref().filter(|v| !v.trim().is_empty())
    }

    async fn complete(&self, user: String, json_mode: bool) -> Result<String, TutorError> {
        let api_key = self.api_key().ok_or(TutorError::NotConfigured("TUTOR_API_KEY"))?;
        let url = format!("{}/chat/completions", self.config.api_endpoint.trim_end_matches('/'));
        let messages = [
            ChatMessage {
                role: "system".into(),
                content: SYSTEM_PROMPT.into(),
            },
            ChatMessage {
                role: "user".into(),
                content: user,
            },
        ];
        let mut payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false
        });
        if json_mode {
            payload["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let response = self.post_with_retry(&url, api_key, &payload).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(TutorError::EmptyResponse)
    }

    async fn post_with_retry(
        &self,
        url: &str,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> Result<ChatResponse, TutorError> {
        let mut retry = 0;
        loop {
            let err = match self.client.post(url).bearer_auth(api_key).json(payload).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await?;
                        return serde_json::from_slice(&bytes).map_err(|e| {
                            error!(error = %e, "failed to parse tutor response");
                            TutorError::Json(e)
                        });
                    }
                    let body = resp.text().await.unwrap_or_default();
                    if !is_retryable(status) {
                        return Err(TutorError::HttpStatus { status, body });
                    }
                    TutorError::HttpStatus { status, body }
                }
                Err(e) => TutorError::Request(e),
            };

            if retry >= MAX_RETRIES {
                return Err(err);
            }
            warn!(retry, error = %err, "tutor request failed, retrying");
            sleep(Duration::from_millis(BASE_BACKOFF_MS * (1 << retry))).await;
            retry += 1;
        }
    }
}

impl Tutor for LlmTutor {
    async fn explain(&self, word: &WordEntry) -> Result<String, TutorError> {
        self.complete(explanation_prompt(word), false).await
    }

    async fn new_example(&self, word: &WordEntry) -> Result<ExampleSentence, TutorError> {
        let text = self.complete(sentence_prompt(word), true).await?;
        parse_sentence(&text)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn normalize_endpoint(endpoint: String) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use crate::catalog::WordCatalog;

    fn haus() -> WordEntry {
        WordEntry::clone(WordCatalog::builtin().unwrap().get("1").unwrap())
    }

    #[test]
    fn parses_plain_and_fenced_json() {
        let plain =
            parse_sentence(r#"{"target": "Ich sehe ein Haus.", "native": "Bir ev görüyorum."}"#)
                .unwrap();
        assert_eq!(plain.target, "Ich sehe ein Haus.");

        let fenced =
            parse_sentence("```json\n{\"german\": \"Das Haus.\", \"turkish\": \"Ev.\"}\n```")
                .unwrap();
        assert_eq!(fenced, ExampleSentence::new("Das Haus.", "Ev."));
    }

    #[test]
    fn rejects_malformed_sentences() {
        assert!(matches!(parse_sentence(""), Err(TutorError::EmptyResponse)));
        assert!(matches!(parse_sentence("Haus"), Err(TutorError::Json(_))));
        assert!(matches!(
            parse_sentence(r#"{"target": "", "native": "Ev"}"#),
            Err(TutorError::MalformedSentence(_))
        ));
        assert!(matches!(parse_sentence(r#"{"target": "Haus"}"#), Err(TutorError::Json(_))));
    }

    #[test]
    fn prompts_name_the_word() {
        let word = haus();
        assert!(explanation_prompt(&word).contains("\"Haus\" (noun)"));
        assert!(sentence_prompt(&word).contains("Target CEFR level: A1"));
    }

    #[test]
    fn endpoint_normalization() {
        assert_eq!(normalize_endpoint("https://host/".into()), "https://host/v1");
        assert_eq!(normalize_endpoint("https://host/v1".into()), "https://host/v1");
    }

    #[tokio::test]
    async fn unconfigured_tutor_falls_back_to_offline_mode() {
        let tutor = LlmTutor::new(TutorConfig::offline());
        assert!(!tutor.is_available());
        let word = haus();
        assert!(matches!(tutor.explain(&word).await, Err(TutorError::NotConfigured(_))));
        assert_eq!(explain_or_fallback(&tutor, &word).await, OFFLINE_EXPLANATION);
        assert_eq!(example_or_fallback(&tutor, &word).await, offline_example());
    }

    #[tokio::test]
    async fn failures_become_fixed_messages() {
        let word = haus();
        let tutor = broken();
        assert_eq!(explain_or_fallback(&tutor, &word).await, CONNECTION_ERROR);
        assert_eq!(example_or_fallback(&tutor, &word).await, failed_example());
    }

    #[tokio::test]
    async fn empty_explanation_uses_placeholder() {
        let tutor = ScriptedTutor {
            explanation: || Ok("   ".to_string()),
            example: || Err(TutorError::EmptyResponse),
        };
        let word = haus();
        assert_eq!(explain_or_fallback(&tutor, &word).await, EMPTY_EXPLANATION);
        assert_eq!(example_or_fallback(&tutor, &word).await, failed_example());
    }

    #[tokio::test]
    async fn working_tutor_passes_results_through() {
        let word = haus();
        let tutor = working();
        assert_eq!(explain_or_fallback(&tutor, &word).await, "Ev, oturulan yer demektir.");
        assert_eq!(example_or_fallback(&tutor, &word).await.native, "Ev büyük.");
    }
}
