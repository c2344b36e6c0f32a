//! Text-generation collaborator.
//!
//! The analysis orchestrator only sees [`TextGenerator`]; [`HttpTextGenerator`]
//! is the production implementation, one request per call with no retry.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};

/// Turns a prompt into generated text.
pub trait TextGenerator: Send + Sync + 'static {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Status reported by the local model server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalServerStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
}

impl LocalServerStatus {
    pub fn online(&self) -> bool {
        self.status == "online"
    }
}

/// HTTP-backed generator for every configured provider.
pub struct HttpTextGenerator {
    provider: LlmProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    http: reqwest::Client,
}

impl HttpTextGenerator {
    /// Build a generator; remote providers require a key.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.resolved_api_key();
        if config.provider.requires_api_key() && api_key.is_none() {
            return Err(Error::Config(format!(
                "llm.api_key (or {}) is required for provider {}",
                config.provider.api_key_env().unwrap_or("provider env var"),
                config.provider.as_str()
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::Llm(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            provider: config.provider,
            model: config.model.clone(),
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            http,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Query `{endpoint}/status` on the local model server.
    pub async fn check_local_status(&self) -> Result<LocalServerStatus> {
        if self.provider != LlmProvider::Local {
            return Err(Error::Config(format!(
                "status check is only available for the local provider, not {}",
                self.provider.as_str()
            )));
        }

        let url = format!("{}/status", self.endpoint);
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("local server unreachable: {e}")))?;
        let body = read_success_body(resp, "local server").await?;
        let status: LocalServerStatus = serde_json::from_str(&body)
            .map_err(|e| Error::Llm(format!("local server sent malformed status: {e}")))?;

        tracing::debug!(
            status = %status.status,
            model_loaded = status.model_loaded,
            "Local model server status"
        );
        Ok(status)
    }

    fn bearer_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = self.api_key.as_deref() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| Error::Llm(format!("invalid auth header: {e}")))?,
            );
        }
        Ok(headers)
    }

    async fn post(&self, url: String, body: serde_json::Value) -> Result<serde_json::Value> {
        let label = self.provider.as_str();
        let resp = self
            .http
            .post(url)
            .headers(self.bearer_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("{label} request failed: {e}")))?;
        let body = read_success_body(resp, label).await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Llm(format!("{label} sent malformed JSON: {e}")))
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let label = self.provider.as_str();
        tracing::info!(provider = label, prompt_chars = prompt.len(), "Requesting generation");

        let text = match self.provider {
            LlmProvider::Local => {
                let json = self
                    .post(
                        format!("{}/generate", self.endpoint),
                        json!({
                            "prompt": prompt,
                            "max_length": self.max_tokens,
                            "temperature": self.temperature,
                        }),
                    )
                    .await?;
                json.get("response")
                    .and_then(|v| v.as_str())
                    .map(ToString::to_string)
                    .ok_or_else(|| {
                        Error::Llm("local response missing string field `response`".to_string())
                    })
            }
            LlmProvider::HuggingFace => {
                let json = self
                    .post(
                        self.endpoint.clone(),
                        json!({
                            "inputs": prompt,
                            "parameters": {
                                "max_new_tokens": self.max_tokens,
                                "temperature": self.temperature,
                                "return_full_text": false,
                            },
                        }),
                    )
                    .await?;
                json.as_array()
                    .and_then(|arr| arr.first())
                    .and_then(|v| v.get("generated_text"))
                    .and_then(|v| v.as_str())
                    .map(ToString::to_string)
                    .ok_or_else(|| {
                        Error::Llm("huggingface response missing [0].generated_text".to_string())
                    })
            }
            LlmProvider::Ollama => {
                let json = self
                    .post(
                        format!("{}/api/generate", self.endpoint),
                        json!({
                            "model": self.model,
                            "prompt": prompt,
                            "stream": false,
                            "options": {
                                "num_predict": self.max_tokens,
                                "temperature": self.temperature,
                            },
                        }),
                    )
                    .await?;
                json.get("response")
                    .and_then(|v| v.as_str())
                    .map(ToString::to_string)
                    .ok_or_else(|| {
                        Error::Llm("ollama response missing string field `response`".to_string())
                    })
            }
            LlmProvider::OpenAI => {
                let json = self
                    .post(
                        format!("{}/v1/chat/completions", self.endpoint),
                        json!({
                            "model": self.model,
                            "max_tokens": self.max_tokens,
                            "temperature": self.temperature,
                            "messages": [{ "role": "user", "content": prompt }],
                        }),
                    )
                    .await?;
                json.get("choices")
                    .and_then(|v| v.as_array())
                    .and_then(|arr| arr.first())
                    .and_then(|v| v.get("message"))
                    .and_then(|v| v.get("content"))
                    .and_then(|v| v.as_str())
                    .map(ToString::to_string)
                    .ok_or_else(|| {
                        Error::Llm(
                            "openai response missing choices[0].message.content".to_string(),
                        )
                    })
            }
        }?;

        tracing::info!(provider = label, response_chars = text.len(), "Generation complete");
        Ok(text)
    }
}

impl TextGenerator for HttpTextGenerator {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send {
        self.generate_text(prompt)
    }
}

async fn read_success_body(resp: reqwest::Response, label: &str) -> Result<String> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| Error::Llm(format!("{label} read body failed: {e}")))?;
    if !status.is_success() {
        return Err(Error::Llm(format!(
            "{} returned {}: {}",
            label,
            status.as_u16(),
            body
        )));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    fn config(provider: LlmProvider, endpoint: &str) -> LlmConfig {
        LlmConfig {
            provider,
            endpoint: Some(endpoint.to_string()),
            api_key: Some("test-key".to_string()),
            max_tokens: 256,
            ..Default::default()
        }
    }

    #[test]
    fn test_remote_provider_requires_key() {
        let config = LlmConfig {
            provider: LlmProvider::HuggingFace,
            api_key: Some(String::new()),
            ..Default::default()
        };
        // Only assert when the environment does not supply a key
        if std::env::var("HF_API_KEY").is_err() {
            assert!(matches!(
                HttpTextGenerator::new(&config),
                Err(Error::Config(_))
            ));
        }
        assert!(HttpTextGenerator::new(&LlmConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_local_generate_request_and_response() {
        let (url, server) = serve_once(200, r#"{"response":"Mondays are weak."}"#).await;
        let generator = HttpTextGenerator::new(&config(LlmProvider::Local, &url)).unwrap();

        let text = generator.generate("Analyze").await.unwrap();
        assert_eq!(text, "Mondays are weak.");

        let request = server.await.unwrap();
        assert_eq!(request.request_line, "POST /generate HTTP/1.1");
        let body = request.json();
        assert_eq!(body["prompt"], "Analyze");
        assert_eq!(body["max_length"], 256);
        assert!(request.header("authorization").is_none());
    }

    #[tokio::test]
    async fn test_huggingface_sends_bearer_and_reads_first_generation() {
        let (url, server) = serve_once(200, r#"[{"generated_text":"Fine."}]"#).await;
        let generator = HttpTextGenerator::new(&config(LlmProvider::HuggingFace, &url)).unwrap();

        assert_eq!(generator.generate("p").await.unwrap(), "Fine.");

        let request = server.await.unwrap();
        assert_eq!(request.header("authorization"), Some("Bearer test-key"));
        let body = request.json();
        assert_eq!(body["inputs"], "p");
        assert_eq!(body["parameters"]["return_full_text"], false);
    }

    #[tokio::test]
    async fn test_openai_chat_completion() {
        let (url, server) =
            serve_once(200, r#"{"choices":[{"message":{"content":"Done."}}]}"#).await;
        let generator = HttpTextGenerator::new(&config(LlmProvider::OpenAI, &url)).unwrap();

        assert_eq!(generator.generate("p").await.unwrap(), "Done.");
        let request = server.await.unwrap();
        assert_eq!(request.request_line, "POST /v1/chat/completions HTTP/1.1");
        assert_eq!(request.json()["messages"][0]["content"], "p");
    }

    #[tokio::test]
    async fn test_non_success_status_is_llm_error() {
        let (url, _server) = serve_once(500, r#"{"error":"model not loaded"}"#).await;
        let generator = HttpTextGenerator::new(&config(LlmProvider::Ollama, &url)).unwrap();

        let err = generator.generate("p").await.unwrap_err();
        assert!(matches!(err, Error::Llm(ref m) if m.contains("500")));
        assert!(err.is_external());
    }

    #[tokio::test]
    async fn test_missing_field_is_llm_error() {
        let (url, _server) = serve_once(200, r#"{"text":"wrong field"}"#).await;
        let generator = HttpTextGenerator::new(&config(LlmProvider::Local, &url)).unwrap();
        assert!(matches!(
            generator.generate("p").await,
            Err(Error::Llm(_))
        ));
    }

    #[tokio::test]
    async fn test_local_status() {
        let (url, server) =
            serve_once(200, r#"{"status":"online","model_loaded":true,"server_version":"1.0.0"}"#)
                .await;
        let generator = HttpTextGenerator::new(&config(LlmProvider::Local, &url)).unwrap();

        let status = generator.check_local_status().await.unwrap();
        assert!(status.online());
        assert!(status.model_loaded);
        assert_eq!(server.await.unwrap().request_line, "GET /status HTTP/1.1");

        let ollama = HttpTextGenerator::new(&config(LlmProvider::Ollama, &url)).unwrap();
        assert!(matches!(
            ollama.check_local_status().await,
            Err(Error::Config(_))
        ));
    }
}
