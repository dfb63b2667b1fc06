//! Model adapter boundary
//!
//! The aggregator only ever talks to a [`ModelAdapter`]. Two implementations
//! ship: [`HeuristicOnly`] never answers, [`HttpModelAdapter`] talks to an
//! Ollama-style `/api/generate` endpoint.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ModelUnavailable;

/// One file's worth of model work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelQuery {
    /// Source file the excerpt comes from
    pub file: PathBuf,
    /// Module of that file, for resolving relative symbol names
    pub module: String,
    /// Bounded source excerpt
    pub excerpt: String,
    /// Task description, symbol list and allowed categories
    pub instructions: String,
    /// Per-query timeout
    pub timeout: Duration,
}

impl ModelQuery {
    /// Prompt text sent to a text-completion model
    #[must_use]
    pub fn prompt(&self) -> String {
        format!(
            "{}\n\nFile: {}\n```\n{}\n```\n",
            self.instructions,
            self.file.display(),
            self.excerpt
        )
    }
}

/// A finding as the model phrased it, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedFinding {
    /// Symbol name, absolute (`m:A.b`) or relative to the queried file
    pub symbol: String,
    /// Category as written by the model
    pub category: String,
    /// Explanation
    #[serde(default)]
    pub rationale: String,
}

/// What came back from the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    /// Nothing to add
    Empty,
    /// Unstructured text, possibly containing JSON
    Text(String),
    /// Already structured findings
    Findings(Vec<SuggestedFinding>),
}

/// Injected model capability
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Ask for findings on one file
    ///
    /// # Errors
    /// Returns [`ModelUnavailable`] when no usable reply arrives
    async fn query(&self, query: ModelQuery) -> Result<ModelReply, ModelUnavailable>;
}

/// Adapter used when no model is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicOnly;

#[async_trait::async_trait]
impl ModelAdapter for HeuristicOnly {
    async fn query(&self, _query: ModelQuery) -> Result<ModelReply, ModelUnavailable> {
        Ok(ModelReply::Empty)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Adapter for a local model server exposing `POST /api/generate`
#[derive(Debug, Clone)]
pub struct HttpModelAdapter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl HttpModelAdapter {
    /// Default endpoint of a local model server
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:11434";

    /// Adapter for `model` served at `endpoint`
    #[must_use]
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    /// Builder: custom HTTP client
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Model identifier
    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/api/generate", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl ModelAdapter for HttpModelAdapter {
    async fn query(&self, query: ModelQuery) -> Result<ModelReply, ModelUnavailable> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: query.prompt(),
            stream: false,
            format: "json",
        };
        tracing::debug!(model = %self.model, file = %query.file.display(), "querying model");

        let response = self
            .client
            .post(self.url())
            .timeout(query.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelUnavailable::Timeout(query.timeout)
                } else {
                    ModelUnavailable::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModelUnavailable::Status(status.as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelUnavailable::Decode(e.to_string()))?;

        if body.response.trim().is_empty() {
            Ok(ModelReply::Empty)
        } else {
            Ok(ModelReply::Text(body.response))
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn query() -> ModelQuery {
        ModelQuery {
            file: PathBuf::from("app/calc.py"),
            module: "app.calc".to_string(),
            excerpt: "def add(a, b):\n    return a + b\n".to_string(),
            instructions: "List risks.".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn prompt_carries_instructions_and_excerpt() {
        let prompt = query().prompt();
        assert!(prompt.starts_with("List risks."));
        assert!(prompt.contains("File: app/calc.py"));
        assert!(prompt.contains("def add(a, b):"));
    }

    #[tokio::test]
    async fn heuristic_only_never_answers() {
        assert_eq!(HeuristicOnly.query(query()).await, Ok(ModelReply::Empty));
    }

    #[tokio::test]
    async fn http_adapter_reads_response_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "codellama",
                "stream": false,
                "format": "json",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "codellama",
                "response": "{\"findings\": []}",
                "done": true,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = HttpModelAdapter::new(format!("{}/", server.uri()), "codellama");
        let reply = adapter.query(query()).await.unwrap();
        assert_eq!(reply, ModelReply::Text("{\"findings\": []}".to_string()));
    }

    #[tokio::test]
    async fn http_adapter_maps_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let adapter = HttpModelAdapter::new(server.uri(), "codellama");
        assert_eq!(adapter.query(query()).await, Err(ModelUnavailable::Status(503)));

        let garbled = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&garbled)
            .await;
        let adapter = HttpModelAdapter::new(garbled.uri(), "codellama");
        assert!(matches!(adapter.query(query()).await, Err(ModelUnavailable::Decode(_))));
    }

    #[tokio::test]
    async fn http_adapter_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;
        let adapter = HttpModelAdapter::new(server.uri(), "codellama");
        let slow = ModelQuery {
            timeout: Duration::from_millis(100),
            ..query()
        };
        assert_eq!(
            adapter.query(slow).await,
            Err(ModelUnavailable::Timeout(Duration::from_millis(100)))
        );
    }

    #[tokio::test]
    async fn empty_response_is_empty_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": "  " })))
            .mount(&server)
            .await;
        let adapter = HttpModelAdapter::new(server.uri(), "codellama");
        assert_eq!(adapter.query(query()).await, Ok(ModelReply::Empty));
    }
}
