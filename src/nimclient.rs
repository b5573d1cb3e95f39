use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::ChatMessage;
use crate::endpoint::{self, Endpoint};
use crate::settings::Settings;

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 512;

#[derive(Debug, Error)]
pub enum NimError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("{status} for url: {url}{}", detail(.body))]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },
    #[error("No models returned from /v1/models")]
    NoModels,
    #[error("No choices in completion response")]
    NoChoices,
}

fn detail(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({})", body)
    }
}

#[derive(Debug, Deserialize)]
pub struct ModelData {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub data: Vec<ModelData>,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReplyMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// Client for an OpenAI-compatible NIM endpoint, built from a settings snapshot.
#[derive(Clone)]
pub struct NimClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NimClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: Client::new(),
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>, NimError> {
        let response = self.get(Endpoint::Models).await?;
        let models: ModelsResponse = response.json().await?;
        let ids: Vec<String> = models
            .data
            .into_iter()
            .filter_map(|m| m.id)
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(NimError::NoModels);
        }
        Ok(ids)
    }

    pub async fn health_ready(&self) -> Result<(), NimError> {
        self.get(Endpoint::HealthReady).await?;
        Ok(())
    }

    /// One non-streaming completion over the full message history.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, NimError> {
        let route = Endpoint::ChatCompletions;
        let url = route.url(&self.base_url);
        tracing::info!("Sending {} messages to {} (model {})", messages.len(), url, model);

        let request = ChatRequest {
            model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: false,
        };
        let response = self
            .client
            .post(&url)
            .headers(endpoint::headers(&self.api_key))
            .json(&request)
            .timeout(route.timeout())
            .send()
            .await?;
        let response = check_status(response, url).await?;

        let completion: ChatResponse = response.json().await?;
        let choice = completion.choices.into_iter().next().ok_or(NimError::NoChoices)?;
        Ok(choice.message.content.unwrap_or_default())
    }

    async fn get(&self, route: Endpoint) -> Result<Response, NimError> {
        let url = route.url(&self.base_url);
        tracing::info!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .headers(endpoint::headers(&self.api_key))
            .timeout(route.timeout())
            .send()
            .await?;
        check_status(response, url).await
    }
}

async fn check_status(response: Response, url: String) -> Result<Response, NimError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(NimError::Status { status, url, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{closed_base_url, request_body, serve_once};

    fn client_for(base_url: String, api_key: &str) -> NimClient {
        NimClient::new(&Settings {
            base_url,
            api_key: api_key.to_string(),
            ..Settings::default()
        })
    }

    #[tokio::test]
    async fn list_models_reads_ids_and_sends_bearer() {
        let body = r#"{"object":"list","data":[{"id":"meta/llama3-8b-instruct"},{"object":"model"},{"id":""},{"id":"mistralai/mixtral-8x7b"}]}"#;
        let (base_url, server) = serve_once("200 OK", body).await;

        let models = client_for(base_url, "nvapi-key").list_models().await.unwrap();
        assert_eq!(models, ["meta/llama3-8b-instruct", "mistralai/mixtral-8x7b"]);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /v1/models HTTP/1.1"), "{}", request);
        let lowered = request.to_lowercase();
        assert!(lowered.contains("authorization: bearer nvapi-key"));
        assert!(lowered.contains("content-type: application/json"));
    }

    #[tokio::test]
    async fn empty_model_list_is_an_error() {
        let (base_url, _server) = serve_once("200 OK", r#"{"data":[]}"#).await;
        let err = client_for(base_url, "").list_models().await.unwrap_err();
        assert!(matches!(err, NimError::NoModels));
        assert_eq!(err.to_string(), "No models returned from /v1/models");
    }

    #[tokio::test]
    async fn missing_data_key_is_an_empty_list() {
        let (base_url, _server) = serve_once("200 OK", "{}").await;
        let err = client_for(base_url, "").list_models().await.unwrap_err();
        assert!(matches!(err, NimError::NoModels));
    }

    #[tokio::test]
    async fn no_key_means_no_authorization_header() {
        let (base_url, server) = serve_once("200 OK", r#"{"status":"ready"}"#).await;
        client_for(base_url, "").health_ready().await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /v1/health/ready HTTP/1.1"), "{}", request);
        assert!(!request.to_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn unhealthy_status_carries_code_and_body() {
        let (base_url, _server) = serve_once("503 Service Unavailable", r#"{"status":"not ready"}"#).await;
        let err = client_for(base_url, "").health_ready().await.unwrap_err();
        match &err {
            NimError::Status { status, url, body } => {
                assert_eq!(*status, StatusCode::SERVICE_UNAVAILABLE);
                assert!(url.ends_with("/v1/health/ready"));
                assert!(body.contains("not ready"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().starts_with("503 Service Unavailable for url: http://127.0.0.1:"));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_request_error() {
        let err = client_for(closed_base_url(), "").health_ready().await.unwrap_err();
        assert!(matches!(err, NimError::Request(_)));
    }

    #[tokio::test]
    async fn chat_posts_history_and_returns_first_choice() {
        let reply = r#"{"id":"cmpl-1","choices":[{"index":0,"message":{"role":"assistant","content":"Hello there!"},"finish_reason":"stop"}]}"#;
        let (base_url, server) = serve_once("200 OK", reply).await;

        let messages = vec![ChatMessage::system("Be kind."), ChatMessage::user("hi")];
        let content = client_for(base_url, "k").chat("meta/llama3-8b-instruct", &messages).await.unwrap();
        assert_eq!(content, "Hello there!");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions HTTP/1.1"), "{}", request);
        let body = request_body(&request);
        assert_eq!(body["model"], "meta/llama3-8b-instruct");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["stream"], false);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(
            body["messages"],
            serde_json::json!([
                {"role": "system", "content": "Be kind."},
                {"role": "user", "content": "hi"}
            ])
        );
    }

    #[tokio::test]
    async fn chat_without_choices_fails() {
        let (base_url, _server) = serve_once("200 OK", r#"{"choices":[]}"#).await;
        let err = client_for(base_url, "").chat("m", &[ChatMessage::user("x")]).await.unwrap_err();
        assert!(matches!(err, NimError::NoChoices));
    }

    #[tokio::test]
    async fn null_content_is_an_empty_reply() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let (base_url, _server) = serve_once("200 OK", body).await;
        let content = client_for(base_url, "").chat("m", &[ChatMessage::user("x")]).await.unwrap();
        assert_eq!(content, "");
    }

    #[tokio::test]
    async fn rejected_key_surfaces_as_status_error() {
        let (base_url, _server) = serve_once("401 Unauthorized", "").await;
        let err = client_for(base_url, "bad").chat("m", &[ChatMessage::user("x")]).await.unwrap_err();
        assert!(matches!(err, NimError::Status { status, .. } if status == StatusCode::UNAUTHORIZED));
        assert!(err.to_string().ends_with("/v1/chat/completions"));
    }
}
