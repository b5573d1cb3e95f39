use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

/// The three routes this client talks to, relative to the `/v1` base URL.
#[derive(Debug, Clone, PartialEq, Copy)]
pub enum Endpoint {
    Models,
    HealthReady,
    ChatCompletions,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Models => "models",
            Endpoint::HealthReady => "health/ready",
            Endpoint::ChatCompletions => "chat/completions",
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            Endpoint::Models => Duration::from_secs(30),
            Endpoint::HealthReady => Duration::from_secs(15),
            Endpoint::ChatCompletions => Duration::from_secs(60),
        }
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path())
    }
}

/// JSON content type always, bearer auth only when a key is configured.
pub fn headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if !api_key.is_empty() {
        match HeaderValue::from_str(&format!("Bearer {}", api_key)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("API key contains characters not allowed in a header, sending without it"),
        }
    }
    headers
}
