use crate::api::read_json;
use crate::error::InvokeError;
use crate::http;
use async_trait::async_trait;
use codehealth_config::{Config, ACE_API_URL};
use reqwest::Client;
use serde_json::Value;

#[async_trait]
pub trait RefactorClient: Send + Sync {
    /// Submits one refactoring request; a single attempt.
    async fn post_refactor(&self, payload: &Value) -> Result<Value, InvokeError>;
}

/// The CodeScene ACE auto-refactoring service.
#[derive(Debug, Clone)]
pub struct AceClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl AceClient {
    pub fn new(config: &Config) -> Result<Self, InvokeError> {
        let client = http::build_client(config).map_err(InvokeError::from_transport)?;
        Ok(Self::with_client(client, ACE_API_URL, config.ace_access_token.clone()))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn refactor_url(&self) -> String {
        format!("{}/api/refactor", self.base_url)
    }
}

#[async_trait]
impl RefactorClient for AceClient {
    async fn post_refactor(&self, payload: &Value) -> Result<Value, InvokeError> {
        let url = self.refactor_url();
        log::debug!("POST {url}");
        let mut request = self.client.post(&url).json(payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(InvokeError::from_transport)?;
        // 400 bodies carry ACE's diagnostics and are kept in the error.
        read_json(response)
            .await
            .inspect_err(|err| log::warn!("refactor request failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn posts_to_the_refactor_endpoint() {
        let client = AceClient::with_client(Client::new(), "https://devtools.codescene.io/", None);
        assert_eq!(client.refactor_url(), "https://devtools.codescene.io/api/refactor");
    }

    #[test]
    fn uses_the_ace_token() {
        let config = Config::from_lookup(|key| match key {
            "CS_ACE_ACCESS_TOKEN" => Some("ace".to_string()),
            "CS_ACCESS_TOKEN" => Some("cs".to_string()),
            _ => None,
        });
        let client = AceClient::new(&config).expect("client");
        assert_eq!(client.token.as_deref(), Some("ace"));
    }
}
