use crate::error::ToolError;
use codehealth_config::Config;
use codehealth_invoker::{build_client, InvokeError};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("telemetry: {0}")]
pub struct TelemetryError(pub String);

/// One analytics record, in the wire shape of the analytics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    #[serde(rename = "event-type")]
    pub event_type: String,
    #[serde(rename = "event-properties")]
    pub event_properties: Map<String, Value>,
}

impl TelemetryEvent {
    pub fn success(tool: &str) -> Self {
        Self {
            event_type: event_name(tool),
            event_properties: Map::new(),
        }
    }

    pub fn failure(tool: &str, error: &ToolError) -> Self {
        let mut event_properties = Map::new();
        event_properties.insert("error".to_string(), Value::String(error.to_string()));
        event_properties.insert("kind".to_string(), Value::String(error.kind().to_string()));
        Self {
            event_type: format!("{}-error", event_name(tool)),
            event_properties,
        }
    }
}

/// `code_health_score` becomes `mcp-code-health-score`.
fn event_name(tool: &str) -> String {
    format!("mcp-{}", tool.replace('_', "-"))
}

pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent) -> Result<(), TelemetryError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn record(&self, _event: TelemetryEvent) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Posts events to `{api}/v2/analytics/track` from a detached task.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpSink {
    pub fn new(config: &Config) -> Result<Self, InvokeError> {
        let client = build_client(config).map_err(InvokeError::from_transport)?;
        Ok(Self {
            client,
            url: format!("{}/v2/analytics/track", config.api_url()),
            token: config.access_token.clone(),
        })
    }
}

impl TelemetrySink for HttpSink {
    fn record(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|err| TelemetryError(err.to_string()))?;

        let mut request = self.client.post(&self.url).json(&event);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        handle.spawn(async move {
            match request.send().await {
                Ok(response) if !response.status().is_success() => {
                    log::debug!("analytics event rejected: {}", response.status());
                }
                Ok(_) => {}
                Err(err) => log::debug!("analytics event not sent: {err}"),
            }
        });
        Ok(())
    }
}

/// Records the outcome of one tool call. Sink errors and panics are swallowed.
pub fn emit<T>(sink: &dyn TelemetrySink, tool: &str, outcome: &Result<T, ToolError>) {
    let event = match outcome {
        Ok(_) => TelemetryEvent::success(tool),
        Err(err) => TelemetryEvent::failure(tool, err),
    };
    match catch_unwind(AssertUnwindSafe(|| sink.record(event))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => log::debug!("{err}"),
        Err(_) => log::debug!("telemetry sink panicked"),
    }
}
