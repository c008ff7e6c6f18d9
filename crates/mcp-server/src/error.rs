use codehealth_config::ConfigError;
use codehealth_invoker::InvokeError;
use codehealth_paths::ResolveError;
use thiserror::Error;

/// Every way a tool invocation can fail. Rendered to text only at the tool boundary.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Missing or inconsistent configuration: mount mismatch, missing token, bad project id.
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Invoke(#[from] InvokeError),

    /// The tool ran but could not produce an answer (unknown function, malformed CLI output).
    #[error("{0}")]
    Tool(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn tool(message: impl Into<String>) -> Self {
        Self::Tool(message.into())
    }

    /// Stable category name used in telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Invoke(InvokeError::ProcessFailure { .. } | InvokeError::Spawn { .. }) => {
                "process"
            }
            Self::Invoke(InvokeError::ApiFailure { .. }) => "api",
            Self::Tool(_) => "tool",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<ResolveError> for ToolError {
    fn from(err: ResolveError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<ConfigError> for ToolError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn kinds_follow_the_failure_source() {
        assert_eq!(ToolError::from(ResolveError::EmptyPath).kind(), "configuration");
        assert_eq!(
            ToolError::from(InvokeError::process_failure("cs", Some(2), "x")).kind(),
            "process"
        );
        assert_eq!(
            ToolError::from(InvokeError::api_failure(Some(401), "denied")).kind(),
            "api"
        );
        assert_eq!(ToolError::tool("no smells").kind(), "tool");
        assert_eq!(ToolError::Internal("boom".into()).kind(), "internal");
    }

    #[test]
    fn invoke_errors_display_transparently() {
        let err = ToolError::from(InvokeError::process_failure("cs", Some(1), "file not found"));
        assert_eq!(err.to_string(), "CLI command failed (exit code 1): file not found");
    }
}
