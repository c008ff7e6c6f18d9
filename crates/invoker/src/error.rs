use std::io;
use thiserror::Error;

/// Upper bound on how much of a response body or stderr is carried in an error.
pub const MAX_DETAIL_CHARS: usize = 500;

pub const CLI_INSTALL_HINT: &str = "The CodeScene CLI tool, cs, isn't properly installed. \
     See https://codescene.io/docs/cli/index.html for instructions.";

#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("CLI command failed ({}): {stderr}", exit_description(.exit_code))]
    ProcessFailure {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{}", spawn_description(.program, .source))]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{}", api_description(.status_code, .body))]
    ApiFailure {
        status_code: Option<u16>,
        body: String,
    },
}

impl InvokeError {
    pub fn process_failure(program: &str, exit_code: Option<i32>, stderr: &str) -> Self {
        Self::ProcessFailure {
            program: program.to_string(),
            exit_code,
            stderr: truncate(stderr.trim()),
        }
    }

    pub fn api_failure(status_code: Option<u16>, body: impl AsRef<str>) -> Self {
        Self::ApiFailure {
            status_code,
            body: truncate(body.as_ref().trim()),
        }
    }

    /// Transport-level failure (connection, TLS, timeout, undecodable body).
    pub fn from_transport(err: reqwest::Error) -> Self {
        Self::api_failure(err.status().map(|status| status.as_u16()), err.to_string())
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiFailure { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

fn exit_description(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn spawn_description(program: &str, source: &io::Error) -> String {
    if source.kind() == io::ErrorKind::NotFound {
        format!("{CLI_INSTALL_HINT} ({program}: {source})")
    } else {
        format!("failed to start {program}: {source}")
    }
}

fn api_description(status_code: &Option<u16>, body: &str) -> String {
    match (status_code, body.is_empty()) {
        (Some(status), true) => format!("API request failed with status {status}"),
        (Some(status), false) => format!("API request failed with status {status}: {body}"),
        (None, _) => format!("API request failed: {body}"),
    }
}

pub(crate) fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn process_failure_carries_stderr() {
        let err = InvokeError::process_failure("cs", Some(1), "file not found\n");
        assert_eq!(err.to_string(), "CLI command failed (exit code 1): file not found");
    }

    #[test]
    fn missing_binary_mentions_installation() {
        let err = InvokeError::Spawn {
            program: "/opt/cs".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with(CLI_INSTALL_HINT));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(MAX_DETAIL_CHARS * 2);
        let err = InvokeError::api_failure(Some(502), &body);
        let InvokeError::ApiFailure { body, status_code } = &err else {
            panic!("expected ApiFailure");
        };
        assert_eq!(*status_code, Some(502));
        assert_eq!(body.chars().count(), MAX_DETAIL_CHARS + 3);
        assert_eq!(err.status_code(), Some(502));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "\u{f6}".repeat(MAX_DETAIL_CHARS + 1);
        assert!(truncate(&text).ends_with("\u{f6}..."));
    }
}
