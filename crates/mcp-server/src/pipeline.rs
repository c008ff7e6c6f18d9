use crate::error::ToolError;
use crate::format::{format_error, format_success, Payload};
use crate::telemetry::{self, TelemetrySink};
use crate::version::VersionChecker;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Wraps every tool call: version gate outermost, telemetry inside it, business logic at the core.
///
/// Whatever the business future does (including panicking) the caller gets exactly one string.
#[derive(Clone)]
pub struct ToolPipeline {
    telemetry: Arc<dyn TelemetrySink>,
    version: VersionChecker,
}

impl ToolPipeline {
    pub fn new(telemetry: Arc<dyn TelemetrySink>, version: VersionChecker) -> Self {
        Self { telemetry, version }
    }

    pub async fn run<F>(&self, tool: &str, business: F) -> String
    where
        F: Future<Output = Result<Payload, ToolError>>,
    {
        log::debug!("tool {tool} invoked");
        let outcome = match AssertUnwindSafe(business).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => Err(ToolError::Internal(panic_message(panic.as_ref()))),
        };

        telemetry::emit(self.telemetry.as_ref(), tool, &outcome);

        let text = match outcome {
            Ok(payload) => format_success(payload),
            Err(err) => format_error(tool, &err),
        };
        self.version.annotate(text)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool panicked".to_string())
}
