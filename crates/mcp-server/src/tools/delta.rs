use crate::delta::run_delta;
use crate::error::ToolError;
use crate::format::Payload;
use codehealth_invoker::ProcessRunner;
use codehealth_paths::PathResolver;
use std::sync::Arc;

/// Delta of the staged and modified files against HEAD.
#[derive(Clone)]
pub struct PreCommitSafeguard {
    runner: Arc<dyn ProcessRunner>,
    paths: PathResolver,
    cli_program: String,
}

impl PreCommitSafeguard {
    pub fn new(runner: Arc<dyn ProcessRunner>, paths: PathResolver, cli_program: impl Into<String>) -> Self {
        Self {
            runner,
            paths,
            cli_program: cli_program.into(),
        }
    }

    pub async fn run(&self, git_repository_path: &str) -> Result<Payload, ToolError> {
        let summary = run_delta(
            self.runner.as_ref(),
            &self.paths,
            &self.cli_program,
            git_repository_path,
            None,
        )
        .await?;
        Payload::json(&summary)
    }
}

/// Branch-level delta of everything between `base_ref` and HEAD.
#[derive(Clone)]
pub struct AnalyzeChangeSet {
    runner: Arc<dyn ProcessRunner>,
    paths: PathResolver,
    cli_program: String,
}

impl AnalyzeChangeSet {
    pub fn new(runner: Arc<dyn ProcessRunner>, paths: PathResolver, cli_program: impl Into<String>) -> Self {
        Self {
            runner,
            paths,
            cli_program: cli_program.into(),
        }
    }

    pub async fn run(&self, base_ref: &str, git_repository_path: &str) -> Result<Payload, ToolError> {
        let base_ref = base_ref.trim();
        if base_ref.is_empty() {
            return Err(ToolError::tool("base_ref must name a git reference, e.g. 'main'"));
        }
        let summary = run_delta(
            self.runner.as_ref(),
            &self.paths,
            &self.cli_program,
            git_repository_path,
            Some(base_ref),
        )
        .await?;
        Payload::json(&summary)
    }
}
