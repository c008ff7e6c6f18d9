use crate::error::ToolError;
use async_trait::async_trait;
use codehealth_invoker::{ProcessInvocation, ProcessRunner};
use codehealth_paths::{find_repo_root, PathResolver};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Single-file Code Health review.
#[async_trait]
pub trait FileAnalyzer: Send + Sync {
    /// Raw JSON review output of the analysis CLI for `file_path`.
    async fn review(&self, file_path: &str) -> Result<String, ToolError>;
}

/// Where and how to point the CLI at one caller-supplied path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliTarget {
    /// Path argument for the CLI.
    pub path: String,
    /// Working directory: the enclosing repository when known.
    pub cwd: Option<PathBuf>,
    /// `GIT_DIR` override when the repository is a git worktree.
    pub git_dir: Option<String>,
}

impl CliTarget {
    pub fn resolve(paths: &PathResolver, file_path: &str) -> Result<Self, ToolError> {
        let resolved = paths.resolve(file_path)?;
        let cwd = resolved.repo_root.or_else(|| {
            // Container paths are already absolute; their repository is found under the mount.
            paths
                .is_containerized()
                .then(|| find_repo_root(Path::new(&resolved.api_path)))
                .flatten()
        });
        let git_dir = cwd.as_deref().and_then(|dir| paths.worktree_git_dir(dir));
        Ok(Self {
            path: resolved.api_path,
            cwd,
            git_dir,
        })
    }

    pub fn invocation<I, S>(&self, program: &str, args: I) -> ProcessInvocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut invocation = ProcessInvocation::new(program, args);
        invocation.cwd = self.cwd.clone();
        if let Some(git_dir) = &self.git_dir {
            invocation = invocation.with_env("GIT_DIR", git_dir.clone());
        }
        invocation
    }
}

/// Runs `cs review <path> --output-format=json`.
#[derive(Clone)]
pub struct CliAnalyzer {
    runner: Arc<dyn ProcessRunner>,
    cli_program: String,
    paths: PathResolver,
}

impl CliAnalyzer {
    pub fn new(runner: Arc<dyn ProcessRunner>, cli_program: impl Into<String>, paths: PathResolver) -> Self {
        Self {
            runner,
            cli_program: cli_program.into(),
            paths,
        }
    }
}

#[async_trait]
impl FileAnalyzer for CliAnalyzer {
    async fn review(&self, file_path: &str) -> Result<String, ToolError> {
        let target = CliTarget::resolve(&self.paths, file_path)?;
        let invocation = target.invocation(
            &self.cli_program,
            ["review", target.path.as_str(), "--output-format=json"],
        );
        Ok(self.runner.run(invocation).await?)
    }
}

#[derive(Deserialize)]
struct ScoreOnly {
    score: Option<f64>,
}

/// Extracts the `score` field of a CLI review.
pub fn score_from_review(output: &str) -> Result<f64, ToolError> {
    let parsed: ScoreOnly = serde_json::from_str(output).map_err(|err| {
        ToolError::tool(format!("CLI output is not valid JSON ({err}): {}", snippet(output)))
    })?;
    parsed.score.ok_or_else(|| {
        ToolError::tool(format!(
            "CLI output does not contain a 'score' field: {}",
            snippet(output)
        ))
    })
}

fn snippet(output: &str) -> &str {
    let output = output.trim();
    match output.char_indices().nth(200) {
        Some((cut, _)) => &output[..cut],
        None => output,
    }
}
