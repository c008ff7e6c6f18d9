//! Delta analysis: what a set of uncommitted or branch changes does to Code Health.

use crate::error::ToolError;
use codehealth_invoker::{ProcessInvocation, ProcessRunner};
use codehealth_paths::PathResolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Improved,
    Degraded,
    Stable,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityGate {
    Passed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileVerdict {
    pub name: Option<String>,
    pub verdict: Verdict,
    pub findings: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaSummary {
    pub quality_gates: QualityGate,
    pub results: Vec<FileVerdict>,
}

#[derive(Deserialize)]
struct DeltaFile {
    name: Option<String>,
    #[serde(rename = "old-score")]
    old_score: Option<f64>,
    #[serde(rename = "new-score")]
    new_score: Option<f64>,
    #[serde(default)]
    findings: Vec<Value>,
}

fn verdict(old_score: Option<f64>, new_score: Option<f64>) -> Verdict {
    match (old_score, new_score) {
        (Some(old), Some(new)) if new > old => Verdict::Improved,
        (Some(old), Some(new)) if new < old => Verdict::Degraded,
        (Some(_), Some(_)) => Verdict::Stable,
        _ => Verdict::Unknown,
    }
}

/// Summarizes `cs delta --output-format=json`. Empty output means nothing changed health.
pub fn analyze_delta_output(output: &str) -> Result<DeltaSummary, ToolError> {
    if output.trim().is_empty() {
        return Ok(DeltaSummary {
            quality_gates: QualityGate::Passed,
            results: Vec::new(),
        });
    }

    let files: Vec<DeltaFile> = serde_json::from_str(output).map_err(|err| {
        let head: String = output.chars().take(500).collect();
        ToolError::tool(format!("Invalid JSON input: {err}\nInput: {head}"))
    })?;

    let results: Vec<FileVerdict> = files
        .into_iter()
        .map(|file| FileVerdict {
            verdict: verdict(file.old_score, file.new_score),
            name: file.name,
            findings: file.findings,
        })
        .collect();

    let quality_gates = if results.iter().any(|r| r.verdict == Verdict::Degraded) {
        QualityGate::Failed
    } else {
        QualityGate::Passed
    };
    Ok(DeltaSummary {
        quality_gates,
        results,
    })
}

/// Runs `cs delta [base_ref] --output-format=json` inside the repository and summarizes it.
///
/// In container mode the repository path goes through the mount, git is told to trust the
/// mounted directory (its owner differs from the container user), and worktrees get `GIT_DIR`.
pub async fn run_delta(
    runner: &dyn ProcessRunner,
    paths: &PathResolver,
    cli_program: &str,
    git_repository_path: &str,
    base_ref: Option<&str>,
) -> Result<DeltaSummary, ToolError> {
    let mut args = vec!["delta".to_string()];
    args.extend(base_ref.map(str::to_string));
    args.push("--output-format=json".to_string());

    let repo_dir: PathBuf = if paths.is_containerized() {
        PathBuf::from(paths.resolve_for_api(git_repository_path)?)
    } else {
        PathBuf::from(git_repository_path)
    };
    let git_dir = paths.worktree_git_dir(&repo_dir);
    let with_git_dir = |invocation: ProcessInvocation| match &git_dir {
        Some(dir) => invocation.with_env("GIT_DIR", dir.clone()),
        None => invocation,
    };

    if paths.is_containerized() {
        let repo = repo_dir.to_string_lossy().into_owned();
        runner
            .run(with_git_dir(ProcessInvocation::new(
                "git",
                ["config", "--system", "--add", "safe.directory", repo.as_str()],
            )))
            .await?;
    }

    let output = runner
        .run(with_git_dir(
            ProcessInvocation::new(cli_program, args).in_dir(repo_dir.as_path()),
        ))
        .await?;
    analyze_delta_output(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codehealth_config::MountTranslation;
    use codehealth_invoker::InvokeError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Mutex;

    struct Scripted {
        output: String,
        calls: Mutex<Vec<ProcessInvocation>>,
    }

    impl Scripted {
        fn new(output: &str) -> Self {
            Self {
                output: output.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProcessRunner for Scripted {
        async fn run(&self, invocation: ProcessInvocation) -> Result<String, InvokeError> {
            self.calls.lock().expect("lock").push(invocation);
            Ok(self.output.clone())
        }
    }

    #[test]
    fn empty_output_passes() {
        let summary = analyze_delta_output("  \n").expect("summary");
        assert_eq!(summary.quality_gates, QualityGate::Passed);
        assert!(summary.results.is_empty());
    }

    #[test]
    fn any_degradation_fails_the_gate() {
        let output = json!([
            { "name": "a.py", "old-score": 8.0, "new-score": 9.0, "findings": [] },
            { "name": "b.py", "old-score": 9.0, "new-score": 7.5, "findings": [{ "category": "Complex Method" }] },
            { "name": "c.py", "old-score": 5.0, "new-score": 5.0 },
            { "name": "d.py", "new-score": 10.0 }
        ])
        .to_string();
        let summary = analyze_delta_output(&output).expect("summary");

        assert_eq!(summary.quality_gates, QualityGate::Failed);
        let verdicts: Vec<Verdict> = summary.results.iter().map(|r| r.verdict).collect();
        assert_eq!(
            verdicts,
            vec![Verdict::Improved, Verdict::Degraded, Verdict::Stable, Verdict::Unknown]
        );
        assert_eq!(summary.results[1].findings.len(), 1);
    }

    #[test]
    fn unknown_and_improved_pass_the_gate() {
        let output = json!([{ "name": "new.py", "new-score": 9.0 }]).to_string();
        assert_eq!(
            analyze_delta_output(&output).expect("summary").quality_gates,
            QualityGate::Passed
        );
    }

    #[test]
    fn malformed_output_is_a_tool_error() {
        let err = analyze_delta_output("{not json").unwrap_err();
        assert_eq!(err.kind(), "tool");
        assert!(err.to_string().starts_with("Invalid JSON input"));
    }

    #[test]
    fn summary_serializes_with_lowercase_verdicts() {
        let summary = analyze_delta_output(
            &json!([{ "name": "a.py", "old-score": 9.0, "new-score": 8.0 }]).to_string(),
        )
        .expect("summary");
        assert_eq!(
            serde_json::to_value(&summary).expect("serialize"),
            json!({
                "quality_gates": "failed",
                "results": [{ "name": "a.py", "verdict": "degraded", "findings": [] }]
            })
        );
    }

    #[tokio::test]
    async fn bare_mode_runs_delta_in_the_repository() {
        let runner = Scripted::new("");
        let summary = run_delta(&runner, &PathResolver::default(), "cs", "/work/repo", Some("main"))
            .await
            .expect("delta");
        assert_eq!(summary.quality_gates, QualityGate::Passed);

        let calls = runner.calls.lock().expect("lock");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, vec!["delta", "main", "--output-format=json"]);
        assert_eq!(calls[0].cwd.as_deref(), Some(Path::new("/work/repo")));
    }

    #[tokio::test]
    async fn container_mode_marks_the_mount_safe_first() {
        let runner = Scripted::new("");
        let paths = PathResolver::with_mount(Some(MountTranslation {
            external_root: "/Users/dev/code".into(),
            internal_root: "/mount".into(),
        }));
        run_delta(&runner, &paths, "cs", "/Users/dev/code/app", None)
            .await
            .expect("delta");

        let calls = runner.calls.lock().expect("lock");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, "git");
        assert_eq!(
            calls[0].args,
            vec!["config", "--system", "--add", "safe.directory", "/mount/app"]
        );
        assert_eq!(calls[1].args, vec!["delta", "--output-format=json"]);
        assert_eq!(calls[1].cwd.as_deref(), Some(Path::new("/mount/app")));
    }

    #[tokio::test]
    async fn container_mode_rejects_repositories_outside_the_mount() {
        let runner = Scripted::new("");
        let paths = PathResolver::with_mount(Some(MountTranslation {
            external_root: "/Users/dev/code".into(),
            internal_root: "/mount".into(),
        }));
        let err = run_delta(&runner, &paths, "cs", "/elsewhere/app", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(runner.calls.lock().expect("lock").is_empty());
    }
}
