//! MCP surface: tool schemas, descriptions and routing.
//!
//! Every tool answers with exactly one text item. Failures are rendered as `Error: ...` text
//! rather than protocol errors, so the assistant can always explain what went wrong.

use crate::deps::ToolDeps;
use crate::pipeline::ToolPipeline;
use crate::tools::{
    AnalyzeChangeSet, AutoRefactor, CodeHealthReview, CodeHealthScore, CodeOwnership,
    PreCommitSafeguard, ProjectLinks, SelectProject, TechnicalDebtGoals, TechnicalDebtHotspots,
};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;

const INSTRUCTIONS: &str = "Code Health tools backed by CodeScene. Use code_health_score and \
code_health_review on single files, pre_commit_code_health_safeguard before committing, \
analyze_change_set before opening a pull request, and code_health_auto_refactor to break up \
unhealthy functions. Project-level tools (select_project, technical debt hotspots and goals, \
code ownership) need a CodeScene project: call select_project first. \
Note: if a result contains \"VERSION UPDATE AVAILABLE\", inform the user about the update \
notice and recommend they update the Code Health MCP Server.";

// ============================================================================
// Tool Input Schemas
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FileRequest {
    #[schemars(description = "The absolute path to the source code file to be analyzed")]
    pub file_path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RepositoryRequest {
    #[schemars(description = "The absolute path to the Git repository for the current code base")]
    pub git_repository_path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ChangeSetRequest {
    #[schemars(
        description = "The git reference to compare against, typically the target branch of the pull request (e.g. \"main\", \"origin/main\")"
    )]
    pub base_ref: String,

    #[schemars(description = "The absolute path to the Git repository for the current code base")]
    pub git_repository_path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AutoRefactorRequest {
    #[schemars(description = "The absolute path to the source code file containing the function")]
    pub file_path: String,

    #[schemars(
        description = "The name of the function to refactor, including any class scope prefix"
    )]
    pub function_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProjectRequest {
    #[schemars(description = "The Project ID selected by the user")]
    pub project_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProjectFileRequest {
    #[schemars(description = "The absolute path to the source code file")]
    pub file_path: String,

    #[schemars(description = "The Project ID selected by the user")]
    pub project_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct OwnershipRequest {
    #[schemars(description = "The Project ID selected by the user")]
    pub project_id: i64,

    #[schemars(description = "The file or directory path to find owners for")]
    pub path: String,
}

/// Code Health MCP Service
#[derive(Clone)]
pub struct CodeHealthService {
    pipeline: ToolPipeline,
    score: CodeHealthScore,
    review: CodeHealthReview,
    safeguard: PreCommitSafeguard,
    change_set: AnalyzeChangeSet,
    auto_refactor: AutoRefactor,
    projects: SelectProject,
    hotspots: TechnicalDebtHotspots,
    goals: TechnicalDebtGoals,
    ownership: CodeOwnership,
    tool_router: ToolRouter<Self>,
}

impl CodeHealthService {
    pub fn new(deps: ToolDeps) -> Self {
        let links = ProjectLinks::new(&deps.config);
        let default_project = deps
            .config
            .default_project_id()
            .map_err(|err| err.to_string());

        Self {
            pipeline: ToolPipeline::new(deps.telemetry.clone(), deps.versions.clone()),
            score: CodeHealthScore::new(deps.analyzer.clone()),
            review: CodeHealthReview::new(deps.analyzer.clone()),
            safeguard: PreCommitSafeguard::new(
                deps.runner.clone(),
                deps.paths.clone(),
                deps.cli_program.clone(),
            ),
            change_set: AnalyzeChangeSet::new(
                deps.runner.clone(),
                deps.paths.clone(),
                deps.cli_program.clone(),
            ),
            auto_refactor: AutoRefactor::new(
                deps.runner.clone(),
                deps.refactor.clone(),
                deps.paths.clone(),
                deps.cli_program.clone(),
                deps.config.ace_access_token.is_some(),
            ),
            projects: SelectProject::new(deps.api.clone(), links.clone(), default_project),
            hotspots: TechnicalDebtHotspots::new(deps.api.clone(), deps.paths.clone(), links.clone()),
            goals: TechnicalDebtGoals::new(deps.api.clone(), deps.paths.clone(), links.clone()),
            ownership: CodeOwnership::new(deps.api.clone(), deps.paths.clone(), links),
            tool_router: Self::tool_router(),
        }
    }
}

fn text_result(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[tool_handler]
impl ServerHandler for CodeHealthService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

#[tool_router]
impl CodeHealthService {
    #[tool(
        description = "Calculates the code quality of the given file using the Code Health metric. \
Returns a score from 10.0 (best) down to 1.0 (worst), formatted as 'Code Health score: X.XX'."
    )]
    pub async fn code_health_score(
        &self,
        Parameters(request): Parameters<FileRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .pipeline
            .run("code_health_score", self.score.run(&request.file_path))
            .await;
        text_result(text)
    }

    #[tool(
        description = "Reviews the given file using the Code Health metric. Returns the Code Health \
score together with the code smells found in each function, as reported by CodeScene. Use the \
review to explain why a file is hard to maintain and which functions to improve first."
    )]
    pub async fn code_health_review(
        &self,
        Parameters(request): Parameters<FileRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .pipeline
            .run("code_health_review", self.review.run(&request.file_path))
            .await;
        text_result(text)
    }

    #[tool(
        description = "Performs a Code Health review on all modified and staged files in the given \
git_repository_path and returns a JSON object describing the code smells that will degrade Code \
Health should this code be committed. Ideal as a pre-commit safeguard. The result contains \
quality_gates ('passed' or 'failed') and results: one entry per file with name, verdict \
('improved', 'degraded', 'stable' or 'unknown') and findings."
    )]
    pub async fn pre_commit_code_health_safeguard(
        &self,
        Parameters(request): Parameters<RepositoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .pipeline
            .run(
                "pre_commit_code_health_safeguard",
                self.safeguard.run(&request.git_repository_path),
            )
            .await;
        text_result(text)
    }

    #[tool(
        description = "Provides a branch-level Code Health review of all changes between the current \
HEAD and the given base_ref: a local pull request pre-flight check. Reports Code Health \
improvements, degradations and code smells across the entire change set as JSON with \
quality_gates ('passed' or 'failed') and per-file results with name, verdict and findings."
    )]
    pub async fn analyze_change_set(
        &self,
        Parameters(request): Parameters<ChangeSetRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .pipeline
            .run(
                "analyze_change_set",
                self.change_set
                    .run(&request.base_ref, &request.git_repository_path),
            )
            .await;
        text_result(text)
    }

    #[tool(
        description = "Refactors a single function to fix specific Code Health problems using \
CodeScene ACE. Intended as an initial refactoring that increases modularity so you can continue \
with more specific refactorings. Supports JavaScript/TypeScript, Java, C#, and C++ and the code \
smells Complex Conditional, Bumpy Road Ahead, Complex Method, Deep Nested Complexity and Large \
Method. Only use it for functions shorter than 300 lines, and insert new functions close to the \
refactored one. Returns JSON with code (the refactored function plus extracted functions), \
declarations (for languages like C++, to be placed in the right include file), confidence, and \
reasons (use these to direct fixes of the refactored code). Requires CS_ACE_ACCESS_TOKEN."
    )]
    pub async fn code_health_auto_refactor(
        &self,
        Parameters(request): Parameters<AutoRefactorRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .pipeline
            .run(
                "code_health_auto_refactor",
                self.auto_refactor
                    .run(&request.file_path, &request.function_name),
            )
            .await;
        text_result(text)
    }

    #[tool(
        description = "Lists all projects for an organization for selection by the user, who can pick \
a project by name or ID. Show them in a Markdown table with the columns 'Project Name' and \
'Project ID'. If the output has a description field, a default project is configured through \
CS_DEFAULT_PROJECT_ID and the user cannot select a different one: explain this. Always include \
the link field, which points to the CodeScene projects page."
    )]
    pub async fn select_project(&self) -> Result<CallToolResult, McpError> {
        let text = self
            .pipeline
            .run("select_project", self.projects.run())
            .await;
        text_result(text)
    }

    #[tool(
        description = "Lists the technical debt hotspots for a project: file path, Code Health score, \
revisions and lines of code. Describe each hotspot in an easy-to-read structure and include the \
description. Always show the link, which opens the hotspots view in CodeScene."
    )]
    pub async fn list_technical_debt_hotspots_for_project(
        &self,
        Parameters(request): Parameters<ProjectRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .pipeline
            .run(
                "list_technical_debt_hotspots_for_project",
                self.hotspots.for_project(request.project_id),
            )
            .await;
        text_result(text)
    }

    #[tool(
        description = "Shows the technical debt hotspot data (Code Health score, revisions, lines of \
code) for a specific file in a project. Include the description, and always show the link, which \
opens the hotspots view in CodeScene."
    )]
    pub async fn list_technical_debt_hotspots_for_project_file(
        &self,
        Parameters(request): Parameters<ProjectFileRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .pipeline
            .run(
                "list_technical_debt_hotspots_for_project_file",
                self.hotspots.for_file(&request.file_path, request.project_id),
            )
            .await;
        text_result(text)
    }

    #[tool(
        description = "Lists the technical debt goals for a project: every file with goals and what \
each goal means. Include the description, and provide the link to the CodeScene Code Biomarkers \
page where the goals can be inspected in detail."
    )]
    pub async fn list_technical_debt_goals_for_project(
        &self,
        Parameters(request): Parameters<ProjectRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .pipeline
            .run(
                "list_technical_debt_goals_for_project",
                self.goals.for_project(request.project_id),
            )
            .await;
        text_result(text)
    }

    #[tool(
        description = "Lists the technical debt goals for a specific file in a project. Explain each \
goal, include the description, and provide the link to the file's Code Biomarkers page in \
CodeScene."
    )]
    pub async fn list_technical_debt_goals_for_project_file(
        &self,
        Parameters(request): Parameters<ProjectFileRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .pipeline
            .run(
                "list_technical_debt_goals_for_project_file",
                self.goals.for_file(&request.file_path, request.project_id),
            )
            .await;
        text_result(text)
    }

    #[tool(
        description = "Finds the owner or owners of a file or directory in a project, for code reviews \
or questions about the code. Returns owners with the paths they own and a link to the CodeScene \
System Map filtered by that owner. Show a Markdown table with the columns Owner, Key Areas and \
Link, with a link after every owner."
    )]
    pub async fn code_ownership_for_path(
        &self,
        Parameters(request): Parameters<OwnershipRequest>,
    ) -> Result<CallToolResult, McpError> {
        let text = self
            .pipeline
            .run(
                "code_ownership_for_path",
                self.ownership.run(request.project_id, &request.path),
            )
            .await;
        text_result(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::CliAnalyzer;
    use crate::format::ERROR_PREFIX;
    use crate::telemetry::{TelemetryError, TelemetryEvent, TelemetrySink};
    use crate::version::VersionChecker;
    use async_trait::async_trait;
    use codehealth_config::Config;
    use codehealth_invoker::{
        ApiQuerier, InvokeError, ProcessInvocation, ProcessRunner, RefactorClient,
    };
    use codehealth_paths::PathResolver;
    use rmcp::model::RawContent;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct MissingFileCli;

    #[async_trait]
    impl ProcessRunner for MissingFileCli {
        async fn run(&self, _invocation: ProcessInvocation) -> Result<String, InvokeError> {
            Err(InvokeError::process_failure("cs", Some(1), "file not found"))
        }
    }

    struct ScoringCli;

    #[async_trait]
    impl ProcessRunner for ScoringCli {
        async fn run(&self, _invocation: ProcessInvocation) -> Result<String, InvokeError> {
            Ok("{\"score\": 9.53}".to_string())
        }
    }

    struct OfflineApi;

    #[async_trait]
    impl ApiQuerier for OfflineApi {
        async fn query_list(
            &self,
            _endpoint: &str,
            _params: &[(String, String)],
            _key: &str,
        ) -> Result<Vec<Value>, InvokeError> {
            Err(InvokeError::api_failure(None, "connection refused"))
        }
    }

    struct OfflineAce;

    #[async_trait]
    impl RefactorClient for OfflineAce {
        async fn post_refactor(&self, _payload: &Value) -> Result<Value, InvokeError> {
            Err(InvokeError::api_failure(Some(503), "unavailable"))
        }
    }

    #[derive(Default)]
    struct FailingTelemetry(Mutex<Vec<String>>);

    impl TelemetrySink for FailingTelemetry {
        fn record(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
            self.0.lock().expect("lock").push(event.event_type);
            Err(TelemetryError("analytics endpoint unreachable".into()))
        }
    }

    fn service_with(
        runner: Arc<dyn ProcessRunner>,
        vars: &[(&str, &str)],
        telemetry: Arc<FailingTelemetry>,
    ) -> CodeHealthService {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::from_lookup(|key| vars.get(key).cloned());
        let paths = PathResolver::new(&config);
        let deps = ToolDeps {
            analyzer: Arc::new(CliAnalyzer::new(runner.clone(), "cs", paths.clone())),
            config: Arc::new(config),
            paths,
            cli_program: "cs".to_string(),
            runner,
            api: Arc::new(OfflineApi),
            refactor: Arc::new(OfflineAce),
            telemetry,
            versions: VersionChecker::disabled(),
        };
        CodeHealthService::new(deps)
    }

    fn extract_text(result: &CallToolResult) -> Option<&str> {
        result.content.first().and_then(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
    }

    fn file(path: &str) -> Parameters<FileRequest> {
        Parameters(FileRequest {
            file_path: path.to_string(),
        })
    }

    #[test]
    fn server_info_advertises_tools_and_version_note() {
        let service = service_with(Arc::new(ScoringCli), &[], Arc::default());
        let info = ServerHandler::get_info(&service);
        assert!(info.capabilities.tools.is_some());
        let instructions = info.instructions.expect("instructions");
        assert!(instructions.contains("VERSION UPDATE AVAILABLE"));
    }

    #[test]
    fn all_tools_are_routed() {
        let service = service_with(Arc::new(ScoringCli), &[], Arc::default());
        let mut names: Vec<String> = service
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "analyze_change_set",
                "code_health_auto_refactor",
                "code_health_review",
                "code_health_score",
                "code_ownership_for_path",
                "list_technical_debt_goals_for_project",
                "list_technical_debt_goals_for_project_file",
                "list_technical_debt_hotspots_for_project",
                "list_technical_debt_hotspots_for_project_file",
                "pre_commit_code_health_safeguard",
                "select_project",
            ]
        );
    }

    #[tokio::test]
    async fn score_is_rendered_with_two_decimals() {
        let service = service_with(Arc::new(ScoringCli), &[], Arc::default());
        let result = service
            .code_health_score(file("src/app.py"))
            .await
            .expect("tool result");
        assert_eq!(extract_text(&result), Some("Code Health score: 9.53"));
    }

    #[tokio::test]
    async fn cli_failure_is_an_error_string_even_when_telemetry_fails() {
        let telemetry = Arc::new(FailingTelemetry::default());
        let service = service_with(Arc::new(MissingFileCli), &[], telemetry.clone());

        let result = service
            .code_health_review(file("src/missing.py"))
            .await
            .expect("tool result");
        assert_ne!(result.is_error, Some(true));
        let text = extract_text(&result).expect("text");
        assert!(text.starts_with(ERROR_PREFIX), "{text}");
        assert!(text.contains("file not found"), "{text}");
        assert_eq!(
            *telemetry.0.lock().expect("lock"),
            vec!["mcp-code-health-review-error".to_string()]
        );
    }

    #[tokio::test]
    async fn api_outage_is_an_error_string() {
        let service = service_with(Arc::new(ScoringCli), &[], Arc::default());
        let result = service
            .list_technical_debt_hotspots_for_project(Parameters(ProjectRequest { project_id: 1 }))
            .await
            .expect("tool result");
        let text = extract_text(&result).expect("text");
        assert!(text.starts_with("Error: API request failed"), "{text}");
    }

    #[tokio::test]
    async fn auto_refactor_without_token_explains_activation() {
        let service = service_with(Arc::new(ScoringCli), &[], Arc::default());
        let result = service
            .code_health_auto_refactor(Parameters(AutoRefactorRequest {
                file_path: "src/app.js".into(),
                function_name: "main".into(),
            }))
            .await
            .expect("tool result");
        let text = extract_text(&result).expect("text");
        assert!(text.starts_with("Error: This tool needs a token valid for CodeScene ACE"));
    }

    #[tokio::test]
    async fn default_project_is_served_without_the_api() {
        let service = service_with(
            Arc::new(ScoringCli),
            &[("CS_DEFAULT_PROJECT_ID", "17")],
            Arc::default(),
        );
        let result = service.select_project().await.expect("tool result");
        let value: Value =
            serde_json::from_str(extract_text(&result).expect("text")).expect("json");
        assert_eq!(value["id"], 17);
        assert_eq!(value["link"], "https://codescene.io/projects");
    }

    #[tokio::test]
    async fn mount_mismatch_is_reported_with_the_segment() {
        let service = service_with(
            Arc::new(ScoringCli),
            &[("CS_MOUNT_PATH", "/home/u/proj")],
            Arc::default(),
        );
        let result = service
            .code_health_score(file("/home/u/Proj/src/app.py"))
            .await
            .expect("tool result");
        let text = extract_text(&result).expect("text");
        assert!(text.starts_with("Error: file_path is not under CS_MOUNT_PATH"), "{text}");
        assert!(text.contains("segment 3: 'Proj' (input) vs 'proj' (mount)"), "{text}");
    }
}
