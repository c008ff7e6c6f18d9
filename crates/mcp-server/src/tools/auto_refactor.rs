use crate::analysis::CliTarget;
use crate::error::ToolError;
use crate::format::Payload;
use codehealth_invoker::{ProcessRunner, RefactorClient};
use codehealth_paths::PathResolver;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

pub const ACE_TOKEN_MISSING: &str = "This tool needs a token valid for CodeScene ACE in \
     CS_ACE_ACCESS_TOKEN. See the ACE activation instructions in \
     https://github.com/codescene-oss/codescene-mcp-server?tab=readme-ov-file#-activate-ace-in-codescene-mcp";

/// One function as reported by `cs parse-fns`.
#[derive(Debug, Clone, Deserialize)]
struct ParsedFunction {
    name: String,
    body: String,
    #[serde(rename = "start-line")]
    start_line: i64,
    #[serde(rename = "function-type")]
    function_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Review {
    #[serde(default)]
    review: Vec<ReviewedSmell>,
}

#[derive(Debug, Deserialize)]
struct ReviewedSmell {
    category: String,
    #[serde(default)]
    functions: Vec<SmellLocation>,
}

#[derive(Debug, Deserialize)]
struct SmellLocation {
    title: String,
    #[serde(rename = "start-line")]
    start_line: i64,
}

/// A code smell, positioned relative to the first line of its function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct SmellRef {
    category: String,
    #[serde(rename = "start-line")]
    start_line: i64,
}

#[derive(Debug, Deserialize)]
struct AceResponse {
    code: String,
    #[serde(default)]
    declarations: Option<String>,
    confidence: AceConfidence,
    #[serde(default)]
    reasons: Vec<AceReason>,
}

#[derive(Debug, Deserialize)]
struct AceConfidence {
    description: String,
}

#[derive(Debug, Deserialize)]
struct AceReason {
    summary: String,
}

#[derive(Debug, Serialize)]
struct RefactoringResult {
    code: String,
    declarations: String,
    confidence: String,
    reasons: Vec<String>,
}

#[derive(Clone)]
pub struct AutoRefactor {
    runner: Arc<dyn ProcessRunner>,
    refactor: Arc<dyn RefactorClient>,
    paths: PathResolver,
    cli_program: String,
    ace_enabled: bool,
}

impl AutoRefactor {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        refactor: Arc<dyn RefactorClient>,
        paths: PathResolver,
        cli_program: impl Into<String>,
        ace_enabled: bool,
    ) -> Self {
        Self {
            runner,
            refactor,
            paths,
            cli_program: cli_program.into(),
            ace_enabled,
        }
    }

    pub async fn run(&self, file_path: &str, function_name: &str) -> Result<Payload, ToolError> {
        if !self.ace_enabled {
            return Err(ToolError::Configuration(ACE_TOKEN_MISSING.to_string()));
        }

        let target = CliTarget::resolve(&self.paths, file_path)?;
        let functions: Vec<Value> = self
            .cli_json(&target, ["parse-fns", "--path", target.path.as_str()])
            .await?;
        let review: Review = self
            .cli_json(&target, ["review", "--output-format=json", target.path.as_str()])
            .await?;

        let function = select_function(functions, function_name)?;

        let smells = smells_in(&review, &function)?;
        if smells.is_empty() {
            return Err(ToolError::tool(format!(
                "No code smells were found in {function_name}"
            )));
        }

        let response = self
            .refactor
            .post_refactor(&refactor_request(file_path, &function, &smells))
            .await?;
        let response: AceResponse = serde_json::from_value(response).map_err(|err| {
            ToolError::tool(format!("Unexpected response from the refactoring service: {err}"))
        })?;

        Payload::json(&RefactoringResult {
            code: response.code,
            declarations: response.declarations.unwrap_or_default(),
            confidence: response.confidence.description,
            reasons: response.reasons.into_iter().map(|r| r.summary).collect(),
        })
    }

    async fn cli_json<T, const N: usize>(&self, target: &CliTarget, args: [&str; N]) -> Result<T, ToolError>
    where
        T: DeserializeOwned,
    {
        let output = self
            .runner
            .run(target.invocation(&self.cli_program, args))
            .await?;
        serde_json::from_str(&output).map_err(|err| {
            ToolError::tool(format!("Unexpected output from `cs {}`: {err}", args[0]))
        })
    }
}

/// Picks `name` from `cs parse-fns` output; only the chosen entry has to be well-formed.
fn select_function(functions: Vec<Value>, name: &str) -> Result<ParsedFunction, ToolError> {
    let entry = functions
        .into_iter()
        .find(|f| f.get("name").and_then(Value::as_str) == Some(name))
        .ok_or_else(|| ToolError::tool(format!("Couldn't find function: {name}")))?;
    serde_json::from_value(entry).map_err(|err| {
        ToolError::tool(format!("Unexpected output from `cs parse-fns` for {name}: {err}"))
    })
}

/// Smells reported for `function`. Complex Conditional titles carry a `:<line>` suffix.
fn smells_in(review: &Review, function: &ParsedFunction) -> Result<Vec<SmellRef>, ToolError> {
    let title = Regex::new(&format!(r"^{}(:\d+)?$", regex::escape(&function.name)))
        .map_err(|err| ToolError::Internal(err.to_string()))?;

    Ok(review
        .review
        .iter()
        .flat_map(|smell| {
            smell
                .functions
                .iter()
                .filter(|location| title.is_match(&location.title))
                .map(|location| SmellRef {
                    category: smell.category.clone(),
                    start_line: location.start_line - function.start_line + 1,
                })
        })
        .collect())
}

fn refactor_request(file_path: &str, function: &ParsedFunction, smells: &[SmellRef]) -> Value {
    let file_type = Path::new(file_path.trim_end_matches(['/', '\\']))
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    json!({
        "api-version": "v2",
        "source-snippet": {
            "file-type": file_type,
            "body": function.body,
            "function-type": function.function_type.as_deref().unwrap_or("Unknown"),
        },
        "review": smells,
    })
}
