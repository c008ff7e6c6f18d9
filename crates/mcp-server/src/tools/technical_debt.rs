use super::links::ProjectLinks;
use crate::error::ToolError;
use crate::format::Payload;
use codehealth_invoker::{params, ApiQuerier};
use codehealth_paths::PathResolver;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const PAGE_SIZE: u32 = 200;

fn technical_debt_endpoint(project_id: i64) -> String {
    format!("v2/projects/{project_id}/analyses/latest/technical-debt")
}

pub(crate) fn files_endpoint(project_id: i64) -> String {
    format!("v2/projects/{project_id}/analyses/latest/files")
}

#[derive(Debug, Serialize)]
struct ProjectHotspots {
    hotspots: Vec<Value>,
    description: String,
    link: String,
}

#[derive(Debug, Serialize)]
struct FileHotspot {
    hotspot: Value,
    description: String,
    link: String,
}

#[derive(Debug, Serialize)]
struct ProjectGoals {
    files: Vec<Value>,
    description: String,
    link: String,
}

#[derive(Debug, Serialize)]
struct FileGoals {
    goals: Vec<Value>,
    description: String,
    link: String,
}

#[derive(Clone)]
pub struct TechnicalDebtHotspots {
    api: Arc<dyn ApiQuerier>,
    paths: PathResolver,
    links: ProjectLinks,
}

impl TechnicalDebtHotspots {
    pub fn new(api: Arc<dyn ApiQuerier>, paths: PathResolver, links: ProjectLinks) -> Self {
        Self { api, paths, links }
    }

    pub async fn for_project(&self, project_id: i64) -> Result<Payload, ToolError> {
        let query = params([
            ("page_size", PAGE_SIZE.to_string()),
            ("page", "1".to_string()),
            ("refactoring_targets", "true".to_string()),
        ]);
        let hotspots = self
            .api
            .query_list(&technical_debt_endpoint(project_id), &query, "result")
            .await?;
        Payload::json(&ProjectHotspots {
            description: format!(
                "Found {} files with technical debt hotspots for project ID {project_id}.",
                hotspots.len()
            ),
            hotspots,
            link: self.links.hotspots(project_id),
        })
    }

    pub async fn for_file(&self, file_path: &str, project_id: i64) -> Result<Payload, ToolError> {
        let relative = self.paths.project_relative(file_path)?;
        let query = params([
            ("filter", format!("file_name~{relative}")),
            ("refactoring_targets", "true".to_string()),
        ]);
        let hotspot = self
            .api
            .query_list(&technical_debt_endpoint(project_id), &query, "result")
            .await?
            .into_iter()
            .next();

        let description = match hotspot {
            Some(_) => format!(
                "Found technical debt hotspot for file {relative} in project ID {project_id}."
            ),
            None => format!(
                "Found no technical debt hotspot for file {relative} in project ID {project_id}."
            ),
        };
        Payload::json(&FileHotspot {
            hotspot: hotspot.unwrap_or_else(|| Value::Object(Map::new())),
            description,
            link: self.links.hotspots(project_id),
        })
    }
}

#[derive(Clone)]
pub struct TechnicalDebtGoals {
    api: Arc<dyn ApiQuerier>,
    paths: PathResolver,
    links: ProjectLinks,
}

impl TechnicalDebtGoals {
    pub fn new(api: Arc<dyn ApiQuerier>, paths: PathResolver, links: ProjectLinks) -> Self {
        Self { api, paths, links }
    }

    pub async fn for_project(&self, project_id: i64) -> Result<Payload, ToolError> {
        let query = params([
            ("page_size", PAGE_SIZE.to_string()),
            ("page", "1".to_string()),
            ("filter", "goals^not-empty".to_string()),
            ("fields", "path,goals".to_string()),
        ]);
        let files = self
            .api
            .query_list(&files_endpoint(project_id), &query, "files")
            .await?;
        Payload::json(&ProjectGoals {
            description: format!(
                "Found {} files with technical debt goals for project ID {project_id}.",
                files.len()
            ),
            files,
            link: self.links.goals(project_id),
        })
    }

    pub async fn for_file(&self, file_path: &str, project_id: i64) -> Result<Payload, ToolError> {
        let relative = self.paths.project_relative(file_path)?;
        let query = params([
            ("filter", format!("path~{relative}")),
            ("fields", "goals".to_string()),
        ]);
        let files = self
            .api
            .query_list(&files_endpoint(project_id), &query, "files")
            .await?;
        let goals = files
            .first()
            .and_then(|file| file.get("goals"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Payload::json(&FileGoals {
            description: format!(
                "Found {} technical debt goals for file {relative} in project ID {project_id}.",
                goals.len()
            ),
            goals,
            link: self.links.goals_for_file(project_id, &relative),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codehealth_config::MountTranslation;
    use codehealth_invoker::{InvokeError, QueryParams};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recorded {
        response: Vec<Value>,
        queries: Mutex<Vec<(String, QueryParams, String)>>,
    }

    impl Recorded {
        fn returning(response: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                response,
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ApiQuerier for Recorded {
        async fn query_list(
            &self,
            endpoint: &str,
            params: &[(String, String)],
            key: &str,
        ) -> Result<Vec<Value>, InvokeError> {
            self.queries
                .lock()
                .expect("lock")
                .push((endpoint.to_string(), params.to_vec(), key.to_string()));
            Ok(self.response.clone())
        }
    }

    fn parse(payload: Payload) -> Value {
        match payload {
            Payload::Json(text) => serde_json::from_str(&text).expect("json"),
            other => panic!("expected JSON, got {other:?}"),
        }
    }

    fn containerized() -> PathResolver {
        PathResolver::with_mount(Some(MountTranslation {
            external_root: "/Users/dev/shop".into(),
            internal_root: "/mount".into(),
        }))
    }

    fn links() -> ProjectLinks {
        ProjectLinks::with_base("https://codescene.io/projects")
    }

    #[tokio::test]
    async fn project_hotspots_query_refactoring_targets() {
        let api = Recorded::returning(vec![json!({ "path": "a.py" }), json!({ "path": "b.py" })]);
        let tool = TechnicalDebtHotspots::new(api.clone(), PathResolver::default(), links());
        let value = parse(tool.for_project(5).await.expect("run"));

        assert_eq!(
            value["description"],
            "Found 2 files with technical debt hotspots for project ID 5."
        );
        assert_eq!(
            value["link"],
            "https://codescene.io/projects/5/analyses/latest/code/technical-debt/system-map#hotspots"
        );
        let queries = api.queries.lock().expect("lock");
        assert_eq!(queries[0].0, "v2/projects/5/analyses/latest/technical-debt");
        assert_eq!(
            queries[0].1,
            params([("page_size", "200"), ("page", "1"), ("refactoring_targets", "true")])
        );
        assert_eq!(queries[0].2, "result");
    }

    #[tokio::test]
    async fn file_hotspot_filters_by_repository_relative_path() {
        let api = Recorded::returning(vec![]);
        let tool = TechnicalDebtHotspots::new(api.clone(), containerized(), links());
        let value = parse(
            tool.for_file("/Users/dev/shop/src/cart.py", 5)
                .await
                .expect("run"),
        );

        assert_eq!(value["hotspot"], json!({}));
        assert_eq!(
            value["description"],
            "Found no technical debt hotspot for file src/cart.py in project ID 5."
        );
        let queries = api.queries.lock().expect("lock");
        assert_eq!(queries[0].1[0], ("filter".to_string(), "file_name~src/cart.py".to_string()));
    }

    #[tokio::test]
    async fn file_goals_use_the_first_match() {
        let api = Recorded::returning(vec![json!({
            "goals": [{ "name": "supervise" }, { "name": "no-problem" }]
        })]);
        let tool = TechnicalDebtGoals::new(api.clone(), PathResolver::default(), links());
        let value = parse(tool.for_file("src/cart.py", 9).await.expect("run"));

        assert_eq!(value["goals"].as_array().map(Vec::len), Some(2));
        assert_eq!(
            value["link"],
            "https://codescene.io/projects/9/analyses/latest/code/biomarkers?name=src%2Fcart.py"
        );
        let queries = api.queries.lock().expect("lock");
        assert_eq!(
            queries[0].1,
            params([("filter", "path~src/cart.py"), ("fields", "goals")])
        );
    }

    #[tokio::test]
    async fn project_goals_only_list_files_with_goals() {
        let api = Recorded::returning(vec![json!({ "path": "a.py", "goals": [] })]);
        let tool = TechnicalDebtGoals::new(api.clone(), PathResolver::default(), links());
        let value = parse(tool.for_project(9).await.expect("run"));
        assert_eq!(
            value["description"],
            "Found 1 files with technical debt goals for project ID 9."
        );
        let queries = api.queries.lock().expect("lock");
        assert!(queries[0]
            .1
            .contains(&("filter".to_string(), "goals^not-empty".to_string())));
    }

    #[tokio::test]
    async fn path_outside_the_mount_fails_before_querying() {
        let api = Recorded::returning(vec![]);
        let tool = TechnicalDebtGoals::new(api.clone(), containerized(), links());
        let err = tool.for_file("/tmp/x.py", 9).await.unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(api.queries.lock().expect("lock").is_empty());
    }
}
