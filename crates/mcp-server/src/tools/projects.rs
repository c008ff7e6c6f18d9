use super::links::ProjectLinks;
use crate::error::ToolError;
use crate::format::Payload;
use codehealth_invoker::ApiQuerier;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct DefaultProject {
    id: i64,
    name: &'static str,
    description: &'static str,
    link: String,
}

#[derive(Debug, Serialize)]
struct ProjectList {
    projects: Vec<Value>,
    link: String,
}

#[derive(Clone)]
pub struct SelectProject {
    api: Arc<dyn ApiQuerier>,
    links: ProjectLinks,
    /// `CS_DEFAULT_PROJECT_ID`, validated when the tool runs.
    default_project: Result<Option<i64>, String>,
}

impl SelectProject {
    pub fn new(
        api: Arc<dyn ApiQuerier>,
        links: ProjectLinks,
        default_project: Result<Option<i64>, String>,
    ) -> Self {
        Self {
            api,
            links,
            default_project,
        }
    }

    pub async fn run(&self) -> Result<Payload, ToolError> {
        let link = self.links.projects().to_string();
        match &self.default_project {
            Err(message) => Err(ToolError::Configuration(message.clone())),
            Ok(Some(id)) => Payload::json(&DefaultProject {
                id: *id,
                name: "Default Project (from CS_DEFAULT_PROJECT_ID env var)",
                description: "Using default project from CS_DEFAULT_PROJECT_ID environment \
                              variable. If you want to be able to select a different project, \
                              unset this variable.",
                link,
            }),
            Ok(None) => {
                let projects = self.api.query_list("v2/projects", &[], "projects").await?;
                Payload::json(&ProjectList { projects, link })
            }
        }
    }
}
