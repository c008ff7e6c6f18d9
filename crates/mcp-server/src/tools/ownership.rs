use super::links::ProjectLinks;
use super::technical_debt::files_endpoint;
use crate::error::ToolError;
use crate::format::Payload;
use codehealth_invoker::{params, ApiQuerier};
use codehealth_paths::PathResolver;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct Ownership {
    owner: String,
    paths: Vec<String>,
    link: String,
}

#[derive(Clone)]
pub struct CodeOwnership {
    api: Arc<dyn ApiQuerier>,
    paths: PathResolver,
    links: ProjectLinks,
}

impl CodeOwnership {
    pub fn new(api: Arc<dyn ApiQuerier>, paths: PathResolver, links: ProjectLinks) -> Self {
        Self { api, paths, links }
    }

    /// Owners of everything matching `path`, sorted by owner.
    pub async fn run(&self, project_id: i64, path: &str) -> Result<Payload, ToolError> {
        let relative = self.paths.project_relative(path)?;
        let query = params([
            ("filter", format!("path~{relative}")),
            ("fields", "owner,path".to_string()),
        ]);
        let files = self
            .api
            .query_list(&files_endpoint(project_id), &query, "files")
            .await?;

        let mut by_owner: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for file in &files {
            let (Some(owner), Some(path)) = (str_field(file, "owner"), str_field(file, "path"))
            else {
                log::debug!("skipping ownership record without owner/path: {file}");
                continue;
            };
            by_owner.entry(owner.to_string()).or_default().push(path.to_string());
        }

        let owners: Vec<Ownership> = by_owner
            .into_iter()
            .map(|(owner, paths)| Ownership {
                link: self.links.owner(project_id, &owner),
                owner,
                paths,
            })
            .collect();
        Payload::json(&owners)
    }
}

fn str_field<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}
