use codehealth_config::Config;
use reqwest::Url;

/// Deep links into the CodeScene web UI (cloud or on-prem).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLinks {
    base: String,
}

impl ProjectLinks {
    pub fn new(config: &Config) -> Self {
        Self::with_base(config.projects_url())
    }

    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn projects(&self) -> &str {
        &self.base
    }

    pub fn hotspots(&self, project_id: i64) -> String {
        format!(
            "{}/{project_id}/analyses/latest/code/technical-debt/system-map#hotspots",
            self.base
        )
    }

    pub fn goals(&self, project_id: i64) -> String {
        format!("{}/{project_id}/analyses/latest/code/biomarkers", self.base)
    }

    pub fn goals_for_file(&self, project_id: i64, relative_path: &str) -> String {
        with_query(self.goals(project_id), "name", relative_path)
    }

    pub fn owner(&self, project_id: i64, owner: &str) -> String {
        with_query(
            format!(
                "{}/{project_id}/analyses/latest/social/individuals/system-map",
                self.base
            ),
            "author",
            &format!("author:{owner}"),
        )
    }
}

/// Appends `key=value`, percent-encoded, to `url`.
fn with_query(url: String, key: &str, value: &str) -> String {
    match Url::parse(&url) {
        Ok(mut parsed) => {
            parsed.query_pairs_mut().append_pair(key, value);
            parsed.into()
        }
        Err(err) => {
            log::debug!("cannot parse link base {url}: {err}");
            format!("{url}?{key}={value}")
        }
    }
}
