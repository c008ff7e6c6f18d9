//! # Code Health Config
//!
//! Process-wide settings for the Code Health MCP server.
//!
//! Everything is read once at startup into an immutable [`Config`] that is passed by reference to
//! the components that need it. Nothing below the binary entry point looks at the process
//! environment directly, which keeps path resolution and the invokers testable with a plain
//! closure lookup:
//!
//! ```
//! use codehealth_config::Config;
//!
//! let config = Config::from_lookup(|key| match key {
//!     "CS_MOUNT_PATH" => Some("/home/u/proj".to_string()),
//!     _ => None,
//! });
//! assert_eq!(config.mount.unwrap().internal_root, "/mount");
//! ```

use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Public cloud REST API.
pub const DEFAULT_API_URL: &str = "https://api.codescene.io";
/// Public cloud web UI, used for deep links.
pub const DEFAULT_PROJECTS_URL: &str = "https://codescene.io/projects";
/// Auto-refactoring (ACE) service.
pub const ACE_API_URL: &str = "https://devtools.codescene.io";
/// Where the container image bind-mounts the user's project.
pub const INTERNAL_MOUNT_ROOT: &str = "/mount";
pub const DEFAULT_VERSION_CHECK_URL: &str =
    "https://api.github.com/repos/codescene-oss/codescene-mcp-server/releases/latest";

/// Checked in order; the first one set wins.
pub const CA_BUNDLE_VARS: [&str; 3] = ["REQUESTS_CA_BUNDLE", "SSL_CERT_FILE", "CURL_CA_BUNDLE"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected} (got {value:?})")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Host-to-container path rewrite for the containerized deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountTranslation {
    /// The host directory as the AI assistant sees it (`CS_MOUNT_PATH`).
    pub external_root: String,
    /// The same directory inside the container.
    pub internal_root: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub no_proxy: Option<String>,
}

impl ProxySettings {
    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none() && self.no_proxy.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub access_token: Option<String>,
    /// On-prem installation URL without trailing slashes.
    pub onprem_url: Option<String>,
    pub ace_access_token: Option<String>,
    pub mount: Option<MountTranslation>,
    /// Explicit location of the `cs` binary.
    pub cli_path: Option<PathBuf>,
    /// Raw `CS_DEFAULT_PROJECT_ID`; validated on use by [`Config::default_project_id`].
    pub default_project_id: Option<String>,
    pub ca_bundle: Option<PathBuf>,
    pub proxy: ProxySettings,
    pub version_check_disabled: bool,
    pub version_check_url: String,
    pub tracking_disabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mount = get("CS_MOUNT_PATH").map(|external_root| MountTranslation {
            external_root,
            internal_root: INTERNAL_MOUNT_ROOT.to_string(),
        });

        let ca_bundle = CA_BUNDLE_VARS
            .iter()
            .find_map(|key| get(key))
            .map(PathBuf::from);

        let proxy = ProxySettings {
            http: get("HTTP_PROXY").or_else(|| get("http_proxy")),
            https: get("HTTPS_PROXY").or_else(|| get("https_proxy")),
            no_proxy: get("NO_PROXY").or_else(|| get("no_proxy")),
        };

        let config = Self {
            access_token: get("CS_ACCESS_TOKEN"),
            onprem_url: get("CS_ONPREM_URL").map(|url| normalize_onprem_url(&url)),
            ace_access_token: get("CS_ACE_ACCESS_TOKEN"),
            mount,
            cli_path: get("CS_CLI_PATH").map(PathBuf::from),
            default_project_id: get("CS_DEFAULT_PROJECT_ID"),
            ca_bundle,
            proxy,
            version_check_disabled: get("CS_DISABLE_VERSION_CHECK").is_some(),
            version_check_url: get("CS_VERSION_CHECK_URL")
                .unwrap_or_else(|| DEFAULT_VERSION_CHECK_URL.to_string()),
            tracking_disabled: get("CS_DISABLE_TRACKING").is_some(),
        };

        log::debug!(
            "config: onprem={} mount={} ca_bundle={} proxy={}",
            config.onprem_url.is_some(),
            config.mount.is_some(),
            config.ca_bundle.is_some(),
            !config.proxy.is_empty()
        );
        config
    }

    /// Base URL of the REST API (cloud or on-prem).
    pub fn api_url(&self) -> String {
        match &self.onprem_url {
            Some(url) => format!("{url}/api"),
            None => DEFAULT_API_URL.to_string(),
        }
    }

    /// Base URL for links into the web UI; project pages live at `{base}/{project_id}/...`.
    pub fn projects_url(&self) -> String {
        match &self.onprem_url {
            Some(url) => url.clone(),
            None => DEFAULT_PROJECTS_URL.to_string(),
        }
    }

    pub fn is_containerized(&self) -> bool {
        self.mount.is_some()
    }

    pub fn default_project_id(&self) -> Result<Option<i64>, ConfigError> {
        let Some(raw) = self.default_project_id.as_deref() else {
            return Ok(None);
        };
        raw.parse::<i64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: "CS_DEFAULT_PROJECT_ID",
                value: raw.to_string(),
                expected: "an integer project id",
            })
    }
}

pub fn normalize_onprem_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn api_url_defaults_to_cloud() {
        let config = config_from(&[]);
        assert_eq!(config.api_url(), "https://api.codescene.io");
        assert_eq!(config.projects_url(), "https://codescene.io/projects");
    }

    #[test]
    fn onprem_url_drops_trailing_slashes() {
        let config = config_from(&[("CS_ONPREM_URL", "https://cs.example.com//")]);
        assert_eq!(config.api_url(), "https://cs.example.com/api");
        assert_eq!(config.projects_url(), "https://cs.example.com");
    }

    #[test]
    fn blank_values_are_unset() {
        let config = config_from(&[("CS_MOUNT_PATH", "  "), ("CS_ACCESS_TOKEN", "")]);
        assert!(config.mount.is_none());
        assert!(config.access_token.is_none());
    }

    #[test]
    fn mount_path_maps_to_internal_root() {
        let config = config_from(&[("CS_MOUNT_PATH", "/home/u/proj")]);
        assert_eq!(
            config.mount,
            Some(MountTranslation {
                external_root: "/home/u/proj".to_string(),
                internal_root: "/mount".to_string(),
            })
        );
    }

    #[test]
    fn ca_bundle_precedence() {
        let config = config_from(&[
            ("CURL_CA_BUNDLE", "/c.pem"),
            ("SSL_CERT_FILE", "/b.pem"),
            ("REQUESTS_CA_BUNDLE", "/a.pem"),
        ]);
        assert_eq!(config.ca_bundle, Some(PathBuf::from("/a.pem")));

        let config = config_from(&[("CURL_CA_BUNDLE", "/c.pem"), ("SSL_CERT_FILE", "/b.pem")]);
        assert_eq!(config.ca_bundle, Some(PathBuf::from("/b.pem")));

        let config = config_from(&[("CURL_CA_BUNDLE", "/c.pem")]);
        assert_eq!(config.ca_bundle, Some(PathBuf::from("/c.pem")));
    }

    #[test]
    fn upper_case_proxy_wins() {
        let config = config_from(&[
            ("https_proxy", "http://lower:3128"),
            ("HTTPS_PROXY", "http://upper:3128"),
            ("no_proxy", "localhost"),
        ]);
        assert_eq!(config.proxy.https.as_deref(), Some("http://upper:3128"));
        assert_eq!(config.proxy.no_proxy.as_deref(), Some("localhost"));
        assert!(config.proxy.http.is_none());
    }

    #[test]
    fn version_check_and_tracking_flags() {
        let config = config_from(&[]);
        assert!(!config.version_check_disabled);
        assert!(!config.tracking_disabled);
        assert_eq!(config.version_check_url, DEFAULT_VERSION_CHECK_URL);

        let config = config_from(&[
            ("CS_DISABLE_VERSION_CHECK", "1"),
            ("CS_DISABLE_TRACKING", "true"),
            ("CS_VERSION_CHECK_URL", "http://127.0.0.1:9/latest"),
        ]);
        assert!(config.version_check_disabled);
        assert!(config.tracking_disabled);
        assert_eq!(config.version_check_url, "http://127.0.0.1:9/latest");
    }

    #[test]
    fn default_project_id_is_validated_on_use() {
        assert_eq!(config_from(&[]).default_project_id(), Ok(None));
        assert_eq!(
            config_from(&[("CS_DEFAULT_PROJECT_ID", "42")]).default_project_id(),
            Ok(Some(42))
        );
        let err = config_from(&[("CS_DEFAULT_PROJECT_ID", "abc")])
            .default_project_id()
            .unwrap_err();
        assert!(err.to_string().contains("CS_DEFAULT_PROJECT_ID"));
    }
}
