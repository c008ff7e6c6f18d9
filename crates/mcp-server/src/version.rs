//! Best-effort "is there a newer release" check.
//!
//! The check never blocks a tool call. A cache miss starts a background lookup and the call
//! proceeds as if the server were current; later calls see the cached answer. Failed lookups are
//! cached too, so an offline machine pays for at most one attempt per cache period.

use async_trait::async_trait;
use codehealth_config::Config;
use codehealth_invoker::{build_client, InvokeError};
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
const NOTICE_RULE: &str =
    "================================================================================";

#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Latest released version, e.g. `v0.5.0` or `0.5.0`.
    async fn latest_version(&self) -> Result<String, InvokeError>;
}

/// GitHub "latest release" endpoint.
#[derive(Debug, Clone)]
pub struct GitHubReleases {
    client: Client,
    url: String,
}

#[derive(Deserialize)]
struct Release {
    tag_name: String,
}

impl GitHubReleases {
    pub fn new(config: &Config) -> Result<Self, InvokeError> {
        let client = build_client(config).map_err(InvokeError::from_transport)?;
        Ok(Self {
            client,
            url: config.version_check_url.clone(),
        })
    }
}

#[async_trait]
impl VersionSource for GitHubReleases {
    async fn latest_version(&self) -> Result<String, InvokeError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(InvokeError::from_transport)?;
        let release: Release = response.json().await.map_err(InvokeError::from_transport)?;
        Ok(release.tag_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStatus {
    Current,
    Stale { latest: String },
}

#[derive(Debug, Default)]
struct CacheState {
    /// `Some(None)` records a failed lookup.
    latest: Option<Option<String>>,
    checked_at: Option<Instant>,
    fetching: bool,
}

#[derive(Clone)]
pub struct VersionChecker {
    current: String,
    source: Option<Arc<dyn VersionSource>>,
    ttl: Duration,
    state: Arc<Mutex<CacheState>>,
}

impl VersionChecker {
    pub fn new(current: impl Into<String>, source: Arc<dyn VersionSource>) -> Self {
        Self {
            current: current.into(),
            source: Some(source),
            ttl: CACHE_TTL,
            state: Arc::default(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            current: CURRENT_VERSION.to_string(),
            source: None,
            ttl: CACHE_TTL,
            state: Arc::default(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Decides from the cache; on a miss, kicks off a background lookup and reports `Current`.
    pub fn status(&self) -> VersionStatus {
        if self.source.is_none() || is_development(&self.current) {
            return VersionStatus::Current;
        }
        let Ok(mut state) = self.state.lock() else {
            return VersionStatus::Current;
        };

        let fresh = state
            .checked_at
            .is_some_and(|checked_at| checked_at.elapsed() < self.ttl);
        if fresh {
            return match &state.latest {
                Some(Some(latest)) if is_newer(&self.current, latest) => VersionStatus::Stale {
                    latest: latest.clone(),
                },
                _ => VersionStatus::Current,
            };
        }

        if !state.fetching {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                state.fetching = true;
                let checker = self.clone();
                handle.spawn(async move { checker.refresh().await });
            }
        }
        VersionStatus::Current
    }

    /// Looks up the latest version now and stores the outcome, success or not.
    pub async fn refresh(&self) {
        let Some(source) = &self.source else {
            return;
        };
        let latest = match source.latest_version().await {
            Ok(latest) => Some(latest),
            Err(err) => {
                log::debug!("version lookup failed: {err}");
                None
            }
        };
        if let Ok(mut state) = self.state.lock() {
            state.latest = Some(latest);
            state.checked_at = Some(Instant::now());
            state.fetching = false;
        }
    }

    /// Appends the upgrade notice when a newer release is known.
    pub fn annotate(&self, text: String) -> String {
        match self.status() {
            VersionStatus::Current => text,
            VersionStatus::Stale { latest } => {
                format!("{text}\n\n{}", upgrade_notice(&self.current, &latest))
            }
        }
    }
}

fn upgrade_notice(current: &str, latest: &str) -> String {
    format!(
        "{NOTICE_RULE}\n\
         VERSION UPDATE AVAILABLE:\n\
         Code Health MCP Server version {current} is outdated. Latest version is {latest}. \
         Please update using your installation method:\n  \
         - Homebrew: `brew upgrade cs-mcp`\n  \
         - Windows: Re-run the PowerShell install script\n  \
         - Docker: `docker pull codescene/codescene-mcp:latest`\n  \
         - Manual: Download the latest binary from \
         https://github.com/codescene-oss/codescene-mcp-server/releases\n\
         {NOTICE_RULE}"
    )
}

fn is_development(version: &str) -> bool {
    matches!(version, "0.0.0" | "dev")
}

fn numeric_parts(version: &str) -> Option<Vec<u64>> {
    version
        .trim()
        .trim_start_matches(['v', 'V'])
        .split('.')
        .map(|part| part.parse().ok())
        .collect()
}

/// Numeric comparison when both sides are dotted numbers, plain inequality otherwise.
pub fn is_newer(current: &str, latest: &str) -> bool {
    match (numeric_parts(current), numeric_parts(latest)) {
        (Some(current), Some(latest)) => latest > current,
        _ => current.trim().trim_start_matches('v') != latest.trim().trim_start_matches('v'),
    }
}
