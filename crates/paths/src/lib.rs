//! # Code Health Paths
//!
//! Turns the file paths an AI assistant sends into the form the analysis engine expects.
//!
//! ```text
//! path supplied by the assistant
//!     │
//!     ├── relative ─────────────────────────────> unchanged
//!     │
//!     ├── absolute, CS_MOUNT_PATH configured ───> /mount/<rest>   (or ConfigurationError)
//!     │
//!     └── absolute, bare execution
//!            ├── inside a git working tree ─────> <path relative to the repo root>
//!            └── outside any repository ────────> unchanged
//! ```

mod mount;
mod repo;

use codehealth_config::{Config, MountTranslation};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use repo::{find_repo_root, read_worktree_gitdir, GIT_MARKER};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("file_path must not be empty")]
    EmptyPath,

    #[error("file_path is not under CS_MOUNT_PATH: '{path}'. {hint}")]
    NotUnderMount { path: String, hint: String },

    #[error("CS_MOUNT_PATH must be an absolute path (got {mount:?})")]
    RelativeMountRoot { mount: String },
}

/// Outcome of resolving one caller-supplied path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// The path to hand to the analysis engine.
    pub api_path: String,
    /// Enclosing repository in bare mode; the natural working directory for the CLI.
    pub repo_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    mount: Option<MountTranslation>,
}

impl PathResolver {
    pub fn new(config: &Config) -> Self {
        Self::with_mount(config.mount.clone())
    }

    pub fn with_mount(mount: Option<MountTranslation>) -> Self {
        Self { mount }
    }

    pub fn is_containerized(&self) -> bool {
        self.mount.is_some()
    }

    pub fn resolve_for_api(&self, path: &str) -> Result<String, ResolveError> {
        self.resolve(path).map(|resolved| resolved.api_path)
    }

    pub fn resolve(&self, path: &str) -> Result<ResolvedPath, ResolveError> {
        if path.trim().is_empty() {
            return Err(ResolveError::EmptyPath);
        }
        if !mount::is_absolute(path) {
            return Ok(ResolvedPath {
                api_path: path.to_string(),
                repo_root: None,
            });
        }

        if let Some(mount) = &self.mount {
            return Ok(ResolvedPath {
                api_path: mount::translate(mount, path)?,
                repo_root: None,
            });
        }

        Ok(resolve_in_working_tree(path))
    }

    /// Repository-relative form of `path`, as used in remote API filters and UI links.
    pub fn project_relative(&self, path: &str) -> Result<String, ResolveError> {
        let api_path = self.resolve_for_api(path)?;
        let Some(mount) = &self.mount else {
            return Ok(api_path);
        };
        if !mount::is_absolute(path) {
            return Ok(api_path);
        }

        let root = mount.internal_root.trim_end_matches('/');
        if api_path == root || api_path == "/" {
            return Ok(".".to_string());
        }
        Ok(api_path
            .strip_prefix(root)
            .map(|rest| rest.trim_start_matches('/').to_string())
            .unwrap_or(api_path))
    }

    /// `GIT_DIR` to use when `repo_dir` is a git worktree, `None` for regular repositories.
    ///
    /// `repo_dir` is a path as seen by this process (the container-internal form in container
    /// mode). The worktree pointer holds a host path, so in container mode it is mapped through
    /// the mount and dropped when it lies outside of it.
    pub fn worktree_git_dir(&self, repo_dir: &Path) -> Option<String> {
        let gitdir = read_worktree_gitdir(&repo_dir.join(GIT_MARKER))?;
        match &self.mount {
            None => Some(gitdir),
            Some(mount) => match mount::translate(mount, &gitdir) {
                Ok(translated) => Some(translated),
                Err(err) => {
                    log::debug!("worktree gitdir not reachable in container: {err}");
                    None
                }
            },
        }
    }
}

fn resolve_in_working_tree(path: &str) -> ResolvedPath {
    let unchanged = || ResolvedPath {
        api_path: path.to_string(),
        repo_root: None,
    };

    // A drive-letter path cannot name anything on a POSIX filesystem.
    if !cfg!(windows) && mount::drive_letter(path).is_some() {
        return unchanged();
    }

    let trimmed = path.trim_end_matches(['/', '\\']);
    let candidate =
        repo::normalize_lexically(Path::new(if trimmed.is_empty() { path } else { trimmed }));

    let Some(root) = find_repo_root(&candidate) else {
        log::debug!("no repository encloses {path}; passing it through");
        return unchanged();
    };
    match repo::relative_to_root(&candidate, &root) {
        Some(relative) => ResolvedPath {
            api_path: relative,
            repo_root: Some(root),
        },
        None => unchanged(),
    }
}
