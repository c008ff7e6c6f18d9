use std::fs;
use std::path::{Component, Path, PathBuf};

/// Marker entry of a git working tree: a directory for regular clones, a file for worktrees.
pub const GIT_MARKER: &str = ".git";

/// Nearest ancestor of `path` (including `path` itself) that contains a `.git` entry.
///
/// The walk is lexical: symlinked segments are not resolved, so the returned root is always a
/// prefix of `path`.
pub fn find_repo_root(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .filter(|candidate| !candidate.as_os_str().is_empty())
        .find(|candidate| candidate.join(GIT_MARKER).exists())
        .map(Path::to_path_buf)
}

/// Drops `.` and folds `..` into the preceding segment without touching the filesystem.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// `path` relative to `root`, `/`-separated; `.` when they are the same directory.
pub(crate) fn relative_to_root(path: &Path, root: &Path) -> Option<String> {
    let rest = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rest
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        Some(".".to_string())
    } else {
        Some(parts.join("/"))
    }
}

/// Reads the `gitdir: <path>` pointer from a worktree's `.git` file.
///
/// Returns `None` for regular repositories (where `.git` is a directory) and for missing or
/// unreadable files.
pub fn read_worktree_gitdir(dot_git: &Path) -> Option<String> {
    if !dot_git.is_file() {
        return None;
    }
    let content = match fs::read_to_string(dot_git) {
        Ok(content) => content,
        Err(err) => {
            log::debug!("cannot read {}: {err}", dot_git.display());
            return None;
        }
    };
    content
        .lines()
        .find_map(|line| line.trim().strip_prefix("gitdir:"))
        .map(str::trim)
        .filter(|gitdir| !gitdir.is_empty())
        .map(str::to_string)
}
