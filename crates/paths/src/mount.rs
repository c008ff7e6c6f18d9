use crate::ResolveError;
use codehealth_config::MountTranslation;

/// Splits an absolute path into its segments, accepting POSIX (`/a/b`) and Windows drive-letter
/// (`C:\a\b`, `c:/a/b`) forms. The drive letter becomes the first segment, upper-cased, so
/// `c:\code` and `C:/code` compare equal. Returns `None` for relative paths.
pub(crate) fn absolute_segments(path: &str) -> Option<Vec<String>> {
    let normalized = path.replace('\\', "/");
    let mut segments = Vec::new();

    let rest = if let Some(drive) = drive_letter(&normalized) {
        segments.push(drive.to_ascii_uppercase().to_string());
        &normalized[2..]
    } else if normalized.starts_with('/') {
        normalized.as_str()
    } else {
        return None;
    };

    let anchor = segments.len();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.len() > anchor {
                    segments.pop();
                }
            }
            _ => segments.push(segment.to_string()),
        }
    }
    Some(segments)
}

pub(crate) fn drive_letter(path: &str) -> Option<char> {
    let mut chars = path.chars();
    let first = chars.next()?;
    (first.is_ascii_alphabetic() && chars.next() == Some(':')).then_some(first)
}

pub(crate) fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\') || drive_letter(path).is_some()
}

fn display_segments(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}

/// Rewrites a host path under the external mount root to the container-internal path.
pub(crate) fn translate(mount: &MountTranslation, path: &str) -> Result<String, ResolveError> {
    let mount_segments =
        absolute_segments(&mount.external_root).ok_or_else(|| ResolveError::RelativeMountRoot {
            mount: mount.external_root.clone(),
        })?;
    let Some(user_segments) = absolute_segments(path) else {
        return Err(ResolveError::NotUnderMount {
            path: path.to_string(),
            hint: "file_path must be absolute to be mapped into the container.".to_string(),
        });
    };

    if let Some(index) = first_mismatch(&user_segments, &mount_segments) {
        let input = user_segments.get(index).map_or("<none>", String::as_str);
        let expected = &mount_segments[index];
        // Segment 0 is the filesystem root, matching how users count path parts.
        return Err(ResolveError::NotUnderMount {
            path: display_segments(&user_segments),
            hint: format!(
                "Path mismatch at segment {}: '{input}' (input) vs '{expected}' (mount). \
                 Check for case sensitivity or typos. \
                 To fix: ensure your CS_MOUNT_PATH matches the input path exactly.",
                index + 1
            ),
        });
    }

    let rest = &user_segments[mount_segments.len()..];
    let root = mount.internal_root.trim_end_matches('/');
    if rest.is_empty() {
        Ok(if root.is_empty() { "/".to_string() } else { root.to_string() })
    } else {
        Ok(format!("{root}/{}", rest.join("/")))
    }
}

/// Index of the first mount segment the user path does not share, if any.
fn first_mismatch(user: &[String], mount: &[String]) -> Option<usize> {
    mount
        .iter()
        .enumerate()
        .find(|(idx, segment)| user.get(*idx) != Some(*segment))
        .map(|(idx, _)| idx)
}
