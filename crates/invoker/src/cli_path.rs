use codehealth_config::Config;
use std::env;
use std::path::{Path, PathBuf};

#[cfg(windows)]
pub const CLI_BINARY_NAME: &str = "cs.exe";
#[cfg(not(windows))]
pub const CLI_BINARY_NAME: &str = "cs";

/// Locates the analysis CLI: `CS_CLI_PATH`, then a binary bundled next to the server executable,
/// then whatever `cs` the `PATH` yields.
pub fn resolve_cli_program(config: &Config) -> String {
    if let Some(path) = &config.cli_path {
        return path.to_string_lossy().into_owned();
    }
    let bundled = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .and_then(|dir| bundled_cli(&dir));
    match bundled {
        Some(path) => path.to_string_lossy().into_owned(),
        None => CLI_BINARY_NAME.to_string(),
    }
}

fn bundled_cli(dir: &Path) -> Option<PathBuf> {
    let candidate = dir.join(CLI_BINARY_NAME);
    candidate.is_file().then_some(candidate)
}
