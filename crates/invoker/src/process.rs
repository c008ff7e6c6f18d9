use crate::error::InvokeError;
use crate::trust_store::JavaTrustStore;
use async_trait::async_trait;
use codehealth_config::Config;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// One external command to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Set on top of the inherited environment, e.g. `GIT_DIR` for worktrees.
    pub extra_env: Vec<(String, String)>,
}

impl ProcessInvocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            extra_env: Vec::new(),
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs the command to completion and returns its stdout.
    async fn run(&self, invocation: ProcessInvocation) -> Result<String, InvokeError>;
}

/// Runs commands as child processes, with the CodeScene context in their environment.
#[derive(Debug, Clone)]
pub struct CliRunner {
    cli_program: String,
    /// Converted once; the file stays on disk for as long as the runner lives.
    trust_store: Option<JavaTrustStore>,
    env: Vec<(String, String)>,
}

impl CliRunner {
    pub fn new(config: &Config, cli_program: impl Into<String>) -> Self {
        let mut env = vec![("CS_CONTEXT".to_string(), "mcp-server".to_string())];
        if let Some(token) = &config.access_token {
            env.push(("CS_ACCESS_TOKEN".to_string(), token.clone()));
        }
        if let Some(url) = &config.onprem_url {
            env.push(("CS_ONPREM_URL".to_string(), url.clone()));
        }

        let trust_store = config
            .ca_bundle
            .as_deref()
            .and_then(JavaTrustStore::from_pem_file);

        Self {
            cli_program: cli_program.into(),
            trust_store,
            env,
        }
    }

    pub fn cli_program(&self) -> &str {
        &self.cli_program
    }

    fn command_for(&self, invocation: &ProcessInvocation) -> Command {
        let mut command = Command::new(&invocation.program);
        if let Some(store) = self
            .trust_store
            .as_ref()
            .filter(|_| invocation.program == self.cli_program)
        {
            command.args(store.cli_args());
        }
        command
            .args(&invocation.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .envs(invocation.extra_env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }
        command
    }
}

#[async_trait]
impl ProcessRunner for CliRunner {
    async fn run(&self, invocation: ProcessInvocation) -> Result<String, InvokeError> {
        log::debug!(
            "running {} {:?} (cwd: {:?})",
            invocation.program,
            invocation.args,
            invocation.cwd
        );

        let output = self
            .command_for(&invocation)
            .output()
            .await
            .map_err(|source| InvokeError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!(
                "{} exited with {:?}: {}",
                invocation.program,
                output.status.code(),
                stderr.trim()
            );
            return Err(InvokeError::process_failure(
                &invocation.program,
                output.status.code(),
                &stderr,
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
