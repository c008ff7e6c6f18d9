use crate::analysis::{CliAnalyzer, FileAnalyzer};
use crate::telemetry::{HttpSink, NoopSink, TelemetrySink};
use crate::version::{GitHubReleases, VersionChecker, CURRENT_VERSION};
use codehealth_config::Config;
use codehealth_invoker::{
    resolve_cli_program, AceClient, ApiQuerier, CliRunner, CodeSceneApi, InvokeError,
    ProcessRunner, RefactorClient,
};
use codehealth_paths::PathResolver;
use std::sync::Arc;

/// Collaborators shared read-only by every tool, built once at startup.
#[derive(Clone)]
pub struct ToolDeps {
    pub config: Arc<Config>,
    pub paths: PathResolver,
    pub cli_program: String,
    pub runner: Arc<dyn ProcessRunner>,
    pub api: Arc<dyn ApiQuerier>,
    pub refactor: Arc<dyn RefactorClient>,
    pub analyzer: Arc<dyn FileAnalyzer>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub versions: VersionChecker,
}

impl ToolDeps {
    pub fn from_config(config: Config) -> Result<Self, InvokeError> {
        let cli_program = resolve_cli_program(&config);
        let paths = PathResolver::new(&config);
        let runner: Arc<dyn ProcessRunner> = Arc::new(CliRunner::new(&config, cli_program.clone()));
        let analyzer = Arc::new(CliAnalyzer::new(runner.clone(), cli_program.clone(), paths.clone()));

        let telemetry: Arc<dyn TelemetrySink> = if config.tracking_disabled {
            Arc::new(NoopSink)
        } else {
            Arc::new(HttpSink::new(&config)?)
        };
        let versions = if config.version_check_disabled {
            VersionChecker::disabled()
        } else {
            VersionChecker::new(CURRENT_VERSION, Arc::new(GitHubReleases::new(&config)?))
        };

        log::info!(
            "cs CLI: {cli_program}, containerized: {}",
            paths.is_containerized()
        );

        Ok(Self {
            api: Arc::new(CodeSceneApi::new(&config)?),
            refactor: Arc::new(AceClient::new(&config)?),
            config: Arc::new(config),
            paths,
            cli_program,
            runner,
            analyzer,
            telemetry,
            versions,
        })
    }
}
