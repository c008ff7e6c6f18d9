//! # Code Health Invoker
//!
//! The boundary to everything outside the server process:
//!
//! - [`ProcessRunner`] runs the `cs` analysis CLI (and `git`) and captures stdout,
//! - [`ApiQuerier`] walks the paginated CodeScene REST API,
//! - [`RefactorClient`] talks to the ACE auto-refactoring service.
//!
//! Every call is a single attempt. Failures surface as [`InvokeError`]; nothing is retried and
//! no partial results are returned.

mod api;
mod cli_path;
mod error;
mod http;
mod process;
mod refactor;
mod trust_store;

pub use api::{paginate, params, ApiQuerier, CodeSceneApi, QueryParams};
pub use cli_path::{resolve_cli_program, CLI_BINARY_NAME};
pub use error::{InvokeError, CLI_INSTALL_HINT, MAX_DETAIL_CHARS};
pub use http::{build_client, USER_AGENT};
pub use process::{CliRunner, ProcessInvocation, ProcessRunner};
pub use refactor::{AceClient, RefactorClient};
