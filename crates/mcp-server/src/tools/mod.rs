//! One struct per tool, each holding only the collaborators it needs.

mod auto_refactor;
mod code_health;
mod delta;
mod links;
mod ownership;
mod projects;
mod technical_debt;

pub use auto_refactor::{AutoRefactor, ACE_TOKEN_MISSING};
pub use code_health::{CodeHealthReview, CodeHealthScore};
pub use delta::{AnalyzeChangeSet, PreCommitSafeguard};
pub use links::ProjectLinks;
pub use ownership::CodeOwnership;
pub use projects::SelectProject;
pub use technical_debt::{TechnicalDebtGoals, TechnicalDebtHotspots};
