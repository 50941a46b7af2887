//! Git command orchestration for an editor's source-control panel.
//!
//! ```text
//!                 main.rs (clap CLI)
//!                        |
//!                        v
//!     config ----> git::GitClient <---- accounts
//!                   |          |
//!        blocking   |          |  streaming
//!                   v          v
//!          git::executor   git::stream
//!           (sh -c, env)   (tokio, chunks)
//!                   |          |
//!                   +----+-----+
//!                        v
//!          git::classifier   git::parser
//!       (fatal detection)   (status/log/branches/progress)
//!
//!   +---------------------------------------------------+
//!   |  foundation   error, logging, audit, translation  |
//!   +---------------------------------------------------+
//! ```

pub mod accounts;
pub mod audit;
pub mod config;
pub mod error;
pub mod error_translation;
pub mod git;
pub mod logging;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{AppError, AppResult, ConfigError, GitError, GitResult};
pub use git::{
    ChangeKind, ChangedFile, CloneProgress, CloneProgressEvent, CommitEntry, GitClient,
    GitExecutor, GitVersion, WorkingContext,
};
