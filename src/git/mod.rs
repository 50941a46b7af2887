pub mod classifier;
pub mod client;
pub mod executor;
pub mod parser;
pub mod repository;
pub mod stream;
pub mod version;

// Re-export commonly used types
pub use classifier::{Classification, FatalCheck, classify};
pub use client::{ChangedFile, CloneProgress, GitClient};
pub use executor::{CommandOutput, CommandRunner, GitExecutor, shell_quote};
pub use parser::{
    ChangeKind, CloneProgressEvent, CommitEntry, StatusEntry, parse_branch_list,
    parse_clone_progress, parse_log, parse_remote_url, parse_status,
};
pub use repository::WorkingContext;
pub use stream::LiveOutput;
pub use version::GitVersion;
