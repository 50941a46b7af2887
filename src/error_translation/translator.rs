use crate::accounts::{AccountError, GitProvider};
use crate::error::{AppError, GitError};

#[derive(Debug, Clone)]
pub struct UserFriendlyError {
    pub simple_message: String,
    pub suggestion: Option<String>,
    pub raw_error: String,
}

pub struct ErrorTranslator;

impl ErrorTranslator {
    /// Translate an AppError into a user-friendly error message
    pub fn translate_app_error(error: &AppError) -> UserFriendlyError {
        match error {
            AppError::Git(git_err) => Self::translate(git_err),
            AppError::Config(config_err) => UserFriendlyError {
                simple_message: "Configuration error occurred.".to_string(),
                suggestion: Some(
                    "Check your config file at ~/.config/gitclient/config.toml".to_string(),
                ),
                raw_error: config_err.to_string(),
            },
            AppError::Account(account_err) => UserFriendlyError {
                simple_message: "Account could not be used.".to_string(),
                suggestion: match account_err {
                    AccountError::MissingServerUrl(_) => {
                        Some("Provide the URL of your self-hosted server".to_string())
                    }
                    AccountError::UnknownProvider(_) => {
                        let ids: Vec<&str> = GitProvider::ALL.iter().map(|p| p.id()).collect();
                        Some(format!("Known providers: {}", ids.join(", ")))
                    }
                    _ => None,
                },
                raw_error: account_err.to_string(),
            },
            AppError::Io(io_err) => UserFriendlyError {
                simple_message: "I/O error occurred.".to_string(),
                suggestion: Some("Check file permissions and disk space".to_string()),
                raw_error: io_err.to_string(),
            },
        }
    }

    /// Translate a GitError into a user-friendly error message
    pub fn translate(error: &GitError) -> UserFriendlyError {
        let raw_error = error.to_string();

        let (simple_message, suggestion) = match error {
            GitError::NotARepository => (
                "Current directory is not a git repository.".to_string(),
                Some("Initialize with: git init".to_string()),
            ),
            GitError::SourceControlDisabled => (
                "Source control is turned off.".to_string(),
                Some(
                    "Set enable_source_control = true under [source_control] in your config"
                        .to_string(),
                ),
            ),
            GitError::FailedToDecodeUrl(path) => (
                format!("Could not build a file location for '{}'.", path),
                Some("Open the repository by its absolute path".to_string()),
            ),
            GitError::UnsafeCommand(_) => (
                "Command was blocked because it contains shell substitution.".to_string(),
                None,
            ),
            GitError::GitVersionTooOld(_) | GitError::GitVersionDetectionFailed(_) => (
                "Installed git could not be used.".to_string(),
                Some("Install git 2.20 or newer and make sure it is on your PATH".to_string()),
            ),
            GitError::OutputError(text) | GitError::ExecutionError { output: text, .. } => {
                Self::match_error_patterns(text)
            }
            GitError::ParseError(_) | GitError::Io(_) => Self::match_error_patterns(&raw_error),
        };

        UserFriendlyError {
            simple_message,
            suggestion,
            raw_error,
        }
    }

    /// Match common git error patterns and provide user-friendly messages
    fn match_error_patterns(error_text: &str) -> (String, Option<String>) {
        let lower = error_text.to_lowercase();

        if lower.contains("no upstream") || lower.contains("does not have an upstream") {
            return (
                "No remote branch is configured for tracking.".to_string(),
                Some("Set one with: git branch --set-upstream-to=origin/<branch>".to_string()),
            );
        }

        if lower.contains("merge conflict") || lower.contains("conflict") {
            return (
                "Merge has conflicts that need to be resolved.".to_string(),
                Some("Fix conflicts in the listed files, then git add and git commit.".to_string()),
            );
        }

        // Checkout of a branch that does not exist
        if lower.contains("pathspec") && lower.contains("did not match") {
            return (
                "Branch or file not found in the repository.".to_string(),
                Some("List branches with the branches command, or check the path.".to_string()),
            );
        }

        if lower.contains("already exists and is not an empty directory") {
            return (
                "Clone destination is not empty.".to_string(),
                Some("Clone into an empty directory.".to_string()),
            );
        }

        if lower.contains("not a git repository") {
            return (
                "Current directory is not a git repository.".to_string(),
                Some("Initialize with: git init".to_string()),
            );
        }

        if lower.contains("repository") && (lower.contains("not found") || lower.contains("does not appear")) {
            return (
                "Remote repository not found.".to_string(),
                Some("Check the remote URL with: git remote -v".to_string()),
            );
        }

        if lower.contains("authentication failed")
            || lower.contains("permission denied")
            || lower.contains("terminal prompts disabled")
            || lower.contains("could not read username")
        {
            return (
                "Authentication failed - check your credentials.".to_string(),
                Some("Verify your SSH keys or personal access token.".to_string()),
            );
        }

        if lower.contains("uncommitted changes") || lower.contains("would be overwritten") {
            return (
                "Operation would overwrite uncommitted changes.".to_string(),
                Some("Stash your changes first with the stash command".to_string()),
            );
        }

        if lower.contains("diverged") || lower.contains("not possible to fast-forward") {
            return (
                "Local and remote branches have diverged.".to_string(),
                Some("Reconcile them manually with git merge or git rebase".to_string()),
            );
        }

        if lower.contains("no local changes to save") {
            return ("Nothing to stash - working directory is clean.".to_string(), None);
        }

        if lower.contains("rebase in progress") {
            return (
                "A rebase operation is currently in progress.".to_string(),
                Some("Continue with: git rebase --continue, or abort: git rebase --abort".to_string()),
            );
        }

        if lower.contains("merge in progress") || lower.contains("unmerged files") {
            return (
                "A merge operation is currently in progress.".to_string(),
                Some("Complete the merge and commit, or abort: git merge --abort".to_string()),
            );
        }

        // Default: return the error as-is with no suggestion
        (error_text.to_string(), None)
    }
}
