use crate::audit::AuditLogger;
use crate::error::{GitError, GitResult};
use crate::git::stream::LiveOutput;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use tracing::{debug, warn};

/// Environment applied to every spawned command so git never waits on a prompt
pub(crate) const NON_INTERACTIVE_ENV: [(&str, &str); 2] =
    [("GIT_TERMINAL_PROMPT", "0"), ("GCM_INTERACTIVE", "never")];

/// Result of executing a command line
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

impl CommandOutput {
    /// Stdout followed by stderr, the text the classifier inspects
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout.trim_end(), self.stderr)
        }
    }
}

/// Process boundary used by the client
///
/// `GitExecutor` is the real implementation; tests substitute scripted output.
pub trait CommandRunner {
    /// Run a command line to completion and capture its output
    fn execute(&self, command: &str) -> GitResult<CommandOutput>;

    /// Spawn a command line in `dir` and return a live feed of its output
    fn spawn_live(&self, command: &str, dir: &Path) -> GitResult<LiveOutput>;

    /// Directory blocking commands run in
    fn working_dir(&self) -> &Path;
}

/// Executes shell command lines scoped to a working directory
#[derive(Debug, Clone)]
pub struct GitExecutor {
    working_dir: PathBuf,
    audit: Option<Arc<AuditLogger>>,
}

impl GitExecutor {
    /// Create a new GitExecutor for the given working directory
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            audit: None,
        }
    }

    /// Record every executed command line in the given audit log
    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Execute a command line and return its combined output
    ///
    /// Fails with `ExecutionError` when the process exits non-zero.
    pub fn run(&self, command: &str) -> GitResult<String> {
        let output = self.execute(command)?;
        if !output.success {
            return Err(GitError::ExecutionError {
                command: command.to_string(),
                exit_code: output.exit_code,
                output: output.combined().trim().to_string(),
            });
        }

        Ok(output.combined())
    }

    /// Spawn a command line and return a live feed of its output
    ///
    /// Must be called from within a Tokio runtime. Dropping the returned
    /// `LiveOutput` terminates the process.
    pub fn run_streaming(&self, command: &str) -> GitResult<LiveOutput> {
        self.spawn_live(command, &self.working_dir)
    }

    fn audit(&self, command: &str, exit_code: i32) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_command(command, &self.working_dir, exit_code) {
                warn!(error = %e, "failed to write audit log entry");
            }
        }
    }
}

impl CommandRunner for GitExecutor {
    /// Execute a command line and capture its output, whatever the exit status
    ///
    /// Only a spawn failure or a rejected command line is an error here;
    /// callers decide what a non-zero exit means.
    /// Example: executor.execute("git status -s --porcelain -u")
    fn execute(&self, command: &str) -> GitResult<CommandOutput> {
        check_command(command)?;

        debug!(command, dir = %self.working_dir.display(), "spawning");

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .envs(NON_INTERACTIVE_ENV)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| GitError::spawn_failed(command, &e))?;

        let output = process_output(output);
        self.audit(command, output.exit_code);
        Ok(output)
    }

    fn spawn_live(&self, command: &str, dir: &Path) -> GitResult<LiveOutput> {
        check_command(command)?;

        debug!(command, dir = %dir.display(), "spawning live");

        LiveOutput::spawn(command, dir)
    }

    fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

fn process_output(output: Output) -> CommandOutput {
    CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
        success: output.status.success(),
    }
}

/// Reject empty command lines and unquoted command substitution
fn check_command(command: &str) -> GitResult<()> {
    if command.trim().is_empty() {
        return Err(GitError::UnsafeCommand("Empty command".to_string()));
    }

    let mut in_single_quotes = false;
    let mut escaped = false;
    for c in command.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\'' => in_single_quotes = !in_single_quotes,
            '\\' if !in_single_quotes => escaped = true,
            '$' | '`' if !in_single_quotes => {
                return Err(GitError::UnsafeCommand(format!(
                    "Command contains potentially unsafe characters: {}",
                    command
                )));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Quote an argument as a single shell word
///
/// Used for every interpolated path, branch name, URL and message.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}
