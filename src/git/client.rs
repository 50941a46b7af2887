//! Git operations facade.
//!
//! ```text
//! GitClient::<op>()
//!    |  build command line (escaped root-relative arguments)
//!    v
//! CommandRunner::execute / spawn_live
//!    |  raw text (once, or chunk by chunk for clone)
//!    v
//! classify()  --hit-->  GitError
//!    |  clean
//!    v
//! parser::*   -->  typed records
//! ```
//!
//! Calls hold no shared state and take no locks; two calls against the same
//! work tree race inside git itself.

use crate::audit::AuditLogger;
use crate::config::Config;
use crate::error::{GitError, GitResult};
use crate::git::classifier::{Classification, FatalCheck, classify};
use crate::git::executor::{CommandOutput, CommandRunner, GitExecutor, shell_quote};
use crate::git::parser::{
    self, ChangeKind, CloneProgressEvent, CommitEntry, LOG_FORMAT,
};
use crate::git::repository::WorkingContext;
use crate::git::stream::LiveOutput;
use crate::git::version::GitVersion;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

const CHECKOUT_SUCCESS_PHRASES: [&str; 2] = ["Switched to branch", "Switched to a new branch"];
const NO_COMMITS_YET: &str = "does not have any commits yet";

/// A changed file resolved against the working tree root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub url: Url,
    pub kind: ChangeKind,
}

/// Runs git actions against one working tree
#[derive(Debug)]
pub struct GitClient<R = GitExecutor> {
    context: WorkingContext,
    runner: R,
    git: String,
    enabled: bool,
}

impl GitClient<GitExecutor> {
    /// Create a client backed by the system shell
    pub fn new(context: WorkingContext, config: &Config) -> Self {
        let mut executor = GitExecutor::new(context.root());

        if config.behavior.log_commands {
            let audit = match &config.git.audit_log {
                Some(path) => AuditLogger::with_path(path),
                None => AuditLogger::new(),
            };
            match audit {
                Ok(audit) => executor = executor.with_audit(Arc::new(audit)),
                Err(e) => warn!(error = %e, "command audit log unavailable"),
            }
        }

        Self::with_runner(context, config, executor)
    }
}

impl<R: CommandRunner> GitClient<R> {
    /// Create a client over any command runner
    pub fn with_runner(context: WorkingContext, config: &Config, runner: R) -> Self {
        Self {
            context,
            runner,
            git: config.git.binary.clone(),
            enabled: config.source_control.enable_source_control,
        }
    }

    /// Get the working context
    pub fn context(&self) -> &WorkingContext {
        &self.context
    }

    /// Check that the configured git binary meets the minimum version
    pub fn verify_git(&self) -> GitResult<GitVersion> {
        GitVersion::validate(&self.runner, &self.git)
    }

    /// Name of the checked-out branch
    pub fn current_branch_name(&self) -> GitResult<String> {
        let output = self.run_checked("rev-parse --abbrev-ref HEAD", FatalCheck::NotARepositoryOnly)?;
        Ok(output.stdout.replace('\n', ""))
    }

    /// Local branch names, or local and remote ones when `all` is set
    pub fn get_branches(&self, all: bool) -> GitResult<Vec<String>> {
        let mut args = format!("branch --format={}", shell_quote("%(refname:short)"));
        if all {
            args.push_str(" -a");
        }

        let output = self.run_checked(&args, FatalCheck::NotARepositoryOnly)?;
        Ok(parser::parse_branch_list(&output.stdout))
    }

    /// Switch to another branch
    ///
    /// Checking out the branch that is already current succeeds without
    /// running checkout at all.
    pub fn checkout_branch(&self, name: &str) -> GitResult<()> {
        if self.current_branch_name()? == name {
            return Ok(());
        }

        let output = self.run(&format!("checkout {}", shell_quote(name)), FatalCheck::NotARepositoryOnly)?;
        let text = output.combined();
        if !CHECKOUT_SUCCESS_PHRASES.iter().any(|phrase| text.contains(phrase)) {
            return Err(GitError::OutputError(text));
        }

        info!(branch = name, "checked out branch");
        Ok(())
    }

    /// Clone a repository into the working tree root, blocking until done
    pub fn clone_repository(&self, url: &str) -> GitResult<()> {
        self.run_checked(&format!("clone {} .", shell_quote(url)), FatalCheck::AnyFatal)?;

        info!(url, "cloned repository");
        Ok(())
    }

    /// Clone a repository into the working tree root, reporting progress
    ///
    /// Must be called from within a Tokio runtime. Dropping the returned
    /// progress feed terminates the clone.
    pub fn clone_repository_live(&self, url: &str) -> GitResult<CloneProgress> {
        self.ensure_enabled()?;

        let (dir, target) = self.clone_target();
        let command = self.command(&format!(
            "clone {} {} --progress",
            shell_quote(url),
            shell_quote(&target)
        ));

        let output = self.runner.spawn_live(&command, &dir)?;
        Ok(CloneProgress::new(output))
    }

    /// Files with uncommitted changes, resolved to file URLs
    ///
    /// A path that cannot be turned into a file URL fails the whole call.
    pub fn get_changed_files(&self) -> GitResult<Vec<ChangedFile>> {
        let output = self.run_checked("status -s --porcelain -u", FatalCheck::NotARepositoryOnly)?;

        parser::parse_status(&output.stdout)
            .into_iter()
            .map(|entry| {
                let url = Url::from_file_path(self.context.root().join(&entry.path))
                    .map_err(|_| GitError::FailedToDecodeUrl(entry.path.clone()))?;

                Ok(ChangedFile {
                    path: entry.path,
                    url,
                    kind: entry.kind,
                })
            })
            .collect()
    }

    /// Commit history, newest first, optionally limited and filtered by path
    pub fn get_commit_history(
        &self,
        limit: Option<usize>,
        path_filter: Option<&str>,
    ) -> GitResult<Vec<CommitEntry>> {
        let mut args = format!("log --pretty={}", shell_quote(LOG_FORMAT));
        if let Some(limit) = limit {
            args.push_str(&format!(" -n {}", limit));
        }
        if let Some(path) = path_filter {
            args.push_str(&format!(" -- {}", shell_quote(path)));
        }

        let output = self.run(&args, FatalCheck::NotARepositoryOnly)?;
        if !output.success {
            if output.stderr.contains(NO_COMMITS_YET) {
                return Ok(Vec::new());
            }
            return Err(self.execution_error(&args, &output));
        }

        let remote_url = self.remote_url()?;

        let mut commits = parser::parse_log(&output.stdout);
        for commit in &mut commits {
            commit.remote_url = remote_url.clone();
        }
        Ok(commits)
    }

    /// URL of the default remote, if one is configured
    pub fn remote_url(&self) -> GitResult<Option<Url>> {
        let output = self.run("ls-remote --get-url", FatalCheck::NotARepositoryOnly)?;
        if !output.success {
            return Ok(None);
        }
        Ok(parser::parse_remote_url(&output.stdout))
    }

    /// Restore one file to its committed state
    pub fn discard_file_changes(&self, path: &str) -> GitResult<()> {
        self.run_checked(&format!("restore -- {}", shell_quote(path)), FatalCheck::AnyFatal)?;

        info!(path, "discarded file changes");
        Ok(())
    }

    /// Restore every file in the working tree to its committed state
    pub fn discard_project_changes(&self) -> GitResult<()> {
        self.run_checked("restore .", FatalCheck::AnyFatal)?;

        info!("discarded project changes");
        Ok(())
    }

    /// Stash uncommitted changes, optionally under a message
    pub fn stash_changes(&self, message: Option<&str>) -> GitResult<()> {
        let args = match message {
            Some(message) => format!("stash save {}", shell_quote(message)),
            None => "stash".to_string(),
        };
        self.run_checked(&args, FatalCheck::AnyFatal)?;

        info!("stashed changes");
        Ok(())
    }

    /// Pull from the tracked upstream
    pub fn pull(&self) -> GitResult<()> {
        self.run_checked("pull", FatalCheck::NotARepositoryOnly)?;

        info!("pulled from upstream");
        Ok(())
    }

    fn command(&self, args: &str) -> String {
        format!("{} {}", self.git, args)
    }

    fn ensure_enabled(&self) -> GitResult<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(GitError::SourceControlDisabled)
        }
    }

    /// Run a git command and classify its output, whatever the exit status
    fn run(&self, args: &str, check: FatalCheck) -> GitResult<CommandOutput> {
        self.ensure_enabled()?;

        let command = self.command(args);
        let output = self.runner.execute(&command)?;

        if let Some(err) = classify(&output.combined()).into_error(check) {
            warn!(command = %command, error = %err, "git reported a failure");
            return Err(err);
        }

        Ok(output)
    }

    /// Like `run`, but a non-zero exit that passed classification still fails
    fn run_checked(&self, args: &str, check: FatalCheck) -> GitResult<CommandOutput> {
        let output = self.run(args, check)?;
        if !output.success {
            return Err(self.execution_error(args, &output));
        }
        Ok(output)
    }

    fn execution_error(&self, args: &str, output: &CommandOutput) -> GitError {
        GitError::ExecutionError {
            command: self.command(args),
            exit_code: output.exit_code,
            output: output.combined().trim().to_string(),
        }
    }

    /// Directory to spawn a live clone in, and the target path relative to it
    fn clone_target(&self) -> (PathBuf, String) {
        let root = self.context.root();
        match (root.parent(), root.file_name()) {
            (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
                (parent.to_path_buf(), name.to_string_lossy().into_owned())
            }
            _ => (PathBuf::from("."), self.context.root_str()),
        }
    }
}

/// Progress feed of a streaming clone
///
/// Events arrive in the order git printed them. A not-a-repository marker
/// ends the feed with an error and terminates the process.
#[derive(Debug)]
pub struct CloneProgress {
    output: LiveOutput,
    done: bool,
}

impl CloneProgress {
    fn new(output: LiveOutput) -> Self {
        Self {
            output,
            done: false,
        }
    }

    /// Wait for the next progress event
    pub async fn next(&mut self) -> Option<GitResult<CloneProgressEvent>> {
        if self.done {
            return None;
        }

        match self.output.next_chunk().await? {
            Ok(chunk) => {
                if classify(&chunk) == Classification::NotARepository {
                    self.done = true;
                    if let Err(e) = self.output.cancel().await {
                        warn!(error = %e, "failed to stop clone");
                    }
                    return Some(Err(GitError::NotARepository));
                }
                Some(Ok(parser::parse_clone_progress(&chunk)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    /// Stop the clone
    pub async fn cancel(&mut self) -> GitResult<()> {
        self.done = true;
        self.output.cancel().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    /// Runner that answers from a script and records every command line
    #[derive(Default)]
    struct ScriptedRunner {
        responses: Vec<(&'static str, CommandOutput)>,
        live: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        fn respond(mut self, needle: &'static str, stdout: &str, stderr: &str, exit_code: i32) -> Self {
            self.responses.push((
                needle,
                CommandOutput {
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                    exit_code,
                    success: exit_code == 0,
                },
            ));
            self
        }

        fn live(mut self, script: &'static str) -> Self {
            self.live = Some(script);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn execute(&self, command: &str) -> GitResult<CommandOutput> {
            self.calls.lock().unwrap().push(command.to_string());
            Ok(self
                .responses
                .iter()
                .find(|(needle, _)| command.contains(needle))
                .map(|(_, output)| output.clone())
                .unwrap_or(CommandOutput {
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: 0,
                    success: true,
                }))
        }

        fn spawn_live(&self, command: &str, dir: &Path) -> GitResult<LiveOutput> {
            self.calls.lock().unwrap().push(command.to_string());
            LiveOutput::spawn(self.live.unwrap_or("true"), dir)
        }

        fn working_dir(&self) -> &Path {
            Path::new("/repo")
        }
    }

    fn client(runner: ScriptedRunner) -> GitClient<ScriptedRunner> {
        GitClient::with_runner(WorkingContext::new("/repo"), &Config::default_config(), runner)
    }

    const NOT_A_REPO: &str = "fatal: not a git repository (or any of the parent directories): .git";

    #[test]
    fn test_current_branch_name_trims_newline() {
        let client = client(ScriptedRunner::default().respond("rev-parse", "main\n", "", 0));
        assert_eq!(client.current_branch_name().unwrap(), "main");
    }

    #[test]
    fn test_current_branch_not_a_repository() {
        let client = client(ScriptedRunner::default().respond("rev-parse", "", NOT_A_REPO, 128));
        assert!(matches!(client.current_branch_name(), Err(GitError::NotARepository)));
    }

    #[test]
    fn test_get_branches_all_flag() {
        let client = client(
            ScriptedRunner::default().respond("branch", "main\nfeature\norigin/main\n", "", 0),
        );

        let branches = client.get_branches(true).unwrap();
        assert_eq!(branches, vec!["main", "feature", "origin/main"]);

        let calls = client.runner.calls();
        assert_eq!(calls[0], "git branch --format='%(refname:short)' -a");
    }

    #[test]
    fn test_checkout_current_branch_is_noop() {
        let client = client(ScriptedRunner::default().respond("rev-parse", "main\n", "", 0));

        client.checkout_branch("main").unwrap();

        let calls = client.runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls.iter().any(|c| c.contains("checkout")));
    }

    #[test]
    fn test_checkout_success_phrase() {
        let client = client(
            ScriptedRunner::default()
                .respond("rev-parse", "main\n", "", 0)
                .respond("checkout", "", "Switched to branch 'feature'\n", 0),
        );

        client.checkout_branch("feature").unwrap();
        assert_eq!(client.runner.calls()[1], "git checkout 'feature'");
    }

    #[test]
    fn test_checkout_ambiguous_output_rejected() {
        let client = client(
            ScriptedRunner::default()
                .respond("rev-parse", "main\n", "", 0)
                .respond("checkout", "", "Already on 'feature'\n", 0),
        );

        assert!(matches!(
            client.checkout_branch("feature"),
            Err(GitError::OutputError(text)) if text.contains("Already on")
        ));
    }

    #[test]
    fn test_checkout_missing_branch_is_output_error() {
        let client = client(
            ScriptedRunner::default()
                .respond("rev-parse", "main\n", "", 0)
                .respond("checkout", "", "error: pathspec 'nope' did not match any file(s) known to git\n", 1),
        );

        assert!(matches!(client.checkout_branch("nope"), Err(GitError::OutputError(_))));
    }

    #[test]
    fn test_clone_fatal_is_output_error() {
        let client = client(ScriptedRunner::default().respond(
            "clone",
            "",
            "fatal: repository 'https://example.com/missing.git/' not found\n",
            128,
        ));

        assert!(matches!(
            client.clone_repository("https://example.com/missing.git"),
            Err(GitError::OutputError(_))
        ));
    }

    #[test]
    fn test_changed_files_example() {
        let client = client(
            ScriptedRunner::default().respond("status", "M  src/app.ts\n?? notes.txt\n", "", 0),
        );

        let files = client.get_changed_files().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "src/app.ts");
        assert_eq!(files[0].kind, ChangeKind::Modified);
        assert_eq!(files[0].url.as_str(), "file:///repo/src/app.ts");
        assert_eq!(files[1].path, "notes.txt");
        assert_eq!(files[1].kind, ChangeKind::Untracked);
        assert_eq!(files[1].url.as_str(), "file:///repo/notes.txt");
    }

    #[test]
    fn test_changed_files_relative_root_fails_whole_call() {
        let runner = ScriptedRunner::default().respond("status", "M  a.rs\n?? b.rs\n", "", 0);
        let client = GitClient::with_runner(
            WorkingContext::new("relative/root"),
            &Config::default_config(),
            runner,
        );

        assert!(matches!(
            client.get_changed_files(),
            Err(GitError::FailedToDecodeUrl(path)) if path == "a.rs"
        ));
    }

    #[test]
    fn test_changed_files_not_a_repository() {
        let client = client(ScriptedRunner::default().respond("status", "", NOT_A_REPO, 128));
        assert!(matches!(client.get_changed_files(), Err(GitError::NotARepository)));
    }

    #[test]
    fn test_commit_history_zips_remote_url() {
        let log = "a1¦a1full¦Second¦Ada¦ada@x.io¦Ada¦ada@x.io¦Tue, 04 Jul 2023 09:00:00 +0000¦\n\
                   b2¦b2full¦First¦Bob¦bob@x.io¦Bob¦bob@x.io¦Mon, 03 Jul 2023 09:00:00 +0000¦\n";
        let client = client(
            ScriptedRunner::default()
                .respond("log", log, "", 0)
                .respond("ls-remote", "https://github.com/acme/widgets.git\n", "", 0),
        );

        let commits = client.get_commit_history(Some(2), Some("src/my file.rs")).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].subject, "Second");
        assert_eq!(commits[1].subject, "First");
        for commit in &commits {
            assert_eq!(
                commit.remote_url.as_ref().map(Url::as_str),
                Some("https://github.com/acme/widgets.git")
            );
        }

        let calls = client.runner.calls();
        assert!(calls[0].ends_with(" -n 2 -- 'src/my file.rs'"));
    }

    #[test]
    fn test_commit_history_remote_not_a_repository() {
        let client = client(
            ScriptedRunner::default()
                .respond("log", "a¦b¦c\n", "", 0)
                .respond("ls-remote", "", NOT_A_REPO, 128),
        );

        assert!(matches!(client.get_commit_history(None, None), Err(GitError::NotARepository)));
    }

    #[test]
    fn test_commit_history_empty_repository() {
        let client = client(ScriptedRunner::default().respond(
            "log",
            "",
            "fatal: your current branch 'main' does not have any commits yet\n",
            128,
        ));

        assert!(client.get_commit_history(None, None).unwrap().is_empty());
    }

    #[test]
    fn test_stash_with_and_without_message() {
        let client = client(ScriptedRunner::default());

        client.stash_changes(None).unwrap();
        client.stash_changes(Some("wip: it's late")).unwrap();

        let calls = client.runner.calls();
        assert_eq!(calls[0], "git stash");
        assert_eq!(calls[1], r"git stash save 'wip: it'\''s late'");
    }

    #[test]
    fn test_discard_fatal_is_output_error() {
        let client = client(ScriptedRunner::default().respond(
            "restore",
            "",
            "fatal: could not resolve HEAD\n",
            128,
        ));

        assert!(matches!(client.discard_file_changes("a.rs"), Err(GitError::OutputError(_))));
        assert!(matches!(client.discard_project_changes(), Err(GitError::OutputError(_))));
    }

    #[test]
    fn test_discard_quotes_path_as_one_word() {
        let client = client(ScriptedRunner::default());

        client.discard_file_changes("notes (copy).txt").unwrap();
        client.discard_file_changes("a.txt;touch>pwned").unwrap();
        client.discard_file_changes("it's $5.txt").unwrap();

        let calls = client.runner.calls();
        assert_eq!(calls[0], "git restore -- 'notes (copy).txt'");
        assert_eq!(calls[1], "git restore -- 'a.txt;touch>pwned'");
        assert_eq!(calls[2], r"git restore -- 'it'\''s $5.txt'");
    }

    #[test]
    fn test_pull_checks_only_not_a_repository() {
        let repo_missing = client(ScriptedRunner::default().respond("pull", "", NOT_A_REPO, 128));
        assert!(matches!(repo_missing.pull(), Err(GitError::NotARepository)));

        let no_remote = client(ScriptedRunner::default().respond(
            "pull",
            "",
            "fatal: no remote repository specified\n",
            1,
        ));
        assert!(matches!(no_remote.pull(), Err(GitError::ExecutionError { exit_code: 1, .. })));
    }

    #[test]
    fn test_disabled_source_control_runs_nothing() {
        let mut config = Config::default_config();
        config.source_control.enable_source_control = false;
        let client = GitClient::with_runner(WorkingContext::new("/repo"), &config, ScriptedRunner::default());

        assert!(matches!(client.get_changed_files(), Err(GitError::SourceControlDisabled)));
        assert!(matches!(client.checkout_branch("main"), Err(GitError::SourceControlDisabled)));
        assert!(client.runner.calls().is_empty());
    }

    #[test]
    fn test_configured_binary_is_used() {
        let mut config = Config::default_config();
        config.git.binary = "/usr/local/bin/git".to_string();
        let client = GitClient::with_runner(WorkingContext::new("/repo"), &config, ScriptedRunner::default());

        client.pull().unwrap();
        assert_eq!(client.runner.calls()[0], "/usr/local/bin/git pull");
    }

    #[test]
    fn test_clone_target_splits_parent() {
        let client = client(ScriptedRunner::default());
        let (dir, target) = client.clone_target();
        assert_eq!(dir, PathBuf::from("/"));
        assert_eq!(target, "repo");

        let relative = GitClient::with_runner(
            WorkingContext::new("checkout"),
            &Config::default_config(),
            ScriptedRunner::default(),
        );
        assert_eq!(relative.clone_target(), (PathBuf::from("."), "checkout".to_string()));
    }

    #[tokio::test]
    async fn test_clone_live_maps_progress() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path().join("my clone");
        let runner = ScriptedRunner::default().live(
            "printf \"Cloning into 'x'...\\nReceiving objects:  42%% (10/20)\\rResolving deltas: 100%% (5/5), done.\\n\" 1>&2",
        );
        let client = GitClient::with_runner(WorkingContext::new(&root), &Config::default_config(), runner);

        let mut progress = client.clone_repository_live("https://example.com/x.git").unwrap();
        let mut events = Vec::new();
        while let Some(event) = progress.next().await {
            events.push(event.unwrap());
        }

        assert_eq!(
            events,
            vec![
                CloneProgressEvent::Other("Cloning into 'x'...".to_string()),
                CloneProgressEvent::ReceivingObjects(42),
                CloneProgressEvent::ResolvingDeltas(100),
            ]
        );
        assert_eq!(
            client.runner.calls()[0],
            "git clone 'https://example.com/x.git' 'my clone' --progress"
        );
    }

    #[tokio::test]
    async fn test_clone_live_not_a_repository_ends_stream() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let runner = ScriptedRunner::default().live(
            "echo 'Receiving objects:  5%'; echo 'fatal: not a git repository'; sleep 30; echo late",
        );
        let client = GitClient::with_runner(
            WorkingContext::new(temp_dir.path().join("x")),
            &Config::default_config(),
            runner,
        );

        let mut progress = client.clone_repository_live("https://example.com/x.git").unwrap();
        assert_eq!(progress.next().await.unwrap().unwrap(), CloneProgressEvent::ReceivingObjects(5));
        assert!(matches!(progress.next().await, Some(Err(GitError::NotARepository))));
        assert!(progress.next().await.is_none());
    }
}
