use clap::{Args, Parser, Subcommand};
use gitclient::error_translation::ErrorTranslator;
use gitclient::{
    AppError, AppResult, CloneProgressEvent, Config, GitClient, GitError, WorkingContext,
    logging,
};
use std::path::PathBuf;
use tracing::debug;

/// Source-control actions for a working tree
#[derive(Debug, Parser)]
#[command(name = "gitclient", author, version, about = "Git command orchestration")]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalOptions {
    /// Working tree to operate on (defaults to the enclosing repository)
    #[arg(short = 'C', long, global = true, env = "GITCLIENT_REPO")]
    repo: Option<PathBuf>,

    /// Configuration file to load instead of ~/.config/gitclient/config.toml
    #[arg(long, global = true, env = "GITCLIENT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List changed files
    Status,

    /// Show commit history
    Log {
        /// Maximum number of commits
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,

        /// Only commits touching this path
        path: Option<String>,
    },

    /// List branches
    Branches {
        /// Include remote-tracking branches
        #[arg(short, long)]
        all: bool,
    },

    /// Print the checked out branch
    CurrentBranch,

    /// Switch to a branch
    Checkout { name: String },

    /// Clone a repository into the working tree
    Clone {
        url: String,

        /// Stream transfer progress while cloning
        #[arg(long)]
        live: bool,
    },

    /// Pull from the tracked remote
    Pull,

    /// Stash local changes
    Stash {
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Discard local changes to a file or the whole tree
    Discard {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        path: Option<String>,

        #[arg(long)]
        all: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        let friendly = ErrorTranslator::translate_app_error(&e);
        eprintln!("Error: {}", friendly.simple_message);
        if let Some(suggestion) = friendly.suggestion {
            eprintln!("Hint: {}", suggestion);
        }
        debug!(error = %friendly.raw_error, "command failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> AppResult<()> {
    let config = match &cli.global.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default()?,
    };
    logging::init_logging(&config.behavior.log_level);

    let context = resolve_context(&cli)?;
    debug!(root = %context.root().display(), "using working tree");
    let client = GitClient::new(context, &config);

    if config.git.min_version_check {
        let version = client.verify_git()?;
        debug!(%version, "git version");
    }

    match cli.command {
        Command::Status => {
            for file in client.get_changed_files()? {
                println!("{:<10} {}", format!("{:?}", file.kind).to_lowercase(), file.path);
            }
        }
        Command::Log { limit, path } => {
            for commit in client.get_commit_history(Some(limit), path.as_deref())? {
                println!(
                    "{} {} ({}, {})",
                    commit.short_hash,
                    commit.subject,
                    commit.author_name,
                    commit.date.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Branches { all } => {
            for branch in client.get_branches(all)? {
                println!("{}", branch);
            }
        }
        Command::CurrentBranch => println!("{}", client.current_branch_name()?),
        Command::Checkout { name } => client.checkout_branch(&name)?,
        Command::Clone { url, live: false } => client.clone_repository(&url)?,
        Command::Clone { url, live: true } => clone_live(&client, &url)?,
        Command::Pull => client.pull()?,
        Command::Stash { message } => client.stash_changes(message.as_deref())?,
        Command::Discard { path: Some(path), .. } => client.discard_file_changes(&path)?,
        Command::Discard { path: None, .. } => client.discard_project_changes()?,
    }

    Ok(())
}

/// Clone targets may not exist yet, every other command needs a work tree
fn resolve_context(cli: &Cli) -> AppResult<WorkingContext> {
    let is_clone = matches!(cli.command, Command::Clone { .. });

    match &cli.global.repo {
        Some(path) => {
            let root = std::path::absolute(path)?;
            if is_clone {
                Ok(WorkingContext::new(root))
            } else {
                Ok(WorkingContext::discover_from(root)?)
            }
        }
        None if is_clone => Ok(WorkingContext::new(std::env::current_dir()?)),
        None => Ok(WorkingContext::discover()?),
    }
}

fn clone_live(client: &GitClient, url: &str) -> AppResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let mut progress = client.clone_repository_live(url)?;

        loop {
            tokio::select! {
                event = progress.next() => match event {
                    Some(Ok(CloneProgressEvent::ReceivingObjects(pct))) => {
                        eprint!("\rReceiving objects: {:>3}%", pct);
                    }
                    Some(Ok(CloneProgressEvent::ResolvingDeltas(pct))) => {
                        eprint!("\rResolving deltas: {:>3}%", pct);
                    }
                    Some(Ok(CloneProgressEvent::Other(line))) => eprintln!("\n{}", line),
                    Some(Err(e)) => return Err(AppError::from(e)),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    progress.cancel().await?;
                    return Err(GitError::OutputError("clone cancelled".to_string()).into());
                }
            }
        }

        eprintln!();
        Ok::<(), AppError>(())
    })
}
