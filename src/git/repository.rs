use crate::error::{GitError, GitResult};
use std::env;
use std::path::{Path, PathBuf};

/// The working tree every command of a client runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingContext {
    root: PathBuf,
}

impl WorkingContext {
    /// Create a context for a known root directory
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Detect the enclosing work tree from the current working directory
    pub fn discover() -> GitResult<Self> {
        let current_dir = env::current_dir().map_err(GitError::Io)?;

        Self::discover_from(&current_dir)
    }

    /// Detect the enclosing work tree starting from a specific directory
    pub fn discover_from<P: AsRef<Path>>(start_path: P) -> GitResult<Self> {
        let mut current = start_path.as_ref().to_path_buf();

        loop {
            if current.join(".git").exists() {
                return Ok(Self::new(current));
            }

            // Move up to parent directory
            if !current.pop() {
                return Err(GitError::NotARepository);
            }
        }
    }

    /// Get the root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root path as text for interpolation into command lines
    pub fn root_str(&self) -> String {
        self.root.to_string_lossy().into_owned()
    }
}
