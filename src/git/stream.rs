//! Live output feed for long-running commands.
//!
//! ```text
//! sh -c <command>
//!   stdout reader task --\
//!                         +--> mpsc --> LiveOutput::next_chunk()
//!   stderr reader task --/
//! ```
//!
//! Chunks are split on `\n` and `\r` because git redraws progress lines
//! in place with carriage returns.

use crate::error::{GitError, GitResult};
use crate::git::executor::NON_INTERACTIVE_ENV;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, trace};

const CHANNEL_CAPACITY: usize = 64;

/// Ordered feed of output chunks from a running process
///
/// The process is killed when the feed is cancelled or dropped.
#[derive(Debug)]
pub struct LiveOutput {
    command: String,
    child: Child,
    rx: mpsc::Receiver<String>,
    last_chunk: Option<String>,
    finished: bool,
}

impl LiveOutput {
    pub(crate) fn spawn(command: &str, working_dir: &Path) -> GitResult<Self> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(working_dir)
            .envs(NON_INTERACTIVE_ENV)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GitError::spawn_failed(command, &e))?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(read_chunks(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(read_chunks(stderr, tx));
        }

        Ok(Self {
            command: command.to_string(),
            child,
            rx,
            last_chunk: None,
            finished: false,
        })
    }

    /// Wait for the next chunk of output
    ///
    /// Returns `None` once the process has exited successfully. A non-zero
    /// exit is reported once as `ExecutionError` before the feed ends.
    pub async fn next_chunk(&mut self) -> Option<GitResult<String>> {
        if self.finished {
            return None;
        }

        if let Some(chunk) = self.rx.recv().await {
            trace!(chunk = %chunk, "live output");
            self.last_chunk = Some(chunk.clone());
            return Some(Ok(chunk));
        }

        // Both pipes closed, the process is exiting
        self.finished = true;
        match self.child.wait().await {
            Ok(status) if status.success() => None,
            Ok(status) => Some(Err(GitError::ExecutionError {
                command: self.command.clone(),
                exit_code: status.code().unwrap_or(-1),
                output: self.last_chunk.take().unwrap_or_default(),
            })),
            Err(e) => Some(Err(GitError::Io(e))),
        }
    }

    /// Terminate the underlying process and end the feed
    pub async fn cancel(&mut self) -> GitResult<()> {
        self.finished = true;
        self.rx.close();
        if self.child.id().is_some() {
            debug!(command = %self.command, "cancelling live command");
            self.child.kill().await?;
        }
        Ok(())
    }

    /// Whether the feed has ended
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

async fn read_chunks<R>(mut reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };

        for &byte in &buf[..n] {
            if byte == b'\n' || byte == b'\r' {
                if !flush(&mut pending, &tx).await {
                    return;
                }
            } else {
                pending.push(byte);
            }
        }
    }

    flush(&mut pending, &tx).await;
}

/// Send the pending bytes as one chunk; false once the receiver is gone
async fn flush(pending: &mut Vec<u8>, tx: &mpsc::Sender<String>) -> bool {
    if pending.is_empty() {
        return true;
    }
    let chunk = String::from_utf8_lossy(pending).trim_end().to_string();
    pending.clear();
    if chunk.is_empty() {
        return true;
    }
    tx.send(chunk).await.is_ok()
}
