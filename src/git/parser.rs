use chrono::{DateTime, FixedOffset, Utc};
use url::Url;

/// Field separator used in the custom log format
pub const LOG_FIELD_DELIMITER: char = '¦';

/// `--pretty` format producing one delimited record per commit
pub const LOG_FORMAT: &str = "%h¦%H¦%s¦%aN¦%ae¦%cn¦%ce¦%aD¦";

/// Date layout of the `%aD` field
const LOG_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

const RECEIVING_OBJECTS: &str = "Receiving objects: ";
const RESOLVING_DELTAS: &str = "Resolving deltas: ";

/// Parse `git status -s --porcelain -u` output
///
/// Lines with an unrecognised status code map to `ChangeKind::Unknown`.
pub fn parse_status(output: &str) -> Vec<StatusEntry> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (code, rest) = match line.split_once(char::is_whitespace) {
                Some((code, rest)) => (code, rest.trim()),
                None => (line, ""),
            };

            StatusEntry {
                path: status_path(rest),
                kind: ChangeKind::from_code(code),
            }
        })
        .collect()
}

/// Resolve the path part of a status line: renames keep the destination
fn status_path(rest: &str) -> String {
    let path = match rest.rsplit_once(" -> ") {
        Some((_, to)) => to,
        None => rest,
    };

    match path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(quoted) => unquote_c_style(quoted),
        None => path.to_string(),
    }
}

/// Decode the body of a git C-style quoted path
///
/// Octal escapes are raw bytes, so multi-byte UTF-8 names arrive as
/// several `\ooo` groups and are decoded together.
fn unquote_c_style(quoted: &str) -> String {
    let mut bytes = Vec::with_capacity(quoted.len());
    let mut chars = quoted.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        match chars.next() {
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('r') => bytes.push(b'\r'),
            Some('a') => bytes.push(0x07),
            Some('b') => bytes.push(0x08),
            Some('f') => bytes.push(0x0c),
            Some('v') => bytes.push(0x0b),
            Some(d @ '0'..='7') => {
                let mut value = d as u32 - '0' as u32;
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&next @ '0'..='7') => {
                            value = value * 8 + (next as u32 - '0' as u32);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                bytes.push((value & 0xff) as u8);
            }
            // \" and \\ and anything unknown stand for themselves
            Some(other) => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => bytes.push(b'\\'),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse log output written with [`LOG_FORMAT`]
///
/// Missing trailing fields default to empty strings and an unreadable
/// date defaults to the current time.
pub fn parse_log(output: &str) -> Vec<CommitEntry> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut fields = line.split(LOG_FIELD_DELIMITER);
            let mut next = || fields.next().unwrap_or_default().to_string();

            let short_hash = next();
            let hash = next();
            let subject = next();
            let author_name = next();
            let author_email = next();
            let committer_name = next();
            let committer_email = next();
            let date = parse_log_date(&next());

            CommitEntry {
                short_hash,
                hash,
                subject,
                author_name,
                author_email,
                committer_name,
                committer_email,
                remote_url: None,
                date,
            }
        })
        .collect()
}

fn parse_log_date(raw: &str) -> DateTime<FixedOffset> {
    let raw = raw.trim();
    DateTime::parse_from_str(raw, LOG_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .unwrap_or_else(|_| Utc::now().fixed_offset())
}

/// Parse branch listing output into branch names
pub fn parse_branch_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Classify one line of `git clone --progress` output
///
/// Plain substring matching on git's human-readable progress text; a
/// percentage that cannot be read is reported as 0.
pub fn parse_clone_progress(line: &str) -> CloneProgressEvent {
    if line.contains(RECEIVING_OBJECTS) {
        CloneProgressEvent::ReceivingObjects(progress_percent(line, RECEIVING_OBJECTS))
    } else if line.contains(RESOLVING_DELTAS) {
        CloneProgressEvent::ResolvingDeltas(progress_percent(line, RESOLVING_DELTAS))
    } else {
        CloneProgressEvent::Other(line.to_string())
    }
}

fn progress_percent(line: &str, label: &str) -> u8 {
    let compact: String = line
        .replace(label, "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    compact
        .split('%')
        .next()
        .and_then(|n| n.parse::<u8>().ok())
        .unwrap_or(0)
        .min(100)
}

/// Parse the remote query output into a URL, if it holds one
pub fn parse_remote_url(output: &str) -> Option<Url> {
    Url::parse(output.trim()).ok()
}

/// A changed file from the status listing, path relative to the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    pub kind: ChangeKind,
}

/// Kind of change reported for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    Untracked,
    Unmerged,
    Unknown,
}

impl ChangeKind {
    /// Map a short-format status code (`M`, `??`, `UU`, `AM`, ...) to a kind
    pub fn from_code(code: &str) -> Self {
        match code {
            "??" => return ChangeKind::Untracked,
            "DD" | "AA" | "AU" | "UA" | "DU" | "UD" | "UU" => return ChangeKind::Unmerged,
            _ => {}
        }

        if code.is_empty() || code.len() > 2 {
            return ChangeKind::Unknown;
        }

        match code.chars().next() {
            Some('M') => ChangeKind::Modified,
            Some('A') => ChangeKind::Added,
            Some('D') => ChangeKind::Deleted,
            Some('R') => ChangeKind::Renamed,
            Some('C') => ChangeKind::Copied,
            Some('U') => ChangeKind::Unmerged,
            _ => ChangeKind::Unknown,
        }
    }
}

/// A commit from the history listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEntry {
    pub short_hash: String,
    pub hash: String,
    pub subject: String,
    pub author_name: String,
    pub author_email: String,
    pub committer_name: String,
    pub committer_email: String,
    pub remote_url: Option<Url>,
    pub date: DateTime<FixedOffset>,
}

/// One update from a streaming clone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneProgressEvent {
    ReceivingObjects(u8),
    ResolvingDeltas(u8),
    Other(String),
}
