//! repo::hg
//!
//! Mercurial checkouts via the `hg` command line.
//!
//! Every invocation runs with `HGPLAIN=1` (no user aliases, no localized
//! output) and `HGENCODING=utf-8`. Paths are read from NUL-separated
//! output so file names with spaces or newlines survive intact.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};

use super::changeset::{hunks_only, sort_diffs, ChangeKind, Changeset, Diff};
use super::{join_args, RepoError, Repository, VcsKind};
use crate::auth::SecretUrl;
use crate::core::types::{BranchName, ChangesetId};

/// Branch every fresh Mercurial repository starts on.
const DEFAULT_BRANCH: &str = "default";

/// Field separator for template output.
const SEP: char = '\0';

/// An open Mercurial checkout.
#[derive(Debug)]
pub struct HgRepo {
    path: PathBuf,
    branch: BranchName,
    /// Revset selecting the branch tip; `None` for an empty repository.
    tip_revset: Option<String>,
}

impl HgRepo {
    /// Open the checkout rooted at `path` and check that `branch` exists,
    /// either as a named branch or as a bookmark.
    ///
    /// An empty repository is accepted only for the `default` branch.
    ///
    /// # Errors
    ///
    /// - [`RepoError::NotARepo`] if `path` is not the root of an hg checkout
    /// - [`RepoError::BranchNotFound`] if the branch does not exist
    pub fn open(path: &Path, branch: &BranchName) -> Result<Self, RepoError> {
        if !path.join(".hg").is_dir() {
            return Err(RepoError::NotARepo {
                path: path.to_path_buf(),
            });
        }

        let mut this = Self {
            path: path.to_path_buf(),
            branch: branch.clone(),
            tip_revset: None,
        };

        if this.hg(&["root"]).is_err() {
            return Err(RepoError::NotARepo {
                path: path.to_path_buf(),
            });
        }

        let is_empty = this.hg(&["log", "-l", "1", "-T", "{node}"])?.trim().is_empty();
        if is_empty {
            if branch.as_str() != DEFAULT_BRANCH {
                return Err(this.branch_not_found());
            }
            return Ok(this);
        }

        let branches = this.list(&["branches", "--closed", "-T", "{branch}\\0"])?;
        let bookmarks = this.list(&["bookmarks", "-T", "{bookmark}\\0"])?;
        match tip_revset(branch.as_str(), &branches, &bookmarks) {
            Some(revset) => {
                this.tip_revset = Some(revset);
                Ok(this)
            }
            None => Err(this.branch_not_found()),
        }
    }

    fn branch_not_found(&self) -> RepoError {
        RepoError::BranchNotFound {
            path: self.path.clone(),
            branch: self.branch.to_string(),
        }
    }

    /// Run `hg` in the checkout and return stdout.
    fn hg(&self, args: &[&str]) -> Result<String, RepoError> {
        let output = Command::new("hg")
            .args(args)
            .current_dir(&self.path)
            .env("HGPLAIN", "1")
            .env("HGENCODING", "utf-8")
            .output()
            .map_err(|e| RepoError::Command {
                program: "hg".into(),
                args: join_args(args),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(RepoError::Command {
                program: "hg".into(),
                args: join_args(args),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run `hg` and split NUL-terminated output.
    fn list(&self, args: &[&str]) -> Result<Vec<String>, RepoError> {
        Ok(split_nul(&self.hg(args)?))
    }

    fn changeset_at(&self, rev: &str) -> Result<Changeset, RepoError> {
        let raw = self.hg(&[
            "log",
            "-r",
            rev,
            "-l",
            "1",
            "-T",
            "{node}\\0{author}\\0{date|hgdate}\\0{desc}",
        ])?;
        let record = parse_log_record(&raw)?;
        let mut builder = Changeset::builder(record.id.clone())
            .author(record.author)
            .message(record.message)
            .diffs(self.diffs(&record.id)?);
        if let Some(ts) = record.timestamp {
            builder = builder.timestamp(ts);
        }
        Ok(builder.build())
    }
}

impl Repository for HgRepo {
    fn kind(&self) -> VcsKind {
        VcsKind::Mercurial
    }

    fn head_changeset(&self) -> Result<Option<Changeset>, RepoError> {
        match &self.tip_revset {
            Some(revset) => Ok(Some(self.changeset_at(revset)?)),
            None => Ok(None),
        }
    }

    fn diffs(&self, id: &ChangesetId) -> Result<Vec<Diff>, RepoError> {
        let entries = self
            .list(&["status", "--change", id.as_str(), "--print0"])
            .map_err(|e| match e {
                RepoError::Command { ref message, .. } if message.contains("unknown revision") => {
                    RepoError::ChangesetNotFound { id: id.to_string() }
                }
                other => other,
            })?;

        let mut diffs = Vec::with_capacity(entries.len());
        for entry in entries {
            let (kind, path) = parse_status_entry(&entry)?;
            let pattern = format!("path:{}", path);
            let raw = self.hg(&["diff", "--git", "-c", id.as_str(), "--", &pattern])?;
            diffs.push(Diff::new(path, kind, hunks_only(&raw)));
        }

        sort_diffs(&mut diffs);
        Ok(diffs)
    }

    fn push_lfs(&self, _pull: &str, _push: &SecretUrl) -> Result<(), RepoError> {
        Err(RepoError::Unsupported {
            vcs: VcsKind::Mercurial,
            operation: "push_lfs",
        })
    }
}

fn invalid(message: impl Into<String>) -> RepoError {
    RepoError::InvalidOutput {
        vcs: VcsKind::Mercurial,
        message: message.into(),
    }
}

/// Revset selecting the tip of `name`: a named branch wins over a bookmark
/// of the same name. `None` if neither exists.
fn tip_revset(name: &str, branches: &[String], bookmarks: &[String]) -> Option<String> {
    let quoted = revset_string(name);
    if branches.iter().any(|b| b == name) {
        Some(format!("max(branch({}))", quoted))
    } else if bookmarks.iter().any(|b| b == name) {
        Some(format!("bookmark({})", quoted))
    } else {
        None
    }
}

/// One changeset as printed by the `log` template in `changeset_at`.
#[derive(Debug, PartialEq)]
struct LogRecord<'a> {
    id: ChangesetId,
    author: &'a str,
    timestamp: Option<DateTime<Utc>>,
    message: &'a str,
}

/// Parse `{node}\0{author}\0{date|hgdate}\0{desc}`.
///
/// The description is the last field, so NULs inside it are kept.
fn parse_log_record(raw: &str) -> Result<LogRecord<'_>, RepoError> {
    let fields: Vec<&str> = raw.splitn(4, SEP).collect();
    let [node, author, date, message] = fields[..] else {
        return Err(invalid(format!("expected 4 log fields, got {}", fields.len())));
    };
    let id = ChangesetId::new(node).map_err(|e| invalid(e.to_string()))?;
    Ok(LogRecord {
        id,
        author,
        timestamp: parse_hgdate(date),
        message,
    })
}

/// Parse one `status --print0` entry: a status letter, a space, the path.
fn parse_status_entry(entry: &str) -> Result<(ChangeKind, &str), RepoError> {
    let (status, path) = entry
        .split_once(' ')
        .ok_or_else(|| invalid(format!("malformed status line: {:?}", entry)))?;
    let kind = match status {
        "A" => ChangeKind::Added,
        "R" => ChangeKind::Deleted,
        "M" => ChangeKind::Modified,
        other => return Err(invalid(format!("unexpected status '{}'", other))),
    };
    Ok((kind, path))
}

/// Quote a string as a revset `literal:` string.
fn revset_string(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'literal:{}'", escaped)
}

/// Split NUL-terminated output, dropping the trailing empty entry.
fn split_nul(raw: &str) -> Vec<String> {
    raw.split(SEP)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `hgdate` output (`<unix seconds> <tz offset>`).
fn parse_hgdate(raw: &str) -> Option<DateTime<Utc>> {
    let secs = raw.split_whitespace().next()?.parse::<i64>().ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn revset_string_escapes_quotes() {
        assert_eq!(revset_string("main"), "'literal:main'");
        assert_eq!(revset_string("it's"), "'literal:it\\'s'");
        assert_eq!(revset_string("a\\b"), "'literal:a\\\\b'");
    }

    #[test]
    fn split_nul_keeps_spaces() {
        let raw = "A foo bar/herp derp.txt\0M x\0";
        assert_eq!(split_nul(raw), vec!["A foo bar/herp derp.txt", "M x"]);
    }

    #[test]
    fn split_nul_empty() {
        assert!(split_nul("").is_empty());
    }

    #[test]
    fn parse_hgdate_reads_seconds() {
        let ts = parse_hgdate("1700000000 -3600").unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert!(parse_hgdate("garbage").is_none());
    }

    const NODE: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn status_entries_from_print0_output() {
        let raw = "A foo bar/herp derp.txt\0M dir/two  spaces.txt\0R gone.txt\0";
        let parsed: Vec<_> = split_nul(raw)
            .iter()
            .map(|e| parse_status_entry(e).map(|(k, p)| (k, p.to_string())))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            parsed,
            vec![
                (ChangeKind::Added, "foo bar/herp derp.txt".to_string()),
                (ChangeKind::Modified, "dir/two  spaces.txt".to_string()),
                (ChangeKind::Deleted, "gone.txt".to_string()),
            ]
        );
    }

    #[test]
    fn status_entry_keeps_leading_space_in_path() {
        let (kind, path) = parse_status_entry("A  leading.txt").unwrap();
        assert_eq!(kind, ChangeKind::Added);
        assert_eq!(path, " leading.txt");
    }

    #[test]
    fn status_entry_rejects_unknown_letter_and_missing_path() {
        assert!(matches!(
            parse_status_entry("? untracked.txt"),
            Err(RepoError::InvalidOutput { .. })
        ));
        assert!(matches!(
            parse_status_entry("A"),
            Err(RepoError::InvalidOutput { .. })
        ));
    }

    #[test]
    fn log_record_fields() {
        let raw = format!(
            "{}\0Test User <test@example.com>\01700000000 0\0Add spaced file\n\nBody",
            NODE
        );
        let record = parse_log_record(&raw).unwrap();
        assert_eq!(record.id.as_str(), NODE);
        assert_eq!(record.author, "Test User <test@example.com>");
        assert_eq!(record.timestamp.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(record.message, "Add spaced file\n\nBody");
    }

    #[test]
    fn log_record_keeps_nul_in_description() {
        let raw = format!("{}\0a\01 0\0one\0two", NODE);
        assert_eq!(parse_log_record(&raw).unwrap().message, "one\0two");
    }

    #[test]
    fn log_record_errors() {
        assert!(matches!(
            parse_log_record("abc\0only two"),
            Err(RepoError::InvalidOutput { .. })
        ));
        let bad_node = "not-a-node\0a\01 0\0msg";
        assert!(matches!(
            parse_log_record(bad_node),
            Err(RepoError::InvalidOutput { .. })
        ));
    }

    #[test]
    fn tip_revset_prefers_branch_then_bookmark() {
        let branches = vec!["default".to_string(), "stable".to_string()];
        let bookmarks = vec!["main".to_string(), "stable".to_string()];

        assert_eq!(
            tip_revset("stable", &branches, &bookmarks).as_deref(),
            Some("max(branch('literal:stable'))")
        );
        assert_eq!(
            tip_revset("main", &branches, &bookmarks).as_deref(),
            Some("bookmark('literal:main')")
        );
        assert_eq!(tip_revset("nope", &branches, &bookmarks), None);
    }

    #[test]
    fn open_without_hg_dir_is_not_a_repo() {
        let temp = TempDir::new().unwrap();
        let err = HgRepo::open(temp.path(), &BranchName::new("default").unwrap()).unwrap_err();
        assert!(matches!(err, RepoError::NotARepo { .. }));
    }
}
