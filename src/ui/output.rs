//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout, diagnostics to stderr. Quiet mode suppresses
//! everything except errors and explicitly requested JSON.

use std::fmt::Display;

use serde::Serialize;

use crate::repo::Changeset;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags. `quiet` wins over `debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print `value` as pretty JSON (always shown).
pub fn json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Multi-line human summary of a changeset.
///
/// ```text
/// changeset 3f2a9c1e0b7d
/// Author:   Jane <jane@example.com>
/// Date:     2024-05-01 12:00:00 UTC
///
///     Add docs
///
///   A  foo bar/herp derp.txt
/// ```
pub fn format_changeset(changeset: &Changeset) -> String {
    let mut out = format!("changeset {}\n", changeset.id().short(12));
    if !changeset.author().is_empty() {
        out.push_str(&format!("Author:   {}\n", changeset.author()));
    }
    if let Some(ts) = changeset.timestamp() {
        out.push_str(&format!("Date:     {}\n", ts.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    out.push_str(&format!("\n    {}\n", changeset.subject()));
    if !changeset.is_empty() {
        out.push('\n');
        for diff in changeset.diffs() {
            out.push_str(&format!("  {}  {}\n", diff.kind.letter(), diff.path));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ChangesetId;
    use crate::repo::{ChangeKind, Diff};
    use chrono::{TimeZone, Utc};

    #[test]
    fn verbosity_quiet_wins() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn changeset_summary() {
        let changeset = Changeset::builder(ChangesetId::new("ab".repeat(20)).unwrap())
            .author("Jane <jane@example.com>")
            .timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
            .message("Add docs\n\nLonger body")
            .diff(Diff::new("foo bar/herp derp.txt", ChangeKind::Added, ""))
            .build();

        let text = format_changeset(&changeset);
        assert!(text.starts_with("changeset abababababab\n"));
        assert!(text.contains("Date:     2024-05-01 12:00:00 UTC"));
        assert!(text.contains("    Add docs\n"));
        assert!(!text.contains("Longer body"));
        assert!(text.contains("  A  foo bar/herp derp.txt\n"));
    }

    #[test]
    fn summary_of_bare_changeset() {
        let changeset = Changeset::builder(ChangesetId::new("c".repeat(40)).unwrap()).build();
        let text = format_changeset(&changeset);
        assert!(!text.contains("Author"));
        assert!(!text.contains("Date"));
    }
}
