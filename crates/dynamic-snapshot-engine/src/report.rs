//! Failure report for snapshots that do not match the fetched data.
//!
//! Besides the expected and actual text, a report lists the substitutions
//! that were active, since a stale substitution value is the most common
//! reason for a dynamic snapshot to fail. Rendering that list is best
//! effort: if it fails, a short note takes its place and the mismatch itself
//! is still reported.

use difference::{Changeset, Difference};
use std::fmt::{self, Write};

use crate::store::SnapshotId;
use crate::substitution::{SubstitutionKind, SubstitutionTable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMismatch {
    pub id: SnapshotId,
    pub expected: String,
    pub actual: String,
    /// Line diff from expected to actual, present when diff output is enabled.
    pub diff: Option<String>,
    /// Rendered substitution tables, empty when diff output is disabled.
    pub substitutions: String,
}

impl SnapshotMismatch {
    pub fn new(
        id: SnapshotId,
        expected: String,
        actual: String,
        table: &SubstitutionTable,
        show_diff: bool,
    ) -> Self {
        let (diff, substitutions) = if show_diff {
            (
                Some(line_diff(&expected, &actual)),
                substitutions_output(table),
            )
        } else {
            (None, String::new())
        };

        Self {
            id,
            expected,
            actual,
            diff,
            substitutions,
        }
    }
}

impl fmt::Display for SnapshotMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot `{}` does not match the fetched data.", self.id)?;
        if let Some(diff) = &self.diff {
            write!(f, "\n--- Expected\n+++ Actual\n{diff}")?;
        }
        f.write_str(&self.substitutions)
    }
}

/// Line-based diff with ` `, `-` and `+` prefixes.
pub fn line_diff(expected: &str, actual: &str) -> String {
    let changeset = Changeset::new(expected, actual, "\n");
    let mut lines: Vec<(char, &str)> = Vec::new();
    for diff in &changeset.diffs {
        let (marker, text) = match diff {
            Difference::Same(text) => (' ', text),
            Difference::Rem(text) => ('-', text),
            Difference::Add(text) => ('+', text),
        };
        lines.extend(text.split('\n').map(|line| (marker, line)));
    }
    // both sides end with a newline
    if lines.last() == Some(&(' ', "")) {
        lines.pop();
    }

    let mut out = String::new();
    for (marker, line) in lines {
        out.push(marker);
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Both substitution tables, plain first, ready to append to a failure
/// message. Never fails.
pub fn substitutions_output(table: &SubstitutionTable) -> String {
    [SubstitutionKind::Plain, SubstitutionKind::Strict]
        .into_iter()
        .filter(|kind| table.of_kind(*kind).next().is_some())
        .map(|kind| best_effort(kind, |out| render_table(out, table, kind)))
        .collect()
}

fn title(kind: SubstitutionKind) -> &'static str {
    match kind {
        SubstitutionKind::Plain => "substitutions",
        SubstitutionKind::Strict => "strict substitutions",
    }
}

fn render_table<W: Write>(out: &mut W, table: &SubstitutionTable, kind: SubstitutionKind) -> fmt::Result {
    let title = title(kind);
    let mut chars = title.chars();
    if let Some(first) = chars.next() {
        write!(out, "{}{}:", first.to_uppercase(), chars.as_str())?;
    }
    for entry in table.of_kind(kind) {
        write!(out, "\n    [{}] => {}", entry.key, entry.value.escape_debug())?;
    }
    Ok(())
}

fn best_effort<F>(kind: SubstitutionKind, render: F) -> String
where
    F: FnOnce(&mut String) -> fmt::Result,
{
    let mut rendered = String::new();
    let body = match render(&mut rendered) {
        Ok(()) => rendered,
        Err(err) => {
            log::warn!("Rendering {} for a snapshot report failed: {err}", title(kind));
            format!(
                "Could not get {} output. Failed with error: {err}",
                title(kind)
            )
        }
    };
    format!("\n\n{body}\n")
}
