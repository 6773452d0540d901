//! Parsing of `git bisect` output and logs.
//!
//! Kept free of process handling so it can be exercised against captured text.

use crate::domain::models::{CommitPair, CommitState};

/// Substring git prints once the search has converged.
pub const COMPLETION_MARKER: &str = "first bad commit";

/// First line of `text` that reports a converged search.
pub fn find_completion_line(text: &str) -> Option<&str> {
    text.lines().find(|line| line.contains(COMPLETION_MARKER))
}

/// Extract the culprit from a completion line.
///
/// Log lines carry the revision in brackets (`# first bad commit: [abc] subject`),
/// while `git bisect good|bad` prints `abc is the first bad commit`.
pub fn revision_from_completion_line(line: &str) -> Option<String> {
    if let (Some(start), Some(end)) = (line.find('['), line.find(']')) {
        if start < end {
            let revision = line[start + 1..end].trim();
            if !revision.is_empty() {
                return Some(revision.to_string());
            }
        }
    }

    line.split_whitespace()
        .next()
        .filter(|token| !token.starts_with('#'))
        .map(str::to_string)
}

/// Culprit named by `text`, if the search it records has completed.
pub fn culprit_from_output(text: &str) -> Option<String> {
    find_completion_line(text).and_then(revision_from_completion_line)
}

/// Verdicts recorded in a bisect log, in order.
pub fn decisions(log: &str) -> Vec<(String, CommitState)> {
    log.lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("git bisect ")?;
            let (verb, revision) = rest.split_once(' ')?;
            let state = CommitState::from_str(verb)?;
            let revision = revision.trim().trim_matches('\'');
            (!revision.is_empty()).then(|| (revision.to_string(), state))
        })
        .collect()
}

/// Latest good and bad revisions recorded in a bisect log.
pub fn frontier(log: &str) -> Option<CommitPair> {
    let mut good = None;
    let mut bad = None;
    for (revision, state) in decisions(log) {
        match state {
            CommitState::Good => good = Some(revision),
            CommitState::Bad => bad = Some(revision),
        }
    }
    Some(CommitPair::new(good?, bad?))
}
