//! Backout/fix correlation.
//!
//! Commits are grouped by bug and ordered by push date. For every commit that
//! was backed out, the scan walks forward from its backout and picks the first
//! later commit of the same bug that is neither a backout nor backed out
//! itself. That commit is taken to be the fix that relanded the change.

use crate::domain::model::{BackoutFixPair, Bug, Commit, FixMatch};
use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Short node prefix used by commit messages ("Backed out changeset 1a2b3c4d5e6f").
const SHORT_NODE_LEN: usize = 12;

#[derive(Debug, Clone)]
pub struct PairingOptions {
    /// Only accept a fix carrying the same code-review revision as the
    /// backed-out commit.
    pub require_revision_match: bool,
    /// Reject candidates whose description mentions a backout anywhere.
    pub skip_description_mentions: bool,
    /// Bug statuses to keep (case-insensitive). Empty keeps every bug,
    /// including bugs missing from the bug source.
    pub allowed_statuses: Vec<String>,
    /// Maximum time between the backout and its fix.
    pub max_gap: Option<Duration>,
}

impl Default for PairingOptions {
    fn default() -> Self {
        Self {
            require_revision_match: false,
            skip_description_mentions: true,
            allowed_statuses: Vec::new(),
            max_gap: None,
        }
    }
}

impl PairingOptions {
    fn status_allowed(&self, bug: Option<&Bug>) -> bool {
        if self.allowed_statuses.is_empty() {
            return true;
        }
        match bug {
            Some(bug) => self
                .allowed_statuses
                .iter()
                .any(|status| status.eq_ignore_ascii_case(&bug.status)),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PairingReport {
    pub pairs: Vec<BackoutFixPair>,
    pub bugs_scanned: usize,
    pub backouts_seen: usize,
    pub unmatched: Vec<String>,
    pub skipped_by_status: usize,
}

impl PairingReport {
    pub fn fix_for(&self, node: &str) -> Option<&BackoutFixPair> {
        self.pairs.iter().find(|pair| pair.inducing.node == node)
    }

    /// Pairs keyed by the backed-out node, for repeated lookups.
    pub fn by_inducing_node(&self) -> HashMap<&str, &BackoutFixPair> {
        self.pairs
            .iter()
            .map(|pair| (pair.inducing.node.as_str(), pair))
            .collect()
    }
}

/// Groups commits by bug id, each group in push order. Commits without a bug
/// are dropped; commits with an unparsable push date sort last and otherwise
/// keep their input order.
pub fn group_by_bug(commits: &[Commit]) -> BTreeMap<u64, Vec<&Commit>> {
    let mut groups: BTreeMap<u64, Vec<&Commit>> = BTreeMap::new();
    for commit in commits {
        if let Some(bug_id) = commit.bug() {
            groups.entry(bug_id).or_default().push(commit);
        }
    }

    for group in groups.values_mut() {
        group.sort_by_key(|commit| {
            let pushed_at = commit.pushed_at();
            (pushed_at.is_none(), pushed_at)
        });
    }

    groups
}

pub fn find_backout_fix_pairs(
    commits: &[Commit],
    bugs: &HashMap<u64, Bug>,
    options: &PairingOptions,
) -> PairingReport {
    let mut by_node: HashMap<&str, &Commit> = HashMap::with_capacity(commits.len());
    for commit in commits {
        by_node.entry(commit.node.as_str()).or_insert(commit);
    }

    let mut report = PairingReport::default();

    for (bug_id, group) in group_by_bug(commits) {
        if !options.status_allowed(bugs.get(&bug_id)) {
            tracing::debug!("Skipping bug {} (status filter)", bug_id);
            report.skipped_by_status += 1;
            continue;
        }
        report.bugs_scanned += 1;

        let mut used_fixes: HashSet<String> = HashSet::new();

        for (position, inducing) in group.iter().enumerate() {
            if !inducing.is_backed_out() {
                continue;
            }
            report.backouts_seen += 1;

            let backout = locate_backout(inducing, &group, &by_node);
            match scan_for_fix(bug_id, position, inducing, backout, &group, &used_fixes, options) {
                Some(pair) => {
                    tracing::debug!(
                        "Bug {}: {} fixed by {} ({})",
                        bug_id,
                        pair.inducing.node,
                        pair.fix.node,
                        pair.matched_by.as_str()
                    );
                    used_fixes.insert(pair.fix.node.clone());
                    report.pairs.push(pair);
                }
                None => report.unmatched.push(inducing.node.clone()),
            }
        }
    }

    tracing::info!(
        "Paired {} of {} backed-out commits across {} bugs",
        report.pairs.len(),
        report.backouts_seen,
        report.bugs_scanned
    );

    report
}

fn locate_backout<'a>(
    inducing: &Commit,
    group: &[&'a Commit],
    by_node: &HashMap<&str, &'a Commit>,
) -> Option<&'a Commit> {
    by_node
        .get(inducing.backedoutby.as_str())
        .copied()
        .or_else(|| {
            group
                .iter()
                .copied()
                .find(|c| c.backsout.iter().any(|node| node == &inducing.node))
        })
}

fn scan_for_fix(
    bug_id: u64,
    position: usize,
    inducing: &Commit,
    backout: Option<&Commit>,
    group: &[&Commit],
    used_fixes: &HashSet<String>,
    options: &PairingOptions,
) -> Option<BackoutFixPair> {
    let inducing_revision = inducing.revision_id();
    if options.require_revision_match && inducing_revision.is_none() {
        return None;
    }

    // The backout may live in the same bug (then order by position) or in
    // another bug (then only its push date can bound the scan).
    let backout_position =
        backout.and_then(|b| group.iter().position(|c| std::ptr::eq(*c, b)));
    let start = backout_position.map_or(position, |p| p.max(position)) + 1;
    let backout_time: Option<NaiveDateTime> = backout.and_then(Commit::pushed_at);
    let reference_time = backout_time.or_else(|| inducing.pushed_at());

    for candidate in group.iter().skip(start) {
        if let (Some(gap), Some(reference), Some(pushed)) =
            (options.max_gap, reference_time, candidate.pushed_at())
        {
            if pushed - reference > gap {
                break;
            }
        }

        if backout_position.is_none() {
            if let (Some(backout_time), Some(pushed)) = (backout_time, candidate.pushed_at()) {
                if pushed < backout_time {
                    continue;
                }
            }
        }

        if candidate.is_backout() || candidate.is_backed_out() {
            continue;
        }
        if options.skip_description_mentions && candidate.mentions_backout() {
            continue;
        }
        if used_fixes.contains(candidate.node.as_str()) {
            continue;
        }

        let candidate_revision = candidate.revision_id();
        let same_revision = inducing_revision.is_some() && candidate_revision == inducing_revision;
        if options.require_revision_match && !same_revision {
            continue;
        }

        let matched_by = if same_revision {
            FixMatch::RevisionId
        } else if mentions_node(candidate, &inducing.node) {
            FixMatch::DescriptionMention
        } else {
            FixMatch::NextCommit
        };

        return Some(BackoutFixPair {
            bug_id,
            inducing: inducing.summary(),
            backout: backout.map(Commit::summary),
            fix: candidate.summary(),
            matched_by,
            lines_changed: candidate.lines_changed(),
            review_status: None,
        });
    }

    None
}

fn mentions_node(candidate: &Commit, node: &str) -> bool {
    let short = node.get(..SHORT_NODE_LEN).unwrap_or(node);
    !short.is_empty() && candidate.desc.contains(short)
}
