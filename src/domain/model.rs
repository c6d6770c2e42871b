use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PUSHDATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BACKOUT_PREFIXES: [&str; 3] = ["backed out", "backout", "back out"];

static REVISION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^Differential Revision:\s*\S*?/?D(\d+)\s*$")
        .expect("Invalid revision line regex")
});

/// A pushed changeset as exported by the commit database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub node: String,
    #[serde(default)]
    pub bug_id: Option<u64>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub pushdate: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub backedoutby: String,
    #[serde(default)]
    pub backsout: Vec<String>,
    #[serde(default)]
    pub added: u64,
    #[serde(default)]
    pub deleted: u64,
    #[serde(default)]
    pub test_added: u64,
    #[serde(default)]
    pub test_deleted: u64,
    #[serde(default)]
    pub other_added: u64,
    #[serde(default)]
    pub other_deleted: u64,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl Commit {
    /// `None` for commits without a bug (the exporter writes 0 or null).
    pub fn bug(&self) -> Option<u64> {
        self.bug_id.filter(|id| *id != 0)
    }

    pub fn is_backout(&self) -> bool {
        if !self.backsout.is_empty() {
            return true;
        }
        let first_line = self.first_line().to_lowercase();
        BACKOUT_PREFIXES
            .iter()
            .any(|prefix| first_line.starts_with(prefix))
    }

    pub fn is_backed_out(&self) -> bool {
        !self.backedoutby.is_empty()
    }

    /// Loose text check used when scanning for fixes: the description talks
    /// about a backout anywhere, not only in its first line.
    pub fn mentions_backout(&self) -> bool {
        let desc = self.desc.to_lowercase();
        desc.contains("backed out") || desc.contains("backout")
    }

    pub fn revision_id(&self) -> Option<u64> {
        REVISION_LINE
            .captures(&self.desc)
            .and_then(|caps| caps[1].parse().ok())
    }

    pub fn pushed_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.pushdate.trim(), PUSHDATE_FORMAT).ok()
    }

    pub fn first_line(&self) -> &str {
        self.desc.lines().next().unwrap_or("").trim()
    }

    pub fn lines_changed(&self) -> LinesChanged {
        LinesChanged {
            added: self.added,
            deleted: self.deleted,
            test_added: self.test_added,
            test_deleted: self.test_deleted,
            other_added: self.other_added,
            other_deleted: self.other_deleted,
        }
    }

    pub fn summary(&self) -> CommitSummary {
        CommitSummary {
            node: self.node.clone(),
            author: self.author.clone(),
            pushdate: self.pushdate.clone(),
            desc: self.first_line().to_string(),
            revision_id: self.revision_id(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinesChanged {
    pub added: u64,
    pub deleted: u64,
    pub test_added: u64,
    pub test_deleted: u64,
    pub other_added: u64,
    pub other_deleted: u64,
}

impl LinesChanged {
    pub fn total(&self) -> u64 {
        self.added
            + self.deleted
            + self.test_added
            + self.test_deleted
            + self.other_added
            + self.other_deleted
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub node: String,
    pub author: String,
    pub pushdate: String,
    pub desc: String,
    pub revision_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub is_patch: u8,
    #[serde(default)]
    pub is_obsolete: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub creator: String,
}

/// A bug record as returned by the bug tracker's REST API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bug {
    pub id: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub whiteboard: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alias: Option<serde_json::Value>,
    #[serde(default)]
    pub cf_crash_signature: String,
    #[serde(default)]
    pub cf_performance_impact: Option<String>,
    #[serde(default)]
    pub cf_has_str: String,
    #[serde(default)]
    pub regressed_by: Vec<u64>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub filed_via: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Bug {
    /// Bugzilla returns `alias` as a string, a list, or null depending on version.
    pub fn aliases(&self) -> Vec<String> {
        match &self.alias {
            Some(serde_json::Value::String(alias)) => vec![alias.clone()],
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn first_comment(&self) -> &str {
        self.comments.first().map(|c| c.text.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixMatch {
    NextCommit,
    RevisionId,
    DescriptionMention,
}

impl FixMatch {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixMatch::NextCommit => "next_commit",
            FixMatch::RevisionId => "revision_id",
            FixMatch::DescriptionMention => "description_mention",
        }
    }
}

/// A backed-out ("bad") commit paired with the commit that later fixed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoutFixPair {
    pub bug_id: u64,
    pub inducing: CommitSummary,
    pub backout: Option<CommitSummary>,
    pub fix: CommitSummary,
    pub matched_by: FixMatch,
    pub lines_changed: LinesChanged,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: u64,
    pub title: String,
    pub status: String,
}

/// Output of a pipeline's transform step, ready to be written.
#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub records: Vec<serde_json::Value>,
    pub csv_output: String,
    pub json_output: String,
    pub summary: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(desc: &str) -> Commit {
        Commit {
            node: "abc".to_string(),
            desc: desc.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_deserialize_commit_with_defaults() {
        let commit: Commit = serde_json::from_str(
            r#"{"node": "a1", "bug_id": null, "pushdate": "2019-01-01 10:00:00", "reviewers": ["x"]}"#,
        )
        .unwrap();
        assert_eq!(commit.bug(), None);
        assert_eq!(commit.added, 0);
        assert!(commit.pushed_at().is_some());

        let commit: Commit = serde_json::from_str(r#"{"node": "a2", "bug_id": 0}"#).unwrap();
        assert_eq!(commit.bug(), None);
        assert!(commit.pushed_at().is_none());
    }

    #[test]
    fn test_backout_detection() {
        assert!(commit("Backed out changeset 1234abcd (bug 1) for bustage").is_backout());
        assert!(commit("Backout bug 1").is_backout());
        assert!(!commit("Bug 1 - Fix the thing. r=me").is_backout());

        let mut with_links = commit("Bug 1 - relanding");
        with_links.backsout = vec!["deadbeef".to_string()];
        assert!(with_links.is_backout());
        assert!(commit("Bug 1 - Fix\n\nThis was backed out earlier").mentions_backout());
    }

    #[test]
    fn test_revision_id_parsing() {
        let c = commit(
            "Bug 1 - Fix. r=me\n\nDifferential Revision: https://phabricator.services.mozilla.com/D12345",
        );
        assert_eq!(c.revision_id(), Some(12345));
        assert_eq!(commit("Bug 1 - mentions D999 inline").revision_id(), None);
    }

    #[test]
    fn test_bug_aliases_and_extra_fields() {
        let bug: Bug = serde_json::from_str(
            r#"{"id": 7, "alias": ["CVE-2020-1", "x"], "cf_tracking": "+"}"#,
        )
        .unwrap();
        assert_eq!(bug.aliases(), vec!["CVE-2020-1", "x"]);
        assert_eq!(bug.extra.get("cf_tracking").unwrap(), "+");

        let bug: Bug = serde_json::from_str(r#"{"id": 8, "alias": "single"}"#).unwrap();
        assert_eq!(bug.aliases(), vec!["single"]);
    }
}
