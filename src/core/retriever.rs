use crate::core::pairing::{find_backout_fix_pairs, PairingOptions};
use crate::domain::model::Commit;
use crate::domain::ports::Storage;
use crate::utils::error::{MinerError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_OUTPUT_FILE: &str = "commit_code_db.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Backouts,
    ReviewComments,
}

impl FromStr for EventType {
    type Err = MinerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "backouts" => Ok(EventType::Backouts),
            "review_comments" => Ok(EventType::ReviewComments),
            other => Err(MinerError::InvalidConfigValueError {
                field: "event_type".to_string(),
                value: other.to_string(),
                reason: "Valid event types: backouts, review_comments".to_string(),
            }),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Backouts => write!(f, "backouts"),
            EventType::ReviewComments => write!(f, "review_comments"),
        }
    }
}

/// Collects the nodes of commits matching `event_type`, in source order.
/// A limit of 0 means no limit.
pub fn extract_commits(
    source: &[Commit],
    event_type: EventType,
    limit: Option<usize>,
) -> Result<Vec<String>> {
    if source.is_empty() {
        return Err(MinerError::ValidationError {
            message: "Source must be provided.".to_string(),
        });
    }

    let mut commits = Vec::new();

    match event_type {
        EventType::Backouts => {
            for commit in source.iter().filter(|c| c.is_backed_out()) {
                if limit.is_some_and(|limit| limit > 0 && commits.len() >= limit) {
                    break;
                }
                commits.push(commit.node.clone());
            }
        }
        EventType::ReviewComments => {
            tracing::warn!("Review comment events are not collected yet");
        }
    }

    tracing::info!(
        "Extracted {} commits for event type: {}",
        commits.len(),
        event_type
    );
    Ok(commits)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BustageFixes {
    /// backed-out node -> node of the commit that fixed it
    pub fixed_by: BTreeMap<String, Option<String>>,
}

/// Resolves, for each backed-out node, the commit that later fixed it.
pub fn bustage_fixed_by(
    history: &[Commit],
    nodes: &[String],
    options: &PairingOptions,
) -> BustageFixes {
    let report = find_backout_fix_pairs(history, &HashMap::new(), options);
    let pairs = report.by_inducing_node();

    let fixed_by = nodes
        .iter()
        .map(|node| {
            let fix = pairs.get(node.as_str()).map(|pair| pair.fix.node.clone());
            (node.clone(), fix)
        })
        .collect();

    BustageFixes { fixed_by }
}

/// Appends one JSON document followed by a newline.
pub async fn save_commit_result<S: Storage, T: Serialize>(
    storage: &S,
    path: &str,
    commit_result: &T,
) -> Result<()> {
    let mut line = serde_json::to_vec(commit_result)?;
    line.push(b'\n');
    storage.append_file(path, &line).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(node: &str, backedoutby: &str) -> Commit {
        Commit {
            node: node.to_string(),
            bug_id: Some(1),
            backedoutby: backedoutby.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_event_type_parsing() {
        assert_eq!("backouts".parse::<EventType>().unwrap(), EventType::Backouts);
        assert_eq!(
            "review_comments".parse::<EventType>().unwrap(),
            EventType::ReviewComments
        );
        assert!("pushes".parse::<EventType>().is_err());
        assert_eq!(EventType::Backouts.to_string(), "backouts");
    }

    #[test]
    fn test_extract_backouts_respects_limit() {
        let source = vec![
            commit("a", "x"),
            commit("b", ""),
            commit("c", "y"),
            commit("d", "z"),
        ];

        let all = extract_commits(&source, EventType::Backouts, None).unwrap();
        assert_eq!(all, vec!["a", "c", "d"]);

        let limited = extract_commits(&source, EventType::Backouts, Some(2)).unwrap();
        assert_eq!(limited, vec!["a", "c"]);

        let unlimited = extract_commits(&source, EventType::Backouts, Some(0)).unwrap();
        assert_eq!(unlimited, all);
    }

    #[test]
    fn test_extract_requires_source() {
        assert!(matches!(
            extract_commits(&[], EventType::Backouts, None),
            Err(MinerError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_review_comments_collect_nothing() {
        let source = vec![commit("a", "x")];
        let nodes = extract_commits(&source, EventType::ReviewComments, None).unwrap();
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_bustage_fixed_by_maps_unresolved_to_none() {
        let mut inducing = commit("aaaa", "bbbb");
        inducing.pushdate = "2021-03-01 10:00:00".to_string();
        let mut backout = commit("bbbb", "");
        backout.pushdate = "2021-03-01 11:00:00".to_string();
        backout.backsout = vec!["aaaa".to_string()];
        let mut fix = commit("cccc", "");
        fix.pushdate = "2021-03-02 10:00:00".to_string();
        let mut lonely = commit("dddd", "eeee");
        lonely.bug_id = Some(2);

        let history = vec![inducing, backout, fix, lonely];
        let nodes = vec!["aaaa".to_string(), "dddd".to_string()];
        let result = bustage_fixed_by(&history, &nodes, &PairingOptions::default());

        assert_eq!(result.fixed_by["aaaa"], Some("cccc".to_string()));
        assert_eq!(result.fixed_by["dddd"], None);
    }
}
