//! Training labels for the performance-bug classifier.

use crate::domain::model::Bug;
use serde::Serialize;
use std::collections::BTreeMap;

pub const PERF_KEYWORD_PREFIXES: [&str; 3] = ["perf", "topperf", "main-thread-io"];

pub const PERF_WHITEBOARD_PREFIXES: [&str; 6] = [
    "[fxperf",
    "[fxperfsize",
    "[snappy",
    "[pdfjs-c-performance",
    "[pdfjs-performance",
    "[sp3",
];

const PERF_IMPACT_LEVELS: [&str; 3] = ["low", "medium", "high"];

pub const CLASSES: [u8; 2] = [0, 1];

pub fn is_performance_bug(bug: &Bug) -> bool {
    if bug
        .cf_performance_impact
        .as_deref()
        .is_some_and(|impact| PERF_IMPACT_LEVELS.contains(&impact))
    {
        return true;
    }

    if bug.keywords.iter().any(|keyword| {
        PERF_KEYWORD_PREFIXES
            .iter()
            .any(|prefix| keyword.starts_with(prefix))
    }) {
        return true;
    }

    let whiteboard = bug.whiteboard.to_lowercase();
    PERF_WHITEBOARD_PREFIXES
        .iter()
        .any(|prefix| whiteboard.contains(prefix))
}

/// Bugs triaged for performance impact get a label; untriaged ("?") and
/// "none" bugs are left out.
pub fn get_labels<'a, I>(bugs: I) -> (BTreeMap<u64, u8>, [u8; 2])
where
    I: IntoIterator<Item = &'a Bug>,
{
    let mut classes = BTreeMap::new();

    for bug in bugs {
        match bug.cf_performance_impact.as_deref() {
            None | Some("?") | Some("none") => continue,
            Some(_) => {
                classes.insert(bug.id, u8::from(is_performance_bug(bug)));
            }
        }
    }

    tracing::info!(
        "{} performance bugs",
        classes.values().filter(|label| **label == 1).count()
    );
    tracing::info!(
        "{} non-performance bugs",
        classes.values().filter(|label| **label == 0).count()
    );

    (classes, CLASSES)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Prediction {
    Class(u8),
    Probabilities([f64; 2]),
}

/// Forces the positive class for bugs the rule already identifies.
pub fn overwrite_classes(bugs: &[Bug], classes: &mut [Prediction], probabilities: bool) {
    for (bug, class) in bugs.iter().zip(classes.iter_mut()) {
        if is_performance_bug(bug) {
            *class = if probabilities {
                Prediction::Probabilities([1.0, 0.0])
            } else {
                Prediction::Class(1)
            };
        }
    }
}
