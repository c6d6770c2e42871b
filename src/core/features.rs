//! Dictionary features for bugs and the vectorizer that turns them into
//! fixed-width numeric rows.

use crate::core::cleanup::{apply_all, Cleanup};
use crate::core::labels::PERF_KEYWORD_PREFIXES;
use crate::domain::model::Bug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

pub trait BugFeature: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, bug: &Bug) -> FeatureValue;
}

pub struct HasStr;

impl BugFeature for HasStr {
    fn name(&self) -> &'static str {
        "has_str"
    }

    fn extract(&self, bug: &Bug) -> FeatureValue {
        FeatureValue::Bool(bug.cf_has_str == "yes")
    }
}

pub struct Keywords {
    pub prefixes_to_ignore: Vec<String>,
}

impl Keywords {
    /// Drops the keywords that give the performance label away.
    pub fn ignoring_perf() -> Self {
        Self {
            prefixes_to_ignore: PERF_KEYWORD_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl BugFeature for Keywords {
    fn name(&self) -> &'static str {
        "keywords"
    }

    fn extract(&self, bug: &Bug) -> FeatureValue {
        let keywords = bug
            .keywords
            .iter()
            .filter(|keyword| {
                !self
                    .prefixes_to_ignore
                    .iter()
                    .any(|prefix| keyword.starts_with(prefix.as_str()))
            })
            .cloned()
            .collect();
        FeatureValue::List(keywords)
    }
}

static COVERITY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[CID ?[0-9]+\]").expect("Invalid Coverity id regex"));

pub struct IsCoverityIssue;

impl BugFeature for IsCoverityIssue {
    fn name(&self) -> &'static str {
        "is_coverity_issue"
    }

    fn extract(&self, bug: &Bug) -> FeatureValue {
        FeatureValue::Bool(COVERITY_ID.is_match(&bug.summary) || COVERITY_ID.is_match(&bug.whiteboard))
    }
}

pub struct HasCrashSignature;

impl BugFeature for HasCrashSignature {
    fn name(&self) -> &'static str {
        "has_crash_signature"
    }

    fn extract(&self, bug: &Bug) -> FeatureValue {
        FeatureValue::Bool(!bug.cf_crash_signature.trim().is_empty())
    }
}

pub struct HasUrl;

impl BugFeature for HasUrl {
    fn name(&self) -> &'static str {
        "has_url"
    }

    fn extract(&self, bug: &Bug) -> FeatureValue {
        FeatureValue::Bool(!bug.url.is_empty())
    }
}

pub struct HasW3cUrl;

impl BugFeature for HasW3cUrl {
    fn name(&self) -> &'static str {
        "has_w3c_url"
    }

    fn extract(&self, bug: &Bug) -> FeatureValue {
        FeatureValue::Bool(bug.url.contains("w3c"))
    }
}

pub struct HasGithubUrl;

impl BugFeature for HasGithubUrl {
    fn name(&self) -> &'static str {
        "has_github_url"
    }

    fn extract(&self, bug: &Bug) -> FeatureValue {
        FeatureValue::Bool(bug.url.contains("github"))
    }
}

pub struct Product;

impl BugFeature for Product {
    fn name(&self) -> &'static str {
        "product"
    }

    fn extract(&self, bug: &Bug) -> FeatureValue {
        FeatureValue::Text(bug.product.clone())
    }
}

pub struct HasRegressionRange;

impl BugFeature for HasRegressionRange {
    fn name(&self) -> &'static str {
        "has_regression_range"
    }

    fn extract(&self, bug: &Bug) -> FeatureValue {
        let flagged = bug
            .extra
            .get("cf_has_regression_range")
            .and_then(|v| v.as_str())
            == Some("yes");
        FeatureValue::Bool(flagged || !bug.regressed_by.is_empty())
    }
}

pub struct HasCveInAlias;

impl BugFeature for HasCveInAlias {
    fn name(&self) -> &'static str {
        "has_cve_in_alias"
    }

    fn extract(&self, bug: &Bug) -> FeatureValue {
        FeatureValue::Bool(bug.aliases().iter().any(|alias| alias.contains("CVE")))
    }
}

pub struct HasAttachment;

impl BugFeature for HasAttachment {
    fn name(&self) -> &'static str {
        "has_attachment"
    }

    fn extract(&self, bug: &Bug) -> FeatureValue {
        FeatureValue::Bool(!bug.attachments.is_empty())
    }
}

pub struct FiledVia;

impl BugFeature for FiledVia {
    fn name(&self) -> &'static str {
        "filed_via"
    }

    fn extract(&self, bug: &Bug) -> FeatureValue {
        FeatureValue::Text(bug.filed_via.clone())
    }
}

/// Extractors used by the performance-bug model.
pub fn performance_extractors() -> Vec<Box<dyn BugFeature>> {
    vec![
        Box::new(HasStr),
        Box::new(Keywords::ignoring_perf()),
        Box::new(IsCoverityIssue),
        Box::new(HasCrashSignature),
        Box::new(HasUrl),
        Box::new(HasW3cUrl),
        Box::new(HasGithubUrl),
        Box::new(Product),
        Box::new(HasRegressionRange),
        Box::new(HasCveInAlias),
        Box::new(HasAttachment),
        Box::new(FiledVia),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub bug_id: u64,
    pub data: BTreeMap<String, FeatureValue>,
    pub title: String,
    pub first_comment: String,
}

pub struct BugExtractor {
    extractors: Vec<Box<dyn BugFeature>>,
    cleanup: Vec<Cleanup>,
}

impl BugExtractor {
    pub fn new(extractors: Vec<Box<dyn BugFeature>>, cleanup: Vec<Cleanup>) -> Self {
        Self {
            extractors,
            cleanup,
        }
    }

    pub fn extract(&self, bug: &Bug) -> FeatureRow {
        let data = self
            .extractors
            .iter()
            .map(|extractor| (extractor.name().to_string(), extractor.extract(bug)))
            .collect();

        FeatureRow {
            bug_id: bug.id,
            data,
            title: apply_all(&self.cleanup, &bug.summary),
            first_comment: apply_all(&self.cleanup, bug.first_comment()),
        }
    }
}

/// One-hot encodes strings (`name=value`) and keeps booleans and numbers
/// as single columns. Columns are sorted by name.
#[derive(Debug, Clone, Default)]
pub struct DictVectorizer {
    feature_names: Vec<String>,
    vocabulary: HashMap<String, usize>,
}

impl DictVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn columns(name: &str, value: &FeatureValue) -> Vec<(String, f64)> {
        match value {
            FeatureValue::Bool(flag) => vec![(name.to_string(), if *flag { 1.0 } else { 0.0 })],
            FeatureValue::Number(n) => vec![(name.to_string(), *n)],
            FeatureValue::Text(text) => vec![(format!("{}={}", name, text), 1.0)],
            FeatureValue::List(items) => items
                .iter()
                .map(|item| (format!("{}={}", name, item), 1.0))
                .collect(),
        }
    }

    pub fn fit<'a, I>(&mut self, rows: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a BTreeMap<String, FeatureValue>>,
    {
        let mut names = BTreeSet::new();
        for row in rows {
            for (name, value) in row {
                for (column, _) in Self::columns(name, value) {
                    names.insert(column);
                }
            }
        }

        self.feature_names = names.into_iter().collect();
        self.vocabulary = self
            .feature_names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();
        self
    }

    pub fn transform_one(&self, row: &BTreeMap<String, FeatureValue>) -> Vec<f64> {
        let mut dense = vec![0.0; self.feature_names.len()];
        for (name, value) in row {
            for (column, x) in Self::columns(name, value) {
                if let Some(&index) = self.vocabulary.get(&column) {
                    dense[index] += x;
                }
            }
        }
        dense
    }

    pub fn transform<'a, I>(&self, rows: I) -> Vec<Vec<f64>>
    where
        I: IntoIterator<Item = &'a BTreeMap<String, FeatureValue>>,
    {
        rows.into_iter().map(|row| self.transform_one(row)).collect()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}
