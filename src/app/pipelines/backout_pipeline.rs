use crate::core::export::{pairs_to_csv, write_outputs};
use crate::core::pairing::find_backout_fix_pairs;
use crate::domain::model::{BackoutFixPair, Bug, Commit, TransformResult};
use crate::domain::ports::{BugSource, CommitSource, ConfigProvider, Pipeline, ReviewSource, Storage};
use crate::utils::error::Result;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const PAIRS_JSON: &str = "pairs.json";
pub const PAIRS_CSV: &str = "pairs.csv";

/// Backout/fix pairing run: commit history in, paired commits out.
pub struct BackoutFixPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    commits: Box<dyn CommitSource>,
    bugs: Option<Box<dyn BugSource>>,
    reviews: Option<Box<dyn ReviewSource>>,
}

impl<S: Storage, C: ConfigProvider> BackoutFixPipeline<S, C> {
    pub fn new(storage: S, config: C, commits: Box<dyn CommitSource>) -> Self {
        Self {
            storage,
            config,
            commits,
            bugs: None,
            reviews: None,
        }
    }

    pub fn with_bug_source(mut self, bugs: Box<dyn BugSource>) -> Self {
        self.bugs = Some(bugs);
        self
    }

    pub fn with_review_source(mut self, reviews: Box<dyn ReviewSource>) -> Self {
        self.reviews = Some(reviews);
        self
    }

    async fn fetch_bugs(&self, commits: &[Commit]) -> Result<HashMap<u64, Bug>> {
        let Some(source) = &self.bugs else {
            return Ok(HashMap::new());
        };

        let ids: Vec<u64> = commits
            .iter()
            .filter_map(Commit::bug)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        tracing::info!("🔎 Looking up {} bugs", ids.len());

        let bugs = source.bugs(&ids).await?;
        Ok(bugs.into_iter().map(|bug| (bug.id, bug)).collect())
    }

    async fn annotate_reviews(&self, pairs: &mut [BackoutFixPair]) -> Result<()> {
        let Some(source) = &self.reviews else {
            return Ok(());
        };

        let ids: Vec<u64> = pairs
            .iter()
            .filter_map(|pair| pair.fix.revision_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(());
        }

        let statuses: HashMap<u64, String> = source
            .revisions(&ids)
            .await?
            .into_iter()
            .map(|revision| (revision.id, revision.status))
            .collect();

        for pair in pairs.iter_mut() {
            pair.review_status = pair
                .fix
                .revision_id
                .and_then(|id| statuses.get(&id).cloned());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for BackoutFixPipeline<S, C> {
    type Item = Commit;

    async fn extract(&self) -> Result<Vec<Commit>> {
        let commits = self.commits.commits().await?;
        tracing::info!("📥 Loaded {} commits", commits.len());
        Ok(commits)
    }

    async fn transform(&self, data: Vec<Commit>) -> Result<TransformResult> {
        let options = self.config.pairing_options();
        let bugs = if options.allowed_statuses.is_empty() {
            HashMap::new()
        } else {
            self.fetch_bugs(&data).await?
        };

        let report = find_backout_fix_pairs(&data, &bugs, &options);
        let mut pairs = report.pairs;
        self.annotate_reviews(&mut pairs).await?;

        let records = pairs
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut summary = BTreeMap::new();
        summary.insert("bugs_scanned".to_string(), report.bugs_scanned);
        summary.insert("backed_out_commits".to_string(), report.backouts_seen);
        summary.insert("pairs".to_string(), pairs.len());
        summary.insert("unmatched".to_string(), report.unmatched.len());
        summary.insert("skipped_by_status".to_string(), report.skipped_by_status);

        Ok(TransformResult {
            csv_output: pairs_to_csv(&pairs)?,
            json_output: serde_json::to_string_pretty(&pairs)?,
            records,
            summary,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let mut files = Vec::new();
        for format in self.config.output_formats() {
            match format.as_str() {
                "json" => files.push((PAIRS_JSON.to_string(), result.json_output.clone().into_bytes())),
                "csv" => files.push((PAIRS_CSV.to_string(), result.csv_output.clone().into_bytes())),
                other => tracing::warn!("Ignoring unknown output format: {}", other),
            }
        }
        write_outputs(&self.storage, &self.config, files).await
    }
}
