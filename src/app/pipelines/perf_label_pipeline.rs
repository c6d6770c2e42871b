use crate::core::cleanup::default_chain;
use crate::core::export::{finish_csv, write_outputs};
use crate::core::features::{performance_extractors, BugExtractor, DictVectorizer, FeatureRow};
use crate::core::labels::get_labels;
use crate::domain::model::{Bug, TransformResult};
use crate::domain::ports::{BugSource, ConfigProvider, Pipeline, Storage};
use crate::utils::error::Result;
use std::collections::BTreeMap;

pub const LABELS_JSON: &str = "perf_labels.json";
pub const FEATURES_CSV: &str = "perf_features.csv";

/// Builds the performance-bug training table: one row per labeled bug with
/// its vectorized dictionary features and cleaned text columns.
pub struct PerformanceBugPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    bugs: Box<dyn BugSource>,
}

impl<S: Storage, C: ConfigProvider> PerformanceBugPipeline<S, C> {
    pub fn new(storage: S, config: C, bugs: Box<dyn BugSource>) -> Self {
        Self {
            storage,
            config,
            bugs,
        }
    }
}

fn feature_table(
    rows: &[(FeatureRow, u8)],
    vectorizer: &DictVectorizer,
) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["bug_id".to_string(), "label".to_string()];
    header.extend(vectorizer.feature_names().iter().cloned());
    header.push("title".to_string());
    header.push("first_comment".to_string());
    writer.write_record(&header)?;

    for (row, label) in rows {
        let mut record = vec![row.bug_id.to_string(), label.to_string()];
        record.extend(
            vectorizer
                .transform_one(&row.data)
                .iter()
                .map(|x| x.to_string()),
        );
        record.push(row.title.clone());
        record.push(row.first_comment.clone());
        writer.write_record(&record)?;
    }

    finish_csv(writer)
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for PerformanceBugPipeline<S, C> {
    type Item = Bug;

    async fn extract(&self) -> Result<Vec<Bug>> {
        let bugs = self.bugs.all_bugs().await?;
        tracing::info!("📥 Loaded {} bugs", bugs.len());
        Ok(bugs)
    }

    async fn transform(&self, data: Vec<Bug>) -> Result<TransformResult> {
        let (classes, labels) = get_labels(&data);

        let extractor = BugExtractor::new(performance_extractors(), default_chain());
        let rows: Vec<(FeatureRow, u8)> = data
            .iter()
            .filter_map(|bug| classes.get(&bug.id).map(|label| (extractor.extract(bug), *label)))
            .collect();

        let mut vectorizer = DictVectorizer::new();
        vectorizer.fit(rows.iter().map(|(row, _)| &row.data));

        let records = classes
            .iter()
            .map(|(bug_id, label)| serde_json::json!({"bug_id": bug_id, "label": label}))
            .collect();

        let positives = classes.values().filter(|label| **label == 1).count();
        let mut summary = BTreeMap::new();
        summary.insert("performance_bugs".to_string(), positives);
        summary.insert("non_performance_bugs".to_string(), classes.len() - positives);
        summary.insert("features".to_string(), vectorizer.feature_names().len());

        Ok(TransformResult {
            records,
            csv_output: feature_table(&rows, &vectorizer)?,
            json_output: serde_json::to_string_pretty(&serde_json::json!({
                "classes": classes,
                "labels": labels,
            }))?,
            summary,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let mut files = Vec::new();
        for format in self.config.output_formats() {
            match format.as_str() {
                "json" => files.push((LABELS_JSON.to_string(), result.json_output.clone().into_bytes())),
                "csv" => files.push((FEATURES_CSV.to_string(), result.csv_output.clone().into_bytes())),
                other => tracing::warn!("Ignoring unknown output format: {}", other),
            }
        }
        write_outputs(&self.storage, &self.config, files).await
    }
}
