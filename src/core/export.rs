use crate::domain::model::BackoutFixPair;
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::{MinerError, Result};
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

#[derive(Debug, Serialize)]
struct PairRow<'a> {
    bug_id: u64,
    inducing_node: &'a str,
    inducing_author: &'a str,
    inducing_pushdate: &'a str,
    backout_node: &'a str,
    fix_node: &'a str,
    fix_pushdate: &'a str,
    matched_by: &'a str,
    added: u64,
    deleted: u64,
    test_added: u64,
    test_deleted: u64,
    review_status: &'a str,
}

pub fn pairs_to_csv(pairs: &[BackoutFixPair]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for pair in pairs {
        writer.serialize(PairRow {
            bug_id: pair.bug_id,
            inducing_node: &pair.inducing.node,
            inducing_author: &pair.inducing.author,
            inducing_pushdate: &pair.inducing.pushdate,
            backout_node: pair.backout.as_ref().map(|b| b.node.as_str()).unwrap_or(""),
            fix_node: &pair.fix.node,
            fix_pushdate: &pair.fix.pushdate,
            matched_by: pair.matched_by.as_str(),
            added: pair.lines_changed.added,
            deleted: pair.lines_changed.deleted,
            test_added: pair.lines_changed.test_added,
            test_deleted: pair.lines_changed.test_deleted,
            review_status: pair.review_status.as_deref().unwrap_or(""),
        })?;
    }
    finish_csv(writer)
}

pub fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| MinerError::processing(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| MinerError::processing(format!("CSV is not UTF-8: {}", e)))
}

pub fn bundle_zip(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, content) in files {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(content)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Writes each file on its own, or a single ZIP archive when bundling is on.
/// Returns the path of what was written (the archive or the directory).
pub async fn write_outputs<S: Storage, C: ConfigProvider>(
    storage: &S,
    config: &C,
    files: Vec<(String, Vec<u8>)>,
) -> Result<String> {
    if config.bundle_outputs() {
        let archive = bundle_zip(&files)?;
        tracing::debug!(
            "Writing ZIP archive ({} files, {} bytes)",
            files.len(),
            archive.len()
        );
        storage.write_file(config.bundle_filename(), &archive).await?;
        return Ok(format!("{}/{}", config.output_path(), config.bundle_filename()));
    }

    for (name, content) in &files {
        tracing::debug!("Writing {} ({} bytes)", name, content.len());
        storage.write_file(name, content).await?;
    }
    Ok(config.output_path().to_string())
}
