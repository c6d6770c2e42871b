use anyhow::Result;
use backout_miner::adapters::{JsonLinesBugDb, JsonLinesCommitDb};
use backout_miner::core::pairing::PairingOptions;
use backout_miner::core::retriever::{bustage_fixed_by, extract_commits, save_commit_result, EventType};
use backout_miner::domain::ports::CommitSource;
use backout_miner::{EtlEngine, LocalStorage, MinerConfig, PerformanceBugPipeline};
use serde_json::{json, Value};
use tempfile::TempDir;

fn write_lines(path: &std::path::Path, records: &[Value]) {
    let lines: Vec<String> = records.iter().map(Value::to_string).collect();
    std::fs::write(path, lines.join("\n") + "\n").unwrap();
}

#[tokio::test]
async fn test_retriever_appends_one_document_per_run() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().to_str().unwrap().to_string();
    write_lines(
        &dir.path().join("commits.json"),
        &[
            json!({"node": "aaaaaaaaaaaaaaaa", "bug_id": 1, "pushdate": "2024-05-01 10:00:00",
                   "desc": "Bug 1 - Feature", "backedoutby": "bbbbbbbbbbbbbbbb"}),
            json!({"node": "bbbbbbbbbbbbbbbb", "bug_id": 1, "pushdate": "2024-05-01 11:00:00",
                   "desc": "Backed out changeset aaaaaaaaaaaa (bug 1)", "backsout": ["aaaaaaaaaaaaaaaa"]}),
            json!({"node": "cccccccccccccccc", "bug_id": 1, "pushdate": "2024-05-02 09:00:00",
                   "desc": "Bug 1 - Feature, relanded"}),
            json!({"node": "dddddddddddddddd", "bug_id": 2, "pushdate": "2024-05-03 09:00:00",
                   "desc": "Bug 2 - Other", "backedoutby": "eeeeeeeeeeeeeeee"}),
        ],
    );

    let storage = LocalStorage::new(base);
    let history = JsonLinesCommitDb::new(storage.clone(), "commits.json")
        .commits()
        .await
        .unwrap();

    let nodes = extract_commits(&history, EventType::Backouts, None).unwrap();
    assert_eq!(nodes, vec!["aaaaaaaaaaaaaaaa", "dddddddddddddddd"]);

    let fixes = bustage_fixed_by(&history, &nodes, &PairingOptions::default());
    assert_eq!(
        fixes.fixed_by["aaaaaaaaaaaaaaaa"].as_deref(),
        Some("cccccccccccccccc")
    );
    assert_eq!(fixes.fixed_by["dddddddddddddddd"], None);

    save_commit_result(&storage, "out/commit_code_db.json", &fixes)
        .await
        .unwrap();
    save_commit_result(&storage, "out/commit_code_db.json", &fixes)
        .await
        .unwrap();

    let written = std::fs::read_to_string(dir.path().join("out/commit_code_db.json")).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 2);
    let document: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(document["aaaaaaaaaaaaaaaa"], "cccccccccccccccc");
    assert!(document["dddddddddddddddd"].is_null());
}

#[tokio::test]
async fn test_retriever_limit_and_empty_history() -> Result<()> {
    let history = vec![
        backout_miner::Commit {
            node: "1".to_string(),
            bug_id: Some(7),
            backedoutby: "2".to_string(),
            ..Default::default()
        },
        backout_miner::Commit {
            node: "3".to_string(),
            bug_id: Some(7),
            backedoutby: "4".to_string(),
            ..Default::default()
        },
    ];

    let nodes = extract_commits(&history, EventType::Backouts, Some(1))?;
    assert_eq!(nodes, vec!["1"]);

    let unlimited = extract_commits(&history, EventType::Backouts, Some(0))?;
    assert_eq!(unlimited, vec!["1", "3"]);

    let reviews = extract_commits(&history, EventType::ReviewComments, None)?;
    assert!(reviews.is_empty());

    assert!(extract_commits(&[], EventType::Backouts, None).is_err());
    Ok(())
}

#[tokio::test]
async fn test_performance_labels_end_to_end() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let output_path = output_dir.path().to_str().unwrap().to_string();

    write_lines(
        &input_dir.path().join("bugs.json"),
        &[
            json!({"id": 10, "product": "Core", "summary": "Scrolling is janky",
                   "keywords": ["perf", "regression"], "cf_performance_impact": "medium",
                   "comments": [{"text": "See https://example.com/trace for the profile"}]}),
            json!({"id": 11, "product": "Firefox", "summary": "Typo in menu",
                   "cf_performance_impact": "none"}),
            json!({"id": 12, "product": "Firefox", "summary": "Wrong icon",
                   "cf_performance_impact": "pending-needinfo",
                   "attachments": [{"id": 1, "content_type": "image/png"}]}),
            json!({"id": 13, "product": "Toolkit", "summary": "Untriaged",
                   "cf_performance_impact": "?"}),
        ],
    );

    let mut config = MinerConfig::default();
    config.output.path = output_path.clone();

    let pipeline = PerformanceBugPipeline::new(
        LocalStorage::new(output_path.clone()),
        config,
        Box::new(JsonLinesBugDb::new(
            LocalStorage::new(input_dir.path().to_str().unwrap().to_string()),
            "bugs.json",
        )),
    );

    EtlEngine::new(pipeline).run().await.unwrap();

    let labels: Value = serde_json::from_str(
        &std::fs::read_to_string(output_dir.path().join("perf_labels.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(labels["labels"], json!([0, 1]));
    assert_eq!(labels["classes"]["10"], 1);
    assert_eq!(labels["classes"]["12"], 0);
    assert!(labels["classes"].get("11").is_none());
    assert!(labels["classes"].get("13").is_none());

    let features = std::fs::read_to_string(output_dir.path().join("perf_features.csv")).unwrap();
    let mut reader = csv::Reader::from_reader(features.as_bytes());
    let header = reader.headers().unwrap().clone();
    assert!(header.iter().any(|h| h == "product=Core"));
    assert!(header.iter().any(|h| h == "keywords=regression"));
    assert!(!header.iter().any(|h| h == "keywords=perf"));

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "10");
    assert_eq!(&rows[1][0], "12");
}
