use backout_miner::adapters::{BugzillaClient, JsonLinesBugDb, JsonLinesCommitDb, PhabricatorClient};
use backout_miner::domain::ports::BugSource;
use backout_miner::utils::{logger, validation::Validate};
use backout_miner::{BackoutFixPipeline, CliConfig, EtlEngine, LocalStorage, MinerConfig, MinerError};
use clap::Parser;
use std::time::Duration;

fn bug_source(config: &MinerConfig, input: &LocalStorage) -> Option<Box<dyn BugSource>> {
    if let Some(path) = &config.sources.bugs {
        tracing::info!("🐛 Bug statuses from database: {}", path);
        return Some(Box::new(JsonLinesBugDb::new(input.clone(), path.clone())));
    }

    config.bugzilla.as_ref().map(|bugzilla| {
        tracing::info!("🐛 Bug statuses from Bugzilla: {}", bugzilla.endpoint);
        let client = BugzillaClient::new(bugzilla.endpoint.clone())
            .with_api_key(bugzilla.api_key.clone())
            .with_chunk_size(bugzilla.chunk_size.unwrap_or(backout_miner::adapters::bugzilla::DEFAULT_CHUNK_SIZE))
            .with_timeout(bugzilla.timeout_seconds.map(Duration::from_secs));
        Box::new(client) as Box<dyn BugSource>
    })
}

async fn run(cli: &CliConfig) -> Result<String, MinerError> {
    let config = cli.resolve()?;
    config.validate()?;

    let commits_path = config.commits_path()?.to_string();
    let input = LocalStorage::new(String::new());
    let output = LocalStorage::new(config.output.path.clone());
    let monitor_enabled = cli.common.monitor_enabled(&config);
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let mut pipeline = BackoutFixPipeline::new(
        output,
        config.clone(),
        Box::new(JsonLinesCommitDb::new(input.clone(), commits_path)),
    );
    if let Some(bugs) = bug_source(&config, &input) {
        pipeline = pipeline.with_bug_source(bugs);
    }
    if let Some(phabricator) = &config.phabricator {
        pipeline = pipeline.with_review_source(Box::new(PhabricatorClient::new(
            phabricator.endpoint.clone(),
            phabricator.api_token.clone(),
        )));
    }

    EtlEngine::new_with_monitoring(pipeline, monitor_enabled)
        .run()
        .await
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    logger::init(cli.common.verbose, cli.common.log_json);
    tracing::info!("Starting backout-miner");
    tracing::debug!("Commit database: {:?}, config file: {:?}", cli.commits, cli.common.config);

    match run(&cli).await {
        Ok(output_path) => {
            tracing::info!("✅ Pairing completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Pairing failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}
