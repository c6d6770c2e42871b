use backout_miner::adapters::JsonLinesCommitDb;
use backout_miner::core::retriever::{bustage_fixed_by, extract_commits, save_commit_result, EventType};
use backout_miner::domain::ports::{CommitSource, ConfigProvider};
use backout_miner::utils::{logger, monitor::SystemMonitor, validation::Validate};
use backout_miner::{CommonArgs, LocalStorage, MinerError};
use clap::Parser;

#[derive(Parser)]
#[command(name = "commit_code_retriever")]
#[command(about = "Retrieve good and bad code associated with commits.")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Limit the number of commits to retrieve (0 means no limit).
    #[arg(long)]
    limit: Option<usize>,

    /// Commit database (JSON lines)
    #[arg(long)]
    commits: Option<String>,

    #[arg(long, default_value = "backouts")]
    event_type: EventType,

    /// JSON-lines file the results are appended to (overrides output.retriever_file)
    #[arg(long)]
    output_file: Option<String>,
}

async fn run(args: &Args) -> Result<usize, MinerError> {
    let mut config = args.common.load_config()?;
    if let Some(commits) = &args.commits {
        config.sources.commits = Some(commits.clone());
    }
    if let Some(output_file) = &args.output_file {
        config.output.retriever_file = output_file.clone();
    }
    config.validate()?;

    let monitor = SystemMonitor::new(args.common.monitor_enabled(&config));

    let db = JsonLinesCommitDb::new(LocalStorage::new(String::new()), config.commits_path()?);
    let history = db.commits().await?;
    monitor.log_stats("Load commits");

    let nodes = extract_commits(&history, args.event_type, args.limit)?;
    if args.event_type == EventType::Backouts {
        let fixes = bustage_fixed_by(&history, &nodes, &config.pairing_options());
        let resolved = fixes.fixed_by.values().filter(|fix| fix.is_some()).count();
        tracing::info!("Resolved fixes for {} of {} backed-out commits", resolved, nodes.len());

        let storage = LocalStorage::new(config.output.path.clone());
        save_commit_result(&storage, &config.output.retriever_file, &fixes).await?;
        tracing::info!(
            "Appended results to {}",
            storage.full_path(&config.output.retriever_file).display()
        );
    }
    monitor.log_final_stats();

    Ok(nodes.len())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init(args.common.verbose, args.common.log_json);

    tracing::info!("Starting with limit: {:?}", args.limit);

    match run(&args).await {
        Ok(_) => tracing::info!("Process completed."),
        Err(e) => {
            tracing::error!("❌ Retrieval failed: {} (Category: {:?})", e, e.category());
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code().max(1));
        }
    }
}
