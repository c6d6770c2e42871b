use backout_miner::adapters::JsonLinesBugDb;
use backout_miner::utils::{logger, validation::Validate};
use backout_miner::{CommonArgs, EtlEngine, LocalStorage, MinerConfig, MinerError, PerformanceBugPipeline};
use clap::Parser;

#[derive(Parser)]
#[command(name = "perf_labels")]
#[command(about = "Export performance-bug labels and features for training")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Bug database (JSON lines)
    #[arg(long)]
    bugs: Option<String>,

    #[arg(long, value_delimiter = ',')]
    formats: Vec<String>,

    #[arg(long, help = "Bundle the outputs into a ZIP archive")]
    bundle: bool,
}

fn resolve(args: &Args) -> Result<MinerConfig, MinerError> {
    let mut config = args.common.load_config()?;
    if let Some(bugs) = &args.bugs {
        config.sources.bugs = Some(bugs.clone());
    }
    if !args.formats.is_empty() {
        config.output.formats = args.formats.clone();
    }
    if args.bundle {
        config.output.bundle = true;
    }
    config.validate()?;
    Ok(config)
}

async fn run(args: &Args) -> Result<String, MinerError> {
    let config = resolve(args)?;
    let bugs_path = config
        .sources
        .bugs
        .clone()
        .ok_or_else(|| MinerError::MissingConfigError {
            field: "sources.bugs".to_string(),
        })?;

    let monitor_enabled = args.common.monitor_enabled(&config);
    let pipeline = PerformanceBugPipeline::new(
        LocalStorage::new(config.output.path.clone()),
        config,
        Box::new(JsonLinesBugDb::new(LocalStorage::new(String::new()), bugs_path)),
    );

    EtlEngine::new_with_monitoring(pipeline, monitor_enabled)
        .run()
        .await
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init(args.common.verbose, args.common.log_json);

    match run(&args).await {
        Ok(output_path) => {
            tracing::info!("✅ Labels exported");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Label export failed: {} (Category: {:?}, Severity: {:?})",
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_bug_database_is_a_config_error() {
        let args = Args::try_parse_from(["perf_labels"]).unwrap();

        let err = run(&args).await.unwrap_err();
        assert!(matches!(err, MinerError::MissingConfigError { ref field } if field == "sources.bugs"));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_bug_database_exits_by_severity() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        let args = Args::try_parse_from([
            "perf_labels",
            "--output-path",
            dir.path().to_str().unwrap(),
            "--bugs",
            missing.to_str().unwrap(),
        ])
        .unwrap();

        let err = run(&args).await.unwrap_err();
        assert!(matches!(err, MinerError::IoError(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_unknown_format_rejected_before_running() {
        let args = Args::try_parse_from(["perf_labels", "--formats", "xml"]).unwrap();
        let err = resolve(&args).unwrap_err();
        assert!(matches!(err, MinerError::InvalidConfigValueError { .. }));
        assert_eq!(err.exit_code(), 1);
    }
}
