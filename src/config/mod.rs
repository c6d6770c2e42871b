pub mod cli;
pub mod toml_config;

pub use toml_config::MinerConfig;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::{Args, Parser};

/// Flags shared by every binary.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output directory (overrides output.path)
    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl CommonArgs {
    /// Loads the TOML file when given, then applies command-line overrides.
    pub fn load_config(&self) -> Result<MinerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                MinerConfig::from_file(path)?
            }
            None => MinerConfig::default(),
        };

        if let Some(output_path) = &self.output_path {
            config.output.path = output_path.clone();
        }

        Ok(config)
    }

    pub fn monitor_enabled(&self, config: &MinerConfig) -> bool {
        self.monitor || config.monitoring_enabled()
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "backout-miner")]
#[command(about = "Pair backed-out commits with the commits that fixed them")]
pub struct CliConfig {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Commit database (JSON lines)
    #[arg(long)]
    pub commits: Option<String>,

    /// Bug database (JSON lines), used for status filtering
    #[arg(long)]
    pub bugs: Option<String>,

    /// Bugzilla base URL, queried for bug statuses when no bug database is given
    #[arg(long)]
    pub bugzilla_url: Option<String>,

    #[arg(long, env = "BUGZILLA_API_KEY", hide_env_values = true)]
    pub bugzilla_api_key: Option<String>,

    /// Only keep bugs in these statuses
    #[arg(long, value_delimiter = ',')]
    pub allowed_status: Vec<String>,

    #[arg(long, help = "Require the fix to carry the same review revision")]
    pub require_revision_match: bool,

    /// Maximum hours between a backout and its fix
    #[arg(long)]
    pub max_gap_hours: Option<i64>,

    #[arg(long, value_delimiter = ',')]
    pub formats: Vec<String>,

    #[arg(long, help = "Bundle the outputs into a ZIP archive")]
    pub bundle: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn resolve(&self) -> Result<MinerConfig> {
        let mut config = self.common.load_config()?;

        if let Some(commits) = &self.commits {
            config.sources.commits = Some(commits.clone());
        }
        if let Some(bugs) = &self.bugs {
            config.sources.bugs = Some(bugs.clone());
        }
        if let Some(endpoint) = &self.bugzilla_url {
            let bugzilla = config.bugzilla.get_or_insert(toml_config::BugzillaConfig {
                endpoint: endpoint.clone(),
                api_key: None,
                chunk_size: None,
                timeout_seconds: None,
            });
            bugzilla.endpoint = endpoint.clone();
        }
        if let (Some(bugzilla), Some(key)) = (config.bugzilla.as_mut(), &self.bugzilla_api_key) {
            bugzilla.api_key = Some(key.clone());
        }
        if !self.allowed_status.is_empty() {
            config.pairing.allowed_statuses = self.allowed_status.clone();
        }
        if self.require_revision_match {
            config.pairing.require_revision_match = true;
        }
        if self.max_gap_hours.is_some() {
            config.pairing.max_gap_hours = self.max_gap_hours;
        }
        if !self.formats.is_empty() {
            config.output.formats = self.formats.clone();
        }
        if self.bundle {
            config.output.bundle = true;
        }

        Ok(config)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use crate::domain::ports::ConfigProvider;

    #[test]
    fn test_cli_overrides_defaults() {
        let cli = CliConfig::parse_from([
            "backout-miner",
            "--commits",
            "commits.json",
            "--allowed-status",
            "RESOLVED,VERIFIED",
            "--require-revision-match",
            "--bugzilla-url",
            "https://bugzilla.example.com",
            "--output-path",
            "/tmp/mined",
            "--formats",
            "csv",
        ]);

        let config = cli.resolve().unwrap();
        assert_eq!(config.sources.commits.as_deref(), Some("commits.json"));
        assert_eq!(config.pairing.allowed_statuses, vec!["RESOLVED", "VERIFIED"]);
        assert!(config.pairing_options().require_revision_match);
        assert_eq!(
            config.bugzilla.as_ref().map(|b| b.endpoint.as_str()),
            Some("https://bugzilla.example.com")
        );
        assert_eq!(config.output_path(), "/tmp/mined");
        assert_eq!(config.output_formats(), &["csv".to_string()]);
    }

    #[test]
    fn test_missing_config_file_fails() {
        let cli = CliConfig::parse_from(["backout-miner", "--config", "/nonexistent/miner.toml"]);
        assert!(cli.resolve().is_err());
    }
}
