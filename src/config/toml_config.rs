use crate::core::pairing::PairingOptions;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{MinerError, Result};
use crate::utils::validation::{self, Validate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

static ENV_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("Invalid env var regex"));

pub const VALID_FORMATS: [&str; 2] = ["json", "csv"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinerConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    pub bugzilla: Option<BugzillaConfig>,
    pub phabricator: Option<PhabricatorConfig>,
    #[serde(default)]
    pub pairing: PairingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub commits: Option<String>,
    pub bugs: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugzillaConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub chunk_size: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhabricatorConfig {
    pub endpoint: String,
    pub api_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    pub require_revision_match: bool,
    pub skip_description_mentions: bool,
    pub allowed_statuses: Vec<String>,
    pub max_gap_hours: Option<i64>,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            require_revision_match: false,
            skip_description_mentions: true,
            allowed_statuses: Vec::new(),
            max_gap_hours: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub formats: Vec<String>,
    pub bundle: bool,
    pub bundle_filename: String,
    pub retriever_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
            formats: vec!["json".to_string(), "csv".to_string()],
            bundle: false,
            bundle_filename: "backout_miner_output.zip".to_string(),
            retriever_file: crate::core::retriever::DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl MinerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed)?)
    }

    /// 替換環境變數 (例如 ${BUGZILLA_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn commits_path(&self) -> Result<&str> {
        validation::validate_required_field("sources.commits", &self.sources.commits)
            .map(String::as_str)
    }
}

impl ConfigProvider for MinerConfig {
    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn bundle_outputs(&self) -> bool {
        self.output.bundle
    }

    fn bundle_filename(&self) -> &str {
        &self.output.bundle_filename
    }

    fn pairing_options(&self) -> PairingOptions {
        PairingOptions {
            require_revision_match: self.pairing.require_revision_match,
            skip_description_mentions: self.pairing.skip_description_mentions,
            allowed_statuses: self.pairing.allowed_statuses.clone(),
            max_gap: self.pairing.max_gap_hours.and_then(chrono::Duration::try_hours),
        }
    }
}

impl Validate for MinerConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("output.path", &self.output.path)?;

        for format in &self.output.formats {
            if !VALID_FORMATS.contains(&format.as_str()) {
                return Err(MinerError::InvalidConfigValueError {
                    field: "output.formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        VALID_FORMATS.join(", ")
                    ),
                });
            }
        }

        if let Some(commits) = &self.sources.commits {
            validation::validate_path("sources.commits", commits)?;
        }
        if let Some(bugs) = &self.sources.bugs {
            validation::validate_path("sources.bugs", bugs)?;
        }

        if let Some(bugzilla) = &self.bugzilla {
            validation::validate_url("bugzilla.endpoint", &bugzilla.endpoint)?;
            if let Some(chunk_size) = bugzilla.chunk_size {
                validation::validate_positive_number("bugzilla.chunk_size", chunk_size, 1)?;
            }
        }

        if let Some(phabricator) = &self.phabricator {
            validation::validate_url("phabricator.endpoint", &phabricator.endpoint)?;
            validation::validate_non_empty_string("phabricator.api_token", &phabricator.api_token)?;
        }

        if let Some(hours) = self.pairing.max_gap_hours {
            let reason = if hours <= 0 {
                Some("Value must be positive")
            } else if chrono::Duration::try_hours(hours).is_none() {
                Some("Value is too large for a time span")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(MinerError::InvalidConfigValueError {
                    field: "pairing.max_gap_hours".to_string(),
                    value: hours.to_string(),
                    reason: reason.to_string(),
                });
            }
        }

        Ok(())
    }
}
