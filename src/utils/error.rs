use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinerError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Source '{source_name}' returned an unexpected response: {message}")]
    SourceError { source_name: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MinerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MinerError::ConfigError { .. }
            | MinerError::InvalidConfigValueError { .. }
            | MinerError::MissingConfigError { .. }
            | MinerError::TomlError(_) => ErrorCategory::Configuration,
            MinerError::ApiError(_) | MinerError::SourceError { .. } => ErrorCategory::Network,
            MinerError::CsvError(_)
            | MinerError::SerializationError(_)
            | MinerError::ProcessingError { .. }
            | MinerError::ValidationError { .. } => ErrorCategory::Data,
            MinerError::IoError(_) | MinerError::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            MinerError::ApiError(_) | MinerError::SourceError { .. } => {
                "Check the endpoint URL, the API key and network connectivity, then retry"
            }
            MinerError::MissingConfigError { .. } | MinerError::InvalidConfigValueError { .. } => {
                "Fix the reported field in the command line or the TOML file"
            }
            MinerError::ConfigError { .. } | MinerError::TomlError(_) => {
                "Make sure the configuration file exists and is valid TOML"
            }
            MinerError::SerializationError(_) | MinerError::CsvError(_) => {
                "Check that the commit and bug databases are JSON lines produced by the exporter"
            }
            MinerError::ProcessingError { .. } | MinerError::ValidationError { .. } => {
                "Inspect the input data with --verbose to locate the offending record"
            }
            MinerError::IoError(_) | MinerError::ZipError(_) => {
                "Check file permissions and free disk space in the output directory"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not fetch remote data: {}", self),
            ErrorCategory::Data => format!("Input data could not be processed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// 依嚴重程度對應的結束代碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        MinerError::ProcessingError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MinerError>;
