pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::{CliConfig, CommonArgs};
pub use config::MinerConfig;

pub use app::pipelines::{BackoutFixPipeline, PerformanceBugPipeline};
pub use core::etl::EtlEngine;
pub use domain::model::{BackoutFixPair, Bug, Commit};
pub use utils::error::{MinerError, Result};
