use crate::core::pairing::PairingOptions;
use crate::domain::model::{Bug, Commit, Revision, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn bundle_outputs(&self) -> bool;
    fn bundle_filename(&self) -> &str;
    fn pairing_options(&self) -> PairingOptions;
}

/// Version-control history: every pushed commit, backouts included.
#[async_trait]
pub trait CommitSource: Send + Sync {
    async fn commits(&self) -> Result<Vec<Commit>>;
}

/// Bug-tracker queries.
#[async_trait]
pub trait BugSource: Send + Sync {
    async fn bugs(&self, ids: &[u64]) -> Result<Vec<Bug>>;

    /// Every bug the source knows about. Remote trackers cannot enumerate
    /// and return an error.
    async fn all_bugs(&self) -> Result<Vec<Bug>>;
}

/// Code-review metadata.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn revisions(&self, ids: &[u64]) -> Result<Vec<Revision>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Item: Send;

    async fn extract(&self) -> Result<Vec<Self::Item>>;
    async fn transform(&self, data: Vec<Self::Item>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
