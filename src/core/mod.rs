pub mod cleanup;
pub mod etl;
pub mod export;
pub mod features;
pub mod labels;
pub mod pairing;
pub mod retriever;

pub use crate::domain::model::TransformResult;
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
