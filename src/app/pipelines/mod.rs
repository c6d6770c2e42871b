pub mod backout_pipeline;
pub mod perf_label_pipeline;

pub use backout_pipeline::BackoutFixPipeline;
pub use perf_label_pipeline::PerformanceBugPipeline;
