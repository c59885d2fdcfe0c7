pub mod cancel;
pub mod config;
pub mod pipeline;
pub mod priority;
pub mod report;
pub mod state;
mod logging;

#[cfg(test)]
mod tests;

pub use cancel::CancelToken;
pub use config::{PipelineConfig, PriorityWeights};
pub use logging::{init_logging, Logger};
pub use pipeline::ContentPipeline;
pub use nv_core::RankKey;
pub use priority::compute_priority;
pub use report::{FailureRecord, PersistedRecord, RunOutcome, RunReport, FATAL_EXIT_CODE};
pub use state::{ArticleState, Stage};

pub mod prelude {
    pub use super::{CancelToken, ContentPipeline, PipelineConfig, RunOutcome, RunReport};
    pub use nv_core::{Error, Result};
}
