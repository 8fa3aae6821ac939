pub mod ask_pipeline;
pub mod combine_pipeline;
pub mod render_pipeline;

pub use ask_pipeline::{plan_jobs, AskJob, AskPipeline, SavedResponse};
pub use combine_pipeline::{CombinePipeline, GroupWords};
pub use render_pipeline::{CloudPlan, RenderPipeline};
