pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::Cli;

pub use adapters::{LocalStorage, OpenAiClient};
pub use app::pipelines::{AskPipeline, CombinePipeline, RenderPipeline};
pub use config::ProbeConfig;
pub use core::engine::StageEngine;
pub use utils::error::{ProbeError, Result};
