pub mod aggregate;
pub mod engine;
pub mod layout;
pub mod lexicon;
pub mod render;
pub mod sentiment;

pub use crate::domain::ports::{CompletionClient, Pipeline, Storage};
pub use crate::utils::error::Result;
