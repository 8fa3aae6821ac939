pub mod pipelines;
pub mod stages;
