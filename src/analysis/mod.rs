//! Analysis pipeline: raw provider output to derived metrics to the
//! assembled report.

pub mod derive;
pub mod pipeline;

pub use pipeline::Pipeline;
