pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod schema;
pub mod sql;
pub mod tracing;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, Txt2SqlError};
pub use orchestrator::{Orchestrator, Pipeline, QueryArtifact};
