pub mod executor;
pub mod generator;
pub mod prompt;
pub mod tools;

pub use executor::AgentOrchestrator;
pub use generator::SqlGenerator;
pub use prompt::{build_generation_prompt, AGENT_SYSTEM_PROMPT, TERMINATION_TOKEN};
pub use tools::{tool_specs, AgentRun, SqlTools};
