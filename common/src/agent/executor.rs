use crate::agent::prompt::{AGENT_SYSTEM_PROMPT, TERMINATION_TOKEN};
use crate::agent::tools::{tool_specs, AgentRun, SqlTools};
use crate::error::Result;
use crate::llm::model::{ChatModel, Message};
use crate::orchestrator::{Orchestrator, QueryArtifact};
use async_trait::async_trait;
use std::sync::Arc;

fn is_termination(reply: &Message) -> bool {
    reply.content_str().trim_end().ends_with(TERMINATION_TOKEN)
}

/// lets the model drive retrieval, validation and execution through tool calls
pub struct AgentOrchestrator {
    model: Arc<dyn ChatModel>,
    tools: SqlTools,
    max_turns: usize,
}

impl AgentOrchestrator {
    pub fn new(model: Arc<dyn ChatModel>, tools: SqlTools, max_turns: usize) -> Self {
        Self {
            model,
            tools,
            max_turns: max_turns.max(1),
        }
    }
}

#[async_trait]
impl Orchestrator for AgentOrchestrator {
    #[tracing::instrument(skip(self, question), fields(orchestrator = "agent", max_turns = self.max_turns))]
    async fn answer_question(&self, question: &str) -> Result<QueryArtifact> {
        let specs = tool_specs();
        let mut run = AgentRun::default();
        let mut messages = vec![Message::system(AGENT_SYSTEM_PROMPT), Message::user(question)];
        let mut finished = false;

        for turn in 1..=self.max_turns {
            tracing::info!("agent turn {}/{}", turn, self.max_turns);

            let reply = self.model.chat(&messages, &specs).await?;
            let calls = reply.tool_calls.clone();
            let terminated = is_termination(&reply);
            messages.push(reply);

            for call in &calls {
                let output = self.tools.dispatch(&mut run, call).await;
                messages.push(Message::tool(call.id.clone(), output));
            }

            if terminated {
                tracing::info!(turn, "agent signalled completion");
                finished = true;
                break;
            }
            if calls.is_empty() {
                tracing::info!(turn, "agent replied without tool calls");
                finished = true;
                break;
            }
        }

        if !finished {
            tracing::warn!("agent stopped after reaching the turn limit of {}", self.max_turns);
        }

        Ok(run.into_artifact())
    }
}
