use crate::agent::prompt::build_generation_prompt;
use crate::error::Result;
use crate::llm::model::{ChatModel, Message};
use crate::sql::cleaner::clean_sql;
use std::sync::Arc;

/// turns a question plus schema context into a single sql statement
pub struct SqlGenerator {
    model: Arc<dyn ChatModel>,
}

impl SqlGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// one completion, no retry; the cleaned output is returned as-is
    #[tracing::instrument(skip(self, question, schema_context), fields(context_len = schema_context.len()))]
    pub async fn generate(&self, question: &str, schema_context: &str) -> Result<String> {
        let prompt = build_generation_prompt(question, schema_context);
        let messages = vec![Message::system(prompt)];

        let reply = self.model.chat(&messages, &[]).await?;
        let sql = clean_sql(reply.content_str().trim());

        tracing::info!(sql_length = sql.len(), "sql generated");
        tracing::debug!(%sql, "generated statement");
        Ok(sql)
    }
}
