use crate::orchestrator::QueryArtifact;
use crate::schema::retriever::SchemaRetriever;
use crate::sql::cleaner::clean_sql;
use crate::sql::executor::SqlExecutor;
use crate::sql::table::ResultTable;
use crate::sql::validator::validate_sql;
use crate::llm::model::{ToolCall, ToolSpec};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub const RETRIEVE_SCHEMA: &str = "retrieve_schema";
pub const VALIDATE_SQL: &str = "validate_sql";
pub const RUN_SQL: &str = "run_sql";

pub const PREVIEW_ROWS: usize = 5;

pub const EXECUTED_MESSAGE: &str = "Query executed successfully.";

/// what the tools observed during one agent conversation
#[derive(Debug, Default)]
pub struct AgentRun {
    pub last_sql: Option<String>,
    pub last_message: String,
    pub last_result: Option<ResultTable>,
}

impl AgentRun {
    pub fn into_artifact(self) -> QueryArtifact {
        QueryArtifact {
            sql: self.last_sql.unwrap_or_default(),
            message: self.last_message,
            result: self.last_result,
        }
    }
}

#[derive(Deserialize)]
struct QuestionArgs {
    question: String,
}

#[derive(Deserialize)]
struct SqlArgs {
    sql: String,
}

pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::function(
            RETRIEVE_SCHEMA,
            "Retrieve database schema based on the question.",
            json!({
                "type": "object",
                "properties": {
                    "question": {"type": "string", "description": "The natural language question"}
                },
                "required": ["question"]
            }),
        ),
        ToolSpec::function(
            VALIDATE_SQL,
            "Validate if a SQL query is safe and correct.",
            json!({
                "type": "object",
                "properties": {
                    "sql": {"type": "string", "description": "The SQL query to validate"}
                },
                "required": ["sql"]
            }),
        ),
        ToolSpec::function(
            RUN_SQL,
            "Execute a SQL query and get the results.",
            json!({
                "type": "object",
                "properties": {
                    "sql": {"type": "string", "description": "The SQL query to execute"}
                },
                "required": ["sql"]
            }),
        ),
    ]
}

/// the pipeline stages exposed as tools; all state lives in the caller's `AgentRun`
pub struct SqlTools {
    retriever: Arc<SchemaRetriever>,
    executor: Arc<dyn SqlExecutor>,
}

impl SqlTools {
    pub fn new(retriever: Arc<SchemaRetriever>, executor: Arc<dyn SqlExecutor>) -> Self {
        Self { retriever, executor }
    }

    /// run one tool call; failures are reported back to the model as text
    #[tracing::instrument(skip(self, run, call), fields(tool = %call.function.name, call_id = %call.id))]
    pub async fn dispatch(&self, run: &mut AgentRun, call: &ToolCall) -> String {
        let arguments = call.function.arguments.as_str();

        match call.function.name.as_str() {
            RETRIEVE_SCHEMA => match serde_json::from_str::<QuestionArgs>(arguments) {
                Ok(args) => self.retrieve_schema(&args.question).await,
                Err(e) => invalid_arguments(RETRIEVE_SCHEMA, e),
            },
            VALIDATE_SQL => match serde_json::from_str::<SqlArgs>(arguments) {
                Ok(args) => self.validate(&args.sql),
                Err(e) => invalid_arguments(VALIDATE_SQL, e),
            },
            RUN_SQL => match serde_json::from_str::<SqlArgs>(arguments) {
                Ok(args) => self.run_sql(run, &args.sql).await,
                Err(e) => invalid_arguments(RUN_SQL, e),
            },
            other => {
                tracing::warn!("model requested unknown tool {}", other);
                format!("Error: unknown tool '{}'", other)
            }
        }
    }

    async fn retrieve_schema(&self, question: &str) -> String {
        match self.retriever.retrieve(question).await {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!("schema retrieval failed: {}", e);
                format!("Error retrieving schema: {}", e)
            }
        }
    }

    fn validate(&self, sql: &str) -> String {
        let verdict = validate_sql(&clean_sql(sql));
        if verdict.ok {
            "SQL is valid.".to_string()
        } else {
            format!("Invalid SQL: {}", verdict.message)
        }
    }

    async fn run_sql(&self, run: &mut AgentRun, sql: &str) -> String {
        let sql = clean_sql(sql);
        run.last_sql = Some(sql.clone());
        run.last_result = None;

        let verdict = validate_sql(&sql);
        if !verdict.ok {
            run.last_message = verdict.message.clone();
            return format!("Refused to execute: {}", verdict.message);
        }

        match self.executor.execute(&sql).await {
            Ok(table) => {
                run.last_message = EXECUTED_MESSAGE.to_string();
                let reply = if table.is_empty() {
                    "Executed successfully but returned no rows.".to_string()
                } else {
                    format!(
                        "Executed successfully. Result preview:\n{}",
                        table.preview_markdown(PREVIEW_ROWS)
                    )
                };
                run.last_result = Some(table);
                reply
            }
            Err(e) => {
                run.last_message = format!("Error: {}", e);
                format!("Error executing SQL: {}", e)
            }
        }
    }
}

fn invalid_arguments(tool: &str, e: serde_json::Error) -> String {
    tracing::warn!("invalid arguments for {}: {}", tool, e);
    format!("Error: invalid arguments for {}: {}", tool, e)
}
