use crate::agent::generator::SqlGenerator;
use crate::agent::tools::EXECUTED_MESSAGE;
use crate::error::{Result, Txt2SqlError};
use crate::schema::retriever::SchemaRetriever;
use crate::sql::executor::SqlExecutor;
use crate::sql::table::ResultTable;
use crate::sql::validator::validate_sql;
use async_trait::async_trait;
use std::sync::Arc;

/// outcome of one question: the sql that was produced, a status message, and
/// the rows when the statement actually ran
#[derive(Debug, Clone, PartialEq)]
pub struct QueryArtifact {
    pub sql: String,
    pub message: String,
    pub result: Option<ResultTable>,
}

impl QueryArtifact {
    pub fn into_parts(self) -> (String, String, Option<ResultTable>) {
        (self.sql, self.message, self.result)
    }
}

#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn answer_question(&self, question: &str) -> Result<QueryArtifact>;
}

/// retrieve → generate → validate → execute, stopping at a failed validation
pub struct Pipeline {
    retriever: Arc<SchemaRetriever>,
    generator: SqlGenerator,
    executor: Arc<dyn SqlExecutor>,
}

impl Pipeline {
    pub fn new(
        retriever: Arc<SchemaRetriever>,
        generator: SqlGenerator,
        executor: Arc<dyn SqlExecutor>,
    ) -> Self {
        Self {
            retriever,
            generator,
            executor,
        }
    }
}

#[async_trait]
impl Orchestrator for Pipeline {
    #[tracing::instrument(skip(self, question), fields(orchestrator = "pipeline"))]
    async fn answer_question(&self, question: &str) -> Result<QueryArtifact> {
        let schema = self.retriever.retrieve(question).await?;
        let sql = self.generator.generate(question, &schema).await?;

        let verdict = validate_sql(&sql);
        if !verdict.ok {
            return Ok(QueryArtifact {
                sql,
                message: verdict.message,
                result: None,
            });
        }

        match self.executor.execute(&sql).await {
            Ok(table) => Ok(QueryArtifact {
                sql,
                message: EXECUTED_MESSAGE.to_string(),
                result: Some(table),
            }),
            Err(Txt2SqlError::Execution(reason)) => Ok(QueryArtifact {
                sql,
                message: format!("Error executing query: {}", reason),
                result: None,
            }),
            Err(e) => Err(e),
        }
    }
}
