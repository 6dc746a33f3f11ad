use crate::error::{Result, Txt2SqlError};
use crate::llm::model::Embedder;
use crate::schema::index::{RecordMetadata, VectorIndex};
use std::sync::Arc;

/// three-line stanza describing one matched table
pub fn format_stanza(meta: &RecordMetadata) -> String {
    format!(
        "\nTABLE: {}\nCOLUMNS: {}\nDESCRIPTION: {}\n",
        meta.name, meta.columns, meta.description
    )
}

/// finds the tables most relevant to a question by embedding similarity
pub struct SchemaRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl SchemaRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, question: &str) -> Result<String> {
        self.retrieve_top_k(question, self.top_k).await
    }

    /// schema context for the `top_k` nearest tables, most similar first
    #[tracing::instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn retrieve_top_k(&self, question: &str, top_k: usize) -> Result<String> {
        let embedding = self
            .embedder
            .embed(&[question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Txt2SqlError::Provider("no embedding returned for question".to_string()))?;

        let matches = self.index.query(&embedding, top_k).await?;

        tracing::info!(
            matched = matches.len(),
            tables = %matches.iter().map(|m| m.metadata.name.as_str()).collect::<Vec<_>>().join(","),
            "retrieved schema context"
        );

        Ok(matches.iter().map(|m| format_stanza(&m.metadata)).collect())
    }
}
