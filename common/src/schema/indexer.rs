use crate::error::{Result, Txt2SqlError};
use crate::llm::model::Embedder;
use crate::schema::descriptor::TableDescriptor;
use crate::schema::index::{IndexRecord, VectorIndex};

/// embed every table description in one batch and rebuild the index from it,
/// keyed by the table's position in the schema; tables missing from `tables`
/// no longer appear in the index afterwards
#[tracing::instrument(skip(embedder, index, tables), fields(table_count = tables.len()))]
pub async fn build_schema_index(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    tables: &[TableDescriptor],
) -> Result<usize> {
    if tables.is_empty() {
        tracing::warn!("no tables to index; clearing the collection");
        index.replace(Vec::new()).await?;
        return Ok(0);
    }

    let documents: Vec<String> = tables.iter().map(TableDescriptor::document).collect();

    tracing::info!("requesting embeddings for {} table descriptions", documents.len());
    let vectors = embedder.embed(&documents).await?;

    if vectors.len() != tables.len() {
        return Err(Txt2SqlError::Provider(format!(
            "requested {} embeddings, received {}",
            tables.len(),
            vectors.len()
        )));
    }

    let records: Vec<IndexRecord> = tables
        .iter()
        .zip(documents)
        .zip(vectors)
        .enumerate()
        .map(|(i, ((table, document), embedding))| IndexRecord {
            id: i.to_string(),
            document,
            embedding,
            metadata: table.metadata(),
        })
        .collect();

    let count = records.len();
    index.replace(records).await?;

    tracing::info!(indexed = count, "schema indexed");
    Ok(count)
}
