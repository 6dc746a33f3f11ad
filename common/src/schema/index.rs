use crate::error::{Result, Txt2SqlError};
use arrow_array::types::Float32Type;
use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator,
    RecordBatchReader, StringArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// flat metadata kept next to each embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub columns: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// nearest-neighbour hit, closest first
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    pub document: String,
    pub metadata: RecordMetadata,
    pub distance: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// insert records, replacing any existing record with the same id
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<()>;

    /// drop every stored record and keep only `records`
    async fn replace(&self, records: Vec<IndexRecord>) -> Result<()>;

    /// the `n_results` records closest to `embedding`, ordered by ascending distance
    async fn query(&self, embedding: &[f32], n_results: usize) -> Result<Vec<QueryMatch>>;

    async fn count(&self) -> Result<usize>;
}

const VECTOR_COLUMN: &str = "vector";
const DISTANCE_COLUMN: &str = "_distance";

fn record_schema(dimensions: i32) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("document", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("type", DataType::Utf8, false),
        Field::new("description", DataType::Utf8, false),
        Field::new("columns", DataType::Utf8, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimensions,
            ),
            true,
        ),
    ]))
}

fn vector_dimensions(schema: &Schema) -> Option<usize> {
    schema
        .field_with_name(VECTOR_COLUMN)
        .ok()
        .and_then(|f| match f.data_type() {
            DataType::FixedSizeList(_, dim) => usize::try_from(*dim).ok(),
            _ => None,
        })
}

fn string_column<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

/// one arrow batch holding every record; all embeddings must share a dimension
fn record_batch(records: &[IndexRecord]) -> Result<RecordBatch> {
    let dimensions = records.first().map(|r| r.embedding.len()).unwrap_or(0);
    if let Some(bad) = records.iter().find(|r| r.embedding.len() != dimensions) {
        return Err(Txt2SqlError::Index(format!(
            "record {} has dimension {} but the batch uses {}",
            bad.id,
            bad.embedding.len(),
            dimensions
        )));
    }
    let width = i32::try_from(dimensions)
        .map_err(|_| Txt2SqlError::Index(format!("dimension {} is too large", dimensions)))?;

    let vectors = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
        records
            .iter()
            .map(|r| Some(r.embedding.iter().copied().map(Some).collect::<Vec<_>>())),
        width,
    );

    let batch = RecordBatch::try_new(
        record_schema(width),
        vec![
            string_column(records.iter().map(|r| r.id.as_str())),
            string_column(records.iter().map(|r| r.document.as_str())),
            string_column(records.iter().map(|r| r.metadata.name.as_str())),
            string_column(records.iter().map(|r| r.metadata.kind.as_str())),
            string_column(records.iter().map(|r| r.metadata.description.as_str())),
            string_column(records.iter().map(|r| r.metadata.columns.as_str())),
            Arc::new(vectors),
        ],
    )?;
    Ok(batch)
}

fn batch_reader(batch: RecordBatch) -> Box<dyn RecordBatchReader + Send> {
    let schema = batch.schema();
    Box::new(RecordBatchIterator::new(vec![Ok(batch)], schema))
}

fn text_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Txt2SqlError::Index(format!("search result has no text column {}", name)))
}

fn batch_matches(batch: &RecordBatch, out: &mut Vec<QueryMatch>) -> Result<()> {
    let ids = text_column(batch, "id")?;
    let documents = text_column(batch, "document")?;
    let names = text_column(batch, "name")?;
    let kinds = text_column(batch, "type")?;
    let descriptions = text_column(batch, "description")?;
    let columns = text_column(batch, "columns")?;
    let distances = batch
        .column_by_name(DISTANCE_COLUMN)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    for i in 0..batch.num_rows() {
        out.push(QueryMatch {
            id: ids.value(i).to_string(),
            document: documents.value(i).to_string(),
            metadata: RecordMetadata {
                name: names.value(i).to_string(),
                kind: kinds.value(i).to_string(),
                description: descriptions.value(i).to_string(),
                columns: columns.value(i).to_string(),
            },
            distance: distances.map(|d| d.value(i)).unwrap_or(f32::MAX),
        });
    }
    Ok(())
}

/// persistent lancedb collection searched by cosine distance; the table is
/// created on first write because its vector width comes from the embeddings
pub struct LanceIndex {
    path: PathBuf,
    name: String,
    connection: Connection,
    table: RwLock<Option<Table>>,
}

impl LanceIndex {
    /// connect to the database directory `dir` and open `collection` if it exists
    pub async fn open(dir: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let connection = lancedb::connect(&dir.to_string_lossy()).execute().await?;
        let table = match connection.open_table(collection).execute().await {
            Ok(table) => Some(table),
            Err(lancedb::Error::TableNotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            collection,
            path = %dir.display(),
            exists = table.is_some(),
            "opened vector index"
        );

        Ok(Self {
            path: dir.join(format!("{}.lance", collection)),
            name: collection.to_string(),
            connection,
            table: RwLock::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn create(&self, batch: RecordBatch) -> Result<Table> {
        let table = self
            .connection
            .create_table(self.name.as_str(), batch_reader(batch))
            .execute()
            .await?;
        Ok(table)
    }
}

async fn stored_dimensions(table: &Table) -> Result<Option<usize>> {
    let schema = table.schema().await?;
    Ok(vector_dimensions(&schema))
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let dimensions = records[0].embedding.len();
        let batch = record_batch(&records)?;
        let mut guard = self.table.write().await;

        match guard.clone() {
            None => *guard = Some(self.create(batch).await?),
            Some(table) => {
                let stored = stored_dimensions(&table).await?;
                if stored != Some(dimensions) {
                    return Err(Txt2SqlError::Index(format!(
                        "records have dimension {} but collection {} stores {:?}",
                        dimensions, self.name, stored
                    )));
                }

                // one commit: either every record lands or none does
                let mut merge = table.merge_insert(&["id"]);
                merge.when_matched_update_all(None).when_not_matched_insert_all();
                merge.execute(batch_reader(batch)).await?;
            }
        }

        tracing::info!(records = records.len(), collection = %self.name, "vector index updated");
        Ok(())
    }

    async fn replace(&self, records: Vec<IndexRecord>) -> Result<()> {
        let batch = if records.is_empty() {
            None
        } else {
            Some(record_batch(&records)?)
        };
        let mut guard = self.table.write().await;

        if guard.take().is_some() {
            self.connection.drop_table(self.name.as_str()).await?;
        }
        if let Some(batch) = batch {
            *guard = Some(self.create(batch).await?);
        }

        tracing::info!(records = records.len(), collection = %self.name, "vector index rebuilt");
        Ok(())
    }

    async fn query(&self, embedding: &[f32], n_results: usize) -> Result<Vec<QueryMatch>> {
        let guard = self.table.read().await;
        let Some(table) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let stored = stored_dimensions(table).await?;
        if stored != Some(embedding.len()) {
            return Err(Txt2SqlError::Index(format!(
                "query has dimension {} but collection {} stores {:?}",
                embedding.len(),
                self.name,
                stored
            )));
        }
        if n_results == 0 {
            return Ok(Vec::new());
        }

        let batches: Vec<RecordBatch> = table
            .query()
            .nearest_to(embedding.to_vec())?
            .distance_type(DistanceType::Cosine)
            .limit(n_results)
            .execute()
            .await?
            .try_collect()
            .await?;

        let mut matches = Vec::new();
        for batch in &batches {
            batch_matches(batch, &mut matches)?;
        }
        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(n_results);
        Ok(matches)
    }

    async fn count(&self) -> Result<usize> {
        match self.table.read().await.as_ref() {
            Some(table) => Ok(table.count_rows(None).await?),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, embedding: Vec<f32>) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            document: format!("TABLE: {}", name),
            embedding,
            metadata: RecordMetadata {
                name: name.to_string(),
                kind: "table".to_string(),
                description: String::new(),
                columns: "id".to_string(),
            },
        }
    }

    async fn names(index: &LanceIndex, query: &[f32]) -> Vec<String> {
        let mut names: Vec<String> = index
            .query(query, 100)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.metadata.name)
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let index = LanceIndex::open(dir.path(), "schema_store").await.unwrap();
        index
            .upsert(vec![
                record("0", "far", vec![0.0, 1.0]),
                record("1", "near", vec![1.0, 0.1]),
                record("2", "middle", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], 2).await.unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.metadata.name.as_str()).collect();
        assert_eq!(names, vec!["near", "middle"]);
        assert!(hits[0].distance <= hits[1].distance);
        assert_eq!(hits[0].document, "TABLE: near");
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let index = LanceIndex::open(dir.path(), "schema_store").await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(index.query(&[1.0, 0.0], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = LanceIndex::open(dir.path(), "schema_store").await.unwrap();
            index.upsert(vec![record("0", "old", vec![1.0, 0.0])]).await.unwrap();
            index
                .upsert(vec![
                    record("0", "new", vec![1.0, 0.0]),
                    record("1", "other", vec![0.0, 1.0]),
                ])
                .await
                .unwrap();
            assert_eq!(index.count().await.unwrap(), 2);
        }

        let reopened = LanceIndex::open(dir.path(), "schema_store").await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        assert_eq!(names(&reopened, &[1.0, 0.0]).await, vec!["new", "other"]);
        assert!(reopened.path().ends_with("schema_store.lance"));
    }

    #[tokio::test]
    async fn test_replace_drops_stale_records() {
        let dir = tempfile::tempdir().unwrap();
        let index = LanceIndex::open(dir.path(), "schema_store").await.unwrap();
        index
            .replace(vec![
                record("0", "orders", vec![1.0, 0.0]),
                record("1", "legacy", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        index.replace(vec![record("0", "orders", vec![1.0, 0.0])]).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
        assert_eq!(names(&index, &[0.0, 1.0]).await, vec!["orders"]);

        // a new embedding width is accepted on rebuild
        index.replace(vec![record("0", "orders", vec![1.0, 0.0, 0.0])]).await.unwrap();
        assert_eq!(index.query(&[1.0, 0.0, 0.0], 1).await.unwrap().len(), 1);

        index.replace(Vec::new()).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejected_upsert_leaves_collection_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let index = LanceIndex::open(dir.path(), "schema_store").await.unwrap();
        index.upsert(vec![record("0", "orders", vec![1.0, 0.0])]).await.unwrap();

        let mixed = vec![
            record("0", "renamed", vec![1.0, 0.0]),
            record("1", "wide", vec![1.0, 0.0, 0.0]),
        ];
        assert!(matches!(index.upsert(mixed).await, Err(Txt2SqlError::Index(_))));

        let wider = vec![record("2", "wide", vec![1.0, 0.0, 0.0])];
        assert!(matches!(index.upsert(wider).await, Err(Txt2SqlError::Index(_))));

        assert_eq!(index.count().await.unwrap(), 1);
        assert_eq!(names(&index, &[1.0, 0.0]).await, vec!["orders"]);
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let index = LanceIndex::open(dir.path(), "schema_store").await.unwrap();
        index.upsert(vec![record("0", "t", vec![1.0, 0.0])]).await.unwrap();

        let result = index.query(&[1.0, 0.0, 0.0], 1).await;
        assert!(matches!(result, Err(Txt2SqlError::Index(_))));
    }
}
