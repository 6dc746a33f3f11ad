pub mod ddl;
pub mod descriptor;
pub mod index;
pub mod indexer;
pub mod retriever;

pub use ddl::{parse_schema, parse_schema_file, split_statements};
pub use descriptor::TableDescriptor;
pub use index::{IndexRecord, LanceIndex, QueryMatch, RecordMetadata, VectorIndex};
pub use indexer::build_schema_index;
pub use retriever::{format_stanza, SchemaRetriever};
