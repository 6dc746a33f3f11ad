use thiserror::Error;

#[derive(Error, Debug)]
pub enum Txt2SqlError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("vector store error: {0}")]
    VectorStore(#[from] lancedb::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("model provider error: {0}")]
    Provider(String),

    #[error("vector index error: {0}")]
    Index(String),

    #[error("query execution failed: {0}")]
    Execution(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("tracing initialization failed: {0}")]
    Tracing(String),
}

pub type Result<T> = std::result::Result<T, Txt2SqlError>;
