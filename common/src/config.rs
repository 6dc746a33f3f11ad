use crate::error::{Result, Txt2SqlError};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_INDEX_DIR: &str = "chroma_store";
pub const DEFAULT_COLLECTION: &str = "schema_store";
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_AGENT_MAX_TURNS: usize = 10;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// model provider connection settings
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub dbname: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MysqlSettings {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

/// where generated queries are executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseSettings {
    Sqlite { path: PathBuf },
    Postgres(PostgresSettings),
    PostgresUrl(String),
    Mysql(MysqlSettings),
    MysqlUrl(String),
}

impl DatabaseSettings {
    /// interpret a database url: `postgres://` / `postgresql://` urls select postgres,
    /// `mysql://` selects mysql, anything else is treated as a sqlite file path
    /// (an optional `sqlite://` prefix is dropped)
    pub fn from_url(url: &str) -> Self {
        let url = url.trim();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return DatabaseSettings::PostgresUrl(url.to_string());
        }
        if url.starts_with("mysql://") {
            return DatabaseSettings::MysqlUrl(url.to_string());
        }

        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        DatabaseSettings::Sqlite {
            path: PathBuf::from(path),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub index_dir: PathBuf,
    pub collection: String,
    pub top_k: usize,
    pub agent_max_turns: usize,
    pub database: Option<DatabaseSettings>,
}

/// load a `.env` file from the working directory if one exists
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("ignoring unreadable .env file: {}", e),
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env_string(name) {
        Some(v) => v.trim().parse::<T>().map_err(|_| {
            Txt2SqlError::Config(format!("invalid {}={:?}", name, v))
        }),
        None => Ok(default),
    }
}

/// an explicit url wins, then `MYSQL_*`, then the libpq `PG*` variables
fn database_from_env() -> Result<Option<DatabaseSettings>> {
    if let Some(url) = env_string("TXT2SQL_DATABASE_URL") {
        return Ok(Some(DatabaseSettings::from_url(&url)));
    }

    if let Some(host) = env_string("MYSQL_HOST") {
        return Ok(Some(DatabaseSettings::Mysql(MysqlSettings {
            host,
            port: env_parse("MYSQL_PORT", DEFAULT_MYSQL_PORT)?,
            user: env_string("MYSQL_USER"),
            password: env_string("MYSQL_PASSWORD"),
            database: env_string("MYSQL_DATABASE"),
        })));
    }

    if let Some(host) = env_string("PGHOST") {
        return Ok(Some(DatabaseSettings::Postgres(PostgresSettings {
            host,
            port: env_parse("PGPORT", DEFAULT_POSTGRES_PORT)?,
            user: env_string("PGUSER").unwrap_or_else(|| "postgres".to_string()),
            password: env_string("PGPASSWORD"),
            dbname: env_string("PGDATABASE").unwrap_or_else(|| "postgres".to_string()),
        })));
    }

    Ok(None)
}

impl Settings {
    /// read settings from the process environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let provider = ProviderSettings {
            api_key: env_string("OPENAI_API_KEY"),
            base_url: env_string("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            chat_model: env_string("TXT2SQL_CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: env_string("TXT2SQL_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            timeout_secs: env_parse("TXT2SQL_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
        };

        let database = database_from_env()?;

        Ok(Self {
            provider,
            index_dir: env_string("TXT2SQL_INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_DIR)),
            collection: env_string("TXT2SQL_COLLECTION")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            top_k: env_parse("TXT2SQL_TOP_K", DEFAULT_TOP_K)?.max(1),
            agent_max_turns: env_parse("TXT2SQL_AGENT_MAX_TURNS", DEFAULT_AGENT_MAX_TURNS)?.max(1),
            database,
        })
    }

    pub fn require_database(&self) -> Result<&DatabaseSettings> {
        self.database.as_ref().ok_or_else(|| {
            Txt2SqlError::Config(
                "no database configured (set TXT2SQL_DATABASE_URL, MYSQL_HOST or PGHOST)".to_string(),
            )
        })
    }
}
