use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use common::agent::{AgentOrchestrator, SqlGenerator, SqlTools};
use common::config::{load_dotenv, DatabaseSettings, Settings};
use common::llm::OpenAiClient;
use common::schema::{build_schema_index, parse_schema_file, LanceIndex, SchemaRetriever, VectorIndex};
use common::sql::connect_executor;
use common::tracing::init_tracing;
use common::{Orchestrator, Pipeline};
use std::path::PathBuf;
use std::sync::Arc;

use crate::render::{render_artifact, OutputFormat};

#[derive(Parser)]
#[command(name = "txt2sql")]
#[command(about = "ask questions of a database in plain language", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Directory holding the schema vector index
    #[arg(long, global = true, env = "TXT2SQL_INDEX_DIR")]
    index_dir: Option<PathBuf>,

    /// Collection name inside the index directory
    #[arg(long, global = true, env = "TXT2SQL_COLLECTION")]
    collection: Option<String>,
}

#[derive(Args)]
struct QueryArgs {
    /// Let the model drive the tools instead of the fixed pipeline
    #[arg(long, default_value = "false")]
    agent: bool,

    /// Number of tables retrieved as schema context
    #[arg(long, env = "TXT2SQL_TOP_K")]
    top_k: Option<usize>,

    /// Database to query: sqlite file path, postgres:// or mysql:// url
    #[arg(long, env = "TXT2SQL_DATABASE_URL")]
    database_url: Option<String>,

    /// How result rows are printed
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tables and columns found in a DDL file
    Parse {
        /// DDL file with CREATE TABLE statements
        #[arg(short, long, default_value = "schema.sql")]
        schema: PathBuf,
    },

    /// Embed table descriptions from a DDL file into the vector index
    Index {
        /// DDL file with CREATE TABLE statements
        #[arg(short, long, default_value = "schema.sql")]
        schema: PathBuf,
    },

    /// Answer a single question
    Ask {
        /// The question, in plain language
        question: String,

        #[command(flatten)]
        query: QueryArgs,

        /// Also write the result rows to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Answer questions interactively until EOF
    Repl {
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Pipeline,
    Agent,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        load_dotenv();
        let _guard = init_tracing("txt2sql")?;

        let mut settings = Settings::from_env()?;
        if let Some(dir) = self.store.index_dir {
            settings.index_dir = dir;
        }
        if let Some(collection) = self.store.collection {
            settings.collection = collection;
        }

        match self.command {
            Commands::Parse { schema } => parse(schema),
            Commands::Index { schema } => index(&settings, schema).await,
            Commands::Ask {
                question,
                query,
                csv,
            } => ask(settings, query, &question, csv).await,
            Commands::Repl { query } => repl(settings, query).await,
        }
    }
}

fn parse(schema: PathBuf) -> Result<()> {
    let tables = parse_schema_file(&schema)
        .with_context(|| format!("failed to read {}", schema.display()))?;
    println!("{}", serde_json::to_string_pretty(&tables)?);
    Ok(())
}

async fn index(settings: &Settings, schema: PathBuf) -> Result<()> {
    let tables = parse_schema_file(&schema)
        .with_context(|| format!("failed to read {}", schema.display()))?;
    tracing::info!("parsed {} tables from {}", tables.len(), schema.display());

    let client = OpenAiClient::from_settings(&settings.provider)?;
    let index = LanceIndex::open(&settings.index_dir, &settings.collection).await?;

    let count = build_schema_index(&client, &index, &tables).await?;
    tracing::info!(
        indexed = count,
        path = %index.path().display(),
        "schema successfully indexed"
    );
    Ok(())
}

fn apply_query_args(settings: &mut Settings, query: &QueryArgs) -> Mode {
    if let Some(k) = query.top_k {
        settings.top_k = k.max(1);
    }
    if let Some(url) = &query.database_url {
        settings.database = Some(DatabaseSettings::from_url(url));
    }
    if query.agent {
        Mode::Agent
    } else {
        Mode::Pipeline
    }
}

async fn build_orchestrator(settings: &Settings, mode: Mode) -> Result<Box<dyn Orchestrator>> {
    let client = Arc::new(OpenAiClient::from_settings(&settings.provider)?);
    let index = Arc::new(LanceIndex::open(&settings.index_dir, &settings.collection).await?);

    if index.count().await? == 0 {
        tracing::warn!(
            "vector index at {} is empty; run `txt2sql index` first",
            index.path().display()
        );
    }

    let retriever = Arc::new(SchemaRetriever::new(client.clone(), index, settings.top_k));
    let executor = connect_executor(settings.require_database()?)?;

    Ok(match mode {
        Mode::Pipeline => Box::new(Pipeline::new(
            retriever,
            SqlGenerator::new(client),
            executor,
        )),
        Mode::Agent => Box::new(AgentOrchestrator::new(
            client,
            SqlTools::new(retriever, executor),
            settings.agent_max_turns,
        )),
    })
}

async fn ask(mut settings: Settings, query: QueryArgs, question: &str, csv: Option<PathBuf>) -> Result<()> {
    let mode = apply_query_args(&mut settings, &query);
    let orchestrator = build_orchestrator(&settings, mode).await?;

    let artifact = orchestrator.answer_question(question).await?;
    print!("{}", render_artifact(&artifact, query.format)?);

    if let (Some(path), Some(table)) = (csv, &artifact.result) {
        let file = std::fs::File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        table.write_csv(file)?;
        tracing::info!("wrote {} rows to {}", table.row_count(), path.display());
    }

    Ok(())
}

async fn repl(mut settings: Settings, query: QueryArgs) -> Result<()> {
    use rustyline::error::ReadlineError;

    let mode = apply_query_args(&mut settings, &query);
    let orchestrator = build_orchestrator(&settings, mode).await?;
    let mut editor = rustyline::DefaultEditor::new()?;

    println!("ask a question about your data (ctrl-d to quit)");

    loop {
        let line = match editor.readline("txt2sql> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }
        let _ = editor.add_history_entry(question);

        // a failed question is reported and the session carries on
        match orchestrator.answer_question(question).await {
            Ok(artifact) => match render_artifact(&artifact, query.format) {
                Ok(text) => print!("{}", text),
                Err(e) => eprintln!("error: {:#}", e),
            },
            Err(e) => {
                tracing::error!("question failed: {}", e);
                eprintln!("error: {}", e);
            }
        }
    }

    Ok(())
}
