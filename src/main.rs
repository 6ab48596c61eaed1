//! Thin CLI entry point (C11): wires config loading (C10) to one
//! indexer run (C7) and prints the resulting [`IndexReport`] as JSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use semantic_index::adapters::embedding::{HashEmbedder, NullEmbeddingProvider, OpenAiEmbedder};
use semantic_index::adapters::parsers::registry::ParserRegistry;
use semantic_index::adapters::vector_store::{FilesystemVectorStore, VectorStoreProvider};
use semantic_index::application::{IndexMode, IndexOptions, Indexer};
use semantic_index::infrastructure::config::ConfigLoader;
use semantic_index::logging::{self, LogFormat};
use semantic_index::ports::embedding::EmbeddingProvider;

#[derive(Parser, Debug)]
#[command(name = "semantic-index", version, about = "Incremental semantic code indexer")]
struct Cli {
    /// Project root to index. Defaults to the current directory.
    #[arg(long, global = true, default_value = ".")]
    project_root: PathBuf,

    /// Collection name. Defaults to the configured `default_collection`.
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Embedding provider to use.
    #[arg(long, global = true, value_enum, default_value_t = EmbeddingProviderArg::Hash)]
    embedder: EmbeddingProviderArg,

    /// Model name for `--embedder openai`.
    #[arg(long, global = true, default_value = "text-embedding-3-small")]
    embedder_model: String,

    /// Emit JSON-formatted log lines instead of pretty ones.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EmbeddingProviderArg {
    /// Deterministic offline embedder (no network calls).
    Hash,
    /// Constant-vector embedder, for tests and smoke runs.
    Null,
    /// OpenAI-compatible HTTP embedder. Reads its API key from
    /// `OPENAI_API_KEY`.
    Openai,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clear the collection (per `--clearing-policy`) and reparse every file.
    Index {
        #[arg(long, value_enum, default_value_t = ClearingPolicyArg::PreserveManual)]
        clearing_policy: ClearingPolicyArg,
    },
    /// Diff the project against the stored state and reparse only the delta.
    Sync,
    /// Re-index exactly one file.
    File {
        /// Path to the file, relative to `--project-root`.
        path: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ClearingPolicyArg {
    None,
    PreserveManual,
    ClearAll,
}

impl From<ClearingPolicyArg> for semantic_index::application::ClearingPolicy {
    fn from(value: ClearingPolicyArg) -> Self {
        match value {
            ClearingPolicyArg::None => Self::None,
            ClearingPolicyArg::PreserveManual => Self::PreserveManual,
            ClearingPolicyArg::ClearAll => Self::ClearAll,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(if cli.json_logs { LogFormat::Json } else { LogFormat::Pretty });

    match run(cli).await {
        Ok(report) => {
            let rendered = serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string());
            println!("{rendered}");
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> semantic_index::domain::Result<semantic_index::application::IndexReport> {
    let config = ConfigLoader::new().load_for_project(&cli.project_root)?;
    let collection = cli.collection.unwrap_or(config.default_collection.clone());

    let state_dir = semantic_index::adapters::vector_store::filesystem::default_state_dir(&cli.project_root);
    let store: Arc<dyn VectorStoreProvider> = Arc::new(FilesystemVectorStore::new(state_dir));

    let embedder: Arc<dyn EmbeddingProvider> = match cli.embedder {
        EmbeddingProviderArg::Hash => Arc::new(HashEmbedder::new()),
        EmbeddingProviderArg::Null => Arc::new(NullEmbeddingProvider::new()),
        EmbeddingProviderArg::Openai => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| semantic_index::domain::IndexError::config("OPENAI_API_KEY must be set to use --embedder openai"))?;
            Arc::new(OpenAiEmbedder::new(api_key, cli.embedder_model, 1536))
        }
    };

    let window_lines = config.project.window_lines_for("plain_text");
    let registry = Arc::new(ParserRegistry::with_defaults(window_lines));
    let indexer = Indexer::new(registry, embedder, store);

    let (mode, clearing_policy) = match cli.command {
        Command::Index { clearing_policy } => (IndexMode::FullRebuild, clearing_policy.into()),
        Command::Sync => (IndexMode::Incremental, semantic_index::application::ClearingPolicy::None),
        Command::File { path } => (IndexMode::SingleFile(path), semantic_index::application::ClearingPolicy::None),
    };

    let cancellation = tokio_util::sync::CancellationToken::new();
    let watch_for_sigint = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("received SIGINT; finishing in-flight files then aborting the run");
            watch_for_sigint.cancel();
        }
    });

    let options = IndexOptions { clearing_policy, cancellation, ..IndexOptions::default() };
    indexer.index(&cli.project_root, &collection, mode, &config.project, options).await
}
