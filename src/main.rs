//! docchat CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use docchat::{
    chat::ChatOptions,
    commands::{
        cmd_build, cmd_chat, cmd_init, cmd_search, cmd_status, print_build_stats,
        print_chat_outcome, print_init, print_search_results, print_status,
    },
    config::Config,
    embed::create_embedder,
    error::Result,
    generate::HttpGenerator,
    index::IndexOptions,
    meta::MetaDb,
    progress::LogWriterFactory,
    registry::HttpRegistry,
    rerank::{create_reranker, Reranker},
    store::QdrantIndex,
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docchat")]
#[command(version, about = "Document-grounded chat assistant core", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize docchat configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Rebuild the vector index from registered documents
    Build {
        /// Maximum number of documents to list from the registry
        #[arg(long)]
        limit: Option<usize>,

        /// Re-embed documents that are already indexed
        #[arg(long)]
        force_reindex: bool,
    },

    /// Query the index for relevant document chunks
    Search {
        /// The search question
        question: String,

        /// Number of results after reranking
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Send one chat message and print the grounded reply
    Chat {
        /// User id on whose behalf the question is asked
        #[arg(short, long)]
        user: i64,

        /// Existing chat id to continue (a new chat is created when absent)
        #[arg(long)]
        chat: Option<i64>,

        /// Number of context chunks
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// The message text
        message: String,
    },

    /// Show index and database status
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // Init works without an existing config
    if let Commands::Init { force } = &cli.command {
        let config = cmd_init(cli.config.as_deref(), *force).await?;
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "config": config.paths.config_file.display().to_string() })
            );
        } else {
            print_init(&config);
        }
        return Ok(());
    }

    // Completions need no config either
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "docchat", &mut std::io::stdout());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;

    let db = MetaDb::connect(&config.paths.db_file).await?;
    let index = QdrantIndex::new(
        &config.qdrant_url,
        &config.collection_name,
        config.embedding.resolved_dimension(),
    )?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Build {
            limit,
            force_reindex,
        } => {
            let registry = HttpRegistry::new(&config.registry)?;
            let embedder = create_embedder(&config.embedding)?;

            let stats = cmd_build(
                &config,
                &db,
                &registry,
                embedder.as_ref(),
                &index,
                IndexOptions {
                    limit,
                    force_reindex,
                },
            )
            .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_build_stats(&stats);
            }
        }

        Commands::Search { question, top_k } => {
            let embedder = create_embedder(&config.embedding)?;
            let reranker = build_reranker(&config)?;

            let outcome = cmd_search(
                &config,
                embedder.as_ref(),
                reranker.as_deref(),
                &index,
                &question,
                top_k,
            )
            .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_search_results(&outcome);
            }
        }

        Commands::Chat {
            user,
            chat,
            top_k,
            message,
        } => {
            let embedder = create_embedder(&config.embedding)?;
            let reranker = build_reranker(&config)?;
            let generator = HttpGenerator::new(&config.generation)?;

            let outcome = cmd_chat(
                &config,
                &db,
                embedder.as_ref(),
                reranker.as_deref(),
                &index,
                &generator,
                user,
                &message,
                ChatOptions {
                    chat_id: chat,
                    top_k,
                },
            )
            .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_chat_outcome(&outcome);
            }
        }

        Commands::Status => {
            let status = cmd_status(&config, &db, &index).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}

fn build_reranker(config: &Config) -> Result<Option<Box<dyn Reranker>>> {
    if !config.reranker.enabled {
        return Ok(None);
    }
    Ok(Some(create_reranker(&config.reranker)?))
}
