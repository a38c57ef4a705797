use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use hashq::client::Client;
use hashq::config::{
    CacheMode, ListingMode, ServerConfig, ShutdownMode, DEFAULT_CHANNEL_PATH, DEFAULT_REPLY_DIR,
    DEFAULT_WORKERS,
};
use hashq::server::Server;
use hashq::shutdown::install_shutdown_handler;
use hashq::HashqError;

#[derive(Parser, Debug)]
#[command(name = "hashq")]
#[command(version)]
#[command(about = "A shortest-job-first file hashing server over named pipes")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the hashing server
    Server(ServerArgs),

    /// Ask the server for a file's SHA-256
    Hash {
        /// File to hash
        file: PathBuf,

        #[command(flatten)]
        client: ClientArgs,
    },

    /// Print the server's cache contents
    Cache {
        #[command(flatten)]
        client: ClientArgs,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Path of the public request FIFO
    #[arg(long, default_value = DEFAULT_CHANNEL_PATH)]
    channel: PathBuf,

    /// Number of worker threads
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Whether concurrent misses for one path may both be cached
    #[arg(long, value_enum, default_value_t = CacheMode::AllowDuplicates)]
    cache_mode: CacheMode,

    /// Whether the cache lock is held while a listing is written
    #[arg(long, value_enum, default_value_t = ListingMode::HoldLock)]
    listing: ListingMode,

    /// What to do with queued jobs on SIGINT/SIGTERM
    #[arg(long, value_enum, default_value_t = ShutdownMode::Immediate)]
    shutdown: ShutdownMode,
}

// =============================================================================
// Client Arguments (shared by hash and cache commands)
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Path of the server's public request FIFO
    #[arg(long, default_value = DEFAULT_CHANNEL_PATH)]
    channel: PathBuf,

    /// Directory to create the private reply FIFO in
    #[arg(long, default_value = DEFAULT_REPLY_DIR)]
    reply_dir: PathBuf,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

impl ClientArgs {
    fn client(&self) -> Client {
        Client::new(&self.channel, &self.reply_dir)
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct HashOutput {
    file: String,
    status: String,
    from_cache: bool,
    hash: String,
}

#[derive(Serialize)]
struct CacheOutput {
    lines: Vec<String>,
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::new(args.channel)
        .with_workers(args.workers)
        .with_cache_mode(args.cache_mode)
        .with_listing_mode(args.listing)
        .with_shutdown_mode(args.shutdown);
    config.validate()?;

    tracing::info!(
        channel = %config.channel_path.display(),
        workers = config.workers,
        "Starting hashq server"
    );

    let shutdown = install_shutdown_handler()?;
    Server::new(config).run(shutdown).await?;

    Ok(())
}

// =============================================================================
// Client Command Handlers
// =============================================================================

async fn handle_hash(
    client: &Client,
    file: PathBuf,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = match client.hash_file(&file).await {
        Ok(response) => response,
        Err(HashqError::TransportUnavailable(channel)) => {
            eprintln!("Error: the server does not appear to be running.");
            eprintln!("Hint: start it with `hashq server --channel {}`", channel.display());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    match output_format {
        OutputFormat::Json => {
            let output = HashOutput {
                file: file.display().to_string(),
                status: response.status.to_string(),
                from_cache: response.from_cache,
                hash: response.hash,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            let tag = if response.from_cache {
                "[cache hit]"
            } else {
                "[computed]"
            };
            println!("{} SHA256: {}", tag, response.hash);
        }
    }
    Ok(())
}

async fn handle_cache(
    client: &Client,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let lines = client.query_cache().await?;

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&CacheOutput { lines })?);
        }
        OutputFormat::Table => {
            for line in lines {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => {
            run_server(server_args).await?;
            // Workers may still be blocked on a digest or a reply channel;
            // they are abandoned rather than waited for.
            std::process::exit(0);
        }
        Commands::Hash { file, client } => {
            handle_hash(&client.client(), file, &client.output).await?;
        }
        Commands::Cache { client } => {
            handle_cache(&client.client(), &client.output).await?;
        }
    }

    Ok(())
}
