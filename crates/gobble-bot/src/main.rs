//! Gobble bot: entry point.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use gobble::{CatalogReader, SelectionStrategy};
use gobble_bot::config::{
    resolve_catalog_path, resolve_dataset_api, resolve_dataset_id, resolve_users_path,
};
use gobble_bot::ingest::{ingest, DatasetClient};
use gobble_bot::protocol::ProtocolHandler;
use gobble_bot::session::{GobbleSessionManager, SessionOptions};
use gobble_bot::store::{legacy, UserStore};
use gobble_bot::tools::ToolRegistry;
use gobble_bot::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "gobble-bot",
    about = "Swipe through restaurants one at a time, never seeing a kept one twice",
    version
)]
struct Cli {
    #[command(flatten)]
    stores: StoreArgs,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone, Default)]
struct StoreArgs {
    /// Path to the .gbc catalog file.
    #[arg(short, long, global = true)]
    catalog: Option<String>,

    /// Path to the SQLite user store.
    #[arg(short, long, global = true)]
    users: Option<String>,
}

#[derive(Args, Clone)]
struct SelectionArgs {
    /// How undecided entries are drawn (resample, complement).
    #[arg(long, default_value = "complement")]
    strategy: String,

    /// Fixed RNG seed for reproducible selection.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-RPC over stdio (default).
    Serve {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Download the dataset and rebuild the catalog.
    Ingest {
        /// Dataset id. Also reads GOBBLE_DATASET_ID.
        #[arg(long)]
        dataset_id: Option<String>,

        /// Dataset API base URL. Also reads GOBBLE_DATASET_API.
        #[arg(long)]
        api_base: Option<String>,
    },

    /// Validate the catalog file.
    Validate,

    /// Print server capabilities as JSON.
    Info,

    /// Import or export the two-column user table.
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   gobble-bot completions bash > ~/.local/share/bash-completion/completions/gobble-bot
    ///   gobble-bot completions zsh > ~/.zfunc/_gobble-bot
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Swipe interactively in the terminal.
    Repl {
        /// User id to swipe as.
        #[arg(long, default_value_t = 0)]
        user_id: i64,

        #[command(flatten)]
        selection: SelectionArgs,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// Write `UserId<TAB>Saved Restaurants` rows to stdout.
    Export,
    /// Merge rows from a tab-separated file.
    Import {
        /// File to read.
        file: String,
    },
}

impl SelectionArgs {
    fn options(&self) -> anyhow::Result<SessionOptions> {
        let strategy: SelectionStrategy = self.strategy.parse()?;
        Ok(SessionOptions {
            strategy,
            seed: self.seed,
        })
    }
}

fn open_session(stores: &StoreArgs, selection: &SelectionArgs) -> anyhow::Result<GobbleSessionManager> {
    let catalog_path = resolve_catalog_path(stores.catalog.as_deref());
    let users_path = resolve_users_path(stores.users.as_deref());
    let session = GobbleSessionManager::open(&catalog_path, &users_path, selection.options()?)?;
    Ok(session)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let stores = cli.stores;
    let command = cli.command.unwrap_or(Commands::Serve {
        selection: SelectionArgs {
            strategy: "complement".to_string(),
            seed: None,
        },
    });

    match command {
        Commands::Serve { selection } => {
            let session = open_session(&stores, &selection)?;
            tracing::info!("Gobble bot serving {} entries", session.catalog().len());
            let handler = ProtocolHandler::new(Arc::new(Mutex::new(session)));
            let transport = StdioTransport::new(handler);
            transport.run().await?;
        }

        Commands::Ingest {
            dataset_id,
            api_base,
        } => {
            let dataset_id = resolve_dataset_id(dataset_id.as_deref());
            let api_base = resolve_dataset_api(api_base.as_deref());
            let catalog_path = resolve_catalog_path(stores.catalog.as_deref());

            let client = DatasetClient::new(&api_base);
            let report = ingest(&client, &dataset_id, Path::new(&catalog_path))
                .await
                .with_context(|| format!("Ingesting dataset {dataset_id} failed"))?;
            println!(
                "Ingested {} restaurants into {}",
                report.entries,
                report.path.display()
            );
        }

        Commands::Validate => {
            let catalog_path = resolve_catalog_path(stores.catalog.as_deref());
            match CatalogReader::read_from_file(Path::new(&catalog_path)) {
                Ok(catalog) => {
                    println!("Valid catalog file: {catalog_path}");
                    println!("  Entries:    {}", catalog.len());
                    println!("  Created at: {}", catalog.created_at);
                }
                Err(e) => {
                    eprintln!("Invalid catalog file: {e}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Info => {
            let capabilities = gobble_bot::types::InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Users { action } => {
            let users_path = resolve_users_path(stores.users.as_deref());
            let mut store = UserStore::open(Path::new(&users_path))?;
            match action {
                UsersAction::Export => {
                    let mut stdout = std::io::stdout().lock();
                    let n = legacy::export_table(&mut store, &mut stdout)?;
                    tracing::info!("Exported {n} users");
                }
                UsersAction::Import { file } => {
                    let catalog_path = resolve_catalog_path(stores.catalog.as_deref());
                    let catalog = CatalogReader::read_from_file(Path::new(&catalog_path))
                        .with_context(|| format!("Reading catalog {catalog_path}"))?;
                    let reader = std::io::BufReader::new(
                        std::fs::File::open(&file).with_context(|| format!("Opening {file}"))?,
                    );
                    let report = legacy::import_table(&mut store, reader, catalog.len())?;
                    println!(
                        "Imported {} users ({} saved, {} dropped)",
                        report.users, report.saved, report.dropped
                    );
                }
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "gobble-bot", &mut std::io::stdout());
        }

        Commands::Repl { user_id, selection } => {
            let session = open_session(&stores, &selection)?;
            gobble_bot::repl::run(session, user_id)?;
        }
    }

    Ok(())
}
