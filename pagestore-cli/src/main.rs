//! pagestore CLI - drive a page store from the shell
//!
//! Every subcommand opens the store (creating the pages table if needed),
//! runs one operation and prints its result as JSON on stdout.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pagestore_core::{PageStore, StoreConfig};
use tracing::debug;

mod output;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "pagestore",
    author,
    version,
    about = "Create, read, update and delete wiki pages in a SQL-backed page store"
)]
struct Cli {
    /// Path to a TOML config file (default: ./pagestore.toml, then ~/.pagestore/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Database URL (sqlite://... or postgres://...), overrides config
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the pages table if it does not exist
    Init,
    /// List page names in ascending order
    List,
    /// Fetch a page's raw markdown by name
    Get {
        /// Page name
        name: String,
    },
    /// Fetch a page by numeric id
    Show {
        /// Page id
        id: i64,
    },
    /// Create a new page
    Create {
        /// Page name
        name: String,
        #[command(flatten)]
        body: BodyArgs,
    },
    /// Replace a page's markdown
    Save {
        /// Page id
        id: i64,
        #[command(flatten)]
        body: BodyArgs,
    },
    /// Delete a page by id (unknown ids are a no-op)
    Delete {
        /// Page id
        id: i64,
    },
    /// Dump every page (id, name, content) in storage order
    Dump,
    /// Print the resolved configuration as TOML
    Config,
}

#[derive(Args, Debug)]
struct BodyArgs {
    /// Markdown content (reads stdin when neither this nor --file is given)
    markdown: Option<String>,

    /// Read markdown from a file
    #[arg(long, short = 'f', conflicts_with = "markdown")]
    file: Option<PathBuf>,
}

impl BodyArgs {
    fn read(self) -> Result<String> {
        match (self.markdown, self.file) {
            (Some(markdown), _) => Ok(markdown),
            (None, Some(path)) => std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display())),
            (None, None) => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read markdown from stdin")?;
                Ok(buf)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug })?;

    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded .env from {}", path.display());
    }

    let mut config = StoreConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    if let Commands::Config = cli.command {
        print!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to render config")?
        );
        return Ok(());
    }

    let store = PageStore::connect(&config)
        .await
        .with_context(|| format!("Failed to open page store at {}", config.database_url))?;

    let result = run(&store, cli.command).await;
    store.close().await;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}

async fn run(store: &PageStore, command: Commands) -> Result<serde_json::Value> {
    let value = match command {
        Commands::Init => {
            store.create_table().await?;
            output::ok()
        }
        Commands::List => serde_json::to_value(store.list_page_names().await?)?,
        Commands::Get { name } => output::lookup(store.fetch_page(name).await?)?,
        Commands::Show { id } => output::lookup(store.fetch_page_by_id(id).await?)?,
        Commands::Create { name, body } => {
            store.create_page(name, body.read()?).await?;
            output::ok()
        }
        Commands::Save { id, body } => {
            store.save_page(id, body.read()?).await?;
            output::ok()
        }
        Commands::Delete { id } => {
            store.delete_page(id).await?;
            output::ok()
        }
        Commands::Dump => serde_json::to_value(store.fetch_all_pages_data().await?)?,
        Commands::Config => anyhow::bail!("config is printed without opening the store"),
    };
    Ok(value)
}
