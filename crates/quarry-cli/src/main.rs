//! Quarry CLI - plan and run queries against a site of stores
//!
//! Usage:
//!   quarry plan --store <id> <query>
//!   quarry run --store <id> [--init <file.sql>] <query>
//!   quarry check
//!
//! Examples:
//!   quarry plan --site demos/site.yaml --store books 'filter author.name = "Jane Austen" | order -year'
//!   quarry run --site demos/site.yaml --init demos/library.sql --store books 'range ..3'

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;
mod relations;

use config::Config;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Quarry - delegate query trees to relational stores")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "quarry.yaml")]
    config: PathBuf,

    /// Site definition file, overrides the configuration
    #[arg(short, long, global = true)]
    site: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the statement and residual query a store would get
    Plan {
        /// Store the query runs against
        #[arg(long)]
        store: String,

        #[command(flatten)]
        query: QueryArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Run a query: execute the delegated statement, then the residual in memory
    Run {
        /// Store the query runs against
        #[arg(long)]
        store: String,

        #[command(flatten)]
        query: QueryArgs,

        /// DuckDB database file, overrides the configuration
        #[arg(long)]
        database: Option<PathBuf>,

        /// SQL script run before the query, e.g. to load fixtures
        #[arg(long)]
        init: Option<PathBuf>,
    },

    /// Validate the site definition and list its stores
    Check,
}

#[derive(clap::Args)]
struct QueryArgs {
    /// Query text, or a JSON query tree with --json
    query: String,

    /// Read the query as a JSON query tree
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// SQL, then the residual query
    Text,
    /// One JSON object with both
    Json,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("cannot load {}", cli.config.display()))?;
    if let Some(site) = cli.site {
        config.site = site;
    }

    config.apply_logging_env();
    logging::init()?;

    match cli.command {
        Commands::Plan { store, query, output } => {
            let query = commands::read_query(&query.query, query.json)?;
            commands::plan(&config, &store, &query, output)
        }
        Commands::Run {
            store,
            query,
            database,
            init,
        } => {
            let query = commands::read_query(&query.query, query.json)?;
            if let Some(database) = database {
                config.execution.database = Some(database);
            }
            commands::run(&config, &store, &query, init.as_deref())
        }
        Commands::Check => commands::check(&config),
    }
}
