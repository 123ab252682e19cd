//! poi-import - Points-of-interest importer
//!
//! Imports CSV, JSON and XML files into the shared SQLite store and lists
//! what is stored.
//!
//! ```text
//! poi-import import pois.csv pois.json pois.xml
//! poi-import list --category cafe --search harbour
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use poi_common::config::{resolve_database_path, resolve_root_folder, TomlConfig};
use poi_common::db::{init_database, list_pois, PoiFilter};
use poi_import::{ImportOptions, ImportRun, Importer, SqliteGateway};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for poi-import
#[derive(Parser, Debug)]
#[command(name = "poi-import")]
#[command(about = "Import points of interest from CSV, JSON or XML files")]
#[command(version)]
struct Args {
    /// TOML configuration file (also POI_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (also POI_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Folder holding the default database (also POI_ROOT_FOLDER)
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import one or more files; the format follows the extension
    Import {
        /// Files to import, in order
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Do not log per-batch progress
        #[arg(long)]
        no_progress: bool,
    },

    /// List stored points of interest
    List {
        /// Only this category
        #[arg(long)]
        category: Option<String>,

        /// Match id, external id or name
        #[arg(long)]
        search: Option<String>,

        /// Maximum rows to print
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let default_filter = format!(
        "poi_import={level},poi_common={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    let db_path = resolve_database_path(args.database.as_deref(), &root_folder, &config);
    info!("Database: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    match args.command {
        Command::Import { paths, no_progress } => {
            let options = ImportOptions {
                show_progress: config.import.show_progress && !no_progress,
            };
            run_import(pool, paths, options).await
        }
        Command::List {
            category,
            search,
            limit,
        } => {
            let filter = PoiFilter {
                category,
                search,
                limit,
            };
            run_list(&pool, &filter).await
        }
    }
}

/// Import every file, reporting per file; a failed file does not stop the rest
async fn run_import(pool: SqlitePool, paths: Vec<PathBuf>, options: ImportOptions) -> Result<()> {
    let importer = Importer::new(SqliteGateway::new(pool), options);
    let mut run = ImportRun::new();
    let mut failed = 0usize;
    let mut total = 0usize;

    for path in &paths {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match importer.import_file(&mut run, path).await {
            Ok(summary) => {
                total += summary.processed;
                println!(
                    "Imported {} records from {} ({} new, {} updated, {} unchanged, {} skipped)",
                    summary.processed,
                    file_name,
                    summary.inserted,
                    summary.updated,
                    summary.unchanged(),
                    summary.skipped_invalid
                );
            }
            Err(e) => {
                failed += 1;
                error!(file = %path.display(), configuration = e.is_configuration(), "Import failed: {}", e);
                eprintln!("Failed to import {}: {}", path.display(), e);
            }
        }
    }

    println!("Total imported/updated: {}", total);

    if failed > 0 {
        anyhow::bail!("{} of {} files failed to import", failed, paths.len());
    }
    Ok(())
}

async fn run_list(pool: &SqlitePool, filter: &PoiFilter) -> Result<()> {
    let pois = list_pois(pool, filter).await.context("Failed to list records")?;

    println!(
        "{:>8}  {:<32}  {:<20}  {:<16}  {:>10}",
        "ID", "NAME", "EXTERNAL_ID", "CATEGORY", "AVG_RATING"
    );
    for poi in &pois {
        let rating = poi
            .avg_rating
            .map(|r| format!("{:.2}", r))
            .unwrap_or_else(|| "-".to_string());
        let name = if poi.name.is_empty() { "(Unnamed)" } else { poi.name.as_str() };
        println!(
            "{:>8}  {:<32}  {:<20}  {:<16}  {:>10}",
            poi.id, name, poi.external_id, poi.category, rating
        );
    }
    println!("{} record(s)", pois.len());

    Ok(())
}
