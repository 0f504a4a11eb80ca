//! Corner Shop CLI - Database migrations and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! corner-shop-cli migrate
//!
//! # Upsert catalog products from a YAML file
//! corner-shop-cli seed products catalog.yaml
//! ```
//!
//! Both commands read `STOREFRONT_DATABASE_URL` (falling back to
//! `DATABASE_URL`), loading `.env` first when present.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "corner-shop-cli")]
#[command(author, version, about = "Corner Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert catalog products (matched by SKU) from a YAML file
    Products {
        /// Path to the YAML file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => {
                let count = commands::seed::products(&file).await?;
                tracing::info!(count, "Products seeded");
            }
        },
    }
    Ok(())
}
