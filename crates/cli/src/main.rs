//! Shopfront CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations (including the session table)
//! shop-cli migrate
//!
//! # Load products from a YAML file
//! shop-cli seed products fixtures/products.yaml
//!
//! # Delete guest carts whose session has expired
//! shop-cli carts purge-expired
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed products` - Insert or update catalog products
//! - `carts purge-expired` - Remove expired guest carts

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shop-cli")]
#[command(author, version, about = "Shopfront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Cart maintenance
    Carts {
        #[command(subcommand)]
        action: CartsAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert or update products from a YAML file
    Products {
        /// Path to the YAML product list
        file: String,
    },
}

#[derive(Subcommand)]
enum CartsAction {
    /// Delete guest carts whose session has expired
    PurgeExpired,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => commands::seed::products(&file).await?,
        },
        Commands::Carts { action } => match action {
            CartsAction::PurgeExpired => commands::carts::purge_expired().await?,
        },
    }
    Ok(())
}
