//! Forkful CLI - Database migrations and operational tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! forkful migrate
//!
//! # Create or replace a promo code worth 10% for 30 days
//! forkful promo create --code WELCOME10 --discount 10 --valid-days 30
//!
//! # Delete expired sessions
//! forkful sessions purge
//! ```
//!
//! All commands read `FORKFUL_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "forkful")]
#[command(author, version, about = "Forkful CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage promo codes
    Promo {
        #[command(subcommand)]
        action: PromoAction,
    },
    /// Manage login sessions
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum PromoAction {
    /// Create a promo code, replacing any existing code with the same name
    Create {
        /// Code customers type at checkout (case-sensitive)
        #[arg(short, long)]
        code: String,

        /// Discount in percent, 0 to 100
        #[arg(short, long)]
        discount: Decimal,

        /// Days from now until the code expires
        #[arg(short, long, default_value_t = 30)]
        valid_days: u32,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Delete every session whose expiry has passed
    Purge,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Promo { action } => match action {
            PromoAction::Create {
                code,
                discount,
                valid_days,
            } => commands::promo::create(&code, discount, valid_days).await?,
        },
        Commands::Sessions { action } => match action {
            SessionAction::Purge => {
                commands::sessions::purge().await?;
            }
        },
    }
    Ok(())
}
