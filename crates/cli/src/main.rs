//! Verdant Market CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! verdant migrate
//!
//! # Seed the database with demo content
//! verdant seed
//!
//! # Replace previously seeded content
//! verdant seed --clear
//!
//! # Create an account
//! verdant user create -u jordan -e jordan@example.com -p "long enough" -r editor
//!
//! # Change an account's role
//! verdant user promote -e jordan@example.com -r admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the database with demo catalog, blog, and account data
//! - `user create` / `user promote` - Manage accounts

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "verdant")]
#[command(author, version, about = "Verdant Market CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with demo content
    Seed {
        /// Clear previously seeded catalog and blog data first
        #[arg(long)]
        clear: bool,
    },
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an account with a password
    Create {
        /// Username (letters, digits, '_' and '-')
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Account role (`user`, `editor`, `admin`)
        #[arg(short, long, default_value = "user")]
        role: String,
    },
    /// Change an existing account's role
    Promote {
        /// Email address of the account
        #[arg(short, long)]
        email: String,

        /// Account role (`user`, `editor`, `admin`)
        #[arg(short, long)]
        role: String,
    },
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
        Commands::Seed { clear } => commands::seed::run(clear).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                role,
            } => {
                commands::user::create(&username, &email, &password, &role).await?;
            }
            UserAction::Promote { email, role } => {
                commands::user::promote(&email, &role).await?;
            }
        },
    }
    Ok(())
}
