//! Bazaar CLI - Seeding, migrations and user management.
//!
//! # Usage
//!
//! ```bash
//! # Seed the database, applying migrations first
//! bazaar seed --migrate --seed-file data/seed.json
//!
//! # Seed a project in another directory (seed file relative to it)
//! bazaar seed -d ../shop -f data/seed.json
//!
//! # Apply migrations only
//! bazaar migrate
//!
//! # Create a user
//! bazaar user create -e admin@example.com -p 'correct horse' -r admin
//! ```
//!
//! # Commands
//!
//! - `seed` - Import a seed document in one transaction
//! - `migrate` - Run database migrations
//! - `user create` - Create a user through the password-hashing path

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

const DEFAULT_LOG_FILTER: &str = "bazaar=info,bazaar_seed=info,bazaar_cli=info";

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the database from a JSON document
    Seed {
        /// Project directory holding `.env` and relative seed files
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,

        /// Apply migrations before seeding
        #[arg(short, long)]
        migrate: bool,

        /// Path to the seed document
        #[arg(short = 'f', long)]
        seed_file: PathBuf,
    },
    /// Run database migrations
    Migrate {
        /// Project directory holding `.env`
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters); the user cannot log in without one
        #[arg(short, long)]
        password: Option<String>,

        /// First name
        #[arg(long)]
        first_name: Option<String>,

        /// Last name
        #[arg(long)]
        last_name: Option<String>,

        /// Role (`admin`, `member`, `developer`)
        #[arg(short, long, default_value = "member")]
        role: String,

        /// Project directory holding `.env`
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // LOG_FORMAT=json for structured output in CI and containers
    let is_json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let json_layer = is_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Seed {
            directory,
            migrate,
            seed_file,
        } => commands::seed::run(&directory, &seed_file, migrate).await?,
        Commands::Migrate { directory } => commands::migrate::run(&directory).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                password,
                first_name,
                last_name,
                role,
                directory,
            } => {
                commands::user::create(
                    &directory,
                    commands::user::CreateArgs {
                        email,
                        password,
                        first_name,
                        last_name,
                        role,
                    },
                )
                .await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_seed_args() {
        let cli = Cli::try_parse_from(["bazaar", "seed", "--migrate", "-f", "seed.json"]);
        let Ok(Cli {
            command:
                Commands::Seed {
                    directory,
                    migrate,
                    seed_file,
                },
        }) = cli
        else {
            panic!("expected seed command");
        };
        assert_eq!(directory, PathBuf::from("."));
        assert!(migrate);
        assert_eq!(seed_file, PathBuf::from("seed.json"));
    }

    #[test]
    fn test_seed_requires_file() {
        assert!(Cli::try_parse_from(["bazaar", "seed"]).is_err());
    }
}
