//! FormDeToit CLI - Database migrations and account bootstrap.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! fdt-cli migrate
//!
//! # Give an identity created on the auth platform its first roles
//! fdt-cli user grant --id 6f1c... -e direction@formdetoit.fr -n "Direction" -r super_admin
//!
//! # Create identity and account together (password read from FDT_ADMIN_PASSWORD)
//! fdt-cli user create -e direction@formdetoit.fr -n "Direction" -r super_admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user grant` - Create or restore the account row of an existing identity
//! - `user create` - Create an account on the auth platform and in the database

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "fdt-cli")]
#[command(author, version, about = "FormDeToit CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage back-office accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Attach a profile and roles to an existing identity
    Grant {
        /// Identity id on the auth platform
        #[arg(long)]
        id: Uuid,

        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role, repeatable
        #[arg(short, long = "role", required = true)]
        roles: Vec<String>,
    },
    /// Create a new account
    Create {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role, repeatable (`super_admin`, `admin`, `editor`, `recruiter`, `seo`)
        #[arg(short, long = "role", default_value = "super_admin")]
        roles: Vec<String>,

        /// Environment variable holding the initial password
        #[arg(long, default_value = "FDT_ADMIN_PASSWORD")]
        password_env: String,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::User { action } => match action {
            UserAction::Grant {
                id,
                email,
                name,
                roles,
            } => {
                commands::user::grant(id, &email, &name, roles).await?;
            }
            UserAction::Create {
                email,
                name,
                roles,
                password_env,
            } => {
                commands::user::create(&email, &name, roles, &password_env).await?;
            }
        },
    }
    Ok(())
}
