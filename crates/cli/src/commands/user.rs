//! Account bootstrap.
//!
//! The back-office can only create accounts for a signed-in user holding
//! `ManageUsers`, so the first account is granted or created from here.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SUPABASE_URL`, `SUPABASE_ANON_KEY`, `SUPABASE_SERVICE_ROLE_KEY` - auth platform
//! - `FDT_ADMIN_PASSWORD` (or `--password-env`) - initial password, `create` only

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use uuid::Uuid;

use formdetoit_admin::actions::{ActionError, IdentityError, PageCache, SupabaseAuth, UserActions};
use formdetoit_admin::config::{ConfigError, SupabaseConfig};
use formdetoit_admin::db::{PgRecordStore, create_pool};
use formdetoit_admin::models::user::{AccountGrant, UserInput};

/// Errors that can occur during account creation.
#[derive(Debug, Error)]
pub enum UserCommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Auth platform error: {0}")]
    Identity(#[from] IdentityError),

    #[error("{0}")]
    Action(#[from] ActionError),
}

fn database_url() -> Result<SecretString, UserCommandError> {
    std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| UserCommandError::MissingEnvVar("DATABASE_URL".to_owned()))
}

/// Create or restore the account row of an existing identity.
///
/// # Errors
///
/// Returns `UserCommandError` if configuration is missing, the profile is
/// invalid, or the email belongs to another account.
pub async fn grant(
    id: Uuid,
    email: &str,
    name: &str,
    roles: Vec<String>,
) -> Result<(), UserCommandError> {
    dotenvy::dotenv().ok();

    let database_url = database_url()?;
    let supabase = SupabaseConfig::from_env()?;
    let identity = SupabaseAuth::new(&supabase)?;

    tracing::info!("Connecting to database...");
    let store = PgRecordStore::new(create_pool(&database_url).await?);
    let cache = PageCache::new(Duration::from_secs(1));

    let user = UserActions::new(&store, &identity, &cache)
        .grant(
            id,
            AccountGrant {
                email: email.to_owned(),
                full_name: name.to_owned(),
                roles,
            },
        )
        .await?;

    tracing::info!(
        "Account granted! ID: {}, Email: {}, Roles: {:?}",
        user.id,
        user.email,
        user.roles
    );
    Ok(())
}

/// Create an account with its identity.
///
/// # Errors
///
/// Returns `UserCommandError` if configuration is missing, the input is
/// invalid, or the email is already taken.
pub async fn create(
    email: &str,
    name: &str,
    roles: Vec<String>,
    password_env: &str,
) -> Result<(), UserCommandError> {
    dotenvy::dotenv().ok();

    let password = std::env::var(password_env)
        .map_err(|_| UserCommandError::MissingEnvVar(password_env.to_owned()))?;
    let database_url = database_url()?;

    let supabase = SupabaseConfig::from_env()?;
    let identity = SupabaseAuth::new(&supabase)?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;
    let store = PgRecordStore::new(pool);
    // Nothing is rendered from here, the cache only satisfies the action API
    let cache = PageCache::new(Duration::from_secs(1));

    let user = UserActions::new(&store, &identity, &cache)
        .create(UserInput {
            email: email.to_owned(),
            full_name: name.to_owned(),
            password,
            roles,
        })
        .await?;

    tracing::info!(
        "Account created! ID: {}, Email: {}, Roles: {:?}",
        user.id,
        user.email,
        user.roles
    );
    Ok(())
}
