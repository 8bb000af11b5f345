//! Identity provider: password sign-in and account identities.
//!
//! Production uses the hosted platform's auth API ([`SupabaseAuth`]):
//!
//! - `POST /auth/v1/token?grant_type=password` - sign in (anon key)
//! - `POST /auth/v1/admin/users` - create an identity (service role key)
//! - `DELETE /auth/v1/admin/users/{id}` - delete an identity (service role key)
//!
//! [`MemoryIdentityProvider`] keeps identities in process for tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use futures::FutureExt;
use futures::future::{BoxFuture, ready};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use crate::config::SupabaseConfig;

/// Errors from the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Email/password pair rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An identity with this email already exists.
    #[error("identity already exists")]
    AlreadyExists,

    /// No identity with this id.
    #[error("identity not found")]
    NotFound,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with an unexpected error.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// An identity on the auth platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// Authentication backend used by login and user management.
pub trait IdentityProvider: Send + Sync {
    /// Check an email/password pair.
    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a SecretString,
    ) -> BoxFuture<'a, Result<Identity, IdentityError>>;

    /// Create a confirmed identity.
    fn create_identity<'a>(
        &'a self,
        email: &'a str,
        password: &'a SecretString,
    ) -> BoxFuture<'a, Result<Identity, IdentityError>>;

    /// Delete an identity.
    fn delete_identity(&self, id: Uuid) -> BoxFuture<'_, Result<(), IdentityError>>;
}

// =============================================================================
// Hosted auth API
// =============================================================================

/// Client for the hosted auth API.
#[derive(Clone)]
pub struct SupabaseAuth {
    inner: Arc<SupabaseAuthInner>,
}

struct SupabaseAuthInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    service_role_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    user: Identity,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ErrorBody {
    fn text(self) -> Option<String> {
        self.msg.or(self.message).or(self.error_description)
    }
}

impl SupabaseAuth {
    /// Create a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self {
            inner: Arc::new(SupabaseAuthInner {
                client,
                base_url: config.url.clone(),
                anon_key: config.anon_key.clone(),
                service_role_key: config.service_role_key.clone(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| IdentityError::Parse(format!("invalid auth URL: {e}")))
    }

    fn admin_request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let key = self.inner.service_role_key.expose_secret();
        self.inner
            .client
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(key)
    }

    #[instrument(skip(self, password))]
    async fn password_grant(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.set_query(Some("grant_type=password"));
        let response = self
            .inner
            .client
            .post(url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .json(&serde_json::json!({
                "email": email,
                "password": password.expose_secret(),
            }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body: TokenResponse = response
                    .json()
                    .await
                    .map_err(|e| IdentityError::Parse(format!("token response: {e}")))?;
                Ok(body.user)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                Err(IdentityError::InvalidCredentials)
            }
            _ => Err(parse_error(response).await),
        }
    }

    #[instrument(skip(self, password))]
    async fn create_user(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let url = self.endpoint("auth/v1/admin/users")?;
        let response = self
            .admin_request(reqwest::Method::POST, url)
            .json(&serde_json::json!({
                "email": email,
                "password": password.expose_secret(),
                "email_confirm": true,
            }))
            .send()
            .await?;

        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| IdentityError::Parse(format!("user response: {e}")));
        }
        Err(parse_error(response).await)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityError> {
        let url = self.endpoint(&format!("auth/v1/admin/users/{id}"))?;
        let response = self
            .admin_request(reqwest::Method::DELETE, url)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(parse_error(response).await)
    }
}

/// Map an error response to an [`IdentityError`].
async fn parse_error(response: reqwest::Response) -> IdentityError {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return IdentityError::NotFound;
    }

    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

    // Older auth servers report duplicates with a 422 and no error code.
    let duplicate = matches!(
        body.error_code.as_deref(),
        Some("email_exists" | "user_already_exists")
    ) || (status == StatusCode::UNPROCESSABLE_ENTITY && text.contains("already been registered"));
    if duplicate {
        return IdentityError::AlreadyExists;
    }

    IdentityError::Api {
        status: status.as_u16(),
        message: body.text().unwrap_or(text),
    }
}

impl IdentityProvider for SupabaseAuth {
    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a SecretString,
    ) -> BoxFuture<'a, Result<Identity, IdentityError>> {
        self.password_grant(email, password).boxed()
    }

    fn create_identity<'a>(
        &'a self,
        email: &'a str,
        password: &'a SecretString,
    ) -> BoxFuture<'a, Result<Identity, IdentityError>> {
        self.create_user(email, password).boxed()
    }

    fn delete_identity(&self, id: Uuid) -> BoxFuture<'_, Result<(), IdentityError>> {
        self.delete_user(id).boxed()
    }
}

impl std::fmt::Debug for SupabaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseAuth")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// In-process provider
// =============================================================================

#[derive(Debug)]
struct StoredIdentity {
    id: Uuid,
    password: String,
}

/// Identity provider holding identities in memory, keyed by email.
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    identities: RwLock<HashMap<String, StoredIdentity>>,
}

fn poisoned<T>(_: T) -> IdentityError {
    IdentityError::Parse("identity store lock poisoned".to_owned())
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identity directly and return its id.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::AlreadyExists` if the email is taken.
    pub fn add(&self, email: &str, password: &str) -> Result<Uuid, IdentityError> {
        let mut identities = self.identities.write().map_err(poisoned)?;
        if identities.contains_key(email) {
            return Err(IdentityError::AlreadyExists);
        }
        let id = Uuid::new_v4();
        identities.insert(
            email.to_owned(),
            StoredIdentity {
                id,
                password: password.to_owned(),
            },
        );
        Ok(id)
    }

    /// Whether an identity with this id exists.
    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.identities
            .read()
            .is_ok_and(|identities| identities.values().any(|stored| stored.id == id))
    }

    fn check(&self, email: &str, password: &SecretString) -> Result<Identity, IdentityError> {
        let identities = self.identities.read().map_err(poisoned)?;
        match identities.get(email) {
            Some(stored) if stored.password == password.expose_secret() => Ok(Identity {
                id: stored.id,
                email: email.to_owned(),
            }),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }

    fn remove(&self, id: Uuid) -> Result<(), IdentityError> {
        let mut identities = self.identities.write().map_err(poisoned)?;
        let before = identities.len();
        identities.retain(|_, stored| stored.id != id);
        if identities.len() == before {
            return Err(IdentityError::NotFound);
        }
        Ok(())
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a SecretString,
    ) -> BoxFuture<'a, Result<Identity, IdentityError>> {
        ready(self.check(email, password)).boxed()
    }

    fn create_identity<'a>(
        &'a self,
        email: &'a str,
        password: &'a SecretString,
    ) -> BoxFuture<'a, Result<Identity, IdentityError>> {
        let result = self
            .add(email, password.expose_secret())
            .map(|id| Identity {
                id,
                email: email.to_owned(),
            });
        ready(result).boxed()
    }

    fn delete_identity(&self, id: Uuid) -> BoxFuture<'_, Result<(), IdentityError>> {
        ready(self.remove(id)).boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_provider_sign_in() {
        let provider = MemoryIdentityProvider::new();
        let id = provider.add("chef@formdetoit.fr", "ardoise-2024").unwrap();

        let ok = provider
            .sign_in("chef@formdetoit.fr", &SecretString::from("ardoise-2024"))
            .await
            .unwrap();
        assert_eq!(ok.id, id);

        let bad = provider
            .sign_in("chef@formdetoit.fr", &SecretString::from("tuile"))
            .await;
        assert!(matches!(bad, Err(IdentityError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_memory_provider_delete() {
        let provider = MemoryIdentityProvider::new();
        let id = provider.add("a@formdetoit.fr", "password").unwrap();
        provider.delete_identity(id).await.unwrap();
        assert!(!provider.contains(id));
        assert!(matches!(
            provider.delete_identity(id).await,
            Err(IdentityError::NotFound)
        ));
    }

    #[test]
    fn test_endpoints_join_project_url() {
        let auth = SupabaseAuth::new(&SupabaseConfig {
            url: Url::parse("https://abcd.supabase.co").unwrap(),
            anon_key: SecretString::from("anon"),
            service_role_key: SecretString::from("service"),
        })
        .unwrap();
        assert_eq!(
            auth.endpoint("auth/v1/admin/users").unwrap().as_str(),
            "https://abcd.supabase.co/auth/v1/admin/users"
        );
    }
}
