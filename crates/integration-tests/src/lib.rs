//! Integration test harness for the FormDeToit server.
//!
//! Each [`TestContext`] serves the full router on an ephemeral port, over an
//! in-memory record store, an in-memory identity provider and an in-memory
//! session store. Requests go through a real HTTP client with a cookie jar.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p formdetoit-integration-tests
//!
//! # Postgres-backed store tests (ignored by default)
//! TEST_DATABASE_URL=postgres://... cargo test -p formdetoit-integration-tests -- --ignored
//! ```

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower_sessions::MemoryStore;
use url::Url;

use formdetoit_admin::actions::MemoryIdentityProvider;
use formdetoit_admin::config::{AppConfig, SupabaseConfig};
use formdetoit_admin::db::MemoryRecordStore;
use formdetoit_admin::middleware::create_session_layer;
use formdetoit_admin::models::User;
use formdetoit_admin::models::user::UserInput;
use formdetoit_admin::routes;
use formdetoit_admin::state::AppState;

/// Password given to every account created by the harness.
pub const TEST_PASSWORD: &str = "tuiles-et-ardoises";

/// Configuration that never reaches the network.
#[must_use]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: SecretString::from("postgres://unused@localhost/unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: Url::parse("http://localhost:3000").expect("valid url"),
        supabase: SupabaseConfig {
            url: Url::parse("http://localhost:54321").expect("valid url"),
            anon_key: SecretString::from("unused"),
            service_role_key: SecretString::from("unused"),
        },
        page_cache_ttl: Duration::from_secs(300),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    }
}

/// A running server plus a client holding its cookies.
pub struct TestContext {
    pub base_url: String,
    pub client: Client,
    pub state: AppState,
    pub identity: Arc<MemoryIdentityProvider>,
}

/// A client that keeps cookies and does not follow redirects.
#[must_use]
pub fn new_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

impl TestContext {
    /// Start a server over empty in-memory backends.
    pub async fn new() -> Self {
        let identity = Arc::new(MemoryIdentityProvider::new());
        let state = AppState::new(
            test_config(),
            Arc::new(MemoryRecordStore::new()),
            identity.clone(),
        );

        let app = routes::router(state.clone())
            .layer(create_session_layer(MemoryStore::default(), false));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server error");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: new_client(),
            state,
            identity,
        }
    }

    /// Start a server and sign the client in with an account holding `roles`.
    pub async fn signed_in(roles: &[&str]) -> (Self, User) {
        let ctx = Self::new().await;
        let user = ctx.create_user("direction@formdetoit.fr", roles).await;
        let response = ctx.login(&ctx.client, &user.email, TEST_PASSWORD).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        (ctx, user)
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Create an account directly through the actions.
    pub async fn create_user(&self, email: &str, roles: &[&str]) -> User {
        self.state
            .users()
            .create(UserInput {
                email: email.to_owned(),
                full_name: email.split('@').next().unwrap_or(email).to_owned(),
                password: TEST_PASSWORD.to_owned(),
                roles: roles.iter().map(|r| (*r).to_owned()).collect(),
            })
            .await
            .expect("Failed to create test user")
    }

    /// Post the login form with `client`.
    pub async fn login(&self, client: &Client, email: &str, password: &str) -> Response {
        client
            .post(self.url("/auth/login"))
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .expect("Failed to post login form")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST failed")
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT failed")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE failed")
    }

    /// Create a record through the API and return its JSON.
    pub async fn create(&self, resource: &str, body: &Value) -> Value {
        let response = self
            .post_json(&format!("/api/admin/{resource}"), body)
            .await;
        assert_eq!(response.status(), StatusCode::OK, "create {resource}");
        response.json().await.expect("record JSON")
    }
}

/// Read a response body as JSON.
pub async fn json_body(response: Response) -> Value {
    response.json().await.expect("JSON body")
}

/// The `id` field of a record as a string.
#[must_use]
pub fn id_of(record: &Value) -> String {
    record["id"].as_str().expect("record id").to_owned()
}

/// Minimal valid team member body.
#[must_use]
pub fn team_member(name: &str) -> Value {
    json!({ "full_name": name, "job_title": "Couvreur" })
}
