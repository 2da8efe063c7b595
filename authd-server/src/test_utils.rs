//! Test fixture for driving the full router in-process.

use crate::clients::{ClientType, OAuthClient, StaticClientRegistry};
use crate::config::AuthdConfig;
use crate::create_app;
use crate::state::AppState;
use crate::store::{memory::MemoryStore, Store};
use axum::body::Body;
use axum::Router;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Complete test environment: in-memory store, seeded client registry and
/// the real application router.
///
/// ```rust
/// let fixture = TestFixture::new().await;
/// let response = fixture
///     .post_form("/token", &[("grant_type", "refresh_token"), ("client_id", "cli-public")])
///     .await;
/// response.assert_status(StatusCode::BAD_REQUEST);
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Configuration the state was built from
    pub config: AuthdConfig,
    /// Handle on the backing store for direct seeding and inspection
    pub store: Store,
}

impl TestFixture {
    /// Fixture with the default test configuration and client catalogue
    pub async fn new() -> Self {
        Self::with_config(AuthdConfig::for_testing()).await
    }

    /// Fixture with a custom configuration and the default client catalogue
    pub async fn with_config(config: AuthdConfig) -> Self {
        let _ = env_logger::builder()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();

        let store = Store::Memory(MemoryStore::new());
        let registry =
            StaticClientRegistry::new(Self::default_clients()).expect("invalid test catalogue");
        let state = AppState::for_testing(&config, store.clone(), Arc::new(registry));
        let app = create_app(state).await;

        Self { app, config, store }
    }

    /// The clients every fixture knows about: one public CLI and one
    /// confidential server-side integration
    pub fn default_clients() -> Vec<OAuthClient> {
        vec![
            OAuthClient {
                client_id: "cli-public".to_string(),
                name: "Example CLI".to_string(),
                client_type: ClientType::Public,
                client_secret: None,
                redirect_uris: vec!["http://127.0.0.1:8912/callback".to_string()],
                allowed_scopes: vec![
                    "documents:read".to_string(),
                    "documents:write".to_string(),
                ],
            },
            OAuthClient {
                client_id: "web-backend".to_string(),
                name: "Web Backend".to_string(),
                client_type: ClientType::Confidential,
                client_secret: Some("s3cret-backend".to_string()),
                redirect_uris: vec!["https://app.example.com/oauth/callback".to_string()],
                allowed_scopes: vec!["documents:read".to_string()],
            },
        ]
    }

    /// Send a GET request
    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri.as_ref())
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Send a form-encoded POST, the content type of the token and
    /// revocation endpoints
    pub async fn post_form(&self, uri: impl AsRef<str>, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri.as_ref())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Send a JSON POST with optional extra headers
    pub async fn post_json<T: Serialize>(
        &self,
        uri: impl AsRef<str>,
        body: &T,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri.as_ref())
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(Body::from(json_body))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// JSON POST to the internal surface with the test API key
    pub async fn post_internal<T: Serialize>(
        &self,
        uri: impl AsRef<str>,
        body: &T,
    ) -> TestResponse {
        let key = format!("Bearer {}", self.config.internal_api_key);
        self.post_json(uri, body, &[("Authorization", &key)]).await
    }

    /// Send a request and collect status, headers and JSON body
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        let json = if !body.is_empty() {
            serde_json::from_slice(&body).unwrap_or_else(|_| serde_json::json!({}))
        } else {
            serde_json::json!({})
        };

        TestResponse {
            status,
            headers,
            json,
        }
    }
}

/// Response from a test request with convenient assertions
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as JSON (empty object if absent or not JSON)
    pub json: Value,
}

impl TestResponse {
    /// Assert the response has the expected status code
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {} with body: {}",
            expected,
            self.status,
            serde_json::to_string_pretty(&self.json).unwrap_or_default()
        );
        self
    }

    /// Assert the response status is OK (200)
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    /// Assert the OAuth error code in the body
    pub fn assert_oauth_error(&self, expected: &str) -> &Self {
        assert_eq!(
            self.json.get("error").and_then(Value::as_str),
            Some(expected),
            "Expected error '{}' in body: {}",
            expected,
            serde_json::to_string_pretty(&self.json).unwrap_or_default()
        );
        self
    }

    /// The Location header of a redirect response
    pub fn location(&self) -> String {
        self.headers
            .get(http::header::LOCATION)
            .expect("Response has no Location header")
            .to_str()
            .expect("Location header is not valid UTF-8")
            .to_string()
    }

    /// Deserialize the response body into the given type
    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("Failed to deserialize response JSON")
    }
}
