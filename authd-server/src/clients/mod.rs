//! Registered OAuth client catalogue and validation rules.
//!
//! Clients are looked up through the `ClientRepository` trait so the static,
//! configuration-loaded registry used today can be swapped for a dynamic
//! store without touching the endpoints.

use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use subtle::ConstantTimeEq;
use thiserror::Error;
use utoipa::ToSchema;

/// Errors raised while loading the client catalogue
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read clients file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse clients file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("Invalid client entry '{client_id}': {reason}")]
    InvalidClient { client_id: String, reason: String },
}

/// Whether a client can hold a secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// CLI, desktop, mobile or browser-based app; authenticates via PKCE alone
    Public,
    /// Server-side integration able to hold a secret
    Confidential,
}

/// A registered OAuth client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    /// Unique client identifier
    pub client_id: String,
    /// Human-readable name, shown to the user by the login UI
    pub name: String,
    /// Public or confidential
    pub client_type: ClientType,
    /// Secret, present only for confidential clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Closed set of redirect URIs; matching is exact string comparison
    pub redirect_uris: Vec<String>,
    /// Scopes this client may request
    pub allowed_scopes: Vec<String>,
}

impl OAuthClient {
    /// Exact-match membership test. No prefix matching, no wildcard, no
    /// trailing-slash normalization: `https://a/cb` and `https://a/cb/` are
    /// different URIs.
    pub fn redirect_uri_registered(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.iter().any(|uri| uri == redirect_uri)
    }

    /// Every requested scope must be in the client's allowed set
    pub fn scopes_allowed(&self, requested: &str) -> bool {
        requested
            .split_whitespace()
            .all(|scope| self.allowed_scopes.iter().any(|allowed| allowed == scope))
    }

    /// Verify a presented client secret.
    ///
    /// Public clients never authenticate with a secret, so anything presented
    /// is ignored. Confidential clients must present the exact secret; the
    /// comparison is constant-time so it leaks no prefix information.
    pub fn verify_secret(&self, presented: Option<&str>) -> bool {
        match self.client_type {
            ClientType::Public => true,
            ClientType::Confidential => match (&self.client_secret, presented) {
                (Some(stored), Some(given)) => {
                    bool::from(stored.as_bytes().ct_eq(given.as_bytes()))
                }
                _ => false,
            },
        }
    }
}

/// Lookup contract for registered clients
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn lookup(&self, client_id: &str) -> Option<OAuthClient>;

    /// Union of all registered clients' allowed scopes, for the discovery
    /// document
    async fn all_scopes(&self) -> Vec<String>;
}

/// Static registry backed by configuration, the default `ClientRepository`
pub struct StaticClientRegistry {
    clients: HashMap<String, OAuthClient>,
}

impl StaticClientRegistry {
    pub fn new(clients: Vec<OAuthClient>) -> Result<Self, RegistryError> {
        let mut map = HashMap::with_capacity(clients.len());
        for client in clients {
            Self::validate(&client)?;
            if map.insert(client.client_id.clone(), client).is_some() {
                warn!("Duplicate client_id in catalogue; keeping the last entry");
            }
        }
        Ok(Self { clients: map })
    }

    /// Load the catalogue from a JSON file (an array of client entries).
    /// An empty path yields an empty registry, which rejects every request.
    pub fn from_file(path: &str) -> Result<Self, RegistryError> {
        if path.is_empty() {
            warn!("No clients file configured; the client catalogue is empty");
            return Self::new(Vec::new());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_string(),
            source,
        })?;
        let clients: Vec<OAuthClient> =
            serde_json::from_str(&raw).map_err(|source| RegistryError::Parse {
                path: path.to_string(),
                source,
            })?;
        info!("Loaded {} registered clients from {}", clients.len(), path);
        Self::new(clients)
    }

    fn validate(client: &OAuthClient) -> Result<(), RegistryError> {
        if client.client_id.is_empty() {
            return Err(RegistryError::InvalidClient {
                client_id: "<empty>".to_string(),
                reason: "client_id must not be empty".to_string(),
            });
        }
        if client.redirect_uris.is_empty() {
            return Err(RegistryError::InvalidClient {
                client_id: client.client_id.clone(),
                reason: "at least one redirect URI is required".to_string(),
            });
        }
        if client.client_type == ClientType::Confidential && client.client_secret.is_none() {
            return Err(RegistryError::InvalidClient {
                client_id: client.client_id.clone(),
                reason: "confidential clients require a secret".to_string(),
            });
        }
        if client.client_type == ClientType::Public && client.client_secret.is_some() {
            return Err(RegistryError::InvalidClient {
                client_id: client.client_id.clone(),
                reason: "public clients must not carry a secret".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ClientRepository for StaticClientRegistry {
    async fn lookup(&self, client_id: &str) -> Option<OAuthClient> {
        self.clients.get(client_id).cloned()
    }

    async fn all_scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = self
            .clients
            .values()
            .flat_map(|client| client.allowed_scopes.iter().cloned())
            .collect();
        scopes.sort();
        scopes.dedup();
        scopes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public_client() -> OAuthClient {
        OAuthClient {
            client_id: "cli-public".to_string(),
            name: "Example CLI".to_string(),
            client_type: ClientType::Public,
            client_secret: None,
            redirect_uris: vec!["http://127.0.0.1:8912/callback".to_string()],
            allowed_scopes: vec!["documents:read".to_string(), "documents:write".to_string()],
        }
    }

    fn confidential_client() -> OAuthClient {
        OAuthClient {
            client_id: "web-backend".to_string(),
            name: "Web Backend".to_string(),
            client_type: ClientType::Confidential,
            client_secret: Some("s3cret-backend".to_string()),
            redirect_uris: vec!["https://app.example.com/oauth/callback".to_string()],
            allowed_scopes: vec!["documents:read".to_string()],
        }
    }

    #[tokio::test]
    async fn test_lookup() {
        let registry = StaticClientRegistry::new(vec![public_client()]).unwrap();
        assert!(registry.lookup("cli-public").await.is_some());
        assert!(registry.lookup("unknown").await.is_none());
    }

    #[test]
    fn test_redirect_uri_exact_match_only() {
        let client = public_client();
        assert!(client.redirect_uri_registered("http://127.0.0.1:8912/callback"));
        // Trailing slash is a different URI
        assert!(!client.redirect_uri_registered("http://127.0.0.1:8912/callback/"));
        assert!(!client.redirect_uri_registered("http://127.0.0.1:8912/other"));
        assert!(!client.redirect_uri_registered("http://127.0.0.1:8912"));
    }

    #[test]
    fn test_scope_subset() {
        let client = public_client();
        assert!(client.scopes_allowed("documents:read"));
        assert!(client.scopes_allowed("documents:read documents:write"));
        assert!(client.scopes_allowed(""));
        assert!(!client.scopes_allowed("documents:read admin"));
    }

    #[test]
    fn test_secret_verification() {
        let client = confidential_client();
        assert!(client.verify_secret(Some("s3cret-backend")));
        assert!(!client.verify_secret(Some("wrong")));
        assert!(!client.verify_secret(None));

        // Public clients succeed with no secret at all
        let public = public_client();
        assert!(public.verify_secret(None));
        assert!(public.verify_secret(Some("anything")));
    }

    #[test]
    fn test_confidential_client_requires_secret() {
        let mut client = confidential_client();
        client.client_secret = None;
        assert!(StaticClientRegistry::new(vec![client]).is_err());
    }

    #[test]
    fn test_public_client_rejects_secret() {
        let mut client = public_client();
        client.client_secret = Some("oops".to_string());
        assert!(StaticClientRegistry::new(vec![client]).is_err());
    }

    #[tokio::test]
    async fn test_all_scopes_deduplicated() {
        let registry =
            StaticClientRegistry::new(vec![public_client(), confidential_client()]).unwrap();
        assert_eq!(
            registry.all_scopes().await,
            vec!["documents:read".to_string(), "documents:write".to_string()]
        );
    }
}
