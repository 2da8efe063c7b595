//! Access-token signing and opaque token generation.
//!
//! Access tokens are self-contained signed JWTs; any resource server holding
//! the verification key can validate them without calling back into this
//! service. Refresh tokens, authorization codes and session identifiers are
//! opaque random strings with no structure to verify offline.

use crate::store::RefreshToken;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while minting or verifying tokens
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Claims carried by every access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User the token was issued for
    pub sub: String,
    /// Client the token was issued through
    pub client_id: String,
    /// Granted scope, space-separated
    pub scope: String,
    /// Issued-at, Unix seconds
    pub iat: i64,
    /// Expiry, Unix seconds
    pub exp: i64,
    /// Issuer identifier
    pub iss: String,
}

/// Narrowly-scoped signing capability.
///
/// Injected into application state rather than read from ambient process
/// globals, so the issuer is testable and the key can be rotated by swapping
/// the value.
pub struct Signer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
}

impl Signer {
    pub fn from_secret(secret: &str, issuer: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn sign(&self, claims: &AccessClaims) -> Result<String, TokenError> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding,
        )?)
    }

    /// Verify signature, expiry and issuer. This is what a resource server
    /// does with the shared key; exposed here for tests and introspection.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        let data = decode::<AccessClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// Mints access tokens. Pure signing, no storage, safe to run fully in
/// parallel.
#[derive(Clone)]
pub struct TokenIssuer {
    signer: Arc<Signer>,
    access_ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(signer: Arc<Signer>, access_ttl_secs: i64) -> Self {
        Self {
            signer,
            access_ttl_secs,
        }
    }

    /// Returns the signed token and its lifetime in seconds
    pub fn issue_access_token(
        &self,
        user_id: &str,
        client_id: &str,
        scope: &str,
    ) -> Result<(String, i64), TokenError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            client_id: client_id.to_string(),
            scope: scope.to_string(),
            iat: now,
            exp: now + self.access_ttl_secs,
            iss: self.signer.issuer().to_string(),
        };
        let token = self.signer.sign(&claims)?;
        Ok((token, self.access_ttl_secs))
    }

    /// Mint the head of a new refresh-token rotation chain. The caller
    /// persists it; successors are created by the store's rotation.
    pub fn mint_refresh_token(
        &self,
        user_id: &str,
        client_id: &str,
        scope: &str,
        refresh_ttl_secs: i64,
    ) -> RefreshToken {
        let now = Utc::now().timestamp();
        RefreshToken {
            token: random_token(),
            user_id: user_id.to_string(),
            client_id: client_id.to_string(),
            scope: scope.to_string(),
            issued_at: now,
            expires_at: now + refresh_ttl_secs,
            rotated_from: None,
        }
    }
}

/// Generate an unguessable opaque token: 256 bits of randomness, base64url
/// encoded without padding. Used for refresh tokens and authorization codes.
pub fn random_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}
