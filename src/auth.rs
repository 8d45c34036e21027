//! Request authentication
//!
//! Owner routes resolve the caller through an [`Authenticator`]. The
//! bundled [`BearerTokenAuth`] checks `Authorization: Bearer <token>`
//! against a configured token table.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::collections::HashMap;

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Owner key records are stored under
    pub owner: String,
    /// Name of the credential used; recorded as the upload scope
    pub credential: String,
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// Static bearer tokens mapped to owners
#[derive(Debug, Clone, Default)]
pub struct BearerTokenAuth {
    tokens: HashMap<String, String>,
}

impl BearerTokenAuth {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Stable, non-reversible name for a token
    fn credential_name(token: &str) -> String {
        let digest = blake3::hash(token.as_bytes()).to_hex();
        format!("token-{}", &digest.as_str()[..8])
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

impl Authenticator for BearerTokenAuth {
    fn authenticate(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = bearer_token(headers)?;
        let owner = self.tokens.get(token)?;
        Some(Principal {
            owner: owner.clone(),
            credential: Self::credential_name(token),
        })
    }
}
