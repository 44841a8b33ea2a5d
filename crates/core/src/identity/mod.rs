//! Identity module
//!
//! The signed-in principal, the provider seam the task store is bound
//! through, and an HTTP client for the hosted auth service.

mod auth_client;
mod session;

pub use auth_client::AuthClient;
pub use session::SessionIdentity;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::Error;
use crate::Result;

/// An authenticated principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    #[serde(skip)]
    pub access_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            access_token: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Rebuild an identity from a stored JWT access token
    ///
    /// Only the claims are decoded. The signature is checked by the remote
    /// on every request, not here.
    pub fn from_access_token(token: &str) -> Result<Self> {
        let malformed = || Error::Unauthorized("Malformed access token".into());

        let payload = token.split('.').nth(1).ok_or_else(malformed)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| malformed())?;
        let claims: TokenClaims = serde_json::from_slice(&bytes).map_err(|_| malformed())?;
        if claims.sub.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            id: claims.sub,
            email: claims.email,
            access_token: Some(token.to_string()),
        })
    }

    /// Same principal, regardless of session details such as the token
    pub fn same_principal(&self, other: &Identity) -> bool {
        self.id == other.id
    }
}

/// Source of the current identity and of sign-in/sign-out notifications
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;

    /// Receiver that observes every identity change
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}
