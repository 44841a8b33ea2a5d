//! Hosted auth service client
//!
//! Speaks the GoTrue-style password flow and publishes the resulting
//! identity into a [`SessionIdentity`], which the task store binds to.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use super::{Identity, IdentityProvider, SessionIdentity};
use crate::config::SyncConfig;
use crate::error::Error;
use crate::http::{auth_headers, build_client, check_status, transport};
use crate::Result;

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    access_token: String,
    user: AuthUser,
}

impl From<SessionResponse> for Identity {
    fn from(resp: SessionResponse) -> Self {
        Self {
            id: resp.user.id,
            email: resp.user.email,
            access_token: Some(resp.access_token),
        }
    }
}

pub struct AuthClient {
    client: Client,
    config: SyncConfig,
    session: SessionIdentity,
}

fn credentials(email: &str, password: &str) -> Result<serde_json::Value> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(Error::Validation("Email and password are required".into()));
    }
    Ok(serde_json::json!({ "email": email, "password": password }))
}

impl AuthClient {
    pub fn new(config: SyncConfig, session: SessionIdentity) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: build_client(&config)?,
            config,
            session,
        })
    }

    pub fn session(&self) -> &SessionIdentity {
        &self.session
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url(), path)
    }

    /// Sign in with email and password and publish the new identity
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let body = credentials(email, password)?;
        let resp = self
            .client
            .post(self.auth_url("token?grant_type=password"))
            .headers(auth_headers(&self.config.api_key, None)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport("Sign in", e))?;

        // Wrong credentials come back as 400
        if resp.status() == StatusCode::BAD_REQUEST {
            return Err(Error::Unauthorized("Invalid login credentials".into()));
        }
        let session: SessionResponse = check_status(resp, "Sign in")
            .await?
            .json()
            .await
            .map_err(|e| transport("Reading sign in response", e))?;

        let identity = Identity::from(session);
        info!("Signed in as {}", identity.id);
        self.session.set(Some(identity.clone()));
        Ok(identity)
    }

    /// Register a new account
    ///
    /// Returns the identity when the service signs the user in right away,
    /// `None` when the address still has to be confirmed.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Identity>> {
        let body = credentials(email, password)?;
        let resp = self
            .client
            .post(self.auth_url("signup"))
            .headers(auth_headers(&self.config.api_key, None)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport("Sign up", e))?;

        let value: serde_json::Value = check_status(resp, "Sign up")
            .await?
            .json()
            .await
            .map_err(|e| transport("Reading sign up response", e))?;

        if value.get("access_token").is_none() {
            info!("Sign up pending confirmation for {}", email.trim());
            return Ok(None);
        }
        let session: SessionResponse = serde_json::from_value(value)?;
        let identity = Identity::from(session);
        self.session.set(Some(identity.clone()));
        Ok(Some(identity))
    }

    /// End the session
    ///
    /// The local session is cleared even when the remote logout fails; the
    /// remote error is still returned.
    pub async fn sign_out(&self) -> Result<()> {
        let token = self
            .session
            .current_identity()
            .and_then(|identity| identity.access_token);
        self.session.clear();

        let Some(token) = token else {
            return Ok(());
        };
        let result = async {
            let resp = self
                .client
                .post(self.auth_url("logout"))
                .headers(auth_headers(&self.config.api_key, Some(&token))?)
                .send()
                .await
                .map_err(|e| transport("Sign out", e))?;
            check_status(resp, "Sign out").await.map(|_| ())
        }
        .await;

        if let Err(e) = &result {
            warn!("Remote sign out failed: {}", e);
        }
        result
    }

    pub async fn reset_password(&self, email: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::Validation("Email is required".into()));
        }
        let resp = self
            .client
            .post(self.auth_url("recover"))
            .headers(auth_headers(&self.config.api_key, None)?)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .map_err(|e| transport("Password reset", e))?;
        check_status(resp, "Password reset").await?;
        Ok(())
    }

    /// Resume a session from a stored access token
    pub fn restore(&self, access_token: &str) -> Result<Identity> {
        let identity = Identity::from_access_token(access_token)?;
        self.session.set(Some(identity.clone()));
        Ok(identity)
    }
}
