//! Session lifecycle operations: login, OAuth callback, logout.
//!
//! These are the only places a token is created or deliberately removed.
//! Credential checks happen server-side; a failed login is an ordinary
//! request error and never triggers the expired-session path.

use crate::api::response::read_json;
use crate::api::{ApiClient, ApiError, RequestOptions, TokenResponse};
use crate::config::ApiConfig;
use serde_json::{json, Value};

/// Server endpoints used by [`Authenticator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    pub login: String,
    pub logout: Option<String>,
    pub me: String,
}

impl AuthEndpoints {
    pub fn from_config(api: &ApiConfig) -> Self {
        Self {
            login: api.login_path.clone(),
            logout: api.logout_path.clone(),
            me: api.me_path.clone(),
        }
    }
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self::from_config(&ApiConfig::default())
    }
}

/// Login/logout front door for one client surface.
#[derive(Debug, Clone)]
pub struct Authenticator {
    client: ApiClient,
    endpoints: AuthEndpoints,
}

impl Authenticator {
    pub fn new(client: ApiClient, endpoints: AuthEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Exchange credentials for a session token and store it. Returns the
    /// full response body (it usually carries the user profile too).
    pub async fn login(&self, email: &str, password: &str) -> Result<Value, ApiError> {
        let options = RequestOptions::post().json(json!({
            "email": email.trim(),
            "password": password,
        }));
        let response = self
            .client
            .send_raw(&self.endpoints.login, &options, false)
            .await?;
        let body = read_json(response).await?;

        let token = TokenResponse::extract(body.clone(), "login response")?;
        // Persist the refresh cookie first: a token without it cannot be
        // renewed by a later process.
        self.client.cookies().persist()?;
        self.client.session().set_token(token)?;
        tracing::info!(key = self.client.session().key(), "login succeeded");

        Ok(body.unwrap_or(Value::Null))
    }

    /// Accept the token an OAuth provider hands back on the callback URL
    /// (`...?token=<value>`). Relative callback paths are accepted.
    pub fn complete_oauth(&self, callback: &str) -> Result<(), ApiError> {
        let url = reqwest::Url::parse(callback)
            .or_else(|_| {
                reqwest::Url::parse("http://localhost").and_then(|base| base.join(callback))
            })
            .map_err(|_| ApiError::InvalidUrl(callback.to_string()))?;

        let token = url
            .query_pairs()
            .find(|(name, _)| name == "token")
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::MissingToken("OAuth callback".to_string()))?;

        self.client.session().set_token(token)?;
        tracing::info!(key = self.client.session().key(), "OAuth login completed");
        Ok(())
    }

    /// Tell the server (best effort), then drop the local token and the
    /// refresh cookie. Returns whether a token was held.
    pub async fn logout(&self) -> Result<bool, ApiError> {
        let session = self.client.session();
        if !session.is_authenticated() {
            self.client.cookies().clear()?;
            return Ok(false);
        }

        if let Some(path) = &self.endpoints.logout {
            match self
                .client
                .send_raw(path, &RequestOptions::post(), true)
                .await
            {
                Ok(response) if !response.status().is_success() => {
                    tracing::debug!(status = %response.status(), "logout endpoint refused");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "logout request failed"),
            }
        }

        let cleared = session.clear();
        let forgotten = self.client.cookies().clear();
        let cleared = cleared?;
        forgotten?;
        tracing::info!(key = session.key(), "logged out");
        Ok(cleared)
    }

    /// Profile of the signed-in user.
    pub async fn me(&self) -> Result<Value, ApiError> {
        self.client.get(&self.endpoints.me).await
    }
}
