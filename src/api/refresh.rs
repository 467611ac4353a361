//! Silent access-token renewal.
//!
//! The refresh endpoint authenticates with an HTTP-only cookie the server set
//! at login; the shared `reqwest` cookie jar carries it, this code never
//! reads it.
//!
//! ## Design
//! Renewals are serialized behind an async mutex and keyed by the session
//! generation a failing request was sent with. When several requests hit a
//! 401 with the same token, the first one through the mutex calls the
//! endpoint; the rest find the generation already moved and reuse the
//! outcome. One expired token therefore costs exactly one refresh call.

use super::error::ApiError;
use super::response::read_json;
use crate::session::{Session, SessionCookies, SessionToken};
use serde::Deserialize;
use tokio::sync::Mutex;

/// Body returned by login and refresh endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(alias = "accessToken", alias = "access_token")]
    pub token: String,
}

impl TokenResponse {
    /// Pull a non-empty token out of a JSON body.
    pub fn extract(
        body: Option<serde_json::Value>,
        source: &str,
    ) -> Result<SessionToken, ApiError> {
        let body = body.ok_or_else(|| ApiError::MissingToken(source.to_string()))?;
        let parsed: TokenResponse = serde_json::from_value(body)
            .map_err(|_| ApiError::MissingToken(source.to_string()))?;
        let token = parsed.token.trim();
        if token.is_empty() {
            return Err(ApiError::MissingToken(source.to_string()));
        }
        Ok(SessionToken::new(token))
    }
}

/// What a request that hit a 401 should do next.
#[derive(Debug)]
pub(crate) enum Renewal {
    /// Replay once with this token.
    Renewed { token: SessionToken, generation: u64 },
    /// Refresh failed and this caller ended the session.
    Expired,
    /// Another caller already ended the session.
    AlreadyExpired,
}

/// Coalescing refresh coordinator for one session.
#[derive(Debug)]
pub(crate) struct Refresher {
    url: String,
    in_flight: Mutex<()>,
}

impl Refresher {
    pub(crate) fn new(url: String) -> Self {
        Self {
            url,
            in_flight: Mutex::new(()),
        }
    }

    /// Renew the token rejected at `seen_generation`, or reuse the outcome
    /// of a renewal that already happened for it.
    pub(crate) async fn renew(
        &self,
        http: &reqwest::Client,
        session: &Session,
        cookies: &SessionCookies,
        seen_generation: u64,
    ) -> Renewal {
        let _guard = self.in_flight.lock().await;

        let current = session.snapshot();
        if current.generation != seen_generation {
            return match current.token {
                Some(token) => {
                    tracing::debug!("token already renewed by a concurrent request");
                    Renewal::Renewed {
                        token,
                        generation: current.generation,
                    }
                }
                None => Renewal::AlreadyExpired,
            };
        }

        let outcome = self.request_token(http).await;
        // The server may rotate the refresh cookie on every call.
        if let Err(e) = cookies.persist() {
            tracing::warn!(error = %e, "failed to persist refresh cookie");
        }

        // A token that cannot be stored counts as a failed refresh.
        let renewed = match outcome {
            Ok(token) => session
                .set_token(token.clone())
                .map(|()| token)
                .map_err(ApiError::from),
            Err(e) => Err(e),
        };

        match renewed {
            Ok(token) => {
                tracing::info!(key = session.key(), "access token refreshed");
                Renewal::Renewed {
                    token,
                    generation: session.generation(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed");
                // Clear while still holding the mutex so waiters see the
                // advanced generation instead of refreshing again.
                match session.expire(seen_generation) {
                    Ok(true) => Renewal::Expired,
                    Ok(false) => Renewal::AlreadyExpired,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to remove persisted token");
                        Renewal::Expired
                    }
                }
            }
        }
    }

    async fn request_token(&self, http: &reqwest::Client) -> Result<SessionToken, ApiError> {
        let response = http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let body = read_json(response).await?;
        TokenResponse::extract(body, "refresh response")
    }
}
