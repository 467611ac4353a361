//! Authenticated request wrapper.
//!
//! Every view-layer call goes through [`ApiClient::request`] (or one of the
//! typed helpers) instead of issuing raw HTTP requests.

use super::error::{ApiError, SESSION_EXPIRED_NOTICE};
use super::refresh::{Refresher, Renewal};
use super::request::{build_headers, RequestOptions};
use super::response::read_json;
use crate::config::{AuthStrategy, Config};
use crate::notify::{NoticeLevel, SessionEvents, TracingEvents};
use crate::session::{MemoryTokenStore, Session, SessionCookies, SessionToken, TokenStore};
use crate::surface::Surface;
use futures_util::future::try_join_all;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// 401 and 403 both mean the session is no longer valid.
fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Shared HTTP client bound to one session.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
    cookies: Arc<SessionCookies>,
    events: Arc<dyn SessionEvents>,
    login_route: String,
    strategy: AuthStrategy,
    refresher: Option<Arc<Refresher>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .field("login_route", &self.login_route)
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    /// Client for `surface`, restoring its persisted session from `store`.
    pub fn for_surface(
        config: &Config,
        surface: Surface,
        store: Arc<dyn TokenStore>,
        events: Arc<dyn SessionEvents>,
    ) -> Result<Self, ApiError> {
        let profile = surface.profile(config);
        let cookies = SessionCookies::restore(profile.cookie_key(), Arc::clone(&store))?;
        let session = Session::restore(profile.storage_key, store)?;
        let timeout = (config.api.timeout_secs > 0)
            .then(|| Duration::from_secs(config.api.timeout_secs));

        tracing::debug!(
            surface = %surface,
            authenticated = session.is_authenticated(),
            strategy = ?profile.strategy,
            "building API client"
        );

        let mut builder = Self::builder(config.api.base_url.clone())
            .session(Arc::new(session))
            .cookies(Arc::new(cookies))
            .events(events)
            .login_route(profile.login_route)
            .strategy(profile.strategy)
            .refresh_path(config.api.refresh_path.clone());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Cookie jar shared with the HTTP client.
    pub fn cookies(&self) -> &Arc<SessionCookies> {
        &self.cookies
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn strategy(&self) -> AuthStrategy {
        self.strategy
    }

    /// Absolute URL for `path`. Absolute inputs pass through unchanged.
    pub fn url(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        let joined = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        reqwest::Url::parse(&joined).map_err(|_| ApiError::InvalidUrl(joined))
    }

    // ── Core wrapper ─────────────────────────────────────────────

    /// Issue an authenticated request. Returns the parsed JSON body, or
    /// `None` for 204 / empty responses.
    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>, ApiError> {
        let url = self.url(path)?;
        let snapshot = self.session.snapshot();
        let response = self.send(&url, &options, snapshot.token.as_ref()).await?;
        let status = response.status();

        if !is_auth_failure(status) {
            return read_json(response).await;
        }

        tracing::debug!(%status, %url, "authentication rejected");

        // Only a 401 triggers a refresh.
        let refresher = match &self.refresher {
            Some(refresher) if status == StatusCode::UNAUTHORIZED => refresher,
            _ => return Err(self.expire(snapshot.generation)),
        };

        match refresher
            .renew(&self.http, &self.session, &self.cookies, snapshot.generation)
            .await
        {
            Renewal::Renewed { token, generation } => {
                let replay = self.send(&url, &options, Some(&token)).await?;
                if is_auth_failure(replay.status()) {
                    return Err(self.expire(generation));
                }
                read_json(replay).await
            }
            Renewal::Expired => {
                self.announce_expiry();
                Err(ApiError::SessionExpired)
            }
            Renewal::AlreadyExpired => Err(ApiError::SessionExpired),
        }
    }

    async fn send(
        &self,
        url: &reqwest::Url,
        options: &RequestOptions,
        token: Option<&SessionToken>,
    ) -> Result<Response, ApiError> {
        let mut builder = self
            .http
            .request(options.method.clone(), url.clone())
            .headers(build_headers(token, &options.headers));
        if let Some(body) = &options.body {
            builder = builder.body(serde_json::to_vec(body).map_err(ApiError::Encode)?);
        }

        tracing::debug!(
            method = %options.method,
            %url,
            authenticated = token.is_some(),
            "sending request"
        );
        Ok(builder.send().await?)
    }

    /// Send without the session wrapper: no 401 handling, optional token.
    pub(crate) async fn send_raw(
        &self,
        path: &str,
        options: &RequestOptions,
        authenticated: bool,
    ) -> Result<Response, ApiError> {
        let url = self.url(path)?;
        let token = if authenticated {
            self.session.token()
        } else {
            None
        };
        self.send(&url, options, token.as_ref()).await
    }

    /// End the session rejected at `generation` and build the error.
    fn expire(&self, generation: u64) -> ApiError {
        match self.session.expire(generation) {
            Ok(true) => self.announce_expiry(),
            Ok(false) => tracing::debug!("session already changed, skipping logout"),
            Err(e) => {
                tracing::warn!(error = %e, "failed to remove persisted token");
                self.announce_expiry();
            }
        }
        ApiError::SessionExpired
    }

    fn announce_expiry(&self) {
        tracing::warn!(
            key = self.session.key(),
            route = %self.login_route,
            "session expired, redirecting to login"
        );
        self.events.notify(NoticeLevel::Warning, SESSION_EXPIRED_NOTICE);
        self.events.navigate(&self.login_route);
    }

    // ── Typed helpers ────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        decode(self.request(path, RequestOptions::get()).await?)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::post().json(encode(body)?);
        decode(self.request(path, options).await?)
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::put().json(encode(body)?);
        decode(self.request(path, options).await?)
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::patch().json(encode(body)?);
        decode(self.request(path, options).await?)
    }

    /// DELETE, discarding any body.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request(path, RequestOptions::delete()).await?;
        Ok(())
    }

    /// Fetch several independent endpoints concurrently. Results keep the
    /// input order; the first failure fails the whole join.
    pub async fn get_all<S: AsRef<str>>(
        &self,
        paths: &[S],
    ) -> Result<Vec<Option<Value>>, ApiError> {
        try_join_all(
            paths
                .iter()
                .map(|path| self.request(path.as_ref(), RequestOptions::get())),
        )
        .await
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(ApiError::Encode)
}

fn decode<T: DeserializeOwned>(body: Option<Value>) -> Result<T, ApiError> {
    let value = body.ok_or(ApiError::EmptyBody)?;
    Ok(serde_json::from_value(value)?)
}

// ── Builder ──────────────────────────────────────────────────────

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: String,
    session: Option<Arc<Session>>,
    cookies: Option<Arc<SessionCookies>>,
    events: Arc<dyn SessionEvents>,
    login_route: String,
    strategy: AuthStrategy,
    refresh_path: String,
    timeout: Option<Duration>,
}

impl ApiClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session: None,
            cookies: None,
            events: Arc::new(TracingEvents),
            login_route: Surface::Patient.default_login_route().to_string(),
            strategy: AuthStrategy::Simple,
            refresh_path: "/api/auth/refresh".to_string(),
            timeout: None,
        }
    }

    pub fn session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Cookie jar to share; defaults to an in-memory one.
    pub fn cookies(mut self, cookies: Arc<SessionCookies>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn events(mut self, events: Arc<dyn SessionEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn strategy(mut self, strategy: AuthStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        match reqwest::Url::parse(&base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ApiError::InvalidUrl(self.base_url)),
        }

        let cookies = self
            .cookies
            .unwrap_or_else(|| Arc::new(SessionCookies::in_memory()));
        let mut http = reqwest::Client::builder().cookie_provider(cookies.jar());
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        let http = http.build()?;

        let session = self.session.unwrap_or_else(|| {
            Arc::new(Session::new(
                Surface::Patient.default_storage_key(),
                Arc::new(MemoryTokenStore::new()),
            ))
        });

        let mut client = ApiClient {
            http,
            base_url,
            session,
            cookies,
            events: self.events,
            login_route: self.login_route,
            strategy: self.strategy,
            refresher: None,
        };

        if self.strategy == AuthStrategy::RefreshOnce {
            let refresh_url = client.url(&self.refresh_path)?;
            client.refresher = Some(Arc::new(Refresher::new(refresh_url.to_string())));
        }

        Ok(client)
    }
}
