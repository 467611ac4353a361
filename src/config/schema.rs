//! Configuration schema for the nutri client.
//!
//! Every section has a sensible default so an empty (or missing) config file
//! yields a usable client pointed at a local backend.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Remote API settings shared by every surface.
    pub api: ApiConfig,
    /// Where persisted session tokens live.
    pub storage: StorageConfig,
    /// Per-surface overrides (storage key, login route, auth strategy).
    pub surfaces: SurfacesConfig,
}

/// Remote API endpoints and transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every request path is joined to.
    pub base_url: String,
    /// Per-request timeout in seconds (0 disables the timeout).
    pub timeout_secs: u64,
    /// Endpoint that exchanges credentials for a session token.
    pub login_path: String,
    /// Endpoint that mints a new access token from the refresh cookie.
    pub refresh_path: String,
    /// Endpoint notified on logout. `None` skips the server call.
    pub logout_path: Option<String>,
    /// Endpoint returning the authenticated user's profile.
    pub me_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            login_path: "/api/auth/login".to_string(),
            refresh_path: "/api/auth/refresh".to_string(),
            logout_path: Some("/api/auth/logout".to_string()),
            me_path: "/api/me".to_string(),
        }
    }
}

/// Persisted token storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one token file per surface. `~` is expanded.
    /// Defaults to the platform data directory.
    pub data_dir: Option<String>,
}

/// How the request wrapper reacts to an expired session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    /// Clear the token and redirect to login on 401/403.
    Simple,
    /// On 401, renew the token once through the refresh endpoint and replay.
    RefreshOnce,
}

/// Overrides for the three client surfaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SurfacesConfig {
    pub patient: SurfaceConfig,
    pub nutritionist: SurfaceConfig,
    pub admin: SurfaceConfig,
}

/// Optional overrides for a single surface. Unset fields keep the
/// surface's built-in value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Key the session token is persisted under.
    pub storage_key: Option<String>,
    /// View route the user is sent to when the session expires.
    pub login_route: Option<String>,
    /// Expired-session handling.
    pub strategy: Option<AuthStrategy>,
}
