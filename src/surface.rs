//! The three client surfaces sharing the request wrapper.
//!
//! Each surface keeps its own persisted token (so a patient and an admin can
//! be signed in side by side), its own login route and its own reaction to
//! an expired session.

use crate::config::{AuthStrategy, Config, SurfaceConfig};
use std::fmt;
use std::str::FromStr;

/// A client application talking to the shared backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Patient,
    Nutritionist,
    Admin,
}

impl Surface {
    pub const ALL: [Surface; 3] = [Surface::Patient, Surface::Nutritionist, Surface::Admin];

    pub fn name(self) -> &'static str {
        match self {
            Surface::Patient => "patient",
            Surface::Nutritionist => "nutritionist",
            Surface::Admin => "admin",
        }
    }

    /// Built-in persisted storage key.
    pub fn default_storage_key(self) -> &'static str {
        match self {
            Surface::Patient => "token",
            Surface::Nutritionist => "nutritionist_token",
            Surface::Admin => "admin_token",
        }
    }

    /// Built-in login route.
    pub fn default_login_route(self) -> &'static str {
        match self {
            Surface::Patient => "/login",
            Surface::Nutritionist => "/nutricionista/login",
            Surface::Admin => "/admin/login",
        }
    }

    /// Only the nutritionist portal renews tokens silently by default.
    pub fn default_strategy(self) -> AuthStrategy {
        match self {
            Surface::Nutritionist => AuthStrategy::RefreshOnce,
            Surface::Patient | Surface::Admin => AuthStrategy::Simple,
        }
    }

    fn overrides(self, config: &Config) -> &SurfaceConfig {
        match self {
            Surface::Patient => &config.surfaces.patient,
            Surface::Nutritionist => &config.surfaces.nutritionist,
            Surface::Admin => &config.surfaces.admin,
        }
    }

    /// Resolve the effective profile from built-ins plus config overrides.
    pub fn profile(self, config: &Config) -> SurfaceProfile {
        let overrides = self.overrides(config);
        SurfaceProfile {
            surface: self,
            storage_key: overrides
                .storage_key
                .clone()
                .unwrap_or_else(|| self.default_storage_key().to_string()),
            login_route: overrides
                .login_route
                .clone()
                .unwrap_or_else(|| self.default_login_route().to_string()),
            strategy: overrides.strategy.unwrap_or(self.default_strategy()),
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" | "paciente" => Ok(Surface::Patient),
            "nutritionist" | "nutricionista" => Ok(Surface::Nutritionist),
            "admin" => Ok(Surface::Admin),
            other => Err(format!(
                "Unknown surface '{other}'. Supported values: patient, nutritionist, admin"
            )),
        }
    }
}

/// Effective settings for one surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceProfile {
    pub surface: Surface,
    pub storage_key: String,
    pub login_route: String,
    pub strategy: AuthStrategy,
}

impl SurfaceProfile {
    /// Storage key of the persisted cookie jar, next to the token.
    pub fn cookie_key(&self) -> String {
        format!("{}_cookies", self.storage_key)
    }
}
