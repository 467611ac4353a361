//! Authenticated REST client shared by the patient, nutritionist and admin
//! surfaces of the nutrition platform.

pub mod api;
pub mod auth;
pub mod config;
pub mod notify;
pub mod nutrition;
pub mod session;
pub mod surface;

pub use api::{ApiClient, ApiClientBuilder, ApiError, RequestOptions};
pub use auth::{AuthEndpoints, Authenticator};
pub use config::{AuthStrategy, Config};
pub use notify::{NoticeLevel, SessionEvents, TracingEvents};
pub use nutrition::NutrientTotals;
pub use session::{
    FileTokenStore, MemoryTokenStore, Session, SessionCookies, SessionToken, TokenStore,
};
pub use surface::Surface;
