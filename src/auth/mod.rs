pub mod cookies;
pub mod session;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use cookies::{is_auth_token_cookie, SessionCookies, SetCookie};
pub use session::{SessionIdentityProvider, StoredSession};

/// Identity asserted by the provider for the current request. Re-derived
/// from cookies on every request and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Provider-side role claim (e.g. `authenticated`), unrelated to the
    /// application role on the profile.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    pub exp: i64,
}

/// Issues and validates sessions. Implementations read and write session
/// state through the request's [`SessionCookies`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Claims for the current session, or `None` when there is no usable
    /// session. Never fails; errors are logged and read as anonymous.
    async fn get_claims(&self, cookies: &mut SessionCookies) -> Option<Claims>;

    /// Ends the current session. Best-effort.
    async fn sign_out(&self, cookies: &mut SessionCookies);
}
