#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use team_hours::app::{app, AppState};
use team_hours::auth::{Claims, IdentityProvider, SessionCookies, SetCookie};
use team_hours::database::DatabaseError;
use team_hours::gate::AccessGate;
use team_hours::policy::Role;
use team_hours::profile::{Profile, ProfileError, ProfileStore};

pub const SESSION_COOKIE: &str = "sb-test-auth-token";

/// Session cookie values understood by [`CookieIdentity`]:
/// `valid:<sub>` resolves, `refresh:<sub>` resolves after rewriting the
/// cookie, anything else is an unusable session.
pub fn session(sub: &str) -> String {
    format!("{}=valid:{}", SESSION_COOKIE, sub)
}

pub fn refreshable_session(sub: &str) -> String {
    format!("{}=refresh:{}", SESSION_COOKIE, sub)
}

pub fn stale_session() -> String {
    format!("{}=expired", SESSION_COOKIE)
}

pub fn claims(sub: &str) -> Claims {
    Claims {
        sub: sub.to_string(),
        email: Some(format!("{}@example.com", sub)),
        role: Some("authenticated".to_string()),
        session_id: None,
        exp: 4_102_444_800,
    }
}

#[derive(Default)]
pub struct CookieIdentity {
    sign_outs: AtomicUsize,
}

impl CookieIdentity {
    pub fn sign_out_calls(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for CookieIdentity {
    async fn get_claims(&self, cookies: &mut SessionCookies) -> Option<Claims> {
        let value = cookies.get(SESSION_COOKIE)?.to_string();
        if let Some(sub) = value.strip_prefix("valid:") {
            return Some(claims(sub));
        }
        if let Some(sub) = value.strip_prefix("refresh:") {
            cookies.set(SetCookie::session(SESSION_COOKIE, format!("valid:{}", sub), false));
            return Some(claims(sub));
        }
        None
    }

    async fn sign_out(&self, cookies: &mut SessionCookies) {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        cookies.set(SetCookie::removal(SESSION_COOKIE, false));
    }
}

#[derive(Default)]
pub struct MemoryProfiles {
    profiles: HashMap<String, Profile>,
    unavailable: bool,
}

impl MemoryProfiles {
    pub fn with(mut self, sub: &str, role: Role, is_active: bool, onboarded: bool) -> Self {
        self.profiles.insert(
            sub.to_string(),
            Profile {
                role,
                is_active,
                has_completed_onboarding: onboarded,
            },
        );
        self
    }

    /// Every lookup fails as if the database were down.
    pub fn unavailable() -> Self {
        Self {
            profiles: HashMap::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryProfiles {
    async fn get_profile(&self, sub: &str) -> Result<Profile, ProfileError> {
        if self.unavailable {
            return Err(ProfileError::Database(DatabaseError::Sqlx(
                sqlx::Error::PoolTimedOut,
            )));
        }
        self.profiles
            .get(sub)
            .copied()
            .ok_or_else(|| ProfileError::NotFound(sub.to_string()))
    }
}

pub struct TestApp {
    router: Router,
    pub identity: Arc<CookieIdentity>,
}

impl TestApp {
    pub fn new(profiles: MemoryProfiles) -> Self {
        let identity = Arc::new(CookieIdentity::default());
        let gate = AccessGate::new(identity.clone(), Arc::new(profiles));
        let state = AppState {
            gate: Some(Arc::new(gate)),
            database: None,
        };
        Self {
            router: app(state),
            identity,
        }
    }

    /// Gate backed by a real identity provider; `identity` is unused.
    pub fn with_provider(provider: Arc<dyn IdentityProvider>, profiles: MemoryProfiles) -> Self {
        let gate = AccessGate::new(provider, Arc::new(profiles));
        let state = AppState {
            gate: Some(Arc::new(gate)),
            database: None,
        };
        Self {
            router: app(state),
            identity: Arc::new(CookieIdentity::default()),
        }
    }

    pub fn without_gate() -> Self {
        Self::with_state(AppState::default())
    }

    pub fn with_state(state: AppState) -> Self {
        Self {
            router: app(state),
            identity: Arc::new(CookieIdentity::default()),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::empty()).expect("request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        self.request(Method::GET, path, cookie).await
    }

    pub async fn post(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        self.request(Method::POST, path, cookie).await
    }
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
