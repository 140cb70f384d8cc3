use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::auth::{Claims, IdentityProvider, SessionCookies, SetCookie};
use crate::database::DatabaseError;
use crate::policy::Role;
use crate::profile::{Profile, ProfileError, ProfileStore};

pub fn claims(sub: &str) -> Claims {
    Claims {
        sub: sub.to_string(),
        email: Some(format!("{}@example.com", sub)),
        role: Some("authenticated".to_string()),
        session_id: None,
        exp: 4_102_444_800,
    }
}

pub fn profile(role: Role, is_active: bool, has_completed_onboarding: bool) -> Profile {
    Profile {
        role,
        is_active,
        has_completed_onboarding,
    }
}

/// Identity provider with a fixed answer that counts sign-outs.
pub struct FakeIdentity {
    claims: Option<Claims>,
    sign_outs: AtomicUsize,
}

impl FakeIdentity {
    pub fn anonymous() -> Self {
        Self {
            claims: None,
            sign_outs: AtomicUsize::new(0),
        }
    }

    pub fn signed_in(sub: &str) -> Self {
        Self {
            claims: Some(claims(sub)),
            sign_outs: AtomicUsize::new(0),
        }
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn get_claims(&self, _cookies: &mut SessionCookies) -> Option<Claims> {
        self.claims.clone()
    }

    async fn sign_out(&self, cookies: &mut SessionCookies) {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        cookies.set(SetCookie::removal("sb-test-auth-token", false));
    }
}

/// Profile store that always returns the same profile, or always fails.
pub struct FakeProfiles {
    profile: Option<Profile>,
}

impl FakeProfiles {
    pub fn found(profile: Profile) -> Self {
        Self {
            profile: Some(profile),
        }
    }

    pub fn failing() -> Self {
        Self { profile: None }
    }
}

#[async_trait]
impl ProfileStore for FakeProfiles {
    async fn get_profile(&self, _sub: &str) -> Result<Profile, ProfileError> {
        self.profile
            .ok_or(ProfileError::Database(DatabaseError::ConfigMissing("DATABASE_URL")))
    }
}
