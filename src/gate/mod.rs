// Request-time access gate.
//
// Every request runs the same pipeline, each step consuming the previous
// step's output:
//
//   RouteClass + Identity  ->  Claims  ->  Standing  ->  Screening  ->  Decision
//
// Collaborator failures never escape: an unresolvable session is anonymous,
// a failed profile read leaves the role empty.

pub mod decision;

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::auth::{Claims, IdentityProvider, SessionCookies};
use crate::policy::{
    access_denied_redirect, can_access_route, default_route_for_role, is_onboarding_route,
    is_protected_route, matches_route, policy_entry, RouteClass, ONBOARDING_ROUTE,
};
use crate::profile::{Profile, ProfileStore};

pub use decision::{Decision, GateContext, RedirectTarget, Signal, Viewer, PLEASE_LOG_IN};

/// Who is calling, as far as the session cookies tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// `stale_session` is set when session cookies were sent but did not
    /// resolve to claims.
    Anonymous { stale_session: bool },
    Authenticated(Claims),
}

/// An authenticated caller together with whatever profile could be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub claims: Claims,
    pub profile: Option<Profile>,
}

/// Account checks that run before authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screening {
    Deactivated,
    NeedsOnboarding,
    Cleared(Viewer),
}

impl Standing {
    /// Deactivation applies on every gated path. Onboarding is only enforced
    /// on the protected pages outside the onboarding area, so unlisted
    /// endpoints such as `/api/me` keep answering.
    pub fn screen(self, path: &str) -> Screening {
        match self.profile {
            Some(profile) if !profile.is_active => Screening::Deactivated,
            Some(profile)
                if !profile.has_completed_onboarding
                    && is_protected_route(path)
                    && !is_onboarding_route(path) =>
            {
                Screening::NeedsOnboarding
            }
            _ => Screening::Cleared(Viewer {
                claims: self.claims,
                profile: self.profile,
            }),
        }
    }
}

/// Role check for a screened viewer. Paths without a policy entry are open
/// to any signed-in caller, including one whose profile could not be read.
///
/// A denied caller is redirected to the access-denied fallback with
/// `access=denied`, except when the requested path already lies under that
/// fallback: redirecting would be denied again, so the answer is
/// [`Decision::Forbidden`] (403) instead.
pub fn authorize(viewer: Viewer, path: &str) -> Decision {
    let role = viewer.role();
    let permitted = match policy_entry(path) {
        Some(_) => can_access_route(role, path),
        None => true,
    };

    if permitted {
        return Decision::Allow(GateContext {
            viewer: Some(viewer),
        });
    }

    let fallback = access_denied_redirect(role);
    warn!(
        "Access denied: user {} with role {:?} requested {}",
        viewer.claims.sub, role, path
    );

    if matches_route(path, fallback) {
        return Decision::Forbidden;
    }
    Decision::Redirect(RedirectTarget::with_signal(fallback, Signal::AccessDenied))
}

pub struct AccessGate {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
}

impl AccessGate {
    pub fn new(identity: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { identity, profiles }
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    /// Decides what happens to a request for `path`. Session cookie writes
    /// made along the way are left in `cookies` for the response.
    pub async fn evaluate(&self, path: &str, cookies: &mut SessionCookies) -> Decision {
        let route = RouteClass::classify(path);
        let identity = self.identify(cookies).await;

        let claims = match (route, identity) {
            (RouteClass::Public { .. }, Identity::Anonymous { .. })
            | (RouteClass::Unlisted, Identity::Anonymous { .. }) => {
                return Decision::Allow(GateContext::anonymous());
            }
            (RouteClass::Public { confirmation: true }, Identity::Authenticated(claims)) => {
                return Decision::Allow(GateContext {
                    viewer: Some(Viewer {
                        claims,
                        profile: None,
                    }),
                });
            }
            (RouteClass::Public { confirmation: false }, Identity::Authenticated(_)) => {
                debug!("Signed-in request for public route {}, sending to landing", path);
                return Decision::Redirect(RedirectTarget::to(default_route_for_role(None)));
            }
            (RouteClass::Guarded(_), Identity::Anonymous { stale_session }) => {
                let signal = if stale_session {
                    Signal::SessionExpired
                } else {
                    Signal::PleaseLogIn
                };
                debug!("Anonymous request for {} ({:?})", path, signal);
                return Decision::Redirect(RedirectTarget::login(signal));
            }
            (RouteClass::Guarded(_) | RouteClass::Unlisted, Identity::Authenticated(claims)) => {
                claims
            }
        };

        let standing = self.load_standing(claims).await;
        let sub = standing.claims.sub.clone();

        match standing.screen(path) {
            Screening::Deactivated => {
                warn!("Deactivated account {} signed out", sub);
                self.identity.sign_out(cookies).await;
                Decision::Redirect(RedirectTarget::login(Signal::AccountDeactivated))
            }
            Screening::NeedsOnboarding => {
                debug!("User {} has not completed onboarding", sub);
                Decision::Redirect(RedirectTarget::to(ONBOARDING_ROUTE))
            }
            Screening::Cleared(viewer) => authorize(viewer, path),
        }
    }

    async fn identify(&self, cookies: &mut SessionCookies) -> Identity {
        let stale_session = cookies.has_session_artifacts();
        match self.identity.get_claims(cookies).await {
            Some(claims) => Identity::Authenticated(claims),
            None => Identity::Anonymous { stale_session },
        }
    }

    async fn load_standing(&self, claims: Claims) -> Standing {
        let profile = match self.profiles.get_profile(&claims.sub).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                error!("Profile lookup failed for user {}: {}", claims.sub, e);
                None
            }
        };
        Standing { claims, profile }
    }
}
