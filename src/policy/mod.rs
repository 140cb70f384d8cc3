// Route policy: which paths are public, which require a session, and which
// roles may enter each protected area. Everything here is pure.

pub mod role;
pub mod routes;

pub use role::{Role, UnknownRole};
pub use routes::{
    access_denied_redirect, can_access_route, default_route_for_role, gate_exempt,
    is_onboarding_route, is_protected_route, is_public_route, matches_route, policy_entry,
    ProtectedArea, RouteClass, CONFIRM_ROUTE, LANDING_ROUTE, LOGIN_ROUTE, ONBOARDING_ROUTE,
    PUBLIC_ROUTES, SIGN_OUT_ROUTE,
};
