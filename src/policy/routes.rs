use serde::Serialize;

use super::role::Role;

pub const LOGIN_ROUTE: &str = "/login";
pub const CONFIRM_ROUTE: &str = "/confirm";
pub const ONBOARDING_ROUTE: &str = "/onboarding";
pub const LANDING_ROUTE: &str = "/entry";

/// Routes reachable without a session.
pub const PUBLIC_ROUTES: &[&str] = &[
    LOGIN_ROUTE,
    "/sign-up",
    "/sign-up-success",
    "/forgot-password",
    "/update-password",
    CONFIRM_ROUTE,
    "/error",
];

pub const SIGN_OUT_ROUTE: &str = "/auth/signout";

/// Prefixes that never enter the gate at all. Sign-out must stay reachable
/// whatever state the account is in.
const EXEMPT_PREFIXES: &[&str] = &[
    "/_next",
    "/static",
    "/favicon.ico",
    "/health",
    SIGN_OUT_ROUTE,
];
const EXEMPT_EXTENSIONS: &[&str] = &["svg", "png", "jpg", "jpeg", "gif", "webp", "ico"];

/// Exact match or path-prefix match on a segment boundary.
pub fn matches_route(path: &str, route: &str) -> bool {
    match path.strip_prefix(route) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Top-level application areas that require a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectedArea {
    Onboarding,
    Entry,
    Dashboard,
    Team,
    Admin,
}

impl ProtectedArea {
    pub const ALL: [ProtectedArea; 5] = [
        ProtectedArea::Onboarding,
        ProtectedArea::Entry,
        ProtectedArea::Dashboard,
        ProtectedArea::Team,
        ProtectedArea::Admin,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            ProtectedArea::Onboarding => ONBOARDING_ROUTE,
            ProtectedArea::Entry => LANDING_ROUTE,
            ProtectedArea::Dashboard => "/dashboard",
            ProtectedArea::Team => "/team",
            ProtectedArea::Admin => "/admin",
        }
    }

    /// Whether the area has an entry in the policy table. Areas without one
    /// are open to every authenticated caller.
    pub fn has_policy(self) -> bool {
        match self {
            ProtectedArea::Onboarding => false,
            ProtectedArea::Entry
            | ProtectedArea::Dashboard
            | ProtectedArea::Team
            | ProtectedArea::Admin => true,
        }
    }

    /// Allow-list membership for `role`. Only meaningful when [`Self::has_policy`].
    pub fn permits(self, role: Role) -> bool {
        use Role::*;

        match self {
            ProtectedArea::Onboarding => true,
            ProtectedArea::Entry | ProtectedArea::Dashboard => match role {
                Staff | Manager | Admin | SuperAdmin => true,
            },
            ProtectedArea::Team => match role {
                Staff => false,
                Manager | Admin | SuperAdmin => true,
            },
            ProtectedArea::Admin => match role {
                Staff | Manager => false,
                Admin | SuperAdmin => true,
            },
        }
    }

    /// The explicit allow-list, or `None` for unlisted areas.
    pub fn allowed_roles(self) -> Option<Vec<Role>> {
        self.has_policy()
            .then(|| Role::ALL.into_iter().filter(|r| self.permits(*r)).collect())
    }

    /// The area `path` falls under, if any.
    pub fn for_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|area| matches_route(path, area.prefix()))
    }
}

/// Policy entries in scan order. Admin is handled before the scan.
const POLICY_TABLE: [ProtectedArea; 3] = [
    ProtectedArea::Entry,
    ProtectedArea::Dashboard,
    ProtectedArea::Team,
];

pub fn is_public_route(path: &str) -> bool {
    PUBLIC_ROUTES.iter().any(|route| matches_route(path, route))
}

pub fn is_protected_route(path: &str) -> bool {
    ProtectedArea::for_path(path).is_some()
}

pub fn is_onboarding_route(path: &str) -> bool {
    matches_route(path, ONBOARDING_ROUTE)
}

/// Assets and infrastructure endpoints that bypass the gate.
pub fn gate_exempt(path: &str) -> bool {
    if EXEMPT_PREFIXES.iter().any(|prefix| matches_route(path, prefix)) {
        return true;
    }
    path.rsplit_once('.')
        .map(|(_, ext)| EXEMPT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// The policy entry governing `path`. The admin area is checked first and
/// covers every admin sub-page; other entries are prefix-disjoint.
pub fn policy_entry(path: &str) -> Option<ProtectedArea> {
    if matches_route(path, ProtectedArea::Admin.prefix()) {
        return Some(ProtectedArea::Admin);
    }
    POLICY_TABLE
        .into_iter()
        .find(|area| matches_route(path, area.prefix()))
}

pub fn can_access_route(role: Option<Role>, path: &str) -> bool {
    let Some(role) = role else {
        return false;
    };

    match policy_entry(path) {
        Some(area) => area.permits(role),
        None => true,
    }
}

/// Where a signed-in user lands by default.
pub fn default_route_for_role(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Staff | Role::Manager | Role::Admin | Role::SuperAdmin) | None => LANDING_ROUTE,
    }
}

/// Fallback path for a caller denied by [`can_access_route`].
pub fn access_denied_redirect(role: Option<Role>) -> &'static str {
    default_route_for_role(role)
}

/// Route classification from the gate's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Reachable anonymously. `confirmation` marks the account-confirmation
    /// route, which signed-in users may also visit.
    Public { confirmation: bool },
    /// Under a protected prefix; anonymous callers are sent to login.
    Guarded(ProtectedArea),
    /// Neither public nor under a protected prefix.
    Unlisted,
}

impl RouteClass {
    pub fn classify(path: &str) -> Self {
        if is_public_route(path) {
            RouteClass::Public {
                confirmation: matches_route(path, CONFIRM_ROUTE),
            }
        } else if let Some(area) = ProtectedArea::for_path(path) {
            RouteClass::Guarded(area)
        } else {
            RouteClass::Unlisted
        }
    }
}
