use serde::Serialize;

use crate::auth::Claims;
use crate::policy::{self, Role};
use crate::profile::Profile;

pub const PLEASE_LOG_IN: &str = "Please log in to continue";

/// Query-string annotations the pages use for messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    SessionExpired,
    PleaseLogIn,
    AccountDeactivated,
    AccessDenied,
}

impl Signal {
    pub fn query_pair(self) -> (&'static str, &'static str) {
        match self {
            Signal::SessionExpired => ("expired", "true"),
            Signal::PleaseLogIn => ("message", PLEASE_LOG_IN),
            Signal::AccountDeactivated => ("error", "account_deactivated"),
            Signal::AccessDenied => ("access", "denied"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub path: &'static str,
    pub signal: Option<Signal>,
}

impl RedirectTarget {
    pub fn to(path: &'static str) -> Self {
        Self { path, signal: None }
    }

    pub fn with_signal(path: &'static str, signal: Signal) -> Self {
        Self {
            path,
            signal: Some(signal),
        }
    }

    pub fn login(signal: Signal) -> Self {
        Self::with_signal(policy::LOGIN_ROUTE, signal)
    }

    /// `path` plus the form-encoded signal, e.g. `/login?expired=true`.
    pub fn location(&self) -> String {
        match self.signal {
            Some(signal) => {
                let (key, value) = signal.query_pair();
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair(key, value)
                    .finish();
                format!("{}?{}", self.path, query)
            }
            None => self.path.to_string(),
        }
    }
}

/// Who the gate let through. Absent for anonymous requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Viewer {
    pub claims: Claims,
    pub profile: Option<Profile>,
}

impl Viewer {
    pub fn role(&self) -> Option<Role> {
        self.profile.map(|p| p.role)
    }
}

/// What the gate made of a request, inserted into the request extensions on
/// pass-through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateContext {
    pub viewer: Option<Viewer>,
}

impl GateContext {
    pub fn anonymous() -> Self {
        Self { viewer: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(GateContext),
    Redirect(RedirectTarget),
    /// Refused without a redirect, used where the fallback would point back
    /// at the requested path.
    Forbidden,
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn redirect_location(&self) -> Option<String> {
        match self {
            Decision::Redirect(target) => Some(target.location()),
            _ => None,
        }
    }
}
