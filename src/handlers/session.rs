use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use serde::Serialize;

use crate::app::AppState;
use crate::auth::SessionCookies;
use crate::error::ApiError;
use crate::gate::GateContext;
use crate::middleware::access_gate::with_cookies;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::{default_route_for_role, Role, LOGIN_ROUTE};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub has_completed_onboarding: Option<bool>,
    pub home: &'static str,
}

/// GET /api/me - the signed-in viewer as seen by the access gate
pub async fn me(context: Option<Extension<GateContext>>) -> ApiResult<MeResponse> {
    let viewer = context
        .and_then(|Extension(context)| context.viewer)
        .ok_or_else(|| ApiError::unauthorized("Not signed in"))?;

    let role = viewer.role();
    Ok(ApiResponse::success(MeResponse {
        id: viewer.claims.sub,
        email: viewer.claims.email,
        role,
        is_active: viewer.profile.map(|p| p.is_active),
        has_completed_onboarding: viewer.profile.map(|p| p.has_completed_onboarding),
        home: default_route_for_role(role),
    }))
}

/// POST /auth/signout - end the session and return to the login page
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut cookies = SessionCookies::from_headers(&headers);

    if let Some(gate) = state.gate.as_ref() {
        gate.identity().sign_out(&mut cookies).await;
    }

    with_cookies(
        Redirect::to(LOGIN_ROUTE).into_response(),
        cookies.into_pending(),
    )
}
