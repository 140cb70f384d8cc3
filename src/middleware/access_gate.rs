use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::{SessionCookies, SetCookie};
use crate::error::ApiError;
use crate::app::AppState;
use crate::gate::Decision;
use crate::policy::gate_exempt;

/// Runs the access gate in front of every page and turns its decision into
/// either the downstream response or a redirect. Cookie writes made while
/// deciding go out on whichever response is returned.
///
/// Without an identity provider configured the gate is skipped entirely.
pub async fn access_gate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(gate) = state.gate.as_ref() else {
        return next.run(request).await;
    };

    let path = request.uri().path().to_string();
    if gate_exempt(&path) {
        return next.run(request).await;
    }

    let mut cookies = SessionCookies::from_headers(request.headers());
    let decision = gate.evaluate(&path, &mut cookies).await;
    tracing::debug!("Gate decision for {}: {:?}", path, decision);

    let response = match decision {
        Decision::Allow(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Decision::Redirect(target) => Redirect::temporary(&target.location()).into_response(),
        Decision::Forbidden => {
            ApiError::forbidden("You do not have access to this page").into_response()
        }
    };

    with_cookies(response, cookies.into_pending())
}

/// Appends pending cookie writes. A cookie the downstream handler already
/// set itself is left as the handler wrote it.
pub(crate) fn with_cookies(mut response: Response, cookies: Vec<SetCookie>) -> Response {
    let already_set: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split_once('=').map(|(name, _)| name.trim().to_string()))
        .collect();

    for cookie in cookies {
        if already_set.contains(&cookie.name) {
            continue;
        }
        match cookie.to_header_value() {
            Some(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            None => tracing::warn!("Dropped unencodable cookie {}", cookie.name),
        }
    }
    response
}
