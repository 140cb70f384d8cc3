use axum::{
    http::Uri,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use serde_json::json;

use crate::gate::GateContext;
use crate::middleware::ApiResponse;
use crate::policy::{default_route_for_role, LOGIN_ROUTE};

/// GET / - send the viewer to their home route, or to login
pub async fn root(context: Option<Extension<GateContext>>) -> Response {
    let target = match context.and_then(|Extension(context)| context.viewer) {
        Some(viewer) => default_route_for_role(viewer.role()),
        None => LOGIN_ROUTE,
    };
    Redirect::temporary(target).into_response()
}

/// Fallback for page routes. Rendering happens in the front end; this
/// reports the page the gate let through and for whom.
pub async fn page(uri: Uri, context: Option<Extension<GateContext>>) -> Response {
    let viewer = context.and_then(|Extension(context)| context.viewer);

    ApiResponse::success(json!({
        "page": uri.path(),
        "viewer": viewer,
    }))
    .into_response()
}
