use axum::extract::State;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /health - liveness, plus a database ping when one is configured
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    let database = match state.database.as_ref() {
        Some(database) => {
            database.health_check().await.map_err(ApiError::from)?;
            "ok"
        }
        None => "not_configured",
    };

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "database": database,
        "gate": state.gate.is_some(),
    })))
}
