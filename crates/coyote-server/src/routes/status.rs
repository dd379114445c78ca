use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /status: binding state, queue depth and the limits in force.
pub async fn get_status(State(app): State<AppState>) -> Json<serde_json::Value> {
    let svc = &app.service;
    let config = svc.config();
    let binding = svc.binding_info();
    Json(serde_json::json!({
        "bound": binding.is_some(),
        "target_id": binding.as_ref().map(|b| b.target_id.clone()),
        "bound_at": binding.as_ref().map(|b| b.bound_at),
        "pending_jobs": svc.pending_jobs(),
        "owner_max": config.owner_ceiling(),
        "limits": config.limits,
        "defaults": config.defaults,
        "device": config.device,
    }))
}
