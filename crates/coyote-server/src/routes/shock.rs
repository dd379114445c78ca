use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use coyote_core::{ShockReceipt, ShockRequest};

use crate::error::AppError;
use crate::state::AppState;

/// POST /shock: queue a pulse and wait for the device to take it.
///
/// Fails fast with 503 while the device is not bound; otherwise the response
/// is held until the sequencer has fired (or rejected) this job.
pub async fn submit_shock(
    State(app): State<AppState>,
    payload: Result<Json<ShockRequest>, JsonRejection>,
) -> Result<Json<ShockReceipt>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let receipt = app.service.submit_shock(request).await?;
    Ok(Json(receipt))
}
