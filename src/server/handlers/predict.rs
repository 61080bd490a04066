use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub user_q: String,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub answer: String,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(payload) =
        payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("predict", %request_id);

    async move {
        tracing::info!("question received ({} chars)", payload.user_q.len());
        let answer = state.qa.answer(&payload.user_q).await.map_err(|e| {
            tracing::warn!("predict failed: {}", e);
            ApiError::from(e)
        })?;
        Ok::<_, ApiError>(Json(PredictResponse { answer }))
    }
    .instrument(span)
    .await
}
