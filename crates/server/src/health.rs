use axum::{extract::State, http::StatusCode, Json};
use sfquery_core::{ModelInfo, PingStatus, ServiceStatus};

use crate::api::AppState;

pub async fn root() -> (StatusCode, Json<ServiceStatus>) {
    let payload = ServiceStatus {
        status: "online",
        message: "Salesforce query service is running".to_string(),
    };
    (StatusCode::OK, Json(payload))
}

pub async fn ping(State(state): State<AppState>) -> (StatusCode, Json<PingStatus>) {
    (StatusCode::OK, Json(state.runtime.ping()))
}

pub async fn available_models(State(state): State<AppState>) -> (StatusCode, Json<ModelInfo>) {
    (StatusCode::OK, Json(state.runtime.available_models()))
}
