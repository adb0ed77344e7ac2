use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use sfquery_agent::AgentRuntime;
use sfquery_core::{ErrorKind, InterfaceError, QueryError};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::health;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<AgentRuntime>,
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/ping", get(health::ping))
        .route("/available_models", get(health::available_models))
        .route("/process_query", post(process_query))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() || allowed_origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(
                    event_name = "system.server.cors_origin_skipped",
                    correlation_id = "bootstrap",
                    origin = %origin,
                    "ignoring invalid CORS origin"
                );
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// HTTP face of an [`InterfaceError`].
pub struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.body())).into_response()
    }
}

pub async fn process_query(State(state): State<AppState>, body: Bytes) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => payload,
        Err(parse_error) => {
            let error =
                QueryError::Validation(format!("request body is not valid JSON: {parse_error}"));
            return reject(error, &correlation_id);
        }
    };

    match state.runtime.handle_query(&payload, &correlation_id).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(query_error) => reject(query_error, &correlation_id),
    }
}

fn reject(query_error: QueryError, correlation_id: &str) -> Response {
    let interface = query_error.into_interface(correlation_id);
    let body = interface.body();
    match body.kind {
        ErrorKind::UpstreamError => error!(
            event_name = "query.request.upstream_failed",
            correlation_id = %correlation_id,
            error = %body.error,
            "query failed upstream"
        ),
        ErrorKind::ValidationError | ErrorKind::MalformedContextError => warn!(
            event_name = "query.request.rejected",
            correlation_id = %correlation_id,
            kind = body.kind.as_str(),
            error = %body.error,
            "query rejected"
        ),
    }
    ApiError(interface).into_response()
}
