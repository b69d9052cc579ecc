//! HTTP surface: a single selection endpoint plus CORS preflight.

use crate::core::request::SelectAudienceRequest;
use crate::core::selector::AudienceSelector;
use crate::utils::error::SelectionError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{
    HeaderName, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, AUTHORIZATION,
    CONTENT_TYPE,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub const ALLOWED_METHODS: [Method; 2] = [Method::POST, Method::OPTIONS];

pub const ALLOWED_HEADERS: [HeaderName; 4] = [
    AUTHORIZATION,
    HeaderName::from_static("x-client-info"),
    HeaderName::from_static("apikey"),
    CONTENT_TYPE,
];

// Same lists as above, in the form the CORS layer writes them on preflight.
const ALLOW_METHODS_VALUE: &str = "POST,OPTIONS";
const ALLOW_HEADERS_VALUE: &str = "authorization,x-client-info,apikey,content-type";

#[derive(Clone)]
pub struct AppState {
    pub selector: Arc<AudienceSelector>,
    pub strict_status_codes: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Builds the router. Every response, including preflight, 405s and
/// recovered panics, carries the CORS headers.
pub fn router(state: AppState) -> Router {
    let strict_status_codes = state.strict_status_codes;

    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS);

    Router::new()
        .route("/", post(select_audience))
        .route("/select-audience", post(select_audience))
        .layer(CatchPanicLayer::custom(move |panic| {
            panic_response(panic, strict_status_codes)
        }))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS_VALUE),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS_VALUE),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST — select the next audience batch for a campaign.
async fn select_audience(State(state): State<AppState>, body: Bytes) -> Response {
    let result = match serde_json::from_slice::<SelectAudienceRequest>(&body) {
        Ok(request) => {
            state
                .selector
                .select(&request.campaign_id(), request.requested_limit())
                .await
        }
        Err(e) => Err(SelectionError::InvalidRequest {
            message: e.to_string(),
        }),
    };

    match result {
        Ok(contacts) => (StatusCode::OK, Json(contacts)).into_response(),
        Err(e) => error_response(&e, state.strict_status_codes),
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>, strict_status_codes: bool) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("handler panicked");

    let error = SelectionError::Unknown {
        message: format!("Unexpected error: {}", detail),
    };
    error_response(&error, strict_status_codes)
}

fn error_response(e: &SelectionError, strict_status_codes: bool) -> Response {
    let status = if strict_status_codes {
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_REQUEST)
    } else {
        StatusCode::BAD_REQUEST
    };

    if status.is_server_error() {
        tracing::error!(
            error.label = e.as_label(),
            status = status.as_u16(),
            "selection failed: {}",
            e
        );
    } else {
        tracing::warn!(
            error.label = e.as_label(),
            status = status.as_u16(),
            "selection rejected: {}",
            e
        );
    }

    (
        status,
        Json(ErrorBody {
            error: e.to_string(),
        }),
    )
        .into_response()
}
