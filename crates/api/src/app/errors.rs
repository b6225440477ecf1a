use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use linenroom_core::DomainError;
use linenroom_infra::EngineError;

pub fn engine_error_to_response(err: EngineError) -> axum::response::Response {
    let field = err.field().map(str::to_owned);
    match err {
        EngineError::Validation { message, .. } => {
            json_error_with_field(StatusCode::BAD_REQUEST, "validation_error", message, field)
        }
        EngineError::UnavailableItem(item) => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "item_unavailable",
                "message": format!("{item} is unavailable"),
                "field": field,
                "item": item,
            })),
        )
            .into_response(),
        EngineError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        EngineError::Invariant(msg) => {
            tracing::error!(error = %msg, "invariant violated");
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        EngineError::Storage(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    engine_error_to_response(err.into())
}

/// Malformed JSON or form bodies.
pub fn rejection_to_response(rejection: impl std::fmt::Display) -> axum::response::Response {
    json_error_with_field(
        StatusCode::BAD_REQUEST,
        "validation_error",
        rejection.to_string(),
        Some("body".to_string()),
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    json_error_with_field(status, code, message, None)
}

fn json_error_with_field(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    field: Option<String>,
) -> axum::response::Response {
    let mut body = json!({
        "error": code,
        "message": message.into(),
    });
    if let Some(field) = field {
        body["field"] = json!(field);
    }
    (status, axum::Json(body)).into_response()
}
