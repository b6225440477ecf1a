use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use linenroom_supplies::Floor;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn floor_data(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let floor = match id.parse::<Floor>() {
        Ok(floor) => floor,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.reporting.floor_view(floor).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn submit_request(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::SubmitRequestBody>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services.requests.submit_request(body.into_batch()).await {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn report_stockout(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::StockoutBody>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services.requests.report_stockout(Floor::new(body.floor)).await {
        Ok(movement) => Json(json!({
            "status": "ok",
            "movement_id": movement.id,
        }))
        .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
