use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Extension, rejection::FormRejection},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

const SUMMARY_PATH: &str = "/admin/summary";

pub fn router() -> Router {
    Router::new()
        .route("/summary", get(summary))
        .route("/supply", post(supply))
        .route("/clear", post(clear))
        .route("/set_status", post(set_status))
}

pub async fn summary(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.reporting.admin_summary().await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

/// Form `floor=<n>` or `floor=ALL`; answers 303 to the summary.
pub async fn supply(
    Extension(services): Extension<Arc<AppServices>>,
    form: Result<Form<dto::SupplyForm>, FormRejection>,
) -> axum::response::Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let target = match form.target() {
        Ok(target) => target,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.fulfillment.supply_stock(target).await {
        Ok(_) => Redirect::to(SUMMARY_PATH).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn clear(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.fulfillment.clear_pending().await {
        Ok(_) => Redirect::to(SUMMARY_PATH).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

/// Form `item=<name>&available=0|1`.
pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    form: Result<Form<dto::SetStatusForm>, FormRejection>,
) -> axum::response::Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };
    let available = match form.available() {
        Ok(available) => available,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.fulfillment.set_availability(&form.item, available).await {
        Ok(_) => Redirect::to(SUMMARY_PATH).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
