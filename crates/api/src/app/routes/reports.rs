use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    response::IntoResponse,
};

use linenroom_supplies::ReportPeriod;

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn report(
    Extension(services): Extension<Arc<AppServices>>,
    Path(period): Path<String>,
) -> axum::response::Response {
    let period = match period.parse::<ReportPeriod>() {
        Ok(period) => period,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.reporting.report(period).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

/// Catalog items with their availability, in catalog order.
pub async fn catalog(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.reporting.catalog().await {
        Ok(catalog) => Json(catalog.items()).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
