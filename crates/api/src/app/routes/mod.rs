use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod changes;
pub mod floor;
pub mod reports;
pub mod system;

/// Router for all linen room endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/floor/:id/data", get(floor::floor_data))
        .route("/requests", post(floor::submit_request))
        .route("/stockout", post(floor::report_stockout))
        .route("/changes", get(changes::poll_changes))
        .route("/catalog", get(reports::catalog))
        .route("/report/:period", get(reports::report))
        .nest("/admin", admin::router())
}
