use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// `GET /changes?since=<id>` → `{max_id, updates}`.
pub async fn poll_changes(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ChangesQuery>,
) -> axum::response::Response {
    let since = match query.cursor() {
        Ok(since) => since,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.feed.poll_since(since).await {
        Ok(batch) => Json(batch).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
