//! HTTP surface.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use mailpull_core::{
    BodyRepository, FetchBodyResponse, FetchSettings, ResponseStatus, handle_fetch_body_json,
};
use tracing::info;

/// Shared by every request.
pub struct AppState {
    pub settings: FetchSettings,
    pub store: BodyRepository,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/fetch-email-body", post(fetch_email_body))
        .with_state(state)
}

pub async fn serve(addr: &str, router: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn fetch_email_body(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<FetchBodyResponse>) {
    let (status, response) = handle_fetch_body_json(&body, &state.settings, &state.store).await;
    (status_code(status), Json(response))
}

const fn status_code(status: ResponseStatus) -> StatusCode {
    match status {
        ResponseStatus::Ok => StatusCode::OK,
        ResponseStatus::BadRequest => StatusCode::BAD_REQUEST,
        ResponseStatus::NotFound => StatusCode::NOT_FOUND,
        ResponseStatus::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
