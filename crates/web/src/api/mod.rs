use axum::{
    response::IntoResponse,
    routing::{get, on},
    Json, Router,
};
use dashboard::database::Database;
use serde_json::json;

pub mod stations;

use crate::{
    auth,
    common::{route_not_found, METHOD_FILTER_ALL},
    WebState,
};

pub fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .nest("/auth", auth::routes(state.clone()))
        .merge(stations::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn ping() -> impl IntoResponse {
    Json(json!({
        "message": "pong!"
    }))
}
