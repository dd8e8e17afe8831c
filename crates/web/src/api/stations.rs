use axum::{
    extract::{OriginalUri, Path, State},
    http::Method,
    routing::{get, post},
    Form, Json, Router,
};
use dashboard::{database::Database, RequestError};
use model::{
    comment::StationComment,
    station::{Station, StationDetail, StationOverview},
    status::RecentStatus,
    trend::Trend,
};
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{
    auth::AuthUser,
    common::{schema, RouteErrorResponse},
    RouteResult, WebState,
};

/// Registered with full paths: a nested `/` would not match the listing with
/// its trailing slash.
pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/stations", get(get_stations::<D>))
        .route("/stations/", get(get_stations::<D>))
        .route("/stations/schema", get(schema::<StationOverview>))
        .route("/stations/:id/", get(get_station::<D>))
        .route("/stations/:id/comments/", get(get_comments::<D>))
        .route("/stations/:id/comments/add/", post(add_comment::<D>))
        .route("/stations/:id/trend/", get(get_trend::<D>))
        .route("/stations/:id/recent/", get(get_recent::<D>))
        .with_state(state)
}

fn with_request(why: RequestError, method: Method, uri: &OriginalUri) -> RouteErrorResponse {
    RouteErrorResponse::from(why)
        .with_method(&method)
        .with_path(uri.path())
}

#[derive(Debug, Serialize)]
struct StationsDto {
    stations: Vec<StationOverview>,
}

async fn get_stations<D: Database>(
    uri: OriginalUri,
    State(state): State<WebState<D>>,
    AuthUser(_): AuthUser,
) -> RouteResult<Json<StationsDto>> {
    // fill an empty registry from the feed before the first overview
    if let Some(feed) = &state.feed {
        if let Err(why) = feed.bootstrap(&state.client).await {
            log::warn!("could not bootstrap stations from {}: {}", feed.url(), why);
        }
    }
    state
        .client
        .stations_overview()
        .await
        .map(|stations| Json(StationsDto { stations }))
        .map_err(|why| with_request(why, Method::GET, &uri))
}

async fn get_station<D: Database>(
    uri: OriginalUri,
    Path(id): Path<i32>,
    State(state): State<WebState<D>>,
    AuthUser(_): AuthUser,
) -> RouteResult<Json<StationDetail>> {
    state
        .client
        .station_detail(&Id::new(id))
        .await
        .map(Json)
        .map_err(|why| with_request(why, Method::GET, &uri))
}

#[derive(Debug, Serialize)]
struct CommentsDto {
    comments: Vec<StationComment>,
}

async fn get_comments<D: Database>(
    uri: OriginalUri,
    Path(id): Path<i32>,
    State(state): State<WebState<D>>,
    AuthUser(_): AuthUser,
) -> RouteResult<Json<CommentsDto>> {
    state
        .client
        .station_comments(&Id::new(id))
        .await
        .map(|comments| Json(CommentsDto { comments }))
        .map_err(|why| with_request(why, Method::GET, &uri))
}

#[derive(Debug, Deserialize)]
struct CommentForm {
    #[serde(default)]
    content: String,
}

async fn add_comment<D: Database>(
    uri: OriginalUri,
    Path(id): Path<i32>,
    State(state): State<WebState<D>>,
    AuthUser(user): AuthUser,
    Form(form): Form<CommentForm>,
) -> RouteResult<Json<StationComment>> {
    let station: Id<Station> = Id::new(id);
    let comment = state
        .client
        .add_station_comment(&station, &user, &form.content)
        .await
        .map_err(|why| match why {
            // the page shows the bare message
            invalid @ RequestError::Invalid(_) => RouteErrorResponse::from(invalid),
            why => with_request(why, Method::POST, &uri),
        })?;
    if let Err(why) = state.comments.broadcast_comments().await {
        log::warn!("could not notify comment group: {}", why);
    }
    Ok(Json(comment))
}

async fn get_trend<D: Database>(
    uri: OriginalUri,
    Path(id): Path<i32>,
    State(state): State<WebState<D>>,
) -> RouteResult<Json<Trend>> {
    state
        .client
        .trend(&Id::new(id), state.trend_day)
        .await
        .map(Json)
        .map_err(|why| with_request(why, Method::GET, &uri))
}

async fn get_recent<D: Database>(
    uri: OriginalUri,
    Path(id): Path<i32>,
    State(state): State<WebState<D>>,
    AuthUser(_): AuthUser,
) -> RouteResult<Json<RecentStatus>> {
    state
        .client
        .recent_status(&Id::new(id))
        .await
        .map(Json)
        .map_err(|why| with_request(why, Method::GET, &uri))
}
