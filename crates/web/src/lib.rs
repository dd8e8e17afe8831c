pub use crate::common::RouteResult;

use std::{net::SocketAddr, path::Path, sync::Arc};

use axum::Router;
use chrono::NaiveDate;
use citybikes::Feed;
use dashboard::{
    channel::{comments::CommentChannel, group::Group, tours::TourChannel},
    client::Client,
    database::Database,
};
use tokio::net::TcpListener;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    services::{ServeDir, ServeFile},
    set_status::SetStatus,
    trace::TraceLayer,
};

pub mod api;
pub mod auth;
pub mod common;
pub mod config;
pub mod ws;

pub struct WebState<D: Database> {
    pub client: Client<D>,
    pub comments: Arc<CommentChannel<D>>,
    pub tours: Arc<TourChannel<D>>,
    /// Used to fill an empty station registry on demand.
    pub feed: Option<Feed>,
    pub trend_day: NaiveDate,
}

impl<D: Database> Clone for WebState<D> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            comments: self.comments.clone(),
            tours: self.tours.clone(),
            feed: self.feed.clone(),
            trend_day: self.trend_day,
        }
    }
}

impl<D: Database> WebState<D> {
    /// Spawns the comment and tour groups, so this has to be called within
    /// a tokio runtime.
    pub fn new(client: Client<D>, feed: Option<Feed>, trend_day: NaiveDate) -> Self {
        let comments = CommentChannel::new(
            client.clone(),
            Group::spawn(dashboard::channel::comments::GROUP_NAME),
        );
        let tours = TourChannel::new(
            client.clone(),
            Group::spawn(dashboard::channel::tours::GROUP_NAME),
        );
        Self {
            client,
            comments: Arc::new(comments),
            tours: Arc::new(tours),
            feed,
            trend_day,
        }
    }
}

pub fn router<D: Database>(state: WebState<D>, web_root: &Path) -> Router {
    Router::new()
        .nest("/api", api::routes(state.clone()))
        .merge(ws::routes(state))
        .fallback_service(static_content(web_root))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
}

fn static_content(web_root: &Path) -> ServeDir<SetStatus<ServeFile>> {
    ServeDir::new(web_root).not_found_service(ServeFile::new(web_root.join("error404.html")))
}

pub async fn start_web_server(bind: SocketAddr, routes: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    log::info!("listening on {}", bind);
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, Response, StatusCode},
    };
    use chrono::Utc;
    use dashboard::{
        accounts::Registration,
        channel::{ChannelSession, Outbound, Outbox},
        client::NamedReading,
        memory::MemoryDatabase,
        server::Server,
    };
    use http_body_util::BodyExt;
    use model::{
        station::{Reading, Station},
        trend::default_trend_day,
    };
    use serde_json::{json, Value};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tower::ServiceExt;

    use super::*;

    fn app_with_state() -> (Router, WebState<MemoryDatabase>) {
        let client = Server::new(MemoryDatabase::default()).client();
        let state = WebState::new(client, None, default_trend_day());
        (router(state.clone(), Path::new("./resources/www/")), state)
    }

    fn app() -> (Router, Client<MemoryDatabase>) {
        let (router, state) = app_with_state();
        (router, state.client)
    }

    async fn next_json(rx: &mut UnboundedReceiver<Outbound>) -> Value {
        match rx.recv().await {
            Some(Outbound::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    async fn body(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::post("/api/auth/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "username": "robin",
                            "password": "hunter22",
                            "confirm_password": "hunter22",
                            "email": "robin@example.org",
                            "first_name": "Robin",
                            "last_name": "Hood",
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.contains("HttpOnly"));
        cookie.split(';').next().unwrap().to_owned()
    }

    async fn seed_station(client: &Client<MemoryDatabase>) {
        client
            .sync_stations(vec![Station {
                name: "Market Square".to_owned(),
                latitude: 40.44,
                longitude: -80.0,
                slots: 20,
            }])
            .await
            .unwrap();
        client
            .record_status(
                vec![NamedReading {
                    name: "Market Square".to_owned(),
                    reading: Reading {
                        free_bikes: 5,
                        empty_slots: 15,
                    },
                }],
                Utc::now(),
            )
            .await
            .unwrap();
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut request = Request::get(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        request.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn ping() {
        let (app, _) = app();
        let response = app.oneshot(get("/api/ping", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, json!({"message": "pong!"}));
    }

    #[tokio::test]
    async fn stations_require_login() {
        let (app, _) = app();
        let response = app.oneshot(get("/api/stations/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn stations_overview_after_register() {
        let (app, client) = app();
        seed_station(&client).await;
        let cookie = register(&app).await;

        let response = app
            .clone()
            .oneshot(get("/api/stations/", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stations = body(response).await;
        assert_eq!(stations["stations"][0]["pct_full"], 25);
        assert_eq!(stations["stations"][0]["status"], "ok");

        let response = app
            .clone()
            .oneshot(get("/api/auth/me", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(body(response).await["first_name"], "Robin");
    }

    #[tokio::test]
    async fn stations_list_with_and_without_slash() {
        let (app, client) = app();
        seed_station(&client).await;
        let cookie = register(&app).await;
        for uri in ["/api/stations/", "/api/stations", "/api/stations/1/"] {
            let response = app.clone().oneshot(get(uri, Some(&cookie))).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn missing_station_is_not_found() {
        let (app, _) = app();
        let cookie = register(&app).await;
        let response = app
            .oneshot(get("/api/stations/42/", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_comment_is_rejected() {
        let (app, state) = app_with_state();
        let client = state.client.clone();
        seed_station(&client).await;
        let cookie = register(&app).await;
        let id = client.stations_overview().await.unwrap()[0].id.raw();

        let (watcher, _) = client
            .register(Registration {
                username: "lee".to_owned(),
                password: "pw".to_owned(),
                confirm_password: "pw".to_owned(),
                email: "lee@example.org".to_owned(),
                first_name: "Lee".to_owned(),
                last_name: "Park".to_owned(),
            })
            .await
            .unwrap();
        let (outbox, mut rx) = Outbox::new();
        let _session = ChannelSession::open(state.comments.clone(), Some(watcher), outbox).await;
        // comments and replies on join
        assert_eq!(next_json(&mut rx).await, json!([]));
        assert_eq!(next_json(&mut rx).await, json!([]));

        let add = |content: &str| {
            Request::post(format!("/api/stations/{}/comments/add/", id))
                .header(header::COOKIE, cookie.as_str())
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("content={}", content)))
                .unwrap()
        };

        let response = app.clone().oneshot(add("+++")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(response).await, json!({"error": "Empty comment."}));

        assert!(rx.try_recv().is_err());

        let response = app.clone().oneshot(add("dock+3+is+broken")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await["author"], "robin");

        let pushed = next_json(&mut rx).await;
        assert_eq!(pushed[0]["content"], "dock 3 is broken");
        assert_eq!(pushed[0]["commented_to_id"], id);
        assert_eq!(pushed[0]["commentor"], "Robin");

        let response = app
            .oneshot(get(&format!("/api/stations/{}/comments/", id), Some(&cookie)))
            .await
            .unwrap();
        let comments = body(response).await;
        assert_eq!(comments["comments"][0]["content"], "dock 3 is broken");
    }

    #[tokio::test]
    async fn trend_is_public() {
        let (app, _) = app();
        let response = app.oneshot(get("/api/stations/1/trend/", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, json!({"granularity": "day", "series": []}));
    }

    #[tokio::test]
    async fn unknown_api_route() {
        let (app, _) = app();
        let response = app.oneshot(get("/api/nothing", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
