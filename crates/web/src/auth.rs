use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use dashboard::{
    accounts::{Credentials, Registration},
    database::Database,
};
use model::{user::User, WithId};
use serde_json::{json, Value};
use tower_cookies::{cookie::SameSite, Cookie, Cookies};

use crate::{common::RouteErrorResponse, RouteResult, WebState};

pub const SESSION_COOKIE: &str = "sessionid";

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

async fn extract_cookies<S: Send + Sync>(parts: &mut Parts, state: &S) -> RouteResult<Cookies> {
    Cookies::from_request_parts(parts, state)
        .await
        .map_err(|(status, message)| RouteErrorResponse::new(status).with_message(message))
}

/// The user of the session cookie, if any.
pub struct MaybeUser(pub Option<WithId<User>>);

/// Rejects requests without a valid session with `401`.
pub struct AuthUser(pub WithId<User>);

#[async_trait]
impl<D: Database> FromRequestParts<WebState<D>> for MaybeUser {
    type Rejection = RouteErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &WebState<D>,
    ) -> Result<Self, Self::Rejection> {
        let cookies = extract_cookies(parts, state).await?;
        let Some(token) = cookies.get(SESSION_COOKIE).map(|c| c.value().to_owned()) else {
            return Ok(Self(None));
        };
        Ok(Self(state.client.session_user(&token).await?))
    }
}

#[async_trait]
impl<D: Database> FromRequestParts<WebState<D>> for AuthUser {
    type Rejection = RouteErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &WebState<D>,
    ) -> Result<Self, Self::Rejection> {
        match MaybeUser::from_request_parts(parts, state).await? {
            MaybeUser(Some(user)) => Ok(Self(user)),
            MaybeUser(None) => Err(RouteErrorResponse::unauthorized()),
        }
    }
}

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/register", post(register::<D>))
        .route("/login", post(login::<D>))
        .route("/logout", post(logout::<D>))
        .route("/me", get(me))
        .with_state(state)
}

async fn register<D: Database>(
    State(state): State<WebState<D>>,
    cookies: Cookies,
    Json(form): Json<Registration>,
) -> RouteResult<(StatusCode, Json<WithId<User>>)> {
    let (user, session) = state.client.register(form).await?;
    cookies.add(session_cookie(session.token));
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login<D: Database>(
    State(state): State<WebState<D>>,
    cookies: Cookies,
    Json(credentials): Json<Credentials>,
) -> RouteResult<Json<WithId<User>>> {
    let (user, session) = state.client.login(credentials).await?;
    log::info!("user {} logged in", user.content.username);
    cookies.add(session_cookie(session.token));
    Ok(Json(user))
}

async fn logout<D: Database>(
    State(state): State<WebState<D>>,
    cookies: Cookies,
) -> RouteResult<Json<Value>> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        state.client.logout(cookie.value()).await?;
        cookies.remove(session_cookie(String::new()));
    }
    Ok(Json(json!({ "message": "logged out" })))
}

async fn me(AuthUser(user): AuthUser) -> Json<WithId<User>> {
    Json(user)
}
