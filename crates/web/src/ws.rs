use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use axum_extra::TypedHeader;
use dashboard::{
    channel::{protocol::Frame, Channel, ChannelSession, Outbound, Outbox},
    database::Database,
};
use futures::{SinkExt, StreamExt};
use headers::UserAgent;
use model::{user::User, WithId};

use crate::{auth::MaybeUser, WebState};

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/dashboard/data", get(comments_socket::<D>))
        .route("/dashboard/tour", get(tours_socket::<D>))
        .with_state(state)
}

fn log_upgrade(path: &str, user: &Option<WithId<User>>, user_agent: Option<TypedHeader<UserAgent>>) {
    let agent = user_agent
        .map(|TypedHeader(agent)| agent.as_str().to_owned())
        .unwrap_or_else(|| "unknown client".to_owned());
    match user {
        Some(user) => log::info!("{} connected to {} ({})", user.content.username, path, agent),
        None => log::info!("anonymous connection to {} ({})", path, agent),
    }
}

async fn comments_socket<D: Database>(
    ws: WebSocketUpgrade,
    State(state): State<WebState<D>>,
    MaybeUser(user): MaybeUser,
    user_agent: Option<TypedHeader<UserAgent>>,
) -> impl IntoResponse {
    log_upgrade("/dashboard/data", &user, user_agent);
    let channel = state.comments.clone();
    ws.on_upgrade(move |socket| serve(socket, channel, user))
}

async fn tours_socket<D: Database>(
    ws: WebSocketUpgrade,
    State(state): State<WebState<D>>,
    MaybeUser(user): MaybeUser,
    user_agent: Option<TypedHeader<UserAgent>>,
) -> impl IntoResponse {
    log_upgrade("/dashboard/tour", &user, user_agent);
    let channel = state.tours.clone();
    ws.on_upgrade(move |socket| serve(socket, channel, user))
}

/// Pumps frames between the socket and the channel session until either side
/// closes.
async fn serve<C: Channel>(socket: WebSocket, channel: Arc<C>, user: Option<WithId<User>>) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut outbound) = Outbox::new();
    let session = ChannelSession::open(channel, user, outbox).await;

    loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(Outbound::Text(text)) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => session.receive(Frame::Text(text)).await,
                Some(Ok(Message::Binary(data))) => session.receive(Frame::Binary(data)).await,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // ping and pong are answered by the protocol layer
                Some(Ok(_)) => {}
            },
        }
    }

    log::debug!("{:?} disconnected", session.connection());
    session.close().await;
}
