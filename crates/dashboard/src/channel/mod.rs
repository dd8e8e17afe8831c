//! Live channels. Every connection joins the group of its channel, mutations
//! are answered by publishing the complete updated list to the whole group.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use model::{user::User, WithId};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::RequestError;

use self::{
    group::{ConnectionId, GroupRef, Join, Leave, Publish},
    protocol::{Frame, Request},
};

pub mod comments;
pub mod group;
pub mod protocol;
pub mod tours;

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelError {
    NotLoggedIn,
    NotText,
    InvalidJson,
    MissingAction,
    MissingProperty(&'static str),
    MissingProperties,
    /// The request was rejected, the message is meant for the user.
    Rejected(String),
    Internal,
}

pub type ChannelResult<T> = Result<T, ChannelError>;

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoggedIn => write!(f, "You must be logged in"),
            Self::NotText => write!(f, "you must send text_data"),
            Self::InvalidJson => write!(f, "invalid JSON sent to server"),
            Self::MissingAction => write!(f, "action property not sent in JSON"),
            Self::MissingProperty(key) => write!(f, "\"{}\" property not sent in JSON", key),
            Self::MissingProperties => write!(f, "missing json properties"),
            Self::Rejected(message) => write!(f, "{}", message),
            Self::Internal => write!(f, "internal server error"),
        }
    }
}

impl std::error::Error for ChannelError {}

impl ChannelError {
    /// The error frame sent to the client.
    pub fn payload(&self) -> String {
        json!({ "error": self.to_string() }).to_string()
    }
}

impl From<RequestError> for ChannelError {
    fn from(value: RequestError) -> Self {
        match value {
            RequestError::Invalid(message) => Self::Rejected(message),
            RequestError::NotFound => Self::Rejected("not found".to_owned()),
            RequestError::Conflict => Self::Rejected("already exists".to_owned()),
            RequestError::Other(why) => {
                log::error!("channel request failed: {}", why);
                Self::Internal
            }
        }
    }
}

/// A frame sent to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// The sending half of a connection.
#[derive(Debug, Clone)]
pub struct Outbox(mpsc::UnboundedSender<Outbound>);

impl Outbox {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    /// Returns `false` if the connection is gone.
    pub fn send(&self, text: String) -> bool {
        self.0.send(Outbound::Text(text)).is_ok()
    }

    pub fn error(&self, error: &ChannelError) {
        self.send(error.payload());
    }

    pub fn close(&self) {
        let _ = self.0.send(Outbound::Close);
    }
}

/// Serializes `value` and publishes it to the group.
pub async fn publish<T>(group: &GroupRef, value: &T) -> ChannelResult<()>
where
    T: Serialize + Sync,
{
    let text = serde_json::to_string(value).map_err(|why| {
        log::error!("failed to serialize broadcast: {}", why);
        ChannelError::Internal
    })?;
    group.tell(Publish(text)).await.map_err(|why| {
        log::error!("failed to publish to group: {}", why);
        ChannelError::Internal
    })
}

#[async_trait]
pub trait Channel: Send + Sync + 'static {
    fn group(&self) -> &GroupRef;

    /// Called after an authenticated connection joined the group.
    async fn joined(&self) -> ChannelResult<()> {
        Ok(())
    }

    /// Handles one request of `user`. Unknown actions are ignored.
    async fn handle(&self, user: &WithId<User>, request: Request) -> ChannelResult<()>;
}

/// One connection to a channel.
pub struct ChannelSession<C: Channel> {
    channel: Arc<C>,
    connection: ConnectionId,
    user: Option<WithId<User>>,
    outbox: Outbox,
}

impl<C: Channel> ChannelSession<C> {
    /// Joins the group. Connections without a user receive an error and get
    /// closed, they stay in the group until `close` is called.
    pub async fn open(channel: Arc<C>, user: Option<WithId<User>>, outbox: Outbox) -> Self {
        let connection = ConnectionId::next();
        let join = Join {
            connection,
            outbox: outbox.clone(),
        };
        if let Err(why) = channel.group().ask(join).await {
            log::error!("{:?} could not join group: {}", connection, why);
        }
        match &user {
            None => {
                outbox.error(&ChannelError::NotLoggedIn);
                outbox.close();
            }
            Some(_) => {
                if let Err(why) = channel.joined().await {
                    outbox.error(&why);
                }
            }
        }
        Self {
            channel,
            connection,
            user,
            outbox,
        }
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Handles a frame from the client. Errors are sent back to this
    /// connection only, the connection stays open.
    pub async fn receive(&self, frame: Frame) {
        let Some(user) = &self.user else {
            return;
        };
        let result = match protocol::parse(frame) {
            Ok(request) => self.channel.handle(user, request).await,
            Err(why) => Err(why),
        };
        if let Err(why) = result {
            log::debug!("{:?}: {}", self.connection, why);
            self.outbox.error(&why);
        }
    }

    pub async fn close(self) {
        if let Err(why) = self.channel.group().ask(Leave(self.connection)).await {
            log::warn!("{:?} could not leave group: {}", self.connection, why);
        }
    }
}
