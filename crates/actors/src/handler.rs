use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::Actor;

#[async_trait]
pub trait Handler<M>: Actor
where
    M: Message,
{
    async fn handle(&mut self, message: M) -> M::Response;
}

/// Messages are moved into the handler. If a handler panics the message is
/// gone, the asking side then sees `ActorError::NoAnswer`.
pub trait Message: Send + 'static {
    type Response: Send + 'static;
}

#[async_trait]
pub(crate) trait Envelope<A: Actor>: Send {
    async fn deliver(self: Box<Self>, actor: &mut A);
}

pub(crate) struct ActorMessage<M>
where
    M: Message,
{
    message: M,
    respond_to: Option<oneshot::Sender<M::Response>>,
}

impl<M> ActorMessage<M>
where
    M: Message,
{
    pub fn new(message: M, respond_to: Option<oneshot::Sender<M::Response>>) -> Self {
        Self {
            message,
            respond_to,
        }
    }
}

#[async_trait]
impl<M, A> Envelope<A> for ActorMessage<M>
where
    M: Message,
    A: Handler<M>,
{
    async fn deliver(self: Box<Self>, actor: &mut A) {
        let ActorMessage {
            message,
            respond_to,
        } = *self;
        let result = actor.handle(message).await;

        if let Some(respond_to) = respond_to {
            respond_to
                .send(result)
                .unwrap_or_else(|_| log::debug!("asking side is gone, dropping answer"));
        }
    }
}
