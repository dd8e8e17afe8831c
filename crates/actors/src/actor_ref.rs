use tokio::sync::{mpsc, oneshot};

use crate::{
    actor::{Actor, ActorError},
    handler::{ActorMessage, Envelope, Handler, Message},
};

pub(crate) type Mailbox<A> = mpsc::Sender<Box<dyn Envelope<A>>>;

pub struct ActorRef<A: Actor> {
    sender: Mailbox<A>,
}

impl<A: Actor> Clone for ActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<A: Actor> ActorRef<A> {
    pub(crate) fn new(sender: Mailbox<A>) -> Self {
        Self { sender }
    }

    /// Sends a message without waiting for it to be handled.
    pub async fn tell<M>(&self, msg: M) -> Result<(), ActorError>
    where
        M: Message,
        A: Handler<M>,
    {
        let message = ActorMessage::new(msg, None);
        self.sender
            .send(Box::new(message))
            .await
            .map_err(|_| ActorError::Stopped)
    }

    /// Sends a message and waits for the handler's response.
    pub async fn ask<M>(&self, msg: M) -> Result<M::Response, ActorError>
    where
        M: Message,
        A: Handler<M>,
    {
        let (response_tx, response_rx) = oneshot::channel();
        let message = ActorMessage::new(msg, Some(response_tx));
        self.sender
            .send(Box::new(message))
            .await
            .map_err(|_| ActorError::Stopped)?;
        response_rx.await.map_err(|_| ActorError::NoAnswer)
    }

    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }
}
