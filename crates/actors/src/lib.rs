use std::panic::AssertUnwindSafe;

use actor::{Actor, SupervisionStrategy};
use actor_ref::ActorRef;
use futures::FutureExt;
use tokio::sync::mpsc;

pub mod actor;
pub mod actor_ref;
pub mod handler;

/// Mailbox size used by `run`.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// Creates and runs an actor. If the actor panics, it is either restared, resumed
/// or stoped acording to the behavior specified by `Actor::on_fail()`.
pub fn run<A, F>(actor_factory: F) -> ActorRef<A>
where
    A: Actor,
    F: 'static + Send + Fn() -> A,
{
    run_with_capacity(actor_factory, DEFAULT_MAILBOX_CAPACITY)
}

/// Like `run`, with an explicit mailbox size. Senders wait while the mailbox
/// is full.
pub fn run_with_capacity<A, F>(actor_factory: F, capacity: usize) -> ActorRef<A>
where
    A: Actor,
    F: 'static + Send + Fn() -> A,
{
    let (tx, mut rx) = mpsc::channel(capacity.max(1));
    let mut actor = actor_factory();
    let actor_ref = ActorRef::new(tx);

    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            let result = AssertUnwindSafe(envelope.deliver(&mut actor))
                .catch_unwind()
                .await;
            if let Err(why) = result {
                log::error!("actor panicked: {:?}", why);
                match actor.on_fail(why) {
                    SupervisionStrategy::Restart => {
                        actor = actor_factory();
                    }
                    SupervisionStrategy::Resume => {}
                    SupervisionStrategy::Stop => {
                        break;
                    }
                };
            }
        }
    });

    actor_ref
}
