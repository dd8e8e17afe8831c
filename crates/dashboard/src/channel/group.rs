use std::sync::atomic::{AtomicU64, Ordering};

use actors::{
    actor::Actor,
    actor_ref::ActorRef,
    handler::{Handler, Message},
};
use async_trait::async_trait;
use indexmap::IndexMap;

use super::Outbox;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The members of a broadcast group, in the order they joined.
pub struct Group {
    name: &'static str,
    members: IndexMap<ConnectionId, Outbox>,
}

pub type GroupRef = ActorRef<Group>;

impl Actor for Group {}

impl Group {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            members: IndexMap::new(),
        }
    }

    /// Starts the group actor. A restarted group starts without members.
    pub fn spawn(name: &'static str) -> GroupRef {
        actors::run(move || Group::new(name))
    }
}

pub struct Join {
    pub connection: ConnectionId,
    pub outbox: Outbox,
}

impl Message for Join {
    type Response = ();
}

pub struct Leave(pub ConnectionId);

impl Message for Leave {
    type Response = ();
}

/// Sends a text frame to every member. Responds with the number of members
/// that received it.
pub struct Publish(pub String);

impl Message for Publish {
    type Response = usize;
}

pub struct Members;

impl Message for Members {
    type Response = Vec<ConnectionId>;
}

#[async_trait]
impl Handler<Join> for Group {
    async fn handle(&mut self, message: Join) {
        self.members.insert(message.connection, message.outbox);
        log::debug!(
            "{:?} joined group {} ({} members)",
            message.connection,
            self.name,
            self.members.len()
        );
    }
}

#[async_trait]
impl Handler<Leave> for Group {
    async fn handle(&mut self, message: Leave) {
        if self.members.shift_remove(&message.0).is_some() {
            log::debug!("{:?} left group {}", message.0, self.name);
        }
    }
}

#[async_trait]
impl Handler<Publish> for Group {
    async fn handle(&mut self, message: Publish) -> usize {
        let before = self.members.len();
        self.members
            .retain(|_, outbox| outbox.send(message.0.clone()));
        if self.members.len() < before {
            log::debug!(
                "dropped {} closed connections from group {}",
                before - self.members.len(),
                self.name
            );
        }
        self.members.len()
    }
}

#[async_trait]
impl Handler<Members> for Group {
    async fn handle(&mut self, _: Members) -> Vec<ConnectionId> {
        self.members.keys().copied().collect()
    }
}
