use async_trait::async_trait;
use model::{user::User, WithId};

use super::{group::GroupRef, protocol::Request, publish, Channel, ChannelResult};
use crate::{client::Client, database::Database};

pub const GROUP_NAME: &str = "comments";

/// Comments on stations and replies to comments.
pub struct CommentChannel<D: Database> {
    client: Client<D>,
    group: GroupRef,
}

impl<D: Database> CommentChannel<D> {
    pub fn new(client: Client<D>, group: GroupRef) -> Self {
        Self { client, group }
    }

    pub async fn broadcast_comments(&self) -> ChannelResult<()> {
        let comments = self.client.comment_list().await?;
        publish(&self.group, &comments).await
    }

    pub async fn broadcast_replies(&self) -> ChannelResult<()> {
        let replies = self.client.reply_list().await?;
        publish(&self.group, &replies).await
    }

    async fn add_comment(&self, user: &WithId<User>, request: Request) -> ChannelResult<()> {
        let text = request.text("text")?;
        let station = request.id("id")?;
        self.client.add_comment(user, station, text).await?;
        self.broadcast_comments().await
    }

    async fn add_reply(&self, user: &WithId<User>, request: Request) -> ChannelResult<()> {
        let text = request.text("text")?;
        let comment = request.id("id")?;
        self.client.add_reply(user, comment, text).await?;
        self.broadcast_replies().await
    }
}

#[async_trait]
impl<D: Database> Channel for CommentChannel<D> {
    fn group(&self) -> &GroupRef {
        &self.group
    }

    async fn joined(&self) -> ChannelResult<()> {
        self.broadcast_comments().await?;
        self.broadcast_replies().await
    }

    async fn handle(&self, user: &WithId<User>, request: Request) -> ChannelResult<()> {
        match request.action() {
            Some("add_comment") => self.add_comment(user, request).await,
            Some("add_reply") => self.add_reply(user, request).await,
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use model::station::Station;
    use serde_json::{json, Value};
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::{
        accounts::Registration,
        channel::{
            group::{Group, Members},
            protocol::Frame,
            ChannelSession, Outbound, Outbox,
        },
        memory::MemoryDatabase,
        server::Server,
    };

    async fn setup() -> (Arc<CommentChannel<MemoryDatabase>>, WithId<User>) {
        let client = Server::new(MemoryDatabase::default()).client();
        client
            .sync_stations(vec![Station {
                name: "Market Square".to_owned(),
                latitude: 40.44,
                longitude: -80.0,
                slots: 10,
            }])
            .await
            .unwrap();
        let (user, _) = client
            .register(Registration {
                username: "kim".to_owned(),
                password: "pw".to_owned(),
                confirm_password: "pw".to_owned(),
                email: "kim@example.org".to_owned(),
                first_name: "Kim".to_owned(),
                last_name: "Lee".to_owned(),
            })
            .await
            .unwrap();
        let channel = CommentChannel::new(client, Group::spawn(GROUP_NAME));
        (Arc::new(channel), user)
    }

    async fn next_json(rx: &mut UnboundedReceiver<Outbound>) -> Value {
        match rx.recv().await {
            Some(Outbound::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    fn frame(value: Value) -> Frame {
        Frame::Text(value.to_string())
    }

    #[tokio::test]
    async fn unauthenticated_connections_are_closed() {
        let (channel, _) = setup().await;
        let (outbox, mut rx) = Outbox::new();
        let session = ChannelSession::open(channel.clone(), None, outbox).await;
        assert_eq!(next_json(&mut rx).await, json!({"error": "You must be logged in"}));
        assert_eq!(rx.recv().await, Some(Outbound::Close));

        // admitted before the check, released on teardown
        let connection = session.connection();
        assert!(channel.group().ask(Members).await.unwrap().contains(&connection));
        session.close().await;
        assert!(channel.group().ask(Members).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn joining_sends_current_lists() {
        let (channel, user) = setup().await;
        let (outbox, mut rx) = Outbox::new();
        let _session = ChannelSession::open(channel, Some(user), outbox).await;
        assert_eq!(next_json(&mut rx).await, json!([]));
        assert_eq!(next_json(&mut rx).await, json!([]));
    }

    #[tokio::test]
    async fn comments_and_replies_reach_every_member() {
        let (channel, user) = setup().await;
        let (outbox, mut rx) = Outbox::new();
        let (other_outbox, mut other_rx) = Outbox::new();
        let session = ChannelSession::open(channel.clone(), Some(user.clone()), outbox).await;
        let _other = ChannelSession::open(channel, Some(user), other_outbox).await;
        // the join broadcasts: two for the first member, two more for both
        for _ in 0..4 {
            next_json(&mut rx).await;
        }
        for _ in 0..2 {
            next_json(&mut other_rx).await;
        }

        session
            .receive(frame(json!({"action": "add_comment", "text": "dock 4 jammed", "id": 1})))
            .await;
        for rx in [&mut rx, &mut other_rx] {
            let comments = next_json(rx).await;
            assert_eq!(comments[0]["content"], "dock 4 jammed");
            assert_eq!(comments[0]["commented_to_id"], 1);
            assert_eq!(comments[0]["name"], "Kim");
        }

        session
            .receive(frame(json!({"action": "add_reply", "text": "on my way", "id": "1"})))
            .await;
        let replies = next_json(&mut other_rx).await;
        assert_eq!(replies[0]["replied_to_id"], 1);
        assert_eq!(replies[0]["replier"], "Kim");
    }

    #[tokio::test]
    async fn malformed_requests_get_an_error() {
        let (channel, user) = setup().await;
        let (outbox, mut rx) = Outbox::new();
        let session = ChannelSession::open(channel, Some(user), outbox).await;
        next_json(&mut rx).await;
        next_json(&mut rx).await;

        let cases = [
            (Frame::Binary(vec![0]), "you must send text_data"),
            (Frame::Text("{".to_owned()), "invalid JSON sent to server"),
            (frame(json!({"text": "x"})), "action property not sent in JSON"),
            (
                frame(json!({"action": "add_comment", "id": 1})),
                "\"text\" property not sent in JSON",
            ),
            (
                frame(json!({"action": "add_comment", "text": "x"})),
                "\"id\" property not sent in JSON",
            ),
            (
                frame(json!({"action": "add_comment", "text": "x", "id": 99})),
                "station 99 does not exist",
            ),
        ];
        for (frame, error) in cases {
            session.receive(frame).await;
            assert_eq!(next_json(&mut rx).await, json!({ "error": error }));
        }

        // unknown actions are ignored, the connection keeps working
        session.receive(frame(json!({"action": "dance"}))).await;
        session
            .receive(frame(json!({"action": "add_comment", "text": "ok", "id": 1})))
            .await;
        assert_eq!(next_json(&mut rx).await[0]["content"], "ok");
    }
}
