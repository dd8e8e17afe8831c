use async_trait::async_trait;
use model::{user::User, WithId};

use super::{group::GroupRef, protocol::Request, publish, Channel, ChannelError, ChannelResult};
use crate::{client::Client, database::Database};

pub const GROUP_NAME: &str = "tours";

/// Service tour planning: tours, their stops and the tasks at each stop.
pub struct TourChannel<D: Database> {
    client: Client<D>,
    group: GroupRef,
}

fn require(request: &Request, keys: &[&str]) -> ChannelResult<()> {
    if request.has_all(keys) {
        Ok(())
    } else {
        Err(ChannelError::MissingProperties)
    }
}

impl<D: Database> TourChannel<D> {
    pub fn new(client: Client<D>, group: GroupRef) -> Self {
        Self { client, group }
    }

    pub async fn broadcast_tours(&self) -> ChannelResult<()> {
        publish(&self.group, &self.client.tour_list().await?).await
    }

    pub async fn broadcast_stops(&self) -> ChannelResult<()> {
        publish(&self.group, &self.client.stop_list().await?).await
    }

    pub async fn broadcast_tasks(&self) -> ChannelResult<()> {
        publish(&self.group, &self.client.task_list().await?).await
    }

    async fn create_tour(&self, request: Request) -> ChannelResult<()> {
        require(&request, &["date", "user"])?;
        let due_date = request.date("date")?;
        let assigned_to = request.id("user")?;
        self.client.create_tour(due_date, assigned_to).await?;
        self.broadcast_tours().await
    }

    async fn add_stop(&self, request: Request) -> ChannelResult<()> {
        require(&request, &["tour_id", "station_id", "order"])?;
        let tour = request.id("tour_id")?;
        let station = request.id("station_id")?;
        let order = request.int("order")?;
        self.client.add_stop(tour, station, order).await?;
        self.broadcast_stops().await
    }

    async fn add_task(&self, request: Request) -> ChannelResult<()> {
        require(&request, &["stop_id", "text"])?;
        let stop = request.id("stop_id")?;
        let content = request.text("text")?;
        self.client.add_task(stop, content).await?;
        self.broadcast_tasks().await
    }
}

#[async_trait]
impl<D: Database> Channel for TourChannel<D> {
    fn group(&self) -> &GroupRef {
        &self.group
    }

    async fn joined(&self) -> ChannelResult<()> {
        self.broadcast_tours().await?;
        self.broadcast_stops().await?;
        self.broadcast_tasks().await
    }

    async fn handle(&self, _user: &WithId<User>, request: Request) -> ChannelResult<()> {
        match request.action() {
            Some("create_tour") => self.create_tour(request).await,
            Some("add_stop") => self.add_stop(request).await,
            Some("add_task") => self.add_task(request).await,
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
        channel::{group::Group, protocol::Frame, ChannelSession, Outbound, Outbox},
        memory::MemoryDatabase,
        server::Server,
    };

    async fn next_json(rx: &mut UnboundedReceiver<Outbound>) -> Value {
        match rx.recv().await {
            Some(Outbound::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    async fn send(session: &ChannelSession<TourChannel<MemoryDatabase>>, value: Value) {
        session.receive(Frame::Text(value.to_string())).await;
    }

    #[tokio::test]
    async fn plans_a_tour() {
        let client = Server::new(MemoryDatabase::default()).client();
        client
            .sync_stations(vec![Station {
                name: "Liberty Ave".to_owned(),
                latitude: 40.44,
                longitude: -80.0,
                slots: 19,
            }])
            .await
            .unwrap();
        let (user, _) = client
            .register(Registration {
                username: "robin".to_owned(),
                password: "pw".to_owned(),
                confirm_password: "pw".to_owned(),
                email: "robin@example.org".to_owned(),
                first_name: "Robin".to_owned(),
                last_name: "Fischer".to_owned(),
            })
            .await
            .unwrap();
        let channel = Arc::new(TourChannel::new(client, Group::spawn(GROUP_NAME)));
        let (outbox, mut rx) = Outbox::new();
        let session = ChannelSession::open(channel, Some(user.clone()), outbox).await;
        for _ in 0..3 {
            assert_eq!(next_json(&mut rx).await, json!([]));
        }

        send(&session, json!({"action": "create_tour", "date": "2025-11-20"})).await;
        assert_eq!(
            next_json(&mut rx).await,
            json!({"error": "missing json properties"})
        );

        send(
            &session,
            json!({"action": "create_tour", "date": "2025-11-20", "user": user.id.raw()}),
        )
        .await;
        assert_eq!(
            next_json(&mut rx).await,
            json!([{"id": 1, "due_date": "2025-11-20", "assigned_to": "Robin"}])
        );

        send(
            &session,
            json!({"action": "add_stop", "tour_id": 1, "station_id": 1, "order": 1}),
        )
        .await;
        assert_eq!(
            next_json(&mut rx).await,
            json!([{
                "id": 1,
                "tour_id": 1,
                "tour_date": "2025-11-20",
                "station_name": "Liberty Ave",
                "order": 1,
            }])
        );

        send(&session, json!({"action": "add_task", "stop_id": 1, "text": "swap dock 3"})).await;
        assert_eq!(
            next_json(&mut rx).await,
            json!([{
                "id": 1,
                "stop_id": 1,
                "stop_order": 1,
                "stop_name": "Liberty Ave",
                "content": "swap dock 3",
            }])
        );

        send(
            &session,
            json!({"action": "add_stop", "tour_id": 1, "station_id": 1, "order": -3}),
        )
        .await;
        assert_eq!(
            next_json(&mut rx).await,
            json!({"error": "Stop order must not be negative."})
        );

        send(&session, json!({"action": "add_task", "stop_id": 7, "text": "x"})).await;
        assert_eq!(
            next_json(&mut rx).await,
            json!({"error": "stop 7 does not exist"})
        );
        send(&session, json!({"action": "add_stop", "tour_id": 1})).await;
        assert_eq!(
            next_json(&mut rx).await,
            json!({"error": "missing json properties"})
        );
    }
}
