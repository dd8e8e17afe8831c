use std::collections::HashMap;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use model::{
    comment::{
        display_name, Comment, CommentListItem, Reply, ReplyListItem, StationComment,
        CONTENT_MAX_LEN,
    },
    station::{Reading, Station, StationDetail, StationOverview},
    status::{RecentStatus, Snapshot, StatusLog},
    tour::{Stop, StopListItem, Task, TaskListItem, Tour, TourListItem, TASK_MAX_LEN},
    trend::{day_window, utc_window, Trend},
    user::{Session, User},
    WithId,
};
use rand::Rng;
use utility::{id::Id, let_also::LetAlso};

use crate::{
    accounts::{self, Credentials, Registration, INVALID_CREDENTIALS, USERNAME_TAKEN},
    database::{
        CommentRepo, Database, DatabaseError, DatabaseTransaction, StationRepo, StatusRepo,
        TourRepo, UserRepo,
    },
    RequestError, RequestResult,
};

/// Number of comments shown on the station detail page.
pub const STATION_COMMENT_LIMIT: i64 = 20;
/// Number of status logs in the recent status chart.
pub const RECENT_STATUS_LIMIT: i64 = 24;
/// Capacity assumed by the seeder for stations without slots.
pub const SEED_FALLBACK_SLOTS: i32 = 20;

/// A live count of a station, as reported by the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedReading {
    pub name: String,
    pub reading: Reading,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub status_logs: usize,
    pub snapshots: usize,
    /// Readings of stations that are not in the registry.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct Client<D>
where
    D: Database,
{
    pub database: D,
}

fn check_content(label: &str, content: &str, max_len: usize) -> RequestResult<()> {
    if content.chars().count() > max_len {
        Err(RequestError::invalid(format!(
            "{} must have at most {} characters.",
            label, max_len
        )))
    } else {
        Ok(())
    }
}

/// Turns a missing referenced entity into a message for the user.
fn unresolved<T>(result: Result<T, DatabaseError>, what: &str, id: i32) -> RequestResult<T> {
    match result {
        Err(DatabaseError::NotFound) => {
            Err(RequestError::invalid(format!("{} {} does not exist", what, id)))
        }
        other => other.map_err(RequestError::from),
    }
}

impl<D> Client<D>
where
    D: Database,
{
    pub(crate) fn new(database: D) -> Self {
        Self { database }
    }
}

// stations and status
impl<D> Client<D>
where
    D: Database,
{
    pub async fn has_stations(&self) -> RequestResult<bool> {
        Ok(self.database.auto().count_stations().await? > 0)
    }

    pub async fn stations_overview(&self) -> RequestResult<Vec<StationOverview>> {
        let mut db = self.database.auto();
        let stations = db.get_stations().await?;
        let mut latest: HashMap<Id<Station>, Reading> = db
            .latest_status_logs()
            .await?
            .iter()
            .map(|log| (log.station, Reading::from(log)))
            .collect();
        stations
            .into_iter()
            .map(|station| {
                let reading = latest.remove(&station.id);
                StationOverview::new(station, reading)
            })
            .collect::<Vec<_>>()
            .let_owned(Ok)
    }

    pub async fn station_detail(&self, id: &Id<Station>) -> RequestResult<StationDetail> {
        let mut db = self.database.auto();
        let station = db.get_station(id).await?;
        let latest = db
            .status_logs_of_station(id, 1)
            .await?
            .first()
            .map(Reading::from);
        Ok(StationDetail::new(station, latest))
    }

    pub async fn recent_status(&self, id: &Id<Station>) -> RequestResult<RecentStatus> {
        let mut db = self.database.auto();
        db.get_station(id).await?;
        db.status_logs_of_station(id, RECENT_STATUS_LIMIT)
            .await?
            .let_owned(RecentStatus::from_newest_first)
            .let_owned(Ok)
    }

    /// Hourly free bike averages of `day` (UTC). Falls back to one whole-day
    /// average over the local calendar day when no hourly data exists.
    /// Unknown stations simply have no data.
    pub async fn trend(&self, id: &Id<Station>, day: NaiveDate) -> RequestResult<Trend> {
        let mut db = self.database.auto();
        let (start, end) = utc_window(day);
        let hourly = db.snapshots_between(id, start, end).await?;
        if !hourly.is_empty() {
            return Ok(Trend::hourly(&hourly));
        }
        let (start, end) = day_window(day, &Local);
        let daily = db.snapshots_between(id, start, end).await?;
        Ok(Trend::daily(day, &daily))
    }

    /// Upserts the stations by name. Returns the number of stations written.
    pub async fn sync_stations(&self, stations: Vec<Station>) -> RequestResult<usize> {
        let mut tx = self.database.transaction().await?;
        let mut count = 0;
        for station in stations {
            tx.put_station(station).await?;
            count += 1;
        }
        tx.commit().await?;
        Ok(count)
    }

    /// Writes a status log and a snapshot for every reading of a known
    /// station.
    pub async fn record_status(
        &self,
        readings: Vec<NamedReading>,
        at: DateTime<Utc>,
    ) -> RequestResult<StatusReport> {
        let mut tx = self.database.transaction().await?;
        let mut report = StatusReport::default();
        for NamedReading { name, reading } in readings {
            let Some(station) = tx.station_by_name(&name).await? else {
                report.skipped += 1;
                continue;
            };
            tx.put_status_log(StatusLog::record(station.id, reading, at))
                .await?;
            report.status_logs += 1;
            if tx.put_snapshot(Snapshot::record(station.id, reading, at)).await? {
                report.snapshots += 1;
            }
        }
        tx.commit().await?;
        Ok(report)
    }

    /// Replaces the snapshots of `day` (UTC) of every station with 24 hourly
    /// random readings. Returns the number of snapshots inserted.
    pub async fn seed_snapshots<R>(&self, day: NaiveDate, rng: &mut R) -> RequestResult<usize>
    where
        R: Rng + Send,
    {
        let (start, end) = utc_window(day);
        let mut tx = self.database.transaction().await?;
        let stations = tx.get_stations().await?;
        let mut inserted = 0;
        for station in stations {
            tx.delete_snapshots_between(&station.id, start, end).await?;
            let slots = match station.content.slots {
                0 => SEED_FALLBACK_SLOTS,
                slots => slots,
            };
            let snapshots: Vec<Snapshot> = (0..24)
                .map(|hour| {
                    let free_bikes = rng.gen_range(0..=slots.max(0));
                    Snapshot {
                        station: station.id,
                        timestamp: start + Duration::hours(hour),
                        free_bikes,
                        empty_slots: (slots - free_bikes).max(0),
                    }
                })
                .collect();
            for snapshot in snapshots {
                if tx.put_snapshot(snapshot).await? {
                    inserted += 1;
                }
            }
        }
        tx.commit().await?;
        Ok(inserted)
    }
}

// comments
impl<D> Client<D>
where
    D: Database,
{
    pub async fn station_comments(&self, id: &Id<Station>) -> RequestResult<Vec<StationComment>> {
        let mut db = self.database.auto();
        db.get_station(id).await?;
        db.comments_of_station(id, STATION_COMMENT_LIMIT)
            .await?
            .into_iter()
            .map(StationComment::from)
            .collect::<Vec<_>>()
            .let_owned(Ok)
    }

    /// Adds a comment from the station detail page. The author is shown with
    /// the username. Fails with `NotFound` if the station does not exist.
    pub async fn add_station_comment(
        &self,
        station: &Id<Station>,
        author: &WithId<User>,
        content: &str,
    ) -> RequestResult<StationComment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(RequestError::invalid("Empty comment."));
        }
        check_content("Comment", content, CONTENT_MAX_LEN)?;
        let mut db = self.database.auto();
        db.get_station(station).await?;
        db.put_comment(Comment {
            commented_to: *station,
            commentor: author.id,
            content: content.to_owned(),
            name: display_name(&author.content.username),
            creation_time: Utc::now(),
        })
        .await?
        .let_owned(StationComment::from)
        .let_owned(Ok)
    }

    /// Adds a comment from the live comment channel. The author is shown with
    /// the first name.
    pub async fn add_comment(
        &self,
        author: &WithId<User>,
        station: Id<Station>,
        content: String,
    ) -> RequestResult<WithId<Comment>> {
        check_content("Comment", &content, CONTENT_MAX_LEN)?;
        let mut db = self.database.auto();
        unresolved(db.get_station(&station).await, "station", station.raw())?;
        db.put_comment(Comment {
            commented_to: station,
            commentor: author.id,
            content,
            name: display_name(&author.content.first_name),
            creation_time: Utc::now(),
        })
        .await
        .map_err(RequestError::from)
    }

    pub async fn add_reply(
        &self,
        author: &WithId<User>,
        comment: Id<Comment>,
        content: String,
    ) -> RequestResult<WithId<Reply>> {
        check_content("Reply", &content, CONTENT_MAX_LEN)?;
        let mut db = self.database.auto();
        unresolved(db.get_comment(&comment).await, "comment", comment.raw())?;
        db.put_reply(Reply {
            reply_to: comment,
            replier: author.id,
            content,
            name: display_name(&author.content.first_name),
            creation_time: Utc::now(),
        })
        .await
        .map_err(RequestError::from)
    }

    pub async fn comment_list(&self) -> RequestResult<Vec<CommentListItem>> {
        Ok(self.database.auto().comment_list().await?)
    }

    pub async fn reply_list(&self) -> RequestResult<Vec<ReplyListItem>> {
        Ok(self.database.auto().reply_list().await?)
    }
}

// tours
impl<D> Client<D>
where
    D: Database,
{
    pub async fn create_tour(
        &self,
        due_date: NaiveDate,
        assigned_to: Id<User>,
    ) -> RequestResult<WithId<Tour>> {
        let mut db = self.database.auto();
        unresolved(db.get_user(&assigned_to).await, "user", assigned_to.raw())?;
        Ok(db
            .put_tour(Tour {
                due_date,
                assigned_to,
            })
            .await?)
    }

    pub async fn add_stop(
        &self,
        tour: Id<Tour>,
        station: Id<Station>,
        order: i32,
    ) -> RequestResult<WithId<Stop>> {
        if order < 0 {
            return Err(RequestError::invalid("Stop order must not be negative."));
        }
        let mut db = self.database.auto();
        unresolved(db.get_tour(&tour).await, "tour", tour.raw())?;
        unresolved(db.get_station(&station).await, "station", station.raw())?;
        Ok(db
            .put_stop(Stop {
                tour,
                station,
                order,
            })
            .await?)
    }

    pub async fn add_task(&self, stop: Id<Stop>, content: String) -> RequestResult<WithId<Task>> {
        check_content("Task", &content, TASK_MAX_LEN)?;
        let mut db = self.database.auto();
        unresolved(db.get_stop(&stop).await, "stop", stop.raw())?;
        Ok(db.put_task(Task { stop, content }).await?)
    }

    pub async fn tour_list(&self) -> RequestResult<Vec<TourListItem>> {
        Ok(self.database.auto().tour_list().await?)
    }

    pub async fn stop_list(&self) -> RequestResult<Vec<StopListItem>> {
        Ok(self.database.auto().stop_list().await?)
    }

    pub async fn task_list(&self) -> RequestResult<Vec<TaskListItem>> {
        Ok(self.database.auto().task_list().await?)
    }
}

// accounts
impl<D> Client<D>
where
    D: Database,
{
    /// Creates the account and logs it in.
    pub async fn register(&self, form: Registration) -> RequestResult<(WithId<User>, Session)> {
        let account = form.into_account()?;
        let mut tx = self.database.transaction().await?;
        let user = match tx.put_account(account).await {
            Err(DatabaseError::Conflict) => return Err(RequestError::invalid(USERNAME_TAKEN)),
            result => result?,
        };
        let session = Session {
            token: accounts::new_session_token(),
            user: user.id,
            created_at: Utc::now(),
        };
        tx.put_session(session.clone()).await?;
        tx.commit().await?;
        log::info!("registered user {}", user.content.username);
        Ok((user, session))
    }

    pub async fn login(&self, credentials: Credentials) -> RequestResult<(WithId<User>, Session)> {
        credentials.validate()?;
        let mut db = self.database.auto();
        let (id, account) = db
            .account_by_username(&credentials.username)
            .await?
            .filter(|(_, account)| {
                accounts::verify_password(&credentials.password, &account.password_hash)
            })
            .ok_or_else(|| RequestError::invalid(INVALID_CREDENTIALS))?;
        let session = Session {
            token: accounts::new_session_token(),
            user: id,
            created_at: Utc::now(),
        };
        db.put_session(session.clone()).await?;
        Ok((WithId::new(id, account.user), session))
    }

    pub async fn logout(&self, token: &str) -> RequestResult<()> {
        Ok(self.database.auto().delete_session(token).await?)
    }

    pub async fn session_user(&self, token: &str) -> RequestResult<Option<WithId<User>>> {
        Ok(self.database.auto().user_by_session(token).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};
    use model::{station::OccupancyStatus, trend::Granularity};
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{memory::MemoryDatabase, server::Server};

    fn client() -> Client<MemoryDatabase> {
        Server::new(MemoryDatabase::default()).client()
    }

    fn station(name: &str, slots: i32) -> Station {
        Station {
            name: name.to_owned(),
            latitude: 40.44,
            longitude: -79.99,
            slots,
        }
    }

    fn reading(name: &str, free_bikes: i32, empty_slots: i32) -> NamedReading {
        NamedReading {
            name: name.to_owned(),
            reading: Reading {
                free_bikes,
                empty_slots,
            },
        }
    }

    async fn user(client: &Client<MemoryDatabase>, username: &str) -> WithId<User> {
        client
            .register(Registration {
                username: username.to_owned(),
                password: "pw".to_owned(),
                confirm_password: "pw".to_owned(),
                email: format!("{}@example.org", username),
                first_name: format!("{}-first", username),
                last_name: "Doe".to_owned(),
            })
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn overview_uses_latest_reading() {
        let client = client();
        client
            .sync_stations(vec![station("B Street", 10), station("A Street", 8)])
            .await
            .unwrap();
        let first = Utc.with_ymd_and_hms(2025, 11, 18, 8, 0, 0).unwrap();
        let second = first + Duration::minutes(1);
        client
            .record_status(vec![reading("B Street", 1, 9)], first)
            .await
            .unwrap();
        let report = client
            .record_status(vec![reading("B Street", 9, 1), reading("Nowhere", 1, 1)], second)
            .await
            .unwrap();
        assert_eq!(
            report,
            StatusReport {
                status_logs: 1,
                snapshots: 1,
                skipped: 1
            }
        );

        let overview = client.stations_overview().await.unwrap();
        assert_eq!(overview[0].name, "A Street");
        assert_eq!(overview[0].free_bikes, 0);
        assert_eq!(overview[0].empty_slots, 8);
        assert_eq!(overview[0].status, OccupancyStatus::BadEmpty);
        assert_eq!(overview[1].free_bikes, 9);
        assert_eq!(overview[1].pct_full, 90);
        assert_eq!(overview[1].status, OccupancyStatus::High);
    }

    #[tokio::test]
    async fn sync_updates_existing_stations_by_name() {
        let client = client();
        client.sync_stations(vec![station("A", 8)]).await.unwrap();
        client.sync_stations(vec![station("A", 12)]).await.unwrap();
        let overview = client.stations_overview().await.unwrap();
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].slots, 12);
    }

    #[tokio::test]
    async fn duplicate_snapshots_are_ignored() {
        let client = client();
        client.sync_stations(vec![station("A", 8)]).await.unwrap();
        let at = Utc.with_ymd_and_hms(2025, 11, 18, 8, 0, 0).unwrap();
        client.record_status(vec![reading("A", 1, 7)], at).await.unwrap();
        let report = client.record_status(vec![reading("A", 2, 6)], at).await.unwrap();
        assert_eq!(report.status_logs, 1);
        assert_eq!(report.snapshots, 0);
    }

    #[tokio::test]
    async fn detail_and_recent_status() {
        let client = client();
        client.sync_stations(vec![station("A", 8)]).await.unwrap();
        let id = client.stations_overview().await.unwrap()[0].id;
        let start = Utc.with_ymd_and_hms(2025, 11, 18, 0, 0, 0).unwrap();
        for minute in 0..30 {
            client
                .record_status(vec![reading("A", minute % 8, 8 - minute % 8)], start + Duration::minutes(minute as i64))
                .await
                .unwrap();
        }
        let detail = client.station_detail(&id).await.unwrap();
        assert_eq!(detail.free_bikes, 29 % 8);

        let recent = client.recent_status(&id).await.unwrap();
        assert_eq!(recent.labels.len(), 24);
        assert_eq!(recent.labels.first().unwrap(), "00:06");
        assert_eq!(recent.labels.last().unwrap(), "00:29");

        assert!(matches!(
            client.station_detail(&Id::new(99)).await,
            Err(RequestError::NotFound)
        ));
        assert!(matches!(
            client.recent_status(&Id::new(99)).await,
            Err(RequestError::NotFound)
        ));
    }

    #[tokio::test]
    async fn trend_averages_per_hour() {
        let client = client();
        client.sync_stations(vec![station("A", 8)]).await.unwrap();
        let id = client.stations_overview().await.unwrap()[0].id;
        let day = NaiveDate::from_ymd_opt(2025, 11, 18).unwrap();
        let nine = Utc.with_ymd_and_hms(2025, 11, 18, 9, 0, 0).unwrap();
        for (offset, free) in [(0, 2), (20, 4), (60, 7)] {
            client
                .record_status(vec![reading("A", free, 8 - free)], nine + Duration::minutes(offset))
                .await
                .unwrap();
        }
        let trend = client.trend(&id, day).await.unwrap();
        assert_eq!(trend.granularity, Granularity::Hour);
        assert_eq!(trend.series.len(), 2);
        assert_eq!(trend.series[0].ts, "2025-11-18T09:00:00+00:00");
        assert_eq!(trend.series[0].free, 3.0);
        assert_eq!(trend.series[1].free, 7.0);

        let empty = client.trend(&Id::new(42), day).await.unwrap();
        assert_eq!(empty.granularity, Granularity::Day);
        assert!(empty.series.is_empty());
    }

    #[tokio::test]
    async fn seeding_replaces_the_day() {
        let client = client();
        client
            .sync_stations(vec![station("A", 8), station("B", 0)])
            .await
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 11, 17).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(client.seed_snapshots(day, &mut rng).await.unwrap(), 48);
        assert_eq!(client.seed_snapshots(day, &mut rng).await.unwrap(), 48);

        let stations = client.stations_overview().await.unwrap();
        let (start, end) = utc_window(day);
        for station in stations {
            let snapshots = client
                .database
                .auto()
                .snapshots_between(&station.id, start, end)
                .await
                .unwrap();
            assert_eq!(snapshots.len(), 24);
            let slots = if station.slots == 0 { 20 } else { station.slots };
            for (hour, snapshot) in snapshots.iter().enumerate() {
                assert_eq!(snapshot.timestamp.hour() as usize, hour);
                assert!(snapshot.free_bikes <= slots);
                assert_eq!(snapshot.free_bikes + snapshot.empty_slots, slots);
            }
        }
    }

    #[tokio::test]
    async fn station_comments_use_the_username() {
        let client = client();
        client.sync_stations(vec![station("A", 8)]).await.unwrap();
        let id = client.stations_overview().await.unwrap()[0].id;
        let author = user(&client, "sam").await;

        assert!(matches!(
            client.add_station_comment(&id, &author, "   ").await,
            Err(RequestError::Invalid(message)) if message == "Empty comment."
        ));
        assert!(matches!(
            client.add_station_comment(&Id::new(5), &author, "hi").await,
            Err(RequestError::NotFound)
        ));
        for text in ["first", " second "] {
            client.add_station_comment(&id, &author, text).await.unwrap();
        }
        let comments = client.station_comments(&id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "second");
        assert_eq!(comments[0].author, "sam");
    }

    #[tokio::test]
    async fn channel_comments_use_the_first_name() {
        let client = client();
        client.sync_stations(vec![station("A", 8)]).await.unwrap();
        let id = client.stations_overview().await.unwrap()[0].id;
        let author = user(&client, "kim").await;

        let comment = client
            .add_comment(&author, id, "flat tire".to_owned())
            .await
            .unwrap();
        client
            .add_reply(&author, comment.id, "fixed".to_owned())
            .await
            .unwrap();
        assert!(matches!(
            client.add_reply(&author, Id::new(77), "x".to_owned()).await,
            Err(RequestError::Invalid(message)) if message == "comment 77 does not exist"
        ));

        let comments = client.comment_list().await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].name, "kim-first");
        let replies = client.reply_list().await.unwrap();
        assert_eq!(replies[0].replied_to_id, comment.id);
    }

    #[tokio::test]
    async fn tours_stops_and_tasks() {
        let client = client();
        client.sync_stations(vec![station("Market Square", 8)]).await.unwrap();
        let station_id = client.stations_overview().await.unwrap()[0].id;
        let crew = user(&client, "robin").await;
        let day = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();

        let tour = client.create_tour(day, crew.id).await.unwrap();
        let stop = client.add_stop(tour.id, station_id, 1).await.unwrap();
        client.add_task(stop.id, "refill".to_owned()).await.unwrap();

        let tours = client.tour_list().await.unwrap();
        assert_eq!(tours[0].assigned_to, "robin-first");
        let stops = client.stop_list().await.unwrap();
        assert_eq!(stops[0].tour_date, day);
        assert_eq!(stops[0].station_name, "Market Square");
        let tasks = client.task_list().await.unwrap();
        assert_eq!(tasks[0].stop_name, "Market Square");
        assert_eq!(tasks[0].stop_order, 1);

        assert!(matches!(
            client.create_tour(day, Id::new(404)).await,
            Err(RequestError::Invalid(_))
        ));
        assert!(matches!(
            client.add_task(stop.id, "x".repeat(TASK_MAX_LEN + 1)).await,
            Err(RequestError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn register_login_logout() {
        let client = client();
        let registered = user(&client, "alex").await;
        assert!(matches!(
            client
                .register(Registration {
                    username: "alex".to_owned(),
                    password: "a".to_owned(),
                    confirm_password: "a".to_owned(),
                    email: "a@b".to_owned(),
                    first_name: "A".to_owned(),
                    last_name: "B".to_owned(),
                })
                .await,
            Err(RequestError::Invalid(message)) if message == USERNAME_TAKEN
        ));

        let wrong = client
            .login(Credentials {
                username: "alex".to_owned(),
                password: "nope".to_owned(),
            })
            .await;
        assert!(matches!(wrong, Err(RequestError::Invalid(message)) if message == INVALID_CREDENTIALS));

        let (user, session) = client
            .login(Credentials {
                username: "alex".to_owned(),
                password: "pw".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(user.id, registered.id);
        assert_eq!(
            client.session_user(&session.token).await.unwrap(),
            Some(registered)
        );
        client.logout(&session.token).await.unwrap();
        assert_eq!(client.session_user(&session.token).await.unwrap(), None);
    }
}
