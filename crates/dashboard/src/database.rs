use std::{error, fmt, result};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    comment::{Comment, CommentListItem, Reply, ReplyListItem},
    station::Station,
    status::{Snapshot, StatusLog},
    tour::{Stop, StopListItem, Task, TaskListItem, Tour, TourListItem},
    user::{Account, Session, User},
    WithId,
};
use utility::id::Id;

#[derive(Debug)]
pub enum DatabaseError {
    NotFound,
    /// A unique constraint was violated.
    Conflict,
    Other(Box<dyn error::Error + Send + Sync>),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "entry not found"),
            Self::Conflict => write!(f, "entry already exists"),
            Self::Other(why) => write!(f, "database error: {}", why),
        }
    }
}

impl error::Error for DatabaseError {}

pub type Result<T> = result::Result<T, DatabaseError>;

#[async_trait]
pub trait StationRepo {
    /// All stations, ordered by name.
    async fn get_stations(&mut self) -> Result<Vec<WithId<Station>>>;

    async fn get_station(&mut self, id: &Id<Station>) -> Result<WithId<Station>>;

    async fn station_by_name(&mut self, name: &str) -> Result<Option<WithId<Station>>>;

    /// Inserts the station, or updates location and slots of the station with
    /// the same name.
    async fn put_station(&mut self, station: Station) -> Result<WithId<Station>>;

    async fn count_stations(&mut self) -> Result<i64>;
}

#[async_trait]
pub trait StatusRepo {
    async fn put_status_log(&mut self, log: StatusLog) -> Result<WithId<StatusLog>>;

    /// The newest status log of every station that has one.
    async fn latest_status_logs(&mut self) -> Result<Vec<StatusLog>>;

    /// The newest `limit` status logs of a station, newest first.
    async fn status_logs_of_station(
        &mut self,
        station: &Id<Station>,
        limit: i64,
    ) -> Result<Vec<StatusLog>>;

    /// Returns `false` if a snapshot for the same station and timestamp
    /// already exists. The existing snapshot is kept in that case.
    async fn put_snapshot(&mut self, snapshot: Snapshot) -> Result<bool>;

    /// Snapshots with `start <= timestamp < end`, oldest first.
    async fn snapshots_between(
        &mut self,
        station: &Id<Station>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>>;

    async fn delete_snapshots_between(
        &mut self,
        station: &Id<Station>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64>;
}

#[async_trait]
pub trait CommentRepo {
    async fn put_comment(&mut self, comment: Comment) -> Result<WithId<Comment>>;

    async fn get_comment(&mut self, id: &Id<Comment>) -> Result<WithId<Comment>>;

    /// All comments ordered by id, with the author's current first name.
    async fn comment_list(&mut self) -> Result<Vec<CommentListItem>>;

    /// The newest `limit` comments on a station, newest first.
    async fn comments_of_station(
        &mut self,
        station: &Id<Station>,
        limit: i64,
    ) -> Result<Vec<WithId<Comment>>>;

    async fn put_reply(&mut self, reply: Reply) -> Result<WithId<Reply>>;

    async fn reply_list(&mut self) -> Result<Vec<ReplyListItem>>;
}

#[async_trait]
pub trait TourRepo {
    async fn put_tour(&mut self, tour: Tour) -> Result<WithId<Tour>>;

    async fn get_tour(&mut self, id: &Id<Tour>) -> Result<WithId<Tour>>;

    async fn tour_list(&mut self) -> Result<Vec<TourListItem>>;

    async fn put_stop(&mut self, stop: Stop) -> Result<WithId<Stop>>;

    async fn get_stop(&mut self, id: &Id<Stop>) -> Result<WithId<Stop>>;

    async fn stop_list(&mut self) -> Result<Vec<StopListItem>>;

    async fn put_task(&mut self, task: Task) -> Result<WithId<Task>>;

    async fn task_list(&mut self) -> Result<Vec<TaskListItem>>;
}

#[async_trait]
pub trait UserRepo {
    /// Fails with `DatabaseError::Conflict` if the username is taken.
    async fn put_account(&mut self, account: Account) -> Result<WithId<User>>;

    async fn get_user(&mut self, id: &Id<User>) -> Result<WithId<User>>;

    async fn account_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<(Id<User>, Account)>>;

    async fn put_session(&mut self, session: Session) -> Result<()>;

    async fn user_by_session(&mut self, token: &str) -> Result<Option<WithId<User>>>;

    async fn delete_session(&mut self, token: &str) -> Result<()>;
}

pub trait DatabaseOperations:
    StationRepo + StatusRepo + CommentRepo + TourRepo + UserRepo
{
}

#[async_trait]
pub trait DatabaseTransaction: DatabaseOperations {
    async fn commit(self) -> Result<()>;
}

pub trait DatabaseAutocommit: DatabaseOperations {}

/// Storage of the dashboard. Multiple concurrent accesses are possible by
/// cloning the database object.
#[async_trait]
pub trait Database: Clone + Send + Sync + Sized + 'static {
    type Transaction: DatabaseTransaction + Send;
    type Autocommit: DatabaseAutocommit + Send;

    async fn transaction(&self) -> Result<Self::Transaction>;

    fn auto(&self) -> Self::Autocommit;
}
