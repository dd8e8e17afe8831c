//! A database kept in memory. Transactions work on a copy of the store that
//! replaces the shared store on commit.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

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
use utility::id::{HasId, Id};

use crate::database::{
    CommentRepo, Database, DatabaseAutocommit, DatabaseError, DatabaseOperations,
    DatabaseTransaction, Result, StationRepo, StatusRepo, TourRepo, UserRepo,
};

/// A table with serial ids.
#[derive(Debug, Clone)]
struct Table<T> {
    rows: BTreeMap<i32, T>,
    next_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T>
where
    T: HasId<IdType = i32> + Clone,
{
    fn insert(&mut self, row: T) -> WithId<T> {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(id, row.clone());
        WithId::new(Id::new(id), row)
    }

    fn get(&self, id: &Id<T>) -> Result<WithId<T>> {
        self.rows
            .get(&id.raw())
            .map(|row| WithId::new(*id, row.clone()))
            .ok_or(DatabaseError::NotFound)
    }

    fn exists(&self, id: &Id<T>) -> Result<()> {
        if self.rows.contains_key(&id.raw()) {
            Ok(())
        } else {
            Err(DatabaseError::NotFound)
        }
    }

    fn iter(&self) -> impl Iterator<Item = WithId<T>> + '_ {
        self.rows
            .iter()
            .map(|(id, row)| WithId::new(Id::new(*id), row.clone()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Store {
    stations: Table<Station>,
    status_logs: Table<StatusLog>,
    snapshots: Table<Snapshot>,
    users: Table<StoredUser>,
    sessions: HashMap<String, Session>,
    comments: Table<Comment>,
    replies: Table<Reply>,
    tours: Table<Tour>,
    stops: Table<Stop>,
    tasks: Table<Task>,
}

#[derive(Debug, Clone)]
struct StoredUser(Account);

impl HasId for StoredUser {
    type IdType = i32;
}

impl Store {
    fn user(&self, id: &Id<User>) -> Result<WithId<User>> {
        self.users
            .get(&id.cast())
            .map(|stored| WithId::new(*id, stored.content.0.user))
    }

    fn first_name(&self, id: &Id<User>) -> String {
        self.user(id)
            .map(|user| user.content.first_name)
            .unwrap_or_default()
    }

    fn station_name(&self, id: &Id<Station>) -> String {
        self.stations
            .get(id)
            .map(|station| station.content.name)
            .unwrap_or_default()
    }
}

/// Gives the repo implementations access to a store.
pub trait StoreAccess {
    fn with<R>(&mut self, f: impl FnOnce(&mut Store) -> R) -> R;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    store: Arc<Mutex<Store>>,
}

fn lock(store: &Mutex<Store>) -> MutexGuard<'_, Store> {
    // a panicking test leaves the store usable
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct MemoryAutocommit {
    store: Arc<Mutex<Store>>,
}

impl StoreAccess for MemoryAutocommit {
    fn with<R>(&mut self, f: impl FnOnce(&mut Store) -> R) -> R {
        f(&mut lock(&self.store))
    }
}

pub struct MemoryTransaction {
    shared: Arc<Mutex<Store>>,
    staged: Store,
}

impl StoreAccess for MemoryTransaction {
    fn with<R>(&mut self, f: impl FnOnce(&mut Store) -> R) -> R {
        f(&mut self.staged)
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Transaction = MemoryTransaction;
    type Autocommit = MemoryAutocommit;

    async fn transaction(&self) -> Result<Self::Transaction> {
        let staged = lock(&self.store).clone();
        Ok(MemoryTransaction {
            shared: self.store.clone(),
            staged,
        })
    }

    fn auto(&self) -> Self::Autocommit {
        MemoryAutocommit {
            store: self.store.clone(),
        }
    }
}

#[async_trait]
impl DatabaseTransaction for MemoryTransaction {
    async fn commit(self) -> Result<()> {
        *lock(&self.shared) = self.staged;
        Ok(())
    }
}

impl DatabaseAutocommit for MemoryAutocommit {}

impl<S: StoreAccess + Send> DatabaseOperations for S {}

#[async_trait]
impl<S: StoreAccess + Send> StationRepo for S {
    async fn get_stations(&mut self) -> Result<Vec<WithId<Station>>> {
        self.with(|store| {
            let mut stations: Vec<_> = store.stations.iter().collect();
            stations.sort_by(|a, b| a.content.name.cmp(&b.content.name));
            Ok(stations)
        })
    }

    async fn get_station(&mut self, id: &Id<Station>) -> Result<WithId<Station>> {
        self.with(|store| store.stations.get(id))
    }

    async fn station_by_name(&mut self, name: &str) -> Result<Option<WithId<Station>>> {
        self.with(|store| {
            Ok(store
                .stations
                .iter()
                .find(|station| station.content.name == name))
        })
    }

    async fn put_station(&mut self, station: Station) -> Result<WithId<Station>> {
        self.with(|store| {
            let existing = store
                .stations
                .iter()
                .find(|existing| existing.content.name == station.name);
            match existing {
                Some(existing) => {
                    store.stations.rows.insert(existing.id.raw(), station.clone());
                    Ok(WithId::new(existing.id, station))
                }
                None => Ok(store.stations.insert(station)),
            }
        })
    }

    async fn count_stations(&mut self) -> Result<i64> {
        self.with(|store| Ok(store.stations.rows.len() as i64))
    }
}

fn newest_first(logs: &mut [WithId<StatusLog>]) {
    logs.sort_by(|a, b| {
        (b.content.date, b.content.time, b.id).cmp(&(a.content.date, a.content.time, a.id))
    });
}

#[async_trait]
impl<S: StoreAccess + Send> StatusRepo for S {
    async fn put_status_log(&mut self, log: StatusLog) -> Result<WithId<StatusLog>> {
        self.with(|store| {
            store.stations.exists(&log.station)?;
            Ok(store.status_logs.insert(log))
        })
    }

    async fn latest_status_logs(&mut self) -> Result<Vec<StatusLog>> {
        self.with(|store| {
            let mut logs: Vec<_> = store.status_logs.iter().collect();
            newest_first(&mut logs);
            let mut latest: BTreeMap<Id<Station>, StatusLog> = BTreeMap::new();
            for log in logs {
                latest.entry(log.content.station).or_insert(log.content);
            }
            Ok(latest.into_values().collect())
        })
    }

    async fn status_logs_of_station(
        &mut self,
        station: &Id<Station>,
        limit: i64,
    ) -> Result<Vec<StatusLog>> {
        self.with(|store| {
            let mut logs: Vec<_> = store
                .status_logs
                .iter()
                .filter(|log| log.content.station == *station)
                .collect();
            newest_first(&mut logs);
            Ok(logs
                .into_iter()
                .take(limit.max(0) as usize)
                .map(|log| log.content)
                .collect())
        })
    }

    async fn put_snapshot(&mut self, snapshot: Snapshot) -> Result<bool> {
        self.with(|store| {
            store.stations.exists(&snapshot.station)?;
            let duplicate = store.snapshots.rows.values().any(|existing| {
                existing.station == snapshot.station && existing.timestamp == snapshot.timestamp
            });
            if !duplicate {
                store.snapshots.insert(snapshot);
            }
            Ok(!duplicate)
        })
    }

    async fn snapshots_between(
        &mut self,
        station: &Id<Station>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>> {
        self.with(|store| {
            let mut snapshots: Vec<_> = store
                .snapshots
                .rows
                .values()
                .filter(|snapshot| {
                    snapshot.station == *station
                        && snapshot.timestamp >= start
                        && snapshot.timestamp < end
                })
                .cloned()
                .collect();
            snapshots.sort_by_key(|snapshot| snapshot.timestamp);
            Ok(snapshots)
        })
    }

    async fn delete_snapshots_between(
        &mut self,
        station: &Id<Station>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        self.with(|store| {
            let before = store.snapshots.rows.len();
            store.snapshots.rows.retain(|_, snapshot| {
                !(snapshot.station == *station
                    && snapshot.timestamp >= start
                    && snapshot.timestamp < end)
            });
            Ok((before - store.snapshots.rows.len()) as u64)
        })
    }
}

#[async_trait]
impl<S: StoreAccess + Send> CommentRepo for S {
    async fn put_comment(&mut self, comment: Comment) -> Result<WithId<Comment>> {
        self.with(|store| {
            store.stations.exists(&comment.commented_to)?;
            store.user(&comment.commentor)?;
            Ok(store.comments.insert(comment))
        })
    }

    async fn get_comment(&mut self, id: &Id<Comment>) -> Result<WithId<Comment>> {
        self.with(|store| store.comments.get(id))
    }

    async fn comment_list(&mut self) -> Result<Vec<CommentListItem>> {
        self.with(|store| {
            Ok(store
                .comments
                .iter()
                .map(|comment| {
                    let name = store.first_name(&comment.content.commentor);
                    CommentListItem::new(comment, name)
                })
                .collect())
        })
    }

    async fn comments_of_station(
        &mut self,
        station: &Id<Station>,
        limit: i64,
    ) -> Result<Vec<WithId<Comment>>> {
        self.with(|store| {
            let mut comments: Vec<_> = store
                .comments
                .iter()
                .filter(|comment| comment.content.commented_to == *station)
                .collect();
            comments.sort_by(|a, b| {
                (b.content.creation_time, b.id).cmp(&(a.content.creation_time, a.id))
            });
            comments.truncate(limit.max(0) as usize);
            Ok(comments)
        })
    }

    async fn put_reply(&mut self, reply: Reply) -> Result<WithId<Reply>> {
        self.with(|store| {
            store.comments.exists(&reply.reply_to)?;
            store.user(&reply.replier)?;
            Ok(store.replies.insert(reply))
        })
    }

    async fn reply_list(&mut self) -> Result<Vec<ReplyListItem>> {
        self.with(|store| {
            Ok(store
                .replies
                .iter()
                .map(|reply| {
                    let name = store.first_name(&reply.content.replier);
                    ReplyListItem::new(reply, name)
                })
                .collect())
        })
    }
}

#[async_trait]
impl<S: StoreAccess + Send> TourRepo for S {
    async fn put_tour(&mut self, tour: Tour) -> Result<WithId<Tour>> {
        self.with(|store| {
            store.user(&tour.assigned_to)?;
            Ok(store.tours.insert(tour))
        })
    }

    async fn get_tour(&mut self, id: &Id<Tour>) -> Result<WithId<Tour>> {
        self.with(|store| store.tours.get(id))
    }

    async fn tour_list(&mut self) -> Result<Vec<TourListItem>> {
        self.with(|store| {
            Ok(store
                .tours
                .iter()
                .map(|tour| {
                    let name = store.first_name(&tour.content.assigned_to);
                    TourListItem::new(tour, name)
                })
                .collect())
        })
    }

    async fn put_stop(&mut self, stop: Stop) -> Result<WithId<Stop>> {
        self.with(|store| {
            store.tours.exists(&stop.tour)?;
            store.stations.exists(&stop.station)?;
            Ok(store.stops.insert(stop))
        })
    }

    async fn get_stop(&mut self, id: &Id<Stop>) -> Result<WithId<Stop>> {
        self.with(|store| store.stops.get(id))
    }

    async fn stop_list(&mut self) -> Result<Vec<StopListItem>> {
        self.with(|store| {
            store
                .stops
                .iter()
                .map(|stop| {
                    let tour = store.tours.get(&stop.content.tour)?;
                    let station_name = store.station_name(&stop.content.station);
                    Ok(StopListItem::new(stop, tour.content.due_date, station_name))
                })
                .collect()
        })
    }

    async fn put_task(&mut self, task: Task) -> Result<WithId<Task>> {
        self.with(|store| {
            store.stops.exists(&task.stop)?;
            Ok(store.tasks.insert(task))
        })
    }

    async fn task_list(&mut self) -> Result<Vec<TaskListItem>> {
        self.with(|store| {
            store
                .tasks
                .iter()
                .map(|task| {
                    let stop = store.stops.get(&task.content.stop)?;
                    let station_name = store.station_name(&stop.content.station);
                    Ok(TaskListItem::new(task, stop.content.order, station_name))
                })
                .collect()
        })
    }
}

#[async_trait]
impl<S: StoreAccess + Send> UserRepo for S {
    async fn put_account(&mut self, account: Account) -> Result<WithId<User>> {
        self.with(|store| {
            let taken = store
                .users
                .rows
                .values()
                .any(|stored| stored.0.user.username == account.user.username);
            if taken {
                return Err(DatabaseError::Conflict);
            }
            let user = account.user.clone();
            let stored = store.users.insert(StoredUser(account));
            Ok(WithId::new(stored.id.cast(), user))
        })
    }

    async fn get_user(&mut self, id: &Id<User>) -> Result<WithId<User>> {
        self.with(|store| store.user(id))
    }

    async fn account_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<(Id<User>, Account)>> {
        self.with(|store| {
            Ok(store
                .users
                .iter()
                .find(|stored| stored.content.0.user.username == username)
                .map(|stored| (stored.id.cast(), stored.content.0)))
        })
    }

    async fn put_session(&mut self, session: Session) -> Result<()> {
        self.with(|store| {
            store.user(&session.user)?;
            store.sessions.insert(session.token.clone(), session);
            Ok(())
        })
    }

    async fn user_by_session(&mut self, token: &str) -> Result<Option<WithId<User>>> {
        self.with(|store| match store.sessions.get(token) {
            Some(session) => store.user(&session.user).map(Some),
            None => Ok(None),
        })
    }

    async fn delete_session(&mut self, token: &str) -> Result<()> {
        self.with(|store| {
            store.sessions.remove(token);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str) -> Station {
        Station {
            name: name.to_owned(),
            latitude: 0.0,
            longitude: 0.0,
            slots: 4,
        }
    }

    #[tokio::test]
    async fn uncommitted_transactions_are_discarded() {
        let database = MemoryDatabase::default();
        let mut tx = database.transaction().await.unwrap();
        tx.put_station(station("A")).await.unwrap();
        drop(tx);
        assert_eq!(database.auto().count_stations().await.unwrap(), 0);

        let mut tx = database.transaction().await.unwrap();
        tx.put_station(station("A")).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(database.auto().count_stations().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn references_must_exist() {
        let database = MemoryDatabase::default();
        let result = database
            .auto()
            .put_stop(Stop {
                tour: Id::new(1),
                station: Id::new(1),
                order: 1,
            })
            .await;
        assert!(matches!(result, Err(DatabaseError::NotFound)));
    }
}
