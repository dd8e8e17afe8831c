use async_trait::async_trait;
use chrono::NaiveDate;
use dashboard::database::{Result, TourRepo};
use model::{
    tour::{Stop, StopListItem, Task, TaskListItem, Tour, TourListItem},
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{
    queries::tour::{get, get_stop, list, put, put_stop, put_task, stop_list, task_list},
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

use super::{with_id, DatabaseRow};

#[derive(Debug, Clone, FromRow)]
pub struct TourRow {
    pub id: i32,
    pub due_date: NaiveDate,
    pub assigned_to: i32,
}

impl DatabaseRow for TourRow {
    type Model = Tour;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Tour {
            due_date: self.due_date,
            assigned_to: Id::new(self.assigned_to),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TourListRow {
    #[sqlx(flatten)]
    pub tour: TourRow,
    pub first_name: String,
}

impl TourListRow {
    pub fn to_list_item(self) -> TourListItem {
        TourListItem::new(with_id(self.tour), self.first_name)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StopRow {
    pub id: i32,
    pub tour_id: i32,
    pub station_id: i32,
    pub stop_order: i32,
}

impl DatabaseRow for StopRow {
    type Model = Stop;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Stop {
            tour: Id::new(self.tour_id),
            station: Id::new(self.station_id),
            order: self.stop_order,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StopListRow {
    #[sqlx(flatten)]
    pub stop: StopRow,
    pub tour_date: NaiveDate,
    pub station_name: String,
}

impl StopListRow {
    pub fn to_list_item(self) -> StopListItem {
        StopListItem::new(with_id(self.stop), self.tour_date, self.station_name)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: i32,
    pub stop_id: i32,
    pub content: String,
}

impl DatabaseRow for TaskRow {
    type Model = Task;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Task {
            stop: Id::new(self.stop_id),
            content: self.content,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TaskListRow {
    #[sqlx(flatten)]
    pub task: TaskRow,
    pub stop_order: i32,
    pub station_name: String,
}

impl TaskListRow {
    pub fn to_list_item(self) -> TaskListItem {
        TaskListItem::new(with_id(self.task), self.stop_order, self.station_name)
    }
}

#[async_trait]
impl TourRepo for PgDatabaseAutocommit {
    async fn put_tour(&mut self, tour: Tour) -> Result<WithId<Tour>> {
        put(&self.pool, tour).await
    }

    async fn get_tour(&mut self, id: &Id<Tour>) -> Result<WithId<Tour>> {
        get(&self.pool, id).await
    }

    async fn tour_list(&mut self) -> Result<Vec<TourListItem>> {
        list(&self.pool).await
    }

    async fn put_stop(&mut self, stop: Stop) -> Result<WithId<Stop>> {
        put_stop(&self.pool, stop).await
    }

    async fn get_stop(&mut self, id: &Id<Stop>) -> Result<WithId<Stop>> {
        get_stop(&self.pool, id).await
    }

    async fn stop_list(&mut self) -> Result<Vec<StopListItem>> {
        stop_list(&self.pool).await
    }

    async fn put_task(&mut self, task: Task) -> Result<WithId<Task>> {
        put_task(&self.pool, task).await
    }

    async fn task_list(&mut self) -> Result<Vec<TaskListItem>> {
        task_list(&self.pool).await
    }
}

#[async_trait]
impl<'a> TourRepo for PgDatabaseTransaction<'a> {
    async fn put_tour(&mut self, tour: Tour) -> Result<WithId<Tour>> {
        put(&mut *self.tx, tour).await
    }

    async fn get_tour(&mut self, id: &Id<Tour>) -> Result<WithId<Tour>> {
        get(&mut *self.tx, id).await
    }

    async fn tour_list(&mut self) -> Result<Vec<TourListItem>> {
        list(&mut *self.tx).await
    }

    async fn put_stop(&mut self, stop: Stop) -> Result<WithId<Stop>> {
        put_stop(&mut *self.tx, stop).await
    }

    async fn get_stop(&mut self, id: &Id<Stop>) -> Result<WithId<Stop>> {
        get_stop(&mut *self.tx, id).await
    }

    async fn stop_list(&mut self) -> Result<Vec<StopListItem>> {
        stop_list(&mut *self.tx).await
    }

    async fn put_task(&mut self, task: Task) -> Result<WithId<Task>> {
        put_task(&mut *self.tx, task).await
    }

    async fn task_list(&mut self) -> Result<Vec<TaskListItem>> {
        task_list(&mut *self.tx).await
    }
}
