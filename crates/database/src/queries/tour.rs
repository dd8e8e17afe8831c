use dashboard::database::Result;
use model::{
    tour::{Stop, StopListItem, Task, TaskListItem, Tour, TourListItem},
    WithId,
};
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    tour::{StopListRow, StopRow, TaskListRow, TaskRow, TourListRow, TourRow},
    with_id,
};

use super::convert_error;

pub async fn put<'c, E>(executor: E, tour: Tour) -> Result<WithId<Tour>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO tours (due_date, assigned_to)
        VALUES ($1, $2)
        RETURNING id, due_date, assigned_to;
        ",
    )
    .bind(tour.due_date)
    .bind(tour.assigned_to.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: TourRow| with_id(row))
}

pub async fn get<'c, E>(executor: E, id: &Id<Tour>) -> Result<WithId<Tour>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT id, due_date, assigned_to FROM tours WHERE id = $1;")
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map_err(convert_error)
        .map(|row: TourRow| with_id(row))
}

pub async fn list<'c, E>(executor: E) -> Result<Vec<TourListItem>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT tours.id, due_date, assigned_to, users.first_name
        FROM tours
        JOIN users ON users.id = tours.assigned_to
        ORDER BY tours.id ASC;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<TourListRow>| {
        Ok(rows.into_iter().map(TourListRow::to_list_item).collect())
    })
}

pub async fn put_stop<'c, E>(executor: E, stop: Stop) -> Result<WithId<Stop>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO stops (tour_id, station_id, stop_order)
        VALUES ($1, $2, $3)
        RETURNING id, tour_id, station_id, stop_order;
        ",
    )
    .bind(stop.tour.raw())
    .bind(stop.station.raw())
    .bind(stop.order)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: StopRow| with_id(row))
}

pub async fn get_stop<'c, E>(executor: E, id: &Id<Stop>) -> Result<WithId<Stop>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT id, tour_id, station_id, stop_order FROM stops WHERE id = $1;")
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map_err(convert_error)
        .map(|row: StopRow| with_id(row))
}

pub async fn stop_list<'c, E>(executor: E) -> Result<Vec<StopListItem>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            stops.id, tour_id, station_id, stop_order,
            tours.due_date AS tour_date,
            stations.name AS station_name
        FROM stops
        JOIN tours ON tours.id = stops.tour_id
        JOIN stations ON stations.id = stops.station_id
        ORDER BY stops.id ASC;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<StopListRow>| {
        Ok(rows.into_iter().map(StopListRow::to_list_item).collect())
    })
}

pub async fn put_task<'c, E>(executor: E, task: Task) -> Result<WithId<Task>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO tasks (stop_id, content)
        VALUES ($1, $2)
        RETURNING id, stop_id, content;
        ",
    )
    .bind(task.stop.raw())
    .bind(task.content)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: TaskRow| with_id(row))
}

pub async fn task_list<'c, E>(executor: E) -> Result<Vec<TaskListItem>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            tasks.id, stop_id, content,
            stops.stop_order,
            stations.name AS station_name
        FROM tasks
        JOIN stops ON stops.id = tasks.stop_id
        JOIN stations ON stations.id = stops.station_id
        ORDER BY tasks.id ASC;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<TaskListRow>| {
        Ok(rows.into_iter().map(TaskListRow::to_list_item).collect())
    })
}
