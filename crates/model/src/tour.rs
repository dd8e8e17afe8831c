use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{station::Station, user::User, WithId};

pub const TASK_MAX_LEN: usize = 400;

/// A service tour of a crew member. Stops and tasks are deleted together with
/// their tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Tour {
    pub due_date: NaiveDate,
    pub assigned_to: Id<User>,
}

impl HasId for Tour {
    type IdType = i32;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Stop {
    pub tour: Id<Tour>,
    pub station: Id<Station>,
    pub order: i32,
}

impl HasId for Stop {
    type IdType = i32;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    pub stop: Id<Stop>,
    pub content: String,
}

impl HasId for Task {
    type IdType = i32;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourListItem {
    pub id: Id<Tour>,
    #[serde(with = "utility::serde::date")]
    pub due_date: NaiveDate,
    pub assigned_to: String,
}

impl TourListItem {
    pub fn new(tour: WithId<Tour>, assignee_first_name: String) -> Self {
        Self {
            id: tour.id,
            due_date: tour.content.due_date,
            assigned_to: assignee_first_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopListItem {
    pub id: Id<Stop>,
    pub tour_id: Id<Tour>,
    #[serde(with = "utility::serde::date")]
    pub tour_date: NaiveDate,
    pub station_name: String,
    pub order: i32,
}

impl StopListItem {
    pub fn new(stop: WithId<Stop>, tour_date: NaiveDate, station_name: String) -> Self {
        Self {
            id: stop.id,
            tour_id: stop.content.tour,
            tour_date,
            station_name,
            order: stop.content.order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskListItem {
    pub id: Id<Task>,
    pub stop_id: Id<Stop>,
    pub stop_order: i32,
    pub stop_name: String,
    pub content: String,
}

impl TaskListItem {
    /// `stop_name` is the name of the station the stop visits.
    pub fn new(task: WithId<Task>, stop_order: i32, stop_name: String) -> Self {
        Self {
            id: task.id,
            stop_id: task.content.stop,
            stop_order,
            stop_name,
            content: task.content.content,
        }
    }
}
