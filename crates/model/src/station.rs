use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{status::StatusLog, ExampleData, WithId};

/// A physical dock. `name` is unique and used as the key when the registry is
/// refreshed from the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Station {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub slots: i32,
}

impl HasId for Station {
    type IdType = i32;
}

/// Free bikes and empty docks of a station at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Reading {
    pub free_bikes: i32,
    pub empty_slots: i32,
}

impl From<&StatusLog> for Reading {
    fn from(log: &StatusLog) -> Self {
        Self {
            free_bikes: log.free_bikes,
            empty_slots: log.empty_slots,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyStatus {
    BadEmpty,
    Low,
    Ok,
    High,
    BadFull,
}

impl OccupancyStatus {
    pub fn from_pct_full(pct_full: i32) -> Self {
        match pct_full {
            0 => Self::BadEmpty,
            pct if pct <= 15 => Self::Low,
            pct if pct <= 75 => Self::Ok,
            pct if pct <= 90 => Self::High,
            pct if pct >= 100 => Self::BadFull,
            // 91..=99 is reported as ok
            _ => Self::Ok,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub reading: Reading,
    pub capacity: i32,
    pub pct_full: i32,
}

impl Occupancy {
    /// Computes the occupancy of a station from its latest reading. Stations
    /// without any reading are treated as having no bikes at all.
    pub fn compute(slots: i32, latest: Option<Reading>) -> Self {
        let reading = latest.unwrap_or(Reading {
            free_bikes: 0,
            empty_slots: slots.max(0),
        });
        let capacity = [reading.free_bikes + reading.empty_slots, slots, 1]
            .into_iter()
            .find(|value| *value != 0)
            .unwrap_or(1);
        let pct_full =
            (100.0 * reading.free_bikes as f64 / capacity as f64).round_ties_even() as i32;
        Self {
            reading,
            capacity,
            pct_full,
        }
    }

    pub fn status(&self) -> OccupancyStatus {
        OccupancyStatus::from_pct_full(self.pct_full)
    }
}

/// One entry of the stations overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StationOverview {
    pub id: Id<Station>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub slots: i32,
    pub free_bikes: i32,
    pub empty_slots: i32,
    pub pct_full: i32,
    pub status: OccupancyStatus,
}

impl StationOverview {
    pub fn new(station: WithId<Station>, latest: Option<Reading>) -> Self {
        let occupancy = Occupancy::compute(station.content.slots, latest);
        Self {
            id: station.id,
            name: station.content.name,
            latitude: station.content.latitude,
            longitude: station.content.longitude,
            slots: station.content.slots,
            free_bikes: occupancy.reading.free_bikes,
            empty_slots: occupancy.reading.empty_slots,
            pct_full: occupancy.pct_full,
            status: occupancy.status(),
        }
    }
}

impl ExampleData for StationOverview {
    fn example_data() -> Self {
        Self::new(
            WithId::new(
                Id::new(1),
                Station {
                    name: "Liberty Ave & Stanwix St".to_owned(),
                    latitude: 40.441326,
                    longitude: -80.004679,
                    slots: 20,
                },
            ),
            Some(Reading {
                free_bikes: 5,
                empty_slots: 15,
            }),
        )
    }
}

/// The single station view, which leaves out location and status bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StationDetail {
    pub id: Id<Station>,
    pub name: String,
    pub slots: i32,
    pub free_bikes: i32,
    pub empty_slots: i32,
    pub pct_full: i32,
}

impl StationDetail {
    pub fn new(station: WithId<Station>, latest: Option<Reading>) -> Self {
        let occupancy = Occupancy::compute(station.content.slots, latest);
        Self {
            id: station.id,
            name: station.content.name,
            slots: station.content.slots,
            free_bikes: occupancy.reading.free_bikes,
            empty_slots: occupancy.reading.empty_slots,
            pct_full: occupancy.pct_full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(free_bikes: i32, empty_slots: i32) -> Option<Reading> {
        Some(Reading {
            free_bikes,
            empty_slots,
        })
    }

    #[test]
    fn quarter_full_station_is_ok() {
        let overview = StationOverview::example_data();
        assert_eq!(overview.pct_full, 25);
        assert_eq!(overview.status, OccupancyStatus::Ok);
        assert_eq!(Occupancy::compute(20, reading(5, 15)).capacity, 20);
    }

    #[test]
    fn capacity_falls_back_to_slots_then_one() {
        assert_eq!(Occupancy::compute(12, reading(0, 0)).capacity, 12);
        let empty = Occupancy::compute(0, reading(0, 0));
        assert_eq!(empty.capacity, 1);
        assert_eq!(empty.pct_full, 0);
    }

    #[test]
    fn missing_reading_assumes_no_bikes() {
        let occupancy = Occupancy::compute(8, None);
        assert_eq!(occupancy.reading, Reading { free_bikes: 0, empty_slots: 8 });
        assert_eq!(occupancy.status(), OccupancyStatus::BadEmpty);
        assert_eq!(Occupancy::compute(-3, None).reading.empty_slots, 0);
    }

    #[test]
    fn rounds_half_to_even() {
        // 1/8 = 12.5 %, 3/8 = 37.5 %
        assert_eq!(Occupancy::compute(8, reading(1, 7)).pct_full, 12);
        assert_eq!(Occupancy::compute(8, reading(3, 5)).pct_full, 38);
    }

    #[test]
    fn status_buckets() {
        assert_eq!(OccupancyStatus::from_pct_full(0), OccupancyStatus::BadEmpty);
        assert_eq!(OccupancyStatus::from_pct_full(15), OccupancyStatus::Low);
        assert_eq!(OccupancyStatus::from_pct_full(16), OccupancyStatus::Ok);
        assert_eq!(OccupancyStatus::from_pct_full(75), OccupancyStatus::Ok);
        assert_eq!(OccupancyStatus::from_pct_full(90), OccupancyStatus::High);
        assert_eq!(OccupancyStatus::from_pct_full(95), OccupancyStatus::Ok);
        assert_eq!(OccupancyStatus::from_pct_full(100), OccupancyStatus::BadFull);
    }

    #[test]
    fn overview_serializes_snake_case_status() {
        let json = serde_json::to_value(StationOverview::example_data()).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["pct_full"], 25);
        assert_eq!(json["id"], 1);
    }
}
