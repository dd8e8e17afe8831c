use std::collections::BTreeMap;

use chrono::{DateTime, Duration, DurationRound, NaiveDate, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::status::Snapshot;

/// The calendar day the trend chart is anchored to unless configured otherwise.
pub fn default_trend_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 18).unwrap_or_default()
}

/// Half-open UTC window `[day 00:00, day+1 00:00)`.
pub fn utc_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN));
    (start, start + Duration::hours(24))
}

/// The same calendar day in the time zone `tz`, expressed in UTC.
pub fn day_window<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = |date: NaiveDate| {
        tz.from_local_datetime(&date.and_time(chrono::NaiveTime::MIN))
            .earliest()
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)))
    };
    let next = day.succ_opt().unwrap_or(day);
    (local_midnight(day), local_midnight(next))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hour,
    Day,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrendPoint {
    pub ts: String,
    pub free: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Trend {
    pub granularity: Granularity,
    pub series: Vec<TrendPoint>,
}

#[derive(Default)]
struct Mean {
    sum: i64,
    count: i64,
}

impl Mean {
    fn push(&mut self, value: i32) {
        self.sum += value as i64;
        self.count += 1;
    }

    fn value(&self) -> f64 {
        self.sum as f64 / self.count as f64
    }
}

impl Trend {
    /// Averages the free bike counts per hour, ordered by hour. The snapshots
    /// are expected to be inside the window already.
    pub fn hourly<'a, I>(snapshots: I) -> Self
    where
        I: IntoIterator<Item = &'a Snapshot>,
    {
        let mut buckets: BTreeMap<DateTime<Utc>, Mean> = BTreeMap::new();
        for snapshot in snapshots {
            let bucket = snapshot
                .timestamp
                .duration_trunc(Duration::hours(1))
                .unwrap_or(snapshot.timestamp);
            buckets.entry(bucket).or_default().push(snapshot.free_bikes);
        }
        Self {
            granularity: Granularity::Hour,
            series: buckets
                .into_iter()
                .map(|(bucket, mean)| TrendPoint {
                    ts: bucket.to_rfc3339(),
                    free: mean.value(),
                })
                .collect(),
        }
    }

    /// A single whole-day average, or an empty series without snapshots.
    pub fn daily<'a, I>(day: NaiveDate, snapshots: I) -> Self
    where
        I: IntoIterator<Item = &'a Snapshot>,
    {
        let mut mean = Mean::default();
        for snapshot in snapshots {
            mean.push(snapshot.free_bikes);
        }
        let series = if mean.count == 0 {
            vec![]
        } else {
            vec![TrendPoint {
                ts: day.format("%Y-%m-%d").to_string(),
                free: mean.value(),
            }]
        };
        Self {
            granularity: Granularity::Day,
            series,
        }
    }
}

#[cfg(test)]
mod tests {
    use utility::id::Id;

    use super::*;

    fn snapshot(at: DateTime<Utc>, free_bikes: i32) -> Snapshot {
        Snapshot {
            station: Id::new(1),
            timestamp: at,
            free_bikes,
            empty_slots: 10 - free_bikes,
        }
    }

    #[test]
    fn window_covers_exactly_one_day() {
        let (start, end) = utc_window(default_trend_day());
        assert_eq!(start.to_rfc3339(), "2025-11-18T00:00:00+00:00");
        assert_eq!(end - start, Duration::hours(24));
    }

    #[test]
    fn day_window_in_utc_matches_utc_window() {
        let day = default_trend_day();
        assert_eq!(day_window(day, &Utc), utc_window(day));
    }

    #[test]
    fn one_bucket_per_hour_with_mean() {
        let (start, _) = utc_window(default_trend_day());
        let mut snapshots = vec![];
        for hour in 0..24 {
            let base = start + Duration::hours(hour);
            snapshots.push(snapshot(base, 2));
            snapshots.push(snapshot(base + Duration::minutes(30), 5));
        }
        let trend = Trend::hourly(&snapshots);
        assert_eq!(trend.granularity, Granularity::Hour);
        assert_eq!(trend.series.len(), 24);
        assert!(trend.series.iter().all(|point| point.free == 3.5));
        assert_eq!(trend.series[0].ts, "2025-11-18T00:00:00+00:00");
        assert_eq!(trend.series[23].ts, "2025-11-18T23:00:00+00:00");
    }

    #[test]
    fn buckets_are_sorted_regardless_of_input_order() {
        let (start, _) = utc_window(default_trend_day());
        let snapshots = vec![
            snapshot(start + Duration::hours(5), 1),
            snapshot(start + Duration::hours(2), 7),
        ];
        let trend = Trend::hourly(&snapshots);
        assert_eq!(trend.series[0].free, 7.0);
        assert_eq!(trend.series[1].free, 1.0);
    }

    #[test]
    fn daily_fallback_is_a_single_mean_or_empty() {
        let day = default_trend_day();
        let (start, _) = utc_window(day);
        let snapshots = vec![snapshot(start, 1), snapshot(start, 4)];
        let trend = Trend::daily(day, &snapshots);
        assert_eq!(trend.granularity, Granularity::Day);
        assert_eq!(
            trend.series,
            vec![TrendPoint {
                ts: "2025-11-18".to_owned(),
                free: 2.5
            }]
        );

        let empty = Trend::daily(day, &[]);
        assert!(empty.series.is_empty());
        assert_eq!(
            serde_json::to_value(empty).unwrap(),
            serde_json::json!({"granularity": "day", "series": []})
        );
    }
}
