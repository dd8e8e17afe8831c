//! Serde helpers for the date and time formats used on the wire.

pub mod date_time {
    use chrono::{DateTime, TimeZone};
    use serde::Serializer;

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Serializes a timestamp as `YYYY-MM-DD HH:MM:SS` in its own time zone.
    pub fn serialize<S, Tz>(value: &DateTime<Tz>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        serializer.collect_str(&value.format(FORMAT))
    }
}

pub mod date {
    use core::fmt;

    use chrono::NaiveDate;
    use serde::{
        de::{self, Unexpected, Visitor},
        Deserializer, Serializer,
    };

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(value: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DateVisitor;

        impl<'de> Visitor<'de> for DateVisitor {
            type Value = NaiveDate;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string in the format YYYY-MM-DD")
            }

            fn visit_str<E>(self, value: &str) -> Result<NaiveDate, E>
            where
                E: de::Error,
            {
                NaiveDate::parse_from_str(value, FORMAT).map_err(|_| {
                    de::Error::invalid_value(Unexpected::Str(value), &self)
                })
            }
        }

        deserializer.deserialize_str(DateVisitor)
    }
}

pub mod hour_minute {
    use chrono::{DateTime, Local, Utc};
    use serde::Serializer;

    pub const FORMAT: &str = "%H:%M";

    /// Serializes a UTC timestamp as `HH:MM` in the server's local time.
    pub fn serialize_local<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.with_timezone(&Local).format(FORMAT))
    }
}
