use chrono::NaiveDate;
use serde_json::{Map, Value};
use utility::id::{HasId, Id};

use super::ChannelError;

/// A frame received from a client.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// A parsed client message: a JSON object with an `action` discriminator.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    data: Map<String, Value>,
}

pub fn parse(frame: Frame) -> Result<Request, ChannelError> {
    let text = match frame {
        Frame::Text(text) => text,
        Frame::Binary(_) => return Err(ChannelError::NotText),
    };
    let value: Value = serde_json::from_str(&text).map_err(|_| ChannelError::InvalidJson)?;
    match value {
        Value::Object(data) if data.contains_key("action") => Ok(Request { data }),
        _ => Err(ChannelError::MissingAction),
    }
}

impl Request {
    /// `None` if the action is not a string. Such requests are ignored like
    /// unknown actions.
    pub fn action(&self) -> Option<&str> {
        self.data.get("action").and_then(Value::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn has_all(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.has(key))
    }

    fn get(&self, key: &'static str) -> Result<&Value, ChannelError> {
        self.data.get(key).ok_or(ChannelError::MissingProperty(key))
    }

    /// Accepts numbers and numeric strings.
    pub fn int(&self, key: &'static str) -> Result<i32, ChannelError> {
        let value = self.get(key)?;
        value
            .as_i64()
            .and_then(|number| i32::try_from(number).ok())
            .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
            .ok_or_else(|| ChannelError::Rejected(format!("\"{}\" must be an integer", key)))
    }

    pub fn id<T>(&self, key: &'static str) -> Result<Id<T>, ChannelError>
    where
        T: HasId<IdType = i32>,
    {
        self.int(key).map(Id::new)
    }

    pub fn text(&self, key: &'static str) -> Result<String, ChannelError> {
        self.get(key)?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| ChannelError::Rejected(format!("\"{}\" must be a string", key)))
    }

    pub fn date(&self, key: &'static str) -> Result<NaiveDate, ChannelError> {
        let text = self.text(key)?;
        NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|_| {
            ChannelError::Rejected(format!("\"{}\" must be a date like 2025-11-18", key))
        })
    }
}
