use std::{error::Error, fmt};

pub mod accounts;
pub mod channel;
pub mod client;
pub mod collector;
pub mod database;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod server;

#[derive(Debug)]
pub enum RequestError {
    NotFound,
    Conflict,
    /// The request was understood but rejected. The message is meant for the
    /// user.
    Invalid(String),
    Other(Box<dyn Error + Send + Sync>),
}

impl RequestError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid(message.into())
    }

    pub fn other<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::Other(Box::new(why))
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Invalid(message) => write!(f, "{}", message),
            Self::Other(why) => write!(f, "{}", why),
        }
    }
}

impl Error for RequestError {}

impl From<database::DatabaseError> for RequestError {
    fn from(value: database::DatabaseError) -> Self {
        match value {
            database::DatabaseError::NotFound => Self::NotFound,
            database::DatabaseError::Conflict => Self::Conflict,
            database::DatabaseError::Other(why) => Self::Other(why),
        }
    }
}

pub type RequestResult<O> = Result<O, RequestError>;

pub fn not_found_to_none<O>(result: RequestResult<O>) -> RequestResult<Option<O>> {
    if let Err(RequestError::NotFound) = result {
        Ok(None)
    } else {
        result.map(Some)
    }
}
