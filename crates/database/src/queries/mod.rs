use dashboard::database::DatabaseError;

pub mod comment;
pub mod station;
pub mod status;
pub mod tour;
pub mod user;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    if let sqlx::Error::RowNotFound = why {
        return DatabaseError::NotFound;
    }
    let code = why
        .as_database_error()
        .and_then(|error| error.code())
        .map(|code| code.into_owned());
    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => DatabaseError::Conflict,
        Some(FOREIGN_KEY_VIOLATION) => DatabaseError::NotFound,
        _ => DatabaseError::Other(Box::new(why)),
    }
}
