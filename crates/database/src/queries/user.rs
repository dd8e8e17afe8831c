use dashboard::database::Result;
use model::{
    user::{Account, Session, User},
    WithId,
};
use sqlx::{Executor, Postgres};
use utility::id::Id;

use crate::data_model::{
    user::{AccountRow, UserRow},
    with_id,
};

use super::convert_error;

pub async fn put_account<'c, E>(executor: E, account: Account) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO users (username, email, first_name, last_name, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, username, email, first_name, last_name;
        ",
    )
    .bind(account.user.username)
    .bind(account.user.email)
    .bind(account.user.first_name)
    .bind(account.user.last_name)
    .bind(account.password_hash)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: UserRow| with_id(row))
}

pub async fn get<'c, E>(executor: E, id: &Id<User>) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, username, email, first_name, last_name
        FROM users
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: UserRow| with_id(row))
}

pub async fn account_by_username<'c, E>(
    executor: E,
    username: &str,
) -> Result<Option<(Id<User>, Account)>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, username, email, first_name, last_name, password_hash
        FROM users
        WHERE username = $1;
        ",
    )
    .bind(username)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
    .map(|row: Option<AccountRow>| row.map(AccountRow::into_account))
}

pub async fn put_session<'c, E>(executor: E, session: Session) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO sessions (token, user_id, created_at)
        VALUES ($1, $2, $3);
        ",
    )
    .bind(session.token)
    .bind(session.user.raw())
    .bind(session.created_at)
    .execute(executor)
    .await
    .map_err(convert_error)
    .map(|_| ())
}

pub async fn user_by_session<'c, E>(executor: E, token: &str) -> Result<Option<WithId<User>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT users.id, username, email, first_name, last_name
        FROM sessions
        JOIN users ON users.id = sessions.user_id
        WHERE sessions.token = $1;
        ",
    )
    .bind(token)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
    .map(|row: Option<UserRow>| row.map(with_id))
}

pub async fn delete_session<'c, E>(executor: E, token: &str) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query("DELETE FROM sessions WHERE token = $1;")
        .bind(token)
        .execute(executor)
        .await
        .map_err(convert_error)
        .map(|_| ())
}
