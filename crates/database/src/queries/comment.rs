use dashboard::database::Result;
use model::{
    comment::{Comment, CommentListItem, Reply, ReplyListItem},
    station::Station,
    WithId,
};
use sqlx::{Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{
    comment::{CommentListRow, CommentRow, ReplyListRow, ReplyRow},
    with_id, with_ids,
};

use super::convert_error;

pub async fn put<'c, E>(executor: E, comment: Comment) -> Result<WithId<Comment>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO comments (commented_to, commentor, content, name, creation_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, commented_to, commentor, content, name, creation_time;
        ",
    )
    .bind(comment.commented_to.raw())
    .bind(comment.commentor.raw())
    .bind(comment.content)
    .bind(comment.name)
    .bind(comment.creation_time)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: CommentRow| with_id(row))
}

pub async fn get<'c, E>(executor: E, id: &Id<Comment>) -> Result<WithId<Comment>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, commented_to, commentor, content, name, creation_time
        FROM comments
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: CommentRow| with_id(row))
}

pub async fn list<'c, E>(executor: E) -> Result<Vec<CommentListItem>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            comments.id, commented_to, commentor, content, name, creation_time,
            users.first_name
        FROM comments
        JOIN users ON users.id = comments.commentor
        ORDER BY comments.id ASC;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<CommentListRow>| {
        Ok(rows.into_iter().map(CommentListRow::to_list_item).collect())
    })
}

pub async fn newest_of_station<'c, E>(
    executor: E,
    station: &Id<Station>,
    limit: i64,
) -> Result<Vec<WithId<Comment>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, commented_to, commentor, content, name, creation_time
        FROM comments
        WHERE commented_to = $1
        ORDER BY creation_time DESC, id DESC
        LIMIT $2;
        ",
    )
    .bind(station.raw())
    .bind(limit)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<CommentRow>| Ok(with_ids(rows)))
}

pub async fn put_reply<'c, E>(executor: E, reply: Reply) -> Result<WithId<Reply>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO replies (reply_to, replier, content, name, creation_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, reply_to, replier, content, name, creation_time;
        ",
    )
    .bind(reply.reply_to.raw())
    .bind(reply.replier.raw())
    .bind(reply.content)
    .bind(reply.name)
    .bind(reply.creation_time)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: ReplyRow| with_id(row))
}

pub async fn reply_list<'c, E>(executor: E) -> Result<Vec<ReplyListItem>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            replies.id, reply_to, replier, content, name, creation_time,
            users.first_name
        FROM replies
        JOIN users ON users.id = replies.replier
        ORDER BY replies.id ASC;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|rows: Vec<ReplyListRow>| {
        Ok(rows.into_iter().map(ReplyListRow::to_list_item).collect())
    })
}
