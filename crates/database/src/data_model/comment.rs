use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashboard::database::{CommentRepo, Result};
use model::{
    comment::{Comment, CommentListItem, Reply, ReplyListItem},
    station::Station,
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{
    queries::comment::{get, list, newest_of_station, put, put_reply, reply_list},
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

use super::{with_id, DatabaseRow};

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: i32,
    pub commented_to: i32,
    pub commentor: i32,
    pub content: String,
    pub name: String,
    pub creation_time: DateTime<Utc>,
}

impl DatabaseRow for CommentRow {
    type Model = Comment;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Comment {
            commented_to: Id::new(self.commented_to),
            commentor: Id::new(self.commentor),
            content: self.content,
            name: self.name,
            creation_time: self.creation_time,
        }
    }
}

/// A comment joined with the author's first name.
#[derive(Debug, Clone, FromRow)]
pub struct CommentListRow {
    #[sqlx(flatten)]
    pub comment: CommentRow,
    pub first_name: String,
}

impl CommentListRow {
    pub fn to_list_item(self) -> CommentListItem {
        CommentListItem::new(with_id(self.comment), self.first_name)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ReplyRow {
    pub id: i32,
    pub reply_to: i32,
    pub replier: i32,
    pub content: String,
    pub name: String,
    pub creation_time: DateTime<Utc>,
}

impl DatabaseRow for ReplyRow {
    type Model = Reply;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        Reply {
            reply_to: Id::new(self.reply_to),
            replier: Id::new(self.replier),
            content: self.content,
            name: self.name,
            creation_time: self.creation_time,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ReplyListRow {
    #[sqlx(flatten)]
    pub reply: ReplyRow,
    pub first_name: String,
}

impl ReplyListRow {
    pub fn to_list_item(self) -> ReplyListItem {
        ReplyListItem::new(with_id(self.reply), self.first_name)
    }
}

#[async_trait]
impl CommentRepo for PgDatabaseAutocommit {
    async fn put_comment(&mut self, comment: Comment) -> Result<WithId<Comment>> {
        put(&self.pool, comment).await
    }

    async fn get_comment(&mut self, id: &Id<Comment>) -> Result<WithId<Comment>> {
        get(&self.pool, id).await
    }

    async fn comment_list(&mut self) -> Result<Vec<CommentListItem>> {
        list(&self.pool).await
    }

    async fn comments_of_station(
        &mut self,
        station: &Id<Station>,
        limit: i64,
    ) -> Result<Vec<WithId<Comment>>> {
        newest_of_station(&self.pool, station, limit).await
    }

    async fn put_reply(&mut self, reply: Reply) -> Result<WithId<Reply>> {
        put_reply(&self.pool, reply).await
    }

    async fn reply_list(&mut self) -> Result<Vec<ReplyListItem>> {
        reply_list(&self.pool).await
    }
}

#[async_trait]
impl<'a> CommentRepo for PgDatabaseTransaction<'a> {
    async fn put_comment(&mut self, comment: Comment) -> Result<WithId<Comment>> {
        put(&mut *self.tx, comment).await
    }

    async fn get_comment(&mut self, id: &Id<Comment>) -> Result<WithId<Comment>> {
        get(&mut *self.tx, id).await
    }

    async fn comment_list(&mut self) -> Result<Vec<CommentListItem>> {
        list(&mut *self.tx).await
    }

    async fn comments_of_station(
        &mut self,
        station: &Id<Station>,
        limit: i64,
    ) -> Result<Vec<WithId<Comment>>> {
        newest_of_station(&mut *self.tx, station, limit).await
    }

    async fn put_reply(&mut self, reply: Reply) -> Result<WithId<Reply>> {
        put_reply(&mut *self.tx, reply).await
    }

    async fn reply_list(&mut self) -> Result<Vec<ReplyListItem>> {
        reply_list(&mut *self.tx).await
    }
}
