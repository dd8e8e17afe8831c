use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{station::Station, user::User, WithId};

pub const CONTENT_MAX_LEN: usize = 200;
pub const DISPLAY_NAME_MAX_LEN: usize = 20;

/// A comment on a station. `name` is the display name captured when the
/// comment was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Comment {
    pub commented_to: Id<Station>,
    pub commentor: Id<User>,
    pub content: String,
    pub name: String,
    pub creation_time: DateTime<Utc>,
}

impl HasId for Comment {
    type IdType = i32;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Reply {
    pub reply_to: Id<Comment>,
    pub replier: Id<User>,
    pub content: String,
    pub name: String,
    pub creation_time: DateTime<Utc>,
}

impl HasId for Reply {
    type IdType = i32;
}

/// Entry of the comment list pushed over the comment channel. `commentor` and
/// `name` carry the author's current first name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentListItem {
    pub id: Id<Comment>,
    pub commented_to_id: Id<Station>,
    pub commentor: String,
    pub content: String,
    pub name: String,
    #[serde(serialize_with = "utility::serde::date_time::serialize")]
    pub creation_time: DateTime<Utc>,
}

impl CommentListItem {
    pub fn new(comment: WithId<Comment>, author_first_name: String) -> Self {
        Self {
            id: comment.id,
            commented_to_id: comment.content.commented_to,
            commentor: author_first_name.clone(),
            content: comment.content.content,
            name: author_first_name,
            creation_time: comment.content.creation_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyListItem {
    pub id: Id<Reply>,
    pub replied_to_id: Id<Comment>,
    pub replier: String,
    pub content: String,
    pub name: String,
    #[serde(serialize_with = "utility::serde::date_time::serialize")]
    pub creation_time: DateTime<Utc>,
}

impl ReplyListItem {
    pub fn new(reply: WithId<Reply>, author_first_name: String) -> Self {
        Self {
            id: reply.id,
            replied_to_id: reply.content.reply_to,
            replier: author_first_name.clone(),
            content: reply.content.content,
            name: author_first_name,
            creation_time: reply.content.creation_time,
        }
    }
}

/// A comment as shown in the station detail side panel.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct StationComment {
    pub id: Id<Comment>,
    pub author: String,
    pub content: String,
    #[serde(serialize_with = "utility::serde::hour_minute::serialize_local")]
    #[schemars(with = "String")]
    pub time: DateTime<Utc>,
}

impl From<WithId<Comment>> for StationComment {
    fn from(comment: WithId<Comment>) -> Self {
        Self {
            id: comment.id,
            author: comment.content.name,
            content: comment.content.content,
            time: comment.content.creation_time,
        }
    }
}

/// Cuts a display name down to the column width.
pub fn display_name(name: &str) -> String {
    name.chars().take(DISPLAY_NAME_MAX_LEN).collect()
}
