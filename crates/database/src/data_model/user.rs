use async_trait::async_trait;
use dashboard::database::{Result, UserRepo};
use model::{
    user::{Account, Session, User},
    WithId,
};
use sqlx::prelude::FromRow;
use utility::id::Id;

use crate::{
    queries::user::{
        account_by_username, delete_session, get, put_account, put_session, user_by_session,
    },
    PgDatabaseAutocommit, PgDatabaseTransaction,
};

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl DatabaseRow for UserRow {
    type Model = User;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id)
    }

    fn to_model(self) -> Self::Model {
        User {
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    #[sqlx(flatten)]
    pub user: UserRow,
    pub password_hash: String,
}

impl AccountRow {
    pub fn into_account(self) -> (Id<User>, Account) {
        let id = self.user.get_id();
        let account = Account {
            user: self.user.to_model(),
            password_hash: self.password_hash,
        };
        (id, account)
    }
}

#[async_trait]
impl UserRepo for PgDatabaseAutocommit {
    async fn put_account(&mut self, account: Account) -> Result<WithId<User>> {
        put_account(&self.pool, account).await
    }

    async fn get_user(&mut self, id: &Id<User>) -> Result<WithId<User>> {
        get(&self.pool, id).await
    }

    async fn account_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<(Id<User>, Account)>> {
        account_by_username(&self.pool, username).await
    }

    async fn put_session(&mut self, session: Session) -> Result<()> {
        put_session(&self.pool, session).await
    }

    async fn user_by_session(&mut self, token: &str) -> Result<Option<WithId<User>>> {
        user_by_session(&self.pool, token).await
    }

    async fn delete_session(&mut self, token: &str) -> Result<()> {
        delete_session(&self.pool, token).await
    }
}

#[async_trait]
impl<'a> UserRepo for PgDatabaseTransaction<'a> {
    async fn put_account(&mut self, account: Account) -> Result<WithId<User>> {
        put_account(&mut *self.tx, account).await
    }

    async fn get_user(&mut self, id: &Id<User>) -> Result<WithId<User>> {
        get(&mut *self.tx, id).await
    }

    async fn account_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<(Id<User>, Account)>> {
        account_by_username(&mut *self.tx, username).await
    }

    async fn put_session(&mut self, session: Session) -> Result<()> {
        put_session(&mut *self.tx, session).await
    }

    async fn user_by_session(&mut self, token: &str) -> Result<Option<WithId<User>>> {
        user_by_session(&mut *self.tx, token).await
    }

    async fn delete_session(&mut self, token: &str) -> Result<()> {
        delete_session(&mut *self.tx, token).await
    }
}
