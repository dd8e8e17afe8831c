use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    client::Client,
    collector::{self, Collector},
    database::Database,
};

pub struct Server<D>
where
    D: Database,
{
    database: D,
    shutdown: CancellationToken,
}

impl<D> Server<D>
where
    D: Database,
{
    pub fn new(database: D) -> Self {
        Self {
            database,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn client(&self) -> Client<D> {
        Client::new(self.database.clone())
    }

    /// Starts a collector in the background. It is stopped by `shutdown`.
    pub fn collector<C, F>(&self, factory: F) -> JoinHandle<()>
    where
        C: Collector,
        F: 'static + Send + Fn() -> C,
    {
        collector::run(factory, self.client(), self.shutdown.child_token())
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
