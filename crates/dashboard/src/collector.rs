use std::{any::Any, fmt::Debug, panic::AssertUnwindSafe, time::Duration};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{client::Client, database::Database};

const DEFAULT_TICK: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum Continuation {
    /// Waits for the given duration instead of the next tick.
    ContinueAfter(Duration),
    Continue,
    Restart,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SupervisionStrategy {
    Restart,
    Resume,
    Stop,
}

#[async_trait]
pub trait Collector: Send + 'static {
    type Error: Debug + Send;

    /// Used to tell collectors apart in the log.
    fn name(&self) -> &'static str;

    /// This method is regularly called and supposed to gather data and push
    /// it to the database.
    async fn run<D: Database>(&mut self, client: &Client<D>) -> Result<Continuation, Self::Error>;

    /// Specifies how long to wait between calls to the `run` method. `None`
    /// runs the collector again right away.
    fn tick(&self) -> Option<Duration> {
        Some(DEFAULT_TICK)
    }

    /// Defines a backoff function, used to progressively increase the waiting
    /// time when consecutive failures happen.
    fn backoff(&self, last_backoff: Duration) -> Duration {
        last_backoff + self.tick().unwrap_or(DEFAULT_TICK)
    }

    /// Specifies the behavior if the collector returns an error.
    fn on_error(&self, _error: &Self::Error) -> SupervisionStrategy {
        SupervisionStrategy::Resume
    }

    /// Specifies the behavior if the collector panics.
    fn on_panic(&self, _error: Box<dyn Any + Send>) -> SupervisionStrategy {
        SupervisionStrategy::Restart
    }
}

/// Sleeps unless the token gets cancelled first. Returns `false` on
/// cancellation.
async fn wait(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = time::sleep(duration) => true,
        _ = shutdown.cancelled() => false,
    }
}

/// Runs the collector in its own task until it exits, is stopped by its
/// supervision strategy, or `shutdown` is cancelled.
pub fn run<D, C, F>(factory: F, client: Client<D>, shutdown: CancellationToken) -> JoinHandle<()>
where
    D: Database,
    C: Collector,
    F: 'static + Send + Fn() -> C,
{
    let mut collector = factory();

    tokio::spawn(async move {
        let name = collector.name();
        let mut interval = collector.tick().map(|tick| {
            let mut interval = time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let base_backoff = collector.tick().unwrap_or(DEFAULT_TICK);
        let mut backoff = base_backoff;
        log::info!("collector {} started", name);

        loop {
            if let Some(interval) = &mut interval {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown.cancelled() => break,
                }
            } else if shutdown.is_cancelled() {
                break;
            }

            let result = AssertUnwindSafe(collector.run(&client))
                .catch_unwind()
                .await;
            let strategy = match result {
                Ok(Ok(continuation)) => {
                    backoff = base_backoff;
                    match continuation {
                        Continuation::Continue => continue,
                        Continuation::ContinueAfter(duration) => {
                            if wait(duration, &shutdown).await {
                                continue;
                            }
                            break;
                        }
                        Continuation::Restart => {
                            collector = factory();
                            continue;
                        }
                        Continuation::Exit => break,
                    }
                }
                Ok(Err(why)) => {
                    log::warn!("collector {} failed: {:?}", name, why);
                    collector.on_error(&why)
                }
                Err(why) => {
                    log::error!("collector {} panicked: {:?}", name, why);
                    collector.on_panic(why)
                }
            };
            match strategy {
                SupervisionStrategy::Restart => collector = factory(),
                SupervisionStrategy::Resume => {}
                SupervisionStrategy::Stop => break,
            }
            backoff = collector.backoff(backoff);
            if !wait(backoff, &shutdown).await {
                break;
            }
        }
        log::info!("collector {} stopped", name);
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::{memory::MemoryDatabase, server::Server};

    struct Flaky {
        calls: Arc<AtomicUsize>,
        fail_until: usize,
        panic_on_first: bool,
    }

    #[async_trait]
    impl Collector for Flaky {
        type Error = String;

        fn name(&self) -> &'static str {
            "flaky"
        }

        fn tick(&self) -> Option<Duration> {
            Some(Duration::from_millis(1))
        }

        fn backoff(&self, _last_backoff: Duration) -> Duration {
            Duration::from_millis(1)
        }

        async fn run<D: Database>(&mut self, _client: &Client<D>) -> Result<Continuation, String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.panic_on_first && call == 0 {
                panic!("first run panics");
            }
            if call < self.fail_until {
                Err(format!("failure {}", call))
            } else {
                Ok(Continuation::Exit)
            }
        }
    }

    fn flaky(
        calls: &Arc<AtomicUsize>,
        fail_until: usize,
        panic_on_first: bool,
    ) -> impl Fn() -> Flaky + Send + 'static {
        let calls = calls.clone();
        move || Flaky {
            calls: calls.clone(),
            fail_until,
            panic_on_first,
        }
    }

    #[tokio::test]
    async fn resumes_after_errors_until_exit() {
        let server = Server::new(MemoryDatabase::default());
        let calls = Arc::new(AtomicUsize::new(0));
        server.collector(flaky(&calls, 3, false)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn restarts_after_panic() {
        let server = Server::new(MemoryDatabase::default());
        let calls = Arc::new(AtomicUsize::new(0));
        server.collector(flaky(&calls, 0, true)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let server = Server::new(MemoryDatabase::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = server.collector(flaky(&calls, usize::MAX, false));
        server.shutdown();
        handle.await.unwrap();
    }
}
