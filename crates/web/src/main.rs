use std::process::ExitCode;

use chrono::{Days, Utc};
use citybikes::{
    collector::{StationsCollector, StatusCollector},
    Feed,
};
use clap::Parser;
use dashboard::server::Server;
use database::{DatabaseConnectionInfo, PgDatabase};
use rand::{rngs::StdRng, SeedableRng};
use web::{
    config::{Command, Config},
    router, start_web_server, WebState,
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let config = Config::parse();

    // database
    let database_connection_info = DatabaseConnectionInfo::from_env()
        .expect("expected database connection info in env.");
    let database = PgDatabase::connect(database_connection_info)
        .await
        .expect("could not connect to database.");

    let server = Server::new(database);
    let feed = Feed::new(config.feed_url.clone()).expect("could not create feed client.");

    match config.command() {
        Command::Serve => {
            if config.disable_collectors {
                log::info!("collectors disabled");
            } else {
                start_collectors(&server, &feed, &config);
            }

            let state = WebState::new(server.client(), Some(feed), config.trend_day);
            let result = start_web_server(config.bind, router(state, &config.web_root)).await;
            server.shutdown();
            if let Err(why) = result {
                log::error!("web server failed: {}", why);
                return ExitCode::FAILURE;
            }
        }
        Command::Collect { once: true } => match feed.record_status(&server.client()).await {
            Ok(report) => println!(
                "Recorded {} status logs and {} snapshots.",
                report.status_logs, report.snapshots
            ),
            Err(why) => {
                log::error!("{}", why);
                return ExitCode::FAILURE;
            }
        },
        Command::Collect { once: false } => {
            start_collectors(&server, &feed, &config);
            if let Err(why) = tokio::signal::ctrl_c().await {
                log::error!("could not wait for ctrl-c: {}", why);
            }
            server.shutdown();
        }
        Command::SyncStations => match feed.sync_stations(&server.client()).await {
            Ok(count) => println!("Synced {} stations.", count),
            Err(why) => {
                log::error!("{}", why);
                return ExitCode::FAILURE;
            }
        },
        Command::SeedSnapshots { date } => {
            let day = date.unwrap_or_else(|| {
                let today = Utc::now().date_naive();
                today.checked_sub_days(Days::new(1)).unwrap_or(today)
            });
            let mut rng = StdRng::from_entropy();
            match server.client().seed_snapshots(day, &mut rng).await {
                Ok(inserted) => println!("Inserted {} snapshots for {}.", inserted, day),
                Err(why) => {
                    log::error!("could not seed snapshots: {}", why);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

fn start_collectors(server: &Server<PgDatabase>, feed: &Feed, config: &Config) {
    let stations_feed = feed.clone();
    server.collector(move || StationsCollector::new(stations_feed.clone()));

    let status_feed = feed.clone();
    let interval = config.status_interval();
    server.collector(move || StatusCollector::new(status_feed.clone(), interval));
}
