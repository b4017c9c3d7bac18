#[macro_use]
extern crate rocket;

mod api;
mod assessment;
mod auth;
mod config;
mod curriculum;
mod db;
mod env;
mod error;
mod models;
mod progress;
mod schedule;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use std::time::Duration;

use auth::{forbidden_api, unauthorized_api};
use config::AppConfig;
use db::clean_expired_sessions;
use error::AppError;
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use telemetry::{TelemetryFairing, init_tracing};
use thiserror::Error;
use tracing::info;

const DEFAULT_DATABASE_URL: &str = "sqlite://padel-coach.db?mode=rwc";

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Figment(rocket::figment::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::figment::Error> for Error {
    fn from(value: rocket::figment::Error) -> Self {
        Error::Figment(value)
    }
}

pub async fn connect(database_url: &str) -> Result<SqlitePool, Error> {
    let options: SqliteConnectOptions = database_url.parse()?;
    let pool = SqlitePool::connect_with(options.foreign_keys(true)).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(AppError::from)?;
    info!("Migrations completed successfully");

    Ok(pool)
}

fn spawn_session_cleanup(pool: SqlitePool, interval_secs: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool).await {
                Ok(0) => {}
                Ok(count) => info!("Cleaned up {} expired sessions", count),
                Err(e) => e.log_and_record("Session cleanup"),
            }

            tokio::time::sleep(Duration::from_secs(interval_secs)).await;
        }
    });
}

async fn prepare() -> Result<(SqlitePool, AppConfig), Error> {
    let env_files = env::load_environment()?;
    init_tracing();
    for env_file in &env_files {
        env_file.log();
    }

    let config = AppConfig::load()?;
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    let pool = connect(&database_url).await?;
    Ok((pool, config))
}

#[launch]
async fn rocket() -> _ {
    let (pool, config) = match prepare().await {
        Ok(ready) => ready,
        Err(e) => {
            eprintln!("Failed to start padel coach: {}", e);
            std::process::exit(1);
        }
    };

    spawn_session_cleanup(pool.clone(), config.session_cleanup_interval_secs);

    init_rocket(pool).await
}

pub async fn init_rocket(pool: SqlitePool) -> Rocket<Build> {
    info!("Starting padel coach");

    rocket::build()
        .manage(pool)
        .mount("/api", api::routes())
        .register("/api", catchers![unauthorized_api, forbidden_api])
        .attach(AppConfig::fairing())
        .attach(TelemetryFairing)
}
