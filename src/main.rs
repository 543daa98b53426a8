mod aggregation;
mod calendar;
mod config;
mod error;
mod export;
mod front;
mod migration;
pub mod models;
mod records;
mod reports;
mod store;

use std::sync::Arc;

use anyhow::Context;
use env_logger::Env;
use sqlx::postgres::PgPoolOptions;

use crate::{
    config::Config,
    store::{MemoryStore, PgStore, Stores},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::try_init_from_env(Env::default().default_filter_or("masjid_kas=debug"))?;

    let config = Config::from_env()?;
    log::info!(
        "ramadan {} H: {} ({} days)",
        config.ramadan.hijri_year,
        config.ramadan.label(),
        config.ramadan.days()
    );

    let stores = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(url)
                .await
                .context("cannot connect to DATABASE_URL")?;
            migration::migrate(&pool, &config.migrations_dir).await?;
            Stores::from_backend(Arc::new(PgStore::new(pool)))
        }
        None => {
            log::warn!("DATABASE_URL is not set, records are kept in memory only");
            Stores::from_backend(Arc::new(MemoryStore::new()))
        }
    };

    front::start_web_server(&config, stores).await
}
