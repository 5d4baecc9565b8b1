use crate::{adapters::persistence::PostgresPersistence, infra::db::init_db};

pub mod app;
pub mod config;
pub mod db;
pub mod mercadopago_client;
pub mod pending_sweep;
pub mod rate_limit;
pub mod setup;

pub async fn postgres_persistence(database_url: &str) -> anyhow::Result<PostgresPersistence> {
    let pool = init_db(database_url).await?;
    Ok(PostgresPersistence::new(pool))
}
