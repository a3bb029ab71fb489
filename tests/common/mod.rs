//! MySQL helpers for repository tests
//!
//! Tests using these helpers skip themselves when `DATABASE_URL` is unset or
//! the database is unreachable.

use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::sync::Once;
use std::time::Duration;

static ENV_INIT: Once = Once::new();

fn init_env() {
    ENV_INIT.call_once(|| {
        let _ = dotenvy::dotenv();
    });
}

pub async fn get_test_pool() -> anyhow::Result<MySqlPool> {
    init_env();
    let url = std::env::var("DATABASE_URL")?;

    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&url)
        .await?;

    warden_core::migration::MIGRATOR.run(&pool).await?;
    Ok(pool)
}

/// Unique suffix so parallel tests never share rows
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}
