#![cfg(test)]
use std::sync::Arc;

use configs::DatabaseConfig;
use migration::MigratorTrait;
use models::db::connect_with_config;
use uuid::Uuid;

use crate::customer::repo::{InMemoryCustomerRepository, SeaOrmCustomerRepository};
use crate::customer::CustomerRepository;

/// Pool size the shared contract tests run with, like a deployed server.
pub const POOL_SIZE: u32 = 4;

/// Fresh SQLite file per call, migrated to the latest schema.
pub async fn sqlite_repo(max_connections: u32) -> Result<SeaOrmCustomerRepository, anyhow::Error> {
    let path = std::env::temp_dir().join(format!("service_{}.db", Uuid::new_v4()));
    let cfg = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        max_connections,
        min_connections: 1,
        ..DatabaseConfig::default()
    };
    let db = connect_with_config(&cfg).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(SeaOrmCustomerRepository::new(db))
}

/// Every backend the repository contract is checked against.
pub async fn backends() -> Result<Vec<Arc<dyn CustomerRepository>>, anyhow::Error> {
    Ok(vec![Arc::new(InMemoryCustomerRepository::new()), Arc::new(sqlite_repo(POOL_SIZE).await?)])
}
