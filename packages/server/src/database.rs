use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::config::DatabaseConfig;

/// Connect to the record database and bring its schema in line with the
/// entity definitions.
pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.clone());

    // SQLite has a single writer; more connections only produce busy errors.
    let max_connections = if config.url.starts_with("sqlite:") {
        1
    } else {
        config.max_connections.max(1)
    };

    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(60))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("birdwatch_server::entity::*")
        .sync(&db)
        .await?;

    info!(max_connections, "Record database ready");
    Ok(db)
}

/// Close the connection pool.
pub async fn close_db(db: DatabaseConnection) -> Result<(), DbErr> {
    db.close().await?;
    info!("Record database closed");
    Ok(())
}
