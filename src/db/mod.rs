use anyhow::Result;
use chrono::NaiveDate;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

/// Thin façade over the SQLite connection. The gateway only ever needs the
/// quota counter and the suppression registry, so the surface stays small.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn quota_repo(&self) -> repositories::quota::QuotaRepository {
        repositories::quota::QuotaRepository::new(self.conn.clone())
    }

    fn suppression_repo(&self) -> repositories::suppression::SuppressionRepository {
        repositories::suppression::SuppressionRepository::new(self.conn.clone())
    }

    pub async fn get_quota_count(&self, key: &str, day: NaiveDate) -> Result<i32> {
        self.quota_repo().get_count(key, day).await
    }

    pub async fn increment_quota(&self, key: &str, day: NaiveDate) -> Result<()> {
        self.quota_repo().increment(key, day).await
    }

    pub async fn is_suppressed(&self, value: &str) -> Result<bool> {
        self.suppression_repo().contains(value).await
    }

    pub async fn add_suppression(&self, value: &str, kind: &str) -> Result<()> {
        self.suppression_repo().add(value, kind).await
    }
}
