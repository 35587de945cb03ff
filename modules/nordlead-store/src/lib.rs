pub mod admin;
pub mod catalog;
pub mod entity_store;
pub mod error;
pub mod job_store;

pub use admin::{Integration, PgAdminStore, ScoringModelRecord};
pub use catalog::{
    CompanyDetail, CompanyFilter, CompanyPage, DashboardStats, ExportRow, PgCatalog,
};
pub use entity_store::PgEntityStore;
pub use error::{Result, StoreError};
pub use job_store::PgJobStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to Postgres with a small pool sized for the sync workers plus the
/// web handlers.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::debug!("Migrations applied");
    Ok(())
}
