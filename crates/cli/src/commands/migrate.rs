//! Database migration commands.
//!
//! ```bash
//! mp-cli migrate
//! ```
//!
//! Migrations live in `crates/server/migrations/` and are embedded at build
//! time. Applied versions are tracked in `_sqlx_migrations`, so running the
//! command twice is a no-op.

use secrecy::ExposeSecret;
use sqlx::PgPool;

use super::{CommandError, database_url};

/// Run all pending marketplace migrations.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to marketplace database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running marketplace migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Marketplace migrations complete");
    Ok(())
}
