use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;
    Ok(db)
}

/// Create the tables and indexes if they don't exist. Safe to run on every
/// startup; this is not a migration system.
pub async fn bootstrap_schema(db: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            BIGSERIAL PRIMARY KEY,
            email         VARCHAR(320) NOT NULL UNIQUE,
            password_hash VARCHAR(200) NOT NULL,
            is_active     BOOLEAN NOT NULL DEFAULT TRUE,
            created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(db)
    .await
    .context("create users table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id          BIGSERIAL PRIMARY KEY,
            user_id     BIGINT NOT NULL REFERENCES users(id),
            description VARCHAR(200) NOT NULL,
            amount      NUMERIC(12,2) NOT NULL,
            kind        VARCHAR(10) NOT NULL,
            category    VARCHAR(100),
            occurred_on DATE NOT NULL,
            note        TEXT,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(db)
    .await
    .context("create transactions table")?;

    for stmt in [
        "CREATE INDEX IF NOT EXISTS idx_transactions_user_id ON transactions (user_id)",
        "CREATE INDEX IF NOT EXISTS idx_transactions_occurred_on ON transactions (occurred_on)",
        "CREATE INDEX IF NOT EXISTS idx_transactions_kind ON transactions (kind)",
        "CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions (category)",
    ] {
        sqlx::query(stmt)
            .execute(db)
            .await
            .context("create transactions index")?;
    }

    Ok(())
}
