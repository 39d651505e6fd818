use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;

pub type DbPool = Pool<Sqlite>;

/// Open (creating if needed) the on-device database file.
pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// A throwaway in-memory database. The single connection is never recycled,
/// since the data lives only as long as it does.
pub async fn create_memory_db() -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_value(pool: &DbPool, key: &str) -> Result<Option<String>, sqlx::Error> {
    let row = sqlx::query_as::<_, (String,)>("SELECT value FROM kv WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.0))
}

pub async fn set_value(pool: &DbPool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO kv (key, value) VALUES (?, ?) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns whether a value was present.
pub async fn delete_value(pool: &DbPool, key: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM kv WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_reads_none() {
        let pool = create_memory_db().await.unwrap();
        assert_eq!(get_value(&pool, "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites() {
        let pool = create_memory_db().await.unwrap();
        set_value(&pool, "app_budget", "30000").await.unwrap();
        set_value(&pool, "app_budget", "-500").await.unwrap();
        assert_eq!(get_value(&pool, "app_budget").await.unwrap().as_deref(), Some("-500"));
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let pool = create_memory_db().await.unwrap();
        set_value(&pool, "k", "v").await.unwrap();
        assert!(delete_value(&pool, "k").await.unwrap());
        assert!(!delete_value(&pool, "k").await.unwrap());
        assert_eq!(get_value(&pool, "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_db_persists_across_pools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kakeibo.db");

        let pool = create_db(&path).await.unwrap();
        set_value(&pool, "ocr_items", "[]").await.unwrap();
        pool.close().await;

        let pool = create_db(&path).await.unwrap();
        assert_eq!(get_value(&pool, "ocr_items").await.unwrap().as_deref(), Some("[]"));
    }
}
