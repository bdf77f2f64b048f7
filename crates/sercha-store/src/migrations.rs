//! Schema migration runner
//!
//! Each migration asset carries a leading numeric prefix in its name
//! (`0001_initial.sql`). On startup we parse that prefix, sort the assets
//! numerically, and apply each whose version exceeds the maximum recorded
//! in `schema_migrations`. Assets without a parseable numeric prefix are
//! skipped rather than treated as an error, keeping startup tolerant of
//! stray files in the migrations directory.

use sqlx::{Row, SqlitePool};

use sercha_core::ports::StoreError;

/// One migration asset: a name (used only to derive its version) and its
/// SQL body, embedded at compile time.
struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// The full set of known migrations, in the order they were authored.
/// Order here is irrelevant to execution order — `run` re-sorts by the
/// version parsed out of `name` — but listing them in version order
/// keeps this array readable.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "0001_initial.sql",
        sql: include_str!("migrations/0001_initial.sql"),
    },
    Migration {
        name: "0002_document_parent_index.sql",
        sql: include_str!("migrations/0002_document_parent_index.sql"),
    },
];

/// Parses the leading numeric prefix of a migration asset name (the
/// digits before the first non-digit character). Returns `None` if the
/// name does not start with a digit.
fn parse_version(name: &str) -> Option<i64> {
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Applies every migration whose version exceeds the maximum recorded in
/// `schema_migrations`. Idempotent: re-running with no new migrations is
/// a no-op.
pub async fn run(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL)",
    )
    .execute(pool)
    .await
    .map_err(|e| StoreError::Backend(e.into()))?;

    let max_version: i64 = sqlx::query("SELECT COALESCE(MAX(version), 0) AS max_version FROM schema_migrations")
        .fetch_one(pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?
        .get("max_version");

    let mut pending: Vec<(i64, &Migration)> = MIGRATIONS
        .iter()
        .filter_map(|m| parse_version(m.name).map(|v| (v, m)))
        .filter(|(v, _)| *v > max_version)
        .collect();
    pending.sort_by_key(|(v, _)| *v);

    for (version, migration) in pending {
        tracing::debug!(version, name = migration.name, "applying schema migration");
        sqlx::raw_sql(migration.sql)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(pool)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_prefix() {
        assert_eq!(parse_version("0001_initial.sql"), Some(1));
        assert_eq!(parse_version("42_add_index.sql"), Some(42));
    }

    #[test]
    fn missing_prefix_is_skipped() {
        assert_eq!(parse_version("readme.sql"), None);
        assert_eq!(parse_version("_no_prefix.sql"), None);
    }

    #[tokio::test]
    async fn running_migrations_twice_is_idempotent() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run(&pool).await.unwrap();
        run(&pool).await.unwrap();

        let count: i64 = sqlx::query("SELECT COUNT(*) AS c FROM schema_migrations")
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("c");
        assert_eq!(count, MIGRATIONS.len() as i64);
    }
}
