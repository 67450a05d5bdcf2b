use anyhow::{Context, Result};
use rusqlite::Connection;

/// Schema steps in order; step `n` moves `user_version` from `n` to `n + 1`.
const SCHEMA: &[&str] = &[include_str!("migrations/001_initial.sql")];

fn user_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version.max(0) as usize)
}

/// Bring the kv schema up to date. Safe to call on every open.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current = user_version(conn)?;
    if current > SCHEMA.len() {
        anyhow::bail!(
            "Database schema version {} is newer than this build supports ({})",
            current,
            SCHEMA.len()
        );
    }

    for (index, sql) in SCHEMA.iter().enumerate().skip(current) {
        let target = index + 1;
        conn.execute_batch(&format!(
            "BEGIN; {} PRAGMA user_version = {}; COMMIT;",
            sql, target
        ))
        .with_context(|| format!("Failed to upgrade schema to version {}", target))?;
        tracing::info!(version = target, "Upgraded database schema");
    }

    Ok(())
}
