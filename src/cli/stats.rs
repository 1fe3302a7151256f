use anyhow::Result;

use crate::config::EngramConfig;
use crate::memory::metrics;

/// Display store counts and the metrics summary.
pub fn stats(config: &EngramConfig, session: Option<&str>) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let total: i64 = conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
    let with_embedding: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE embedding IS NOT NULL",
        [],
        |row| row.get(0),
    )?;
    let scoped: i64 = conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE scope_id IS NOT NULL",
        [],
        |row| row.get(0),
    )?;
    let db_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let summary = metrics::metrics_summary(&conn, session)?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {total}");
    println!("  With embedding:      {with_embedding}");
    println!("  Scoped:              {scoped}");
    println!("  Database size:       {db_size} bytes");
    println!();

    if let Some(session) = session {
        println!("Session {session}:");
    }
    println!("  Remembers:           {}", summary.total_remembers);
    println!("  Recalls:             {}", summary.total_recalls);
    println!("  Recall hit rate:     {:.2}", summary.recall_hit_rate);
    println!("  Fallback rate:       {:.2}", summary.fallback_rate);

    Ok(())
}
