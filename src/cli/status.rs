use anyhow::Result;

use crate::config::EngramConfig;
use crate::daemon::{self, DaemonStatus};

/// Report daemon liveness and database health.
pub fn status(config: &EngramConfig) -> Result<()> {
    match daemon::status(config) {
        DaemonStatus::Running(pid) => println!("Daemon:          running (pid {pid})"),
        DaemonStatus::Stale(pid) => println!("Daemon:          not running (stale PID file: {pid})"),
        DaemonStatus::Stopped => println!("Daemon:          not running"),
    }
    println!(
        "HTTP endpoint:   http://{}:{}",
        config.server.http_host, config.server.http_port
    );

    let db_path = config.resolved_db_path();
    if !db_path.exists() {
        println!("Database:        not created yet ({})", db_path.display());
        return Ok(());
    }

    let conn = crate::db::open_database(&db_path)?;
    let report = crate::db::check_database_health(&conn)?;

    println!("Database:        {}", db_path.display());
    println!("  Schema version: {}", report.schema_version);
    println!(
        "  Integrity:      {}",
        if report.integrity_ok { "ok" } else { "FAILED" }
    );
    println!(
        "  Embedding model: {}",
        report.embedding_model.as_deref().unwrap_or("unset")
    );
    println!("  Memories:       {}", report.memory_count);
    println!("  Metric events:  {}", report.metric_count);
    println!("  Ledger entries: {}", report.ledger_count);

    Ok(())
}
