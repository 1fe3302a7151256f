use anyhow::Result;

use crate::config::EngramConfig;
use crate::memory::forget;

/// Delete a memory from the terminal, honoring the scope guard rules.
pub fn forget(config: &EngramConfig, id: &str, scope_id: Option<&str>) -> Result<()> {
    let conn = crate::db::open_database(config.resolved_db_path())?;

    let response = forget::forget(&conn, &config.features, id, scope_id, None)?;
    if response.deleted {
        println!("Deleted {id}");
    } else {
        println!("Nothing deleted — id or scope did not match.");
    }
    Ok(())
}
