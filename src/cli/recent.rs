use anyhow::Result;

use crate::config::EngramConfig;
use crate::memory::store;
use crate::memory::types::ScopeFilter;

/// List the most recent memories by strength and recency.
pub fn recent(config: &EngramConfig, limit: usize) -> Result<()> {
    let conn = crate::db::open_database(config.resolved_db_path())?;

    let rows = store::search_fts(
        &conn,
        "",
        limit,
        &ScopeFilter::default(),
        config.embedding.dimensions,
    )?;

    if rows.is_empty() {
        println!("No memories stored yet.");
        return Ok(());
    }

    for (memory, _) in rows {
        println!(
            "{}  [{}]  s={:.2}  {}",
            memory.id,
            memory.category.as_deref().unwrap_or("-"),
            memory.strength,
            preview(&memory.content, 72),
        );
    }
    Ok(())
}

fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
