use anyhow::Result;

use crate::config::EngramConfig;
use crate::embedding;
use crate::memory::recall::{recall, RecallRequest};

/// Run a recall from the terminal.
pub fn search(config: &EngramConfig, query: &str, limit: usize) -> Result<()> {
    let conn = crate::db::open_database(config.resolved_db_path())?;
    let provider = match embedding::shared_provider(&config.embedding) {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::warn!(error = %e, "embedder unavailable, using keyword search");
            None
        }
    };

    let mut request = RecallRequest::new(query);
    request.limit = limit;
    request.min_strength = config.retrieval.default_min_strength;

    let response = recall(&conn, provider.as_deref(), config, &request)?;

    if response.memories.is_empty() {
        println!("No matches.");
        return Ok(());
    }

    if response.fallback_mode {
        println!("(recent memories — no query given)");
    }
    for m in &response.memories {
        println!(
            "{:.3}  {}  [{}]  {}",
            m.relevance,
            m.id,
            m.category.as_deref().unwrap_or("-"),
            m.content,
        );
    }
    Ok(())
}
