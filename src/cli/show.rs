use anyhow::Result;

use crate::config::EngramConfig;
use crate::memory::store;

/// Print one memory in full.
pub fn show(config: &EngramConfig, id: &str) -> Result<()> {
    let conn = crate::db::open_database(config.resolved_db_path())?;

    let Some(memory) = store::get_memory_by_id(&conn, id, config.embedding.dimensions)? else {
        anyhow::bail!("memory not found: {id}");
    };

    println!("id:             {}", memory.id);
    println!("content:        {}", memory.content);
    println!("category:       {}", memory.category.as_deref().unwrap_or("-"));
    println!("scope_id:       {}", memory.scope_id.as_deref().unwrap_or("-"));
    println!("chat_id:        {}", memory.chat_id.as_deref().unwrap_or("-"));
    println!("thread_id:      {}", memory.thread_id.as_deref().unwrap_or("-"));
    println!("task_id:        {}", memory.task_id.as_deref().unwrap_or("-"));
    if let Some(metadata) = &memory.metadata {
        println!("metadata:       {metadata}");
    }
    if let Some(key) = &memory.idempotency_key {
        println!("idempotency:    {key}");
    }
    println!("created_at:     {}", memory.created_at);
    println!("updated_at:     {}", memory.updated_at);
    println!("last_accessed:  {}", memory.last_accessed);
    println!("access_count:   {}", memory.access_count);
    println!("strength:       {:.3}", memory.strength);
    println!(
        "embedding:      {}",
        if memory.embedding.is_some() {
            "present"
        } else {
            "absent"
        }
    );

    Ok(())
}
