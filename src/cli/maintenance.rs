//! CLI maintenance commands — `decay` and `prune` for memory lifecycle management.

use anyhow::Result;

use crate::config::EngramConfig;
use crate::memory::decay;

/// Preview decayed strengths, or persist them with `--apply`.
///
/// Decay is otherwise computed on read only; this is the single path that
/// writes decayed values back.
pub fn decay(config: &EngramConfig, apply: bool) -> Result<()> {
    let conn = crate::db::open_database(config.resolved_db_path())?;
    let rate = config.decay.decay_rate;
    let dims = config.embedding.dimensions;

    if apply {
        let report = decay::apply_decay(&conn, rate, dims)?;
        println!(
            "Applied decay: {} of {} memories updated.",
            report.updated, report.scanned
        );
        return Ok(());
    }

    let mut previews = decay::preview_decay(&conn, rate, dims)?;
    previews.retain(|p| (p.effective_strength - p.stored_strength).abs() > 1e-9);

    if previews.is_empty() {
        println!("No memories would change.");
        return Ok(());
    }

    previews.sort_by(|a, b| {
        a.effective_strength
            .partial_cmp(&b.effective_strength)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    println!("{} memories would change (run with --apply to persist):", previews.len());
    for p in previews.iter().take(20) {
        println!(
            "  {}  {:.3} -> {:.3}",
            p.id, p.stored_strength, p.effective_strength
        );
    }
    if previews.len() > 20 {
        println!("  ... and {} more", previews.len() - 20);
    }
    Ok(())
}

/// Destroy memories whose stored strength is below the threshold.
pub fn prune(config: &EngramConfig, threshold: Option<f64>) -> Result<()> {
    let conn = crate::db::open_database(config.resolved_db_path())?;
    let threshold = threshold.unwrap_or(config.decay.prune_threshold);

    let report = decay::prune(&conn, threshold)?;
    if report.removed == 0 {
        println!("Nothing below strength {threshold}.");
    } else {
        println!("Pruned {} memories below strength {threshold}.", report.removed);
    }
    Ok(())
}
