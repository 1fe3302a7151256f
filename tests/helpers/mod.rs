#![allow(dead_code)]

use engram::config::EngramConfig;
use engram::db;
use engram::embedding::EmbeddingProvider;
use engram::error::Result;
use rusqlite::Connection;

pub const DIMS: usize = 384;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Default config (scopes, idempotency, and context hydration all enabled).
pub fn test_config() -> EngramConfig {
    EngramConfig::default()
}

/// Generate a deterministic embedding with a spike at position `seed`.
/// Each seed produces a distinct unit vector.
pub fn spike(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    v[seed % DIMS] = 1.0;
    v
}

/// Deterministic embedding provider for tests: maps word clusters onto fixed
/// dimensions so related phrasings land near each other without model files.
pub struct TopicProvider;

const TECH_WORDS: &[&str] = &[
    "typescript",
    "javascript",
    "rust",
    "programming",
    "coding",
    "code",
    "language",
];
const WEATHER_WORDS: &[&str] = &["weather", "sunny", "warm", "rain", "cloudy", "today"];
const FOOD_WORDS: &[&str] = &["chocolate", "cake", "recipe", "baking", "dessert"];

impl EmbeddingProvider for TopicProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; DIMS];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            if TECH_WORDS.contains(&word) {
                v[0] += 1.0;
            } else if WEATHER_WORDS.contains(&word) {
                v[1] += 1.0;
            } else if FOOD_WORDS.contains(&word) {
                v[2] += 1.0;
            }
        }
        // Unmatched text still embeds, on its own neutral axis
        if v.iter().all(|x| *x == 0.0) {
            v[3] = 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// A provider whose model never loads, for fallback-path tests.
pub struct UnavailableProvider;

impl EmbeddingProvider for UnavailableProvider {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(engram::error::EngramError::EmbeddingUnavailable(
            "model files missing".into(),
        ))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}
