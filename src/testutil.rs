//! Shared helpers for in-crate unit tests.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::config::{Config, DbConfig, ServerConfig};
use crate::db;
use crate::embedding::Embedder;
use crate::migrate;

/// Deterministic stand-in: a tiny vector derived from the text bytes.
pub struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let mut v = [0.0f32; 8];
        for (i, b) in text.bytes().enumerate() {
            v[i % 8] += b as f32 / 255.0;
        }
        Some(v.to_vec())
    }
}

/// Embedder whose service is permanently down.
pub struct DeadEmbedder;

#[async_trait]
impl Embedder for DeadEmbedder {
    async fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }
}

/// A migrated SQLite database in a fresh temp dir, plus the config built for it.
pub async fn test_pool() -> (tempfile::TempDir, Config, SqlitePool) {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = Config {
        db: DbConfig {
            path: tmp.path().join("admit.sqlite"),
        },
        chunking: Default::default(),
        retrieval: Default::default(),
        embedding: Default::default(),
        enrichment: Default::default(),
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
        vapi: Default::default(),
    };
    migrate::run_migrations(&config).await.unwrap();
    let pool = db::connect(&config).await.unwrap();
    (tmp, config, pool)
}

pub async fn insert_doc(pool: &SqlitePool, id: &str, content: &str) {
    sqlx::query(
        "INSERT INTO knowledge_documents (id, title, content, updated_at) VALUES (?, ?, ?, 0)",
    )
    .bind(id)
    .bind("Test Document")
    .bind(content)
    .execute(pool)
    .await
    .unwrap();
}
