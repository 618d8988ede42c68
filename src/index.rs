//! Knowledge-document indexing pipeline.
//!
//! Chunks a document's content, embeds each chunk, and replaces the stored
//! chunk/vector rows in a single transaction. Partial embedding failure is
//! tolerated — the subset that embedded is stored and the achieved count
//! reported — but zero embedded chunks fails with an actionable message,
//! since the outcome is surfaced in the admin UI.

use anyhow::Result;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::db;
use crate::embedding::{vec_to_blob, Embedder};
use crate::models::KnowledgeDocument;

/// Result of an indexing run, shown to the admin verbatim.
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub success: bool,
    pub chunks_count: usize,
    pub message: String,
}

impl IndexOutcome {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            chunks_count: 0,
            message: message.into(),
        }
    }
}

/// Chunk, embed, and store one document. Replaces any previously stored
/// chunks wholesale, so the chunk list always matches the content as of the
/// last successful index.
pub async fn index_document(
    pool: &SqlitePool,
    embedder: &dyn Embedder,
    config: &Config,
    doc_id: &str,
) -> Result<IndexOutcome> {
    let doc = match get_document(pool, doc_id).await? {
        Some(d) => d,
        None => return Ok(IndexOutcome::failure("Document not found")),
    };

    let chunking = &config.chunking;
    let text_chunks = chunk_text(
        &doc.content,
        chunking.size,
        chunking.overlap,
        chunking.min_content_chars,
    );

    if text_chunks.is_empty() {
        let trimmed = doc.content.trim();
        let reason = if trimmed.is_empty() {
            "Content is empty".to_string()
        } else if trimmed.chars().count() < chunking.min_content_chars {
            format!(
                "Content too short (need at least ~{} characters)",
                chunking.min_content_chars
            )
        } else {
            "Could not create chunks".to_string()
        };
        return Ok(IndexOutcome::failure(reason));
    }

    let mut embedded = Vec::new();
    for (i, text) in text_chunks.iter().enumerate() {
        if let Some(vector) = embedder.embed(text).await {
            embedded.push((text.clone(), vector, i as i64));
        }
    }

    if embedded.is_empty() {
        return Ok(IndexOutcome::failure(
            "Embedding service unavailable. Check OPENAI_API_KEY and re-run indexing.",
        ));
    }

    let skipped = text_chunks.len() - embedded.len();
    let chunks_count = embedded.len();
    replace_chunks(pool, doc_id, &doc.content, &embedded).await?;

    let message = if skipped > 0 {
        format!(
            "Indexed {} chunks ({} failed to embed and were skipped)",
            chunks_count, skipped
        )
    } else {
        format!("Indexed {} chunks", chunks_count)
    };

    Ok(IndexOutcome {
        success: true,
        chunks_count,
        message,
    })
}

pub async fn get_document(pool: &SqlitePool, doc_id: &str) -> Result<Option<KnowledgeDocument>> {
    let row = sqlx::query(
        "SELECT id, title, content, content_hash, updated_at FROM knowledge_documents WHERE id = ?",
    )
    .bind(doc_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| KnowledgeDocument {
        id: r.get("id"),
        title: r.get("title"),
        content: r.get("content"),
        content_hash: r.get("content_hash"),
        updated_at: r.get("updated_at"),
    }))
}

pub async fn list_documents(pool: &SqlitePool) -> Result<Vec<(KnowledgeDocument, i64)>> {
    let rows = sqlx::query(
        r#"
        SELECT d.id, d.title, d.content, d.content_hash, d.updated_at,
               COUNT(c.chunk_index) AS chunk_count
        FROM knowledge_documents d
        LEFT JOIN knowledge_chunks c ON c.document_id = d.id
        GROUP BY d.id
        ORDER BY d.updated_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| {
            (
                KnowledgeDocument {
                    id: r.get("id"),
                    title: r.get("title"),
                    content: r.get("content"),
                    content_hash: r.get("content_hash"),
                    updated_at: r.get("updated_at"),
                },
                r.get("chunk_count"),
            )
        })
        .collect())
}

async fn replace_chunks(
    pool: &SqlitePool,
    document_id: &str,
    content: &str,
    chunks: &[(String, Vec<f32>, i64)],
) -> Result<()> {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let content_hash = format!("{:x}", hasher.finalize());
    let now = chrono::Utc::now().timestamp();

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM knowledge_chunks WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;

    for (text, vector, index) in chunks {
        sqlx::query(
            "INSERT INTO knowledge_chunks (document_id, chunk_index, text, embedding) VALUES (?, ?, ?, ?)",
        )
        .bind(document_id)
        .bind(index)
        .bind(text)
        .bind(vec_to_blob(vector))
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE knowledge_documents SET content_hash = ?, updated_at = ? WHERE id = ?")
        .bind(&content_hash)
        .bind(now)
        .bind(document_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// CLI entry: index one document by id, or every document with `all`.
pub async fn run_index(config: &Config, embedder: &dyn Embedder, target: &str) -> Result<()> {
    let pool = db::connect(config).await?;

    let targets: Vec<(String, String)> = if target == "all" {
        list_documents(&pool)
            .await?
            .into_iter()
            .map(|(d, _)| (d.id, d.title))
            .collect()
    } else {
        match get_document(&pool, target).await? {
            Some(d) => vec![(d.id, d.title)],
            None => {
                println!("index {}", target);
                println!("  Document not found");
                pool.close().await;
                return Ok(());
            }
        }
    };

    for (id, title) in targets {
        let outcome = index_document(&pool, embedder, config, &id).await?;
        println!("index {} ({})", title, id);
        println!("  {}", outcome.message);
        if outcome.success {
            println!("  chunks stored: {}", outcome.chunks_count);
        }
    }
    println!("ok");

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{insert_doc, test_pool, DeadEmbedder, HashEmbedder};

    #[tokio::test]
    async fn test_missing_document() {
        let (_tmp, config, pool) = test_pool().await;
        let outcome = index_document(&pool, &HashEmbedder, &config, "nope")
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("not found"));
    }

    #[tokio::test]
    async fn test_short_content_rejected_with_reason() {
        let (_tmp, config, pool) = test_pool().await;
        insert_doc(&pool, "d1", "hi").await;
        let outcome = index_document(&pool, &HashEmbedder, &config, "d1")
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("short"), "got: {}", outcome.message);
        assert_eq!(outcome.chunks_count, 0);
    }

    #[tokio::test]
    async fn test_empty_content_rejected_with_reason() {
        let (_tmp, config, pool) = test_pool().await;
        insert_doc(&pool, "d1", "   ").await;
        let outcome = index_document(&pool, &HashEmbedder, &config, "d1")
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("empty"));
    }

    #[tokio::test]
    async fn test_indexing_is_idempotent() {
        let (_tmp, config, pool) = test_pool().await;
        let content =
            "Admissions for B.Tech open in June. Applications go through the state entrance \
             counselling portal, and the hostel allocation list is published two weeks later."
                .repeat(5);
        insert_doc(&pool, "d1", &content).await;

        let first = index_document(&pool, &HashEmbedder, &config, "d1")
            .await
            .unwrap();
        assert!(first.success);
        assert!(first.chunks_count > 0);

        let second = index_document(&pool, &HashEmbedder, &config, "d1")
            .await
            .unwrap();
        assert!(second.success);
        assert_eq!(first.chunks_count, second.chunks_count);

        let stored: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_chunks WHERE document_id = 'd1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored as usize, second.chunks_count);
    }

    #[tokio::test]
    async fn test_all_embeds_failing_is_a_failure() {
        let (_tmp, config, pool) = test_pool().await;
        insert_doc(
            &pool,
            "d1",
            "A long enough piece of content about admission deadlines and course fees.",
        )
        .await;
        let outcome = index_document(&pool, &DeadEmbedder, &config, "d1")
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("OPENAI_API_KEY"));
    }
}
