//! Knowledge-base CLI commands.
//!
//! Minimal admin surface for managing knowledge documents from the terminal;
//! the dashboard covers the same operations over HTTP.

use anyhow::{bail, Result};
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::index::list_documents;

pub async fn run_kb_add(
    config: &Config,
    title: &str,
    file: Option<PathBuf>,
    content: Option<String>,
) -> Result<()> {
    let body = match (file, content) {
        (Some(path), None) => std::fs::read_to_string(&path)?,
        (None, Some(text)) => text,
        _ => bail!("Provide exactly one of --file or --content"),
    };

    let pool = db::connect(config).await?;
    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO knowledge_documents (id, title, content, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(title)
    .bind(&body)
    .bind(now)
    .execute(&pool)
    .await?;

    println!("kb add");
    println!("  id: {}", id);
    println!("  title: {}", title);
    println!("  content: {} chars", body.chars().count());
    println!("ok");

    pool.close().await;
    Ok(())
}

pub async fn run_kb_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let docs = list_documents(&pool).await?;

    println!("kb list");
    if docs.is_empty() {
        println!("  no documents");
    }
    for (doc, chunk_count) in docs {
        println!(
            "  {}  {}  ({} chars, {} chunks)",
            doc.id,
            doc.title,
            doc.content.chars().count(),
            chunk_count
        );
    }
    println!("ok");

    pool.close().await;
    Ok(())
}
