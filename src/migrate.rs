use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Knowledge documents (admin-managed source texts)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_documents (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            content_hash TEXT,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Chunk/vector pairs, replaced wholesale on each (re)index
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_chunks (
            document_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            UNIQUE(document_id, chunk_index),
            FOREIGN KEY (document_id) REFERENCES knowledge_documents(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Singleton admin-editable documents, stored as JSON
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS college_info (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            data TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agent_config (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            data TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Admission leads extracted from calls or submitted via tool calls
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admission_leads (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL DEFAULT '',
            age TEXT NOT NULL DEFAULT '',
            twelfth_percentage TEXT NOT NULL DEFAULT '',
            course TEXT NOT NULL DEFAULT '',
            city TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            call_id TEXT,
            source TEXT NOT NULL DEFAULT 'voice',
            transcript TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Per-call report rows written at end-of-call
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS call_logs (
            id TEXT PRIMARY KEY,
            call_id TEXT NOT NULL UNIQUE,
            caller_number TEXT NOT NULL DEFAULT '',
            call_type TEXT NOT NULL DEFAULT 'Web',
            ended_reason TEXT NOT NULL DEFAULT 'Customer Ended Call',
            started_at INTEGER NOT NULL,
            ended_at INTEGER NOT NULL,
            duration_secs INTEGER NOT NULL DEFAULT 0,
            transcript TEXT NOT NULL DEFAULT '[]',
            summary TEXT NOT NULL DEFAULT '',
            enquiry_type TEXT NOT NULL DEFAULT 'general',
            outcome TEXT NOT NULL DEFAULT 'answered',
            sms_sent INTEGER NOT NULL DEFAULT 0,
            email_sent INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Notification body templates (admin-editable)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS message_templates (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            channel TEXT NOT NULL,
            subject TEXT,
            body TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON knowledge_chunks(document_id)",
    )
    .execute(&pool)
    .await?;
    // call_id lookups are the fallback-lead existence check; intentionally
    // not UNIQUE, duplicate leads from racing reports are accepted
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_call_id ON admission_leads(call_id)")
        .execute(&pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_leads_created_at ON admission_leads(created_at DESC)",
    )
    .execute(&pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_call_logs_started ON call_logs(started_at DESC)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}
