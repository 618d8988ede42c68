//! Prompt enrichment.
//!
//! Pulls live website notices and retrieved knowledge chunks into
//! prompt-ready text blocks. Both lookups run concurrently under their own
//! deadline and degrade to an empty string on timeout or error — an
//! assistant request must never hang because a notices page or the
//! embedding service is slow.

use std::time::Duration;

use sqlx::SqlitePool;
use tokio::time::timeout;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::models::AgentConfig;
use crate::notices::NoticeFetcher;
use crate::retrieve::retrieve_chunks;

/// Prompt-ready enrichment blocks. Fields are empty strings when the
/// corresponding source is disabled, empty, or failed.
#[derive(Debug, Clone, Default)]
pub struct EnrichedContext {
    pub live_notices_text: String,
    pub rag_chunks_text: String,
}

pub async fn enriched_context(
    pool: &SqlitePool,
    embedder: &dyn Embedder,
    fetcher: &NoticeFetcher,
    agent: &AgentConfig,
    config: &Config,
) -> EnrichedContext {
    let enrichment = &config.enrichment;

    let notices_part = async {
        let url = match agent.live_data_url.as_deref() {
            Some(u) if !u.is_empty() => u,
            _ => return String::new(),
        };
        match timeout(
            Duration::from_secs(enrichment.notices_timeout_secs),
            fetcher.fetch(url),
        )
        .await
        {
            Ok(notices) if !notices.is_empty() => {
                let lines: Vec<String> = notices
                    .iter()
                    .take(enrichment.max_notices)
                    .map(|n| {
                        if n.date.is_empty() {
                            format!("• {}", n.title)
                        } else {
                            format!("• {}: {}", n.date, n.title)
                        }
                    })
                    .collect();
                format!(
                    "\n### Recent Notices & Events (from college website):\n{}\n",
                    lines.join("\n")
                )
            }
            Ok(_) => String::new(),
            Err(_) => {
                tracing::warn!("live notices lookup timed out");
                String::new()
            }
        }
    };

    let rag_part = async {
        if !agent.rag_enabled {
            return String::new();
        }
        match timeout(
            Duration::from_secs(enrichment.rag_timeout_secs),
            retrieve_chunks(pool, embedder, config),
        )
        .await
        {
            Ok(Ok(chunks)) if !chunks.is_empty() => {
                let lines: Vec<String> = chunks.iter().map(|c| format!("• {}", c)).collect();
                format!(
                    "\n### Additional Knowledge (from documents — use this when the caller asks \
                     about WiFi, passwords, exam dates, events, or any topic listed):\n{}\n",
                    lines.join("\n")
                )
            }
            Ok(Ok(_)) => String::new(),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "knowledge retrieval failed");
                String::new()
            }
            Err(_) => {
                tracing::warn!("knowledge retrieval timed out");
                String::new()
            }
        }
    };

    let (live_notices_text, rag_chunks_text) = tokio::join!(notices_part, rag_part);

    EnrichedContext {
        live_notices_text,
        rag_chunks_text,
    }
}
