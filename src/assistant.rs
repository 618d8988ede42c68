//! Voice-platform assistant sync.
//!
//! Pushes the currently assembled system prompt and call messages to the
//! hosted assistant via the platform's management API, so dashboards that
//! use a static assistant id pick up fresh college data. Only the model and
//! messaging fields are patched — the voice configured in the platform
//! dashboard is left alone.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::embedding::Embedder;
use crate::enrich::enriched_context;
use crate::models::AgentConfig;
use crate::notices::NoticeFetcher;
use crate::prompt;

/// Result of a sync attempt, shown to the admin verbatim.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
}

pub async fn sync_assistant(
    config: &Config,
    embedder: &dyn Embedder,
    fetcher: &NoticeFetcher,
) -> Result<SyncOutcome> {
    let (private_key, assistant_id) = match (
        std::env::var("VAPI_PRIVATE_KEY"),
        std::env::var("VAPI_ASSISTANT_ID"),
    ) {
        (Ok(k), Ok(id)) if !k.is_empty() && !id.is_empty() => (k, id),
        _ => {
            tracing::warn!("assistant sync skipped: VAPI_PRIVATE_KEY or VAPI_ASSISTANT_ID not set");
            return Ok(SyncOutcome {
                success: false,
                message: "Voice platform credentials not configured".to_string(),
            });
        }
    };

    let pool = db::connect(config).await?;
    let college = match crate::store::load_college_info(&pool).await? {
        Some(c) => c,
        None => {
            pool.close().await;
            return Ok(SyncOutcome {
                success: false,
                message: "No college info found in database".to_string(),
            });
        }
    };
    let agent = crate::store::load_agent_config(&pool)
        .await?
        .unwrap_or_else(AgentConfig::default);

    let enriched = enriched_context(&pool, embedder, fetcher, &agent, config).await;
    let system_prompt = prompt::build_system_prompt(&college, &agent, &enriched);

    let payload = serde_json::json!({
        "model": {
            "provider": "openai",
            "model": "gpt-3.5-turbo",
            "temperature": 0.7,
            "maxTokens": 500,
            "messages": [{ "role": "system", "content": system_prompt }],
        },
        "firstMessage": prompt::first_message(&college, &agent),
        "endCallMessage": prompt::end_call_message(&college, &agent),
        "name": format!("{} AI Assistant", college.name),
        "endCallFunctionEnabled": true,
        "recordingEnabled": false,
    });

    let client = reqwest::Client::new();
    let url = format!("{}/assistant/{}", config.vapi.api_url, assistant_id);
    let resp = client
        .patch(&url)
        .bearer_auth(private_key)
        .json(&payload)
        .send()
        .await;

    pool.close().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            tracing::info!(college = %college.name, "assistant synced");
            Ok(SyncOutcome {
                success: true,
                message: format!("Assistant updated with data from \"{}\"", college.name),
            })
        }
        Ok(r) => {
            let status = r.status();
            let body = r.text().await.unwrap_or_default();
            tracing::warn!(%status, "assistant sync failed");
            Ok(SyncOutcome {
                success: false,
                message: format!("Voice platform API error {}: {}", status, body),
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "assistant sync failed");
            Ok(SyncOutcome {
                success: false,
                message: e.to_string(),
            })
        }
    }
}

/// CLI entry: sync and print the outcome.
pub async fn run_sync_assistant(
    config: &Config,
    embedder: &dyn Embedder,
    fetcher: &NoticeFetcher,
) -> Result<()> {
    let outcome = sync_assistant(config, embedder, fetcher).await?;
    println!("sync-assistant");
    println!("  {}", outcome.message);
    println!("{}", if outcome.success { "ok" } else { "failed" });
    Ok(())
}
