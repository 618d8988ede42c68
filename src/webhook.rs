//! Voice-platform webhook server.
//!
//! Exposes the endpoint the voice platform calls throughout a call's
//! lifecycle, dispatching on `message.type`:
//!
//! | Event | Action |
//! |-------|--------|
//! | `tool-calls` | Answer the admission-flow question script, persist submitted leads |
//! | `assistant-request` | Assemble and return the dynamic assistant configuration |
//! | `end-of-call-report` | Log the call, extract a fallback lead, dispatch notifications |
//! | anything else | `{"status": "ignored"}` |
//!
//! A live call is on the other end of every request, so handler failures
//! never propagate: errors are logged and answered with a best-effort 200.
//! Only a payload with no `message.type` at all gets a 400.

use std::sync::{Arc, LazyLock};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use regex::Regex;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::db;
use crate::embedding::{Embedder, EmbeddingClient};
use crate::enrich::enriched_context;
use crate::lead::extract_lead;
use crate::models::{AgentConfig, CallType, LeadSource, TranscriptEntry};
use crate::notices::NoticeFetcher;
use crate::notify::{Notifier, SendgridEmail, TwilioSms};
use crate::prompt::{
    assistant_payload, ADMISSION_QUESTIONS, TOOL_ADMISSION_QUESTION, TOOL_SUBMIT_LEAD,
};
use crate::store;
use crate::transcript::normalize_call;

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[\d()-]{10,}$").unwrap());
static ADMISSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)admission|admit|apply|course|enrol").unwrap());

const DEFAULT_SMS_TEMPLATE: &str =
    "Thanks for calling {{college}}! {{summary}} Visit {{website}} for more info.";
const SMS_TEMPLATE_NAME: &str = "post_call_sms";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub embedder: Arc<dyn Embedder>,
    pub fetcher: Arc<NoticeFetcher>,
    pub sms: Arc<dyn Notifier>,
    pub email: Arc<dyn Notifier>,
}

/// Starts the webhook HTTP server with production collaborators.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let cache_ttl = std::time::Duration::from_secs(config.enrichment.notices_cache_secs);

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        embedder: Arc::new(EmbeddingClient::new(&config.embedding)),
        fetcher: Arc::new(NoticeFetcher::new(cache_ttl)),
        sms: Arc::new(TwilioSms::new()),
        email: Arc::new(SendgridEmail::new()),
    };

    let bind_addr = config.server.bind.clone();
    let app = build_router(state);

    println!("Webhook server listening on http://{}", bind_addr);
    tracing::info!(%bind_addr, "webhook server started");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/webhook/vapi", post(handle_vapi_webhook))
        .layer(cors)
        .with_state(state)
}

async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_vapi_webhook(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let (status, body) = dispatch_event(&state, &payload).await;
    (status, Json(body)).into_response()
}

/// Classify and handle one webhook event. Always answers; a live call is
/// waiting on the other side.
pub async fn dispatch_event(state: &AppState, payload: &Value) -> (StatusCode, Value) {
    let message = &payload["message"];
    let msg_type = match message.get("type").and_then(Value::as_str) {
        Some(t) => t,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                json!({"error": "Invalid webhook payload"}),
            );
        }
    };

    tracing::info!(event = msg_type, "voice webhook event");

    let result = match msg_type {
        "tool-calls" => handle_tool_calls(state, message).await,
        "assistant-request" => handle_assistant_request(state).await,
        "end-of-call-report" => handle_end_of_call(state, message).await,
        _ => Ok(json!({"status": "ignored"})),
    };

    match result {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            tracing::error!(event = msg_type, error = %e, "webhook handler failed");
            (StatusCode::OK, json!({"status": "error"}))
        }
    }
}

// ============ tool-calls ============

async fn handle_tool_calls(state: &AppState, message: &Value) -> anyhow::Result<Value> {
    let tool_calls = collect_tool_calls(message);
    let names: Vec<&str> = tool_calls.iter().map(|t| t.name.as_str()).collect();
    tracing::info!(tools = ?names, "tool calls received");

    let mut results = Vec::new();
    for tc in &tool_calls {
        let result = match tc.name.as_str() {
            TOOL_ADMISSION_QUESTION => admission_question_result(&tc.parameters),
            TOOL_SUBMIT_LEAD => submit_lead_result(state, message, &tc.parameters).await,
            _ => json!({"error": "Unknown tool"}),
        };
        results.push(json!({
            "name": tc.name,
            "toolCallId": tc.id,
            "result": result.to_string(),
        }));
    }

    Ok(json!({ "results": results }))
}

struct ToolCall {
    id: String,
    name: String,
    parameters: Value,
}

/// The platform sends tool invocations in two shapes; flatten both.
fn collect_tool_calls(message: &Value) -> Vec<ToolCall> {
    if let Some(list) = message.get("toolCallList").and_then(Value::as_array) {
        return list
            .iter()
            .map(|tc| ToolCall {
                id: tc
                    .get("id")
                    .or_else(|| tc.get("toolCallId"))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                name: tc
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                parameters: tc.get("parameters").cloned().unwrap_or(json!({})),
            })
            .collect();
    }

    if let Some(list) = message.get("toolWithToolCallList").and_then(Value::as_array) {
        return list
            .iter()
            .map(|t| ToolCall {
                id: t
                    .pointer("/toolCall/id")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                name: t
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                parameters: t.pointer("/toolCall/parameters").cloned().unwrap_or(json!({})),
            })
            .collect();
    }

    Vec::new()
}

fn admission_question_result(params: &Value) -> Value {
    // The model sends the step as an integer, a float, or a string.
    let step = params
        .get("step")
        .and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().map(|f| f as i64))
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        })
        .unwrap_or(1)
        .clamp(1, 5);

    let to_say = ADMISSION_QUESTIONS[(step - 1) as usize];
    let next_step = if step < 5 { json!(step + 1) } else { Value::Null };

    json!({
        "messageToSay": to_say,
        "step": step,
        "nextStep": next_step,
    })
}

async fn submit_lead_result(state: &AppState, message: &Value, params: &Value) -> Value {
    tracing::info!(params = %params, "lead submitted via tool call");

    let call_id = message
        .pointer("/call/id")
        .and_then(Value::as_str)
        .map(str::to_string);
    let customer_number = message
        .pointer("/call/customer/number")
        .and_then(Value::as_str)
        .unwrap_or("");

    let fields = crate::lead::LeadFields {
        full_name: str_param(params, &["fullName", "full_name"]),
        age: str_param(params, &["age"]),
        twelfth_percentage: str_param(params, &["twelfthPercentage", "twelfth_percentage"]),
        course: str_param(params, &["course"]),
        city: str_param(params, &["city"]),
        phone: if customer_number.is_empty() {
            str_param(params, &["phone"])
        } else {
            customer_number.to_string()
        },
    };

    let lead = store::new_lead(&fields, call_id, LeadSource::Voice, None);
    match store::insert_lead(&state.pool, &lead).await {
        Ok(()) => {
            tracing::info!(name = %lead.full_name, id = %lead.id, "admission lead saved");
            json!({
                "success": true,
                "message": "Lead saved. Say: Thank you. Your details have been recorded and our admission team will contact you soon.",
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "admission lead save failed");
            json!({
                "success": false,
                "message": "Thank you. Your details have been noted. Our team will contact you soon.",
            })
        }
    }
}

/// Accept numbers and strings for tool parameters; the model is not
/// consistent about types.
fn str_param(params: &Value, keys: &[&str]) -> String {
    for key in keys {
        match params.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    String::new()
}

// ============ assistant-request ============

async fn handle_assistant_request(state: &AppState) -> anyhow::Result<Value> {
    let college = match store::load_college_info(&state.pool).await? {
        Some(c) => c,
        None => {
            tracing::warn!("assistant requested but no college info is configured");
            return Ok(json!({"error": "College configuration not found"}));
        }
    };
    let agent = store::load_agent_config(&state.pool)
        .await?
        .unwrap_or_else(AgentConfig::default);

    let enriched = enriched_context(
        &state.pool,
        state.embedder.as_ref(),
        &state.fetcher,
        &agent,
        &state.config,
    )
    .await;

    Ok(assistant_payload(&college, &agent, &enriched))
}

// ============ end-of-call-report ============

async fn handle_end_of_call(state: &AppState, message: &Value) -> anyhow::Result<Value> {
    let call = &message["call"];
    let artifact = message
        .get("artifact")
        .or_else(|| message.get("artifacts"))
        .unwrap_or(&Value::Null);

    let now = chrono::Utc::now().timestamp();
    let started_at = parse_timestamp(call.get("startedAt")).unwrap_or(now);
    let ended_at = parse_timestamp(call.get("endedAt")).unwrap_or(now);

    let customer_number = call
        .pointer("/customer/number")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let is_phone = looks_like_phone(&customer_number);
    let call_type = if is_phone { CallType::Inbound } else { CallType::Web };

    let ended_reason = message
        .get("endedReason")
        .or_else(|| call.get("endedReason"))
        .and_then(Value::as_str)
        .map(title_case_reason)
        .unwrap_or_else(|| "Customer Ended Call".to_string());

    let call_id = call
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("sim-{}", chrono::Utc::now().timestamp_millis()));

    let summary = message
        .pointer("/analysis/summary")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let enquiry_type = message
        .pointer("/analysis/structuredData/enquiryType")
        .and_then(Value::as_str)
        .unwrap_or("general")
        .to_string();

    let caller_number = if !customer_number.is_empty() {
        customer_number.clone()
    } else if call_type == CallType::Web {
        "Web".to_string()
    } else {
        "Unknown".to_string()
    };

    let log_transcript: Vec<TranscriptEntry> = artifact
        .get("transcript")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|t| {
                    let role = t.get("role").and_then(Value::as_str)?;
                    let content = t
                        .get("message")
                        .or_else(|| t.get("content"))
                        .and_then(Value::as_str)?;
                    Some(TranscriptEntry {
                        role: role.to_string(),
                        content: content.to_string(),
                        timestamp: now,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let log = store::new_call_log(
        call_id.clone(),
        caller_number,
        call_type,
        ended_reason,
        started_at,
        ended_at,
        log_transcript,
        summary.clone(),
        enquiry_type,
    );
    store::insert_call_log(&state.pool, &log).await?;
    tracing::info!(call_id = %log.call_id, duration = log.duration_secs, "call logged");

    // Fallback lead: only when the call was about admission and the tool
    // flow didn't already record one for this call.
    let normalized = normalize_call(message);
    if ADMISSION_RE.is_match(&normalized.raw_text) {
        if let Err(e) = save_fallback_lead(state, &call_id, &customer_number, &normalized, &log.id).await {
            tracing::warn!(error = %e, "fallback lead extraction failed");
        }
    }

    // Post-call SMS to real phone callers
    if is_phone {
        send_post_call_sms(state, &customer_number, &summary, &log.id).await;
    }

    Ok(json!({"status": "logged"}))
}

async fn save_fallback_lead(
    state: &AppState,
    call_id: &str,
    customer_number: &str,
    normalized: &crate::transcript::NormalizedTranscript,
    log_id: &str,
) -> anyhow::Result<()> {
    if store::lead_exists_for_call(&state.pool, call_id).await? {
        return Ok(());
    }

    let fields = extract_lead(&normalized.raw_text, &normalized.turns, customer_number);
    if !fields.has_plausible_name() {
        return Ok(());
    }

    let lead = store::new_lead(
        &fields,
        Some(call_id.to_string()),
        LeadSource::VoiceFallback,
        Some(normalized.raw_text.clone()),
    );
    store::insert_lead(&state.pool, &lead).await?;
    tracing::info!(name = %lead.full_name, id = %lead.id, "admission lead saved from transcript");

    // Internal alert so the admissions desk sees new leads without polling
    // the dashboard.
    if let Ok(Some(college)) = store::load_college_info(&state.pool).await {
        let to = college.contact.email.clone();
        if !to.is_empty() {
            let body = format!(
                "New admission lead from a call.\n\nName: {}\nAge: {}\n12th %: {}\nCourse: {}\nCity: {}\nPhone: {}",
                lead.full_name, lead.age, lead.twelfth_percentage, lead.course, lead.city, lead.phone
            );
            if state.email.send(&to, "New admission lead", &body).await {
                let _ = store::mark_email_sent(&state.pool, log_id).await;
            }
        }
    }

    Ok(())
}

async fn send_post_call_sms(state: &AppState, phone: &str, summary: &str, log_id: &str) {
    let college = match store::load_college_info(&state.pool).await {
        Ok(Some(c)) => c,
        _ => return,
    };

    let template = match store::load_template(&state.pool, SMS_TEMPLATE_NAME).await {
        Ok(Some(t)) => t.body,
        _ => DEFAULT_SMS_TEMPLATE.to_string(),
    };

    let summary_short: String = if summary.is_empty() {
        "You enquired about our programs.".to_string()
    } else {
        summary.chars().take(80).collect()
    };
    let website = if college.website.is_empty() {
        "our website".to_string()
    } else {
        college.website.clone()
    };

    let body = template
        .replace("{{college}}", &college.name)
        .replace("{{summary}}", &summary_short)
        .replace("{{website}}", &website);

    if state.sms.send(phone, "", &body).await {
        let _ = store::mark_sms_sent(&state.pool, log_id).await;
    }
}

fn parse_timestamp(value: Option<&Value>) -> Option<i64> {
    let s = value?.as_str()?;
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp())
}

fn looks_like_phone(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }
    let compact: String = number.chars().filter(|c| !c.is_whitespace()).collect();
    PHONE_RE.is_match(&compact)
}

fn title_case_reason(raw: &str) -> String {
    raw.replace('-', " ")
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
