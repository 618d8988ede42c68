//! Persistence for admin singletons, leads, call logs, and templates.
//!
//! The college record and agent configuration are singleton rows holding a
//! JSON document; the webhook path reads them, the seed/admin paths write
//! them. Lead existence checks are advisory (read-then-insert): two racing
//! end-of-call reports for the same call can both insert, which is accepted.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::models::{
    AdmissionLead, AgentConfig, CallLog, CollegeInfo, LeadSource, MessageTemplate, TranscriptEntry,
};

pub async fn load_college_info(pool: &SqlitePool) -> Result<Option<CollegeInfo>> {
    let row: Option<String> = sqlx::query_scalar("SELECT data FROM college_info WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    match row {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

pub async fn save_college_info(pool: &SqlitePool, info: &CollegeInfo) -> Result<()> {
    let data = serde_json::to_string(info)?;
    sqlx::query(
        "INSERT INTO college_info (id, data) VALUES (1, ?)
         ON CONFLICT(id) DO UPDATE SET data = excluded.data",
    )
    .bind(data)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_agent_config(pool: &SqlitePool) -> Result<Option<AgentConfig>> {
    let row: Option<String> = sqlx::query_scalar("SELECT data FROM agent_config WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    match row {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

pub async fn save_agent_config(pool: &SqlitePool, config: &AgentConfig) -> Result<()> {
    let data = serde_json::to_string(config)?;
    sqlx::query(
        "INSERT INTO agent_config (id, data) VALUES (1, ?)
         ON CONFLICT(id) DO UPDATE SET data = excluded.data",
    )
    .bind(data)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_lead(pool: &SqlitePool, lead: &AdmissionLead) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO admission_leads
            (id, full_name, age, twelfth_percentage, course, city, phone, call_id, source, transcript, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&lead.id)
    .bind(&lead.full_name)
    .bind(&lead.age)
    .bind(&lead.twelfth_percentage)
    .bind(&lead.course)
    .bind(&lead.city)
    .bind(&lead.phone)
    .bind(&lead.call_id)
    .bind(lead.source.as_str())
    .bind(&lead.transcript)
    .bind(lead.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Advisory duplicate check; see module docs for the accepted race.
pub async fn lead_exists_for_call(pool: &SqlitePool, call_id: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM admission_leads WHERE call_id = ?")
            .bind(call_id)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

pub async fn insert_call_log(pool: &SqlitePool, log: &CallLog) -> Result<()> {
    let transcript_json = serde_json::to_string(&log.transcript)?;
    sqlx::query(
        r#"
        INSERT INTO call_logs
            (id, call_id, caller_number, call_type, ended_reason, started_at, ended_at,
             duration_secs, transcript, summary, enquiry_type, outcome)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&log.id)
    .bind(&log.call_id)
    .bind(&log.caller_number)
    .bind(log.call_type.as_str())
    .bind(&log.ended_reason)
    .bind(log.started_at)
    .bind(log.ended_at)
    .bind(log.duration_secs)
    .bind(transcript_json)
    .bind(&log.summary)
    .bind(&log.enquiry_type)
    .bind(&log.outcome)
    .execute(pool)
    .await?;
    Ok(())
}

/// Flip an automation flag only after the downstream send was confirmed.
pub async fn mark_sms_sent(pool: &SqlitePool, log_id: &str) -> Result<()> {
    sqlx::query("UPDATE call_logs SET sms_sent = 1 WHERE id = ?")
        .bind(log_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_email_sent(pool: &SqlitePool, log_id: &str) -> Result<()> {
    sqlx::query("UPDATE call_logs SET email_sent = 1 WHERE id = ?")
        .bind(log_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn load_template(pool: &SqlitePool, name: &str) -> Result<Option<MessageTemplate>> {
    let row = sqlx::query(
        "SELECT id, name, channel, subject, body FROM message_templates WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| MessageTemplate {
        id: r.get("id"),
        name: r.get("name"),
        channel: r.get("channel"),
        subject: r.get("subject"),
        body: r.get("body"),
    }))
}

pub async fn save_template(pool: &SqlitePool, template: &MessageTemplate) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO message_templates (id, name, channel, subject, body)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            channel = excluded.channel,
            subject = excluded.subject,
            body = excluded.body
        "#,
    )
    .bind(&template.id)
    .bind(&template.name)
    .bind(&template.channel)
    .bind(&template.subject)
    .bind(&template.body)
    .execute(pool)
    .await?;
    Ok(())
}

/// Build a lead row from extracted fields.
pub fn new_lead(
    fields: &crate::lead::LeadFields,
    call_id: Option<String>,
    source: LeadSource,
    transcript: Option<String>,
) -> AdmissionLead {
    AdmissionLead {
        id: uuid::Uuid::new_v4().to_string(),
        full_name: fields.full_name.clone(),
        age: fields.age.clone(),
        twelfth_percentage: fields.twelfth_percentage.clone(),
        course: fields.course.clone(),
        city: fields.city.clone(),
        phone: fields.phone.clone(),
        call_id,
        source,
        transcript,
        created_at: chrono::Utc::now().timestamp(),
    }
}

/// Build a call-log row ready for insertion.
pub fn new_call_log(
    call_id: String,
    caller_number: String,
    call_type: crate::models::CallType,
    ended_reason: String,
    started_at: i64,
    ended_at: i64,
    transcript: Vec<TranscriptEntry>,
    summary: String,
    enquiry_type: String,
) -> CallLog {
    CallLog {
        id: uuid::Uuid::new_v4().to_string(),
        call_id,
        caller_number,
        call_type,
        ended_reason,
        started_at,
        ended_at,
        duration_secs: (ended_at - started_at).max(0),
        transcript,
        summary,
        enquiry_type,
        outcome: "answered".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::LeadFields;
    use crate::models::CallType;
    use crate::testutil::test_pool;

    #[tokio::test]
    async fn test_singletons_roundtrip_and_upsert() {
        let (_tmp, _config, pool) = test_pool().await;
        assert!(load_college_info(&pool).await.unwrap().is_none());

        let mut info = CollegeInfo {
            name: "Test College".to_string(),
            ..CollegeInfo::default()
        };
        save_college_info(&pool, &info).await.unwrap();
        info.name = "Renamed College".to_string();
        save_college_info(&pool, &info).await.unwrap();

        let loaded = load_college_info(&pool).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Renamed College");
    }

    #[tokio::test]
    async fn test_lead_existence_check() {
        let (_tmp, _config, pool) = test_pool().await;
        assert!(!lead_exists_for_call(&pool, "call-1").await.unwrap());

        let fields = LeadFields {
            full_name: "Riya Sen".to_string(),
            ..LeadFields::default()
        };
        let lead = new_lead(
            &fields,
            Some("call-1".to_string()),
            LeadSource::VoiceFallback,
            None,
        );
        insert_lead(&pool, &lead).await.unwrap();
        assert!(lead_exists_for_call(&pool, "call-1").await.unwrap());
        assert!(!lead_exists_for_call(&pool, "call-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_call_log_roundtrip_with_flags() {
        let (_tmp, _config, pool) = test_pool().await;
        let log = new_call_log(
            "call-9".to_string(),
            "+919812345678".to_string(),
            CallType::Inbound,
            "Customer Ended Call".to_string(),
            100,
            160,
            vec![TranscriptEntry {
                role: "user".to_string(),
                content: "hello".to_string(),
                timestamp: 100,
            }],
            "greeting only".to_string(),
            "general".to_string(),
        );
        assert_eq!(log.duration_secs, 60);
        insert_call_log(&pool, &log).await.unwrap();
        mark_sms_sent(&pool, &log.id).await.unwrap();

        let (sms, email): (i64, i64) =
            sqlx::query_as("SELECT sms_sent, email_sent FROM call_logs WHERE id = ?")
                .bind(&log.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(sms, 1);
        assert_eq!(email, 0);
    }
}
