//! Core data models used throughout Admissions Harness.
//!
//! These types represent the knowledge documents, chunks, admin singletons,
//! call logs, and leads that flow through the indexing and webhook pipeline.

use serde::{Deserialize, Serialize};

/// Admin-managed source text for the knowledge base.
#[derive(Debug, Clone)]
pub struct KnowledgeDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub content_hash: Option<String>,
    pub updated_at: i64,
}

/// A chunk of a document with its embedding vector, as stored.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Singleton college record edited through the admin UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollegeInfo {
    pub name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub founder: String,
    #[serde(default)]
    pub chairman: String,
    #[serde(default)]
    pub director: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub admission_process: String,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub facilities: Vec<Facility>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Course {
    pub name: String,
    #[serde(default)]
    pub fees: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub eligibility: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Facility {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Singleton voice-agent configuration edited through the admin UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub first_message: String,
    #[serde(default)]
    pub end_call_message: String,
    #[serde(default)]
    pub fallback_message: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub live_data_url: Option<String>,
    #[serde(default)]
    pub rag_enabled: bool,
}

/// Where an admission lead came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadSource {
    Voice,
    VoiceFallback,
    VapiSync,
    Web,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::Voice => "voice",
            LeadSource::VoiceFallback => "voice_fallback",
            LeadSource::VapiSync => "vapi_sync",
            LeadSource::Web => "web",
        }
    }
}

/// A structured admissions enquiry record.
#[derive(Debug, Clone)]
pub struct AdmissionLead {
    pub id: String,
    pub full_name: String,
    pub age: String,
    pub twelfth_percentage: String,
    pub course: String,
    pub city: String,
    pub phone: String,
    pub call_id: Option<String>,
    pub source: LeadSource,
    pub transcript: Option<String>,
    pub created_at: i64,
}

/// Inbound phone call vs browser-initiated web call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallType {
    Inbound,
    Web,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Inbound => "Inbound",
            CallType::Web => "Web",
        }
    }
}

/// One displayed transcript entry in a call log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: String,
    pub content: String,
    pub timestamp: i64,
}

/// Per-call report row written once at end-of-call.
#[derive(Debug, Clone)]
pub struct CallLog {
    pub id: String,
    pub call_id: String,
    pub caller_number: String,
    pub call_type: CallType,
    pub ended_reason: String,
    pub started_at: i64,
    pub ended_at: i64,
    pub duration_secs: i64,
    pub transcript: Vec<TranscriptEntry>,
    pub summary: String,
    pub enquiry_type: String,
    pub outcome: String,
}

/// A notice/event scraped from the college website.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub date: String,
    pub title: String,
    pub url: String,
}

/// Admin-editable notification template.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    pub id: String,
    pub name: String,
    pub channel: String,
    pub subject: Option<String>,
    pub body: String,
}
