//! # Admissions Harness
//!
//! A voice-AI admissions enquiry backend for colleges.
//!
//! Admissions Harness pairs a SQLite-backed knowledge base (chunked and
//! embedded for retrieval) with a webhook server for a third-party voice
//! platform. Incoming calls get a dynamic system prompt assembled from live
//! college data, website notices, and retrieved knowledge chunks; finished
//! calls are logged and mined for structured admission leads.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │  Knowledge   │──▶│   Pipeline   │──▶│  SQLite   │
//! │  documents   │   │ Chunk+Embed  │   │ chunks+vec│
//! └──────────────┘   └──────────────┘   └─────┬─────┘
//!                                             │
//!                     ┌───────────────────────┤
//!                     ▼                       ▼
//!               ┌───────────┐          ┌────────────┐
//!               │    CLI    │          │  Webhook   │
//!               │ (admitd)  │          │  (axum)    │
//!               └───────────┘          └─────┬──────┘
//!                                            ▼
//!                              prompt assembly · lead extraction
//!                              call logging · SMS/email dispatch
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! admitd init                          # create database
//! admitd seed                          # seed default college/agent config
//! admitd kb add --title "Fees" --file fees.txt
//! admitd index all                     # chunk + embed the knowledge base
//! admitd retrieve                      # debug: print retrieved chunks
//! admitd serve                         # start the voice webhook server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Overlapping-window text chunking |
//! | [`embedding`] | Embedding client + vector utilities |
//! | [`index`] | Document chunk/embed/store pipeline |
//! | [`retrieve`] | Probe-query chunk retrieval |
//! | [`notices`] | Live website notice fetching |
//! | [`enrich`] | Prompt enrichment with timeouts |
//! | [`transcript`] | Call transcript normalization |
//! | [`lead`] | Admission lead extraction |
//! | [`prompt`] | Dynamic system prompt assembly |
//! | [`assistant`] | Voice-platform assistant sync |
//! | [`notify`] | SMS/email delivery |
//! | [`webhook`] | Voice-platform webhook server |
//! | [`store`] | Singleton/lead/call-log persistence |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod assistant;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod enrich;
pub mod index;
pub mod kb;
pub mod lead;
pub mod migrate;
pub mod models;
pub mod notices;
pub mod notify;
pub mod prompt;
pub mod retrieve;
pub mod seed;
pub mod store;
pub mod transcript;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testutil;
