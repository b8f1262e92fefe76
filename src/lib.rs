//! Complaint Triage: acknowledge, classify and route customer complaints.

pub mod config;
pub mod error;
pub mod intake;
pub mod llm;
pub mod mail;
pub mod prompts;
pub mod store;
pub mod templates;
pub mod triage;
