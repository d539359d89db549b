// Session context and the record reported to the backend

use crate::models::classification::ClassificationResult;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value used when the operator made no selection
pub const UNSELECTED: &str = "unknown";

/// Operator selections and identity for one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub event: String,
    pub gender: String,
}

impl SessionContext {
    pub fn new(event: Option<String>, gender: Option<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            event: event.unwrap_or_else(|| UNSELECTED.to_string()),
            gender: gender.unwrap_or_else(|| UNSELECTED.to_string()),
        }
    }
}

/// Body of the single POST made per completed scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub status: String,
    pub event: String,
    pub gender: String,
    pub skin_tone: String,
    pub body_type: String,
    pub height_cm: String,
    pub timestamp: String, // ISO-8601, UTC
}

impl SessionRecord {
    pub fn new(
        context: &SessionContext,
        result: &ClassificationResult,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            status: "active".to_string(),
            event: context.event.clone(),
            gender: context.gender.clone(),
            skin_tone: result.skin_tone.to_string().to_string(),
            body_type: result.body_type.to_string().to_string(),
            height_cm: result.height_label(),
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend rejected record with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

pub type ReportResult<T> = Result<T, ReportError>;
