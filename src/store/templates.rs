//! Session templates
//!
//! Templates are local: the backend never sees them. They are the only
//! store entities with a create/remove lifecycle of their own.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Saved recipe for starting a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTemplate {
    pub id: String,
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl SessionTemplate {
    /// New template with a fresh id, created now
    pub fn new(
        name: impl Into<String>,
        project_id: impl Into<String>,
        project_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            project_id: project_id.into(),
            project_name: project_name.into(),
            account_id: None,
            description: None,
            color: None,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_account(mut self, account_id: Option<String>) -> Self {
        self.account_id = account_id;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}
