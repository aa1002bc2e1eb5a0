//! REST request and response models
//!
//! Timestamps are kept as the strings the backend sends (naive ISO 8601);
//! fields the backend may omit default instead of failing the whole list.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a backend session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Starting,
    Running,
    Idle,
    RateLimited,
    Error,
    Stopped,
    /// A status this client does not know yet
    #[default]
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Starting => "starting",
            SessionStatus::Running => "running",
            SessionStatus::Idle => "idle",
            SessionStatus::RateLimited => "rate_limited",
            SessionStatus::Error => "error",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication state of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    #[default]
    Authenticated,
    NeedsAuth,
    Authenticating,
    Error,
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AuthStatus::Authenticated => "authenticated",
            AuthStatus::NeedsAuth => "needs_auth",
            AuthStatus::Authenticating => "authenticating",
            AuthStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Session summary as listed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub repo_path: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_activity: String,
    #[serde(default)]
    pub message_count: u64,
}

/// Account and its usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub auth_status: AuthStatus,
    #[serde(default)]
    pub is_rate_limited: bool,
    #[serde(default)]
    pub messages_today: u64,
    #[serde(default)]
    pub daily_estimate: u64,
    #[serde(default)]
    pub usage_pct: f64,
    #[serde(default)]
    pub active_sessions: u64,
}

/// Project grouping sessions around one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub repo_path: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub session_count: u64,
}

/// Repository known to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub docker_compose: bool,
    #[serde(default)]
    pub active_sessions: u64,
}

/// One directory in a browse listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub is_git_repo: bool,
}

/// Result of browsing the backend's filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseResult {
    pub current: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub is_git_repo: bool,
    #[serde(default)]
    pub directories: Vec<BrowseEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub repo_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Partial project update; unset fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl UpdateProjectRequest {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// `{"status": ...}` acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Result of a one-shot prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneshotResponse {
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatusResponse {
    pub account_id: String,
    pub status: AuthStatus,
    #[serde(default)]
    pub needs_reauth: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartAuthResponse {
    pub account_id: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfirmResponse {
    pub account_id: String,
    pub status: String,
}

/// Health report; the shape is backend-defined
pub type HealthResponse = serde_json::Map<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_wire_names() {
        let status: SessionStatus = serde_json::from_str(r#""rate_limited""#).unwrap();
        assert_eq!(status, SessionStatus::RateLimited);
        let unknown: SessionStatus = serde_json::from_str(r#""paused""#).unwrap();
        assert_eq!(unknown, SessionStatus::Unknown);
    }

    #[test]
    fn test_session_info_tolerates_missing_fields() {
        let session: SessionInfo =
            serde_json::from_str(r#"{"id":"s1","name":"fix","status":"running"}"#).unwrap();
        assert_eq!(session.status, SessionStatus::Running);
        assert_eq!(session.message_count, 0);
    }

    #[test]
    fn test_create_session_omits_unset_fields() {
        let request = CreateSessionRequest {
            project_id: "p1".to_string(),
            name: None,
            account_id: None,
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"project_id":"p1"}"#
        );
    }

    #[test]
    fn test_browse_result_root_has_no_parent() {
        let result: BrowseResult = serde_json::from_str(
            r#"{"current":"/","parent":null,"is_git_repo":false,"directories":[{"name":"src","path":"/src","is_git_repo":true}]}"#,
        )
        .unwrap();
        assert_eq!(result.parent, None);
        assert!(result.directories[0].is_git_repo);
    }
}
