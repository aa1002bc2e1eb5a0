//! Client state store
//!
//! [`ClientStore`] is the single merge point between REST snapshots
//! (sessions, accounts, projects) and the streaming state of the selected
//! session. It is an ordinary value owned by the composition root;
//! consumers observe it through a `watch` subscription.
//!
//! - Snapshot lists are replaced wholesale on every refresh; the last
//!   refresh wins.
//! - Streaming state is mirrored from the [`ConnectionManager`] event feed,
//!   dropping events of superseded generations.
//! - Navigation state and templates form the persisted subset and are
//!   written to sqlite whenever they change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::api::{AccountInfo, ProjectInfo, SessionInfo};
use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionState, ConnectionStatus};
use crate::error::Result;
use crate::storage::SqliteStorage;

pub mod refresh;
pub mod templates;

pub use refresh::RefreshLoop;
pub use templates::SessionTemplate;

const PERSISTED_STATE_KEY: &str = "cockpit-storage";

/// Top-level navigation tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Sessions,
    Chat,
    Accounts,
    Settings,
}

/// The part of the store that survives restarts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub active_tab: Tab,
    #[serde(default)]
    pub selected_session_id: Option<String>,
    #[serde(default)]
    pub templates: Vec<SessionTemplate>,
}

/// Everything the presentation layer reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub active_tab: Tab,
    pub selected_session_id: Option<String>,
    pub selected_project_id: Option<String>,
    pub sessions: Vec<SessionInfo>,
    pub accounts: Vec<AccountInfo>,
    pub projects: Vec<ProjectInfo>,
    pub templates: Vec<SessionTemplate>,
    pub loading: bool,
    /// Last API error, shown until the next successful refresh
    pub error: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
    /// Streaming state of the selected session
    pub stream: ConnectionState,
}

impl StoreState {
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            active_tab: self.active_tab,
            selected_session_id: self.selected_session_id.clone(),
            templates: self.templates.clone(),
        }
    }

    /// The selected session from the latest snapshot, if listed
    pub fn selected_session(&self) -> Option<&SessionInfo> {
        let id = self.selected_session_id.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Whether the streaming connection is open
    pub fn is_connected(&self) -> bool {
        self.stream.status == ConnectionStatus::Open
    }
}

/// Injectable client state store
#[derive(Debug, Clone)]
pub struct ClientStore {
    state: Arc<watch::Sender<StoreState>>,
    storage: Option<SqliteStorage>,
}

impl Default for ClientStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStore {
    /// In-memory store; nothing is persisted
    pub fn new() -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            state: Arc::new(state),
            storage: None,
        }
    }

    /// Store backed by `storage`, restoring the persisted subset
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CockpitError::Storage`] if the stored state
    /// cannot be read.
    pub fn with_storage(storage: SqliteStorage) -> Result<Self> {
        let persisted: PersistedState = storage.load_json(PERSISTED_STATE_KEY)?.unwrap_or_default();
        tracing::debug!(
            tab = ?persisted.active_tab,
            templates = persisted.templates.len(),
            "Restored client state"
        );
        let state = StoreState {
            active_tab: persisted.active_tab,
            selected_session_id: persisted.selected_session_id,
            templates: persisted.templates,
            ..StoreState::default()
        };
        let (state, _) = watch::channel(state);
        Ok(Self {
            state: Arc::new(state),
            storage: Some(storage),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut StoreState),
    {
        self.state.send_modify(f);
    }

    /// Apply `f` and write the persisted subset if it changed
    fn update_persisted<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut StoreState),
    {
        let mut changed = None;
        self.state.send_modify(|state| {
            let before = state.persisted();
            f(state);
            let after = state.persisted();
            if after != before {
                changed = Some(after);
            }
        });

        match (changed, &self.storage) {
            (Some(persisted), Some(storage)) => storage.save_json(PERSISTED_STATE_KEY, &persisted),
            _ => Ok(()),
        }
    }

    // Navigation

    pub fn set_active_tab(&self, tab: Tab) -> Result<()> {
        self.update_persisted(|state| state.active_tab = tab)
    }

    pub fn select_session(&self, session_id: Option<String>) -> Result<()> {
        self.update_persisted(|state| state.selected_session_id = session_id)
    }

    pub fn select_project(&self, project_id: Option<String>) {
        self.update(|state| state.selected_project_id = project_id);
    }

    // Snapshots

    pub fn set_sessions(&self, sessions: Vec<SessionInfo>) {
        self.update(|state| state.sessions = sessions);
    }

    pub fn set_accounts(&self, accounts: Vec<AccountInfo>) {
        self.update(|state| state.accounts = accounts);
    }

    pub fn set_projects(&self, projects: Vec<ProjectInfo>) {
        self.update(|state| state.projects = projects);
    }

    /// Replace every snapshot list from one refresh cycle and clear the
    /// error slot
    pub fn replace_snapshots(
        &self,
        sessions: Vec<SessionInfo>,
        accounts: Vec<AccountInfo>,
        projects: Vec<ProjectInfo>,
    ) {
        self.update(|state| {
            state.sessions = sessions;
            state.accounts = accounts;
            state.projects = projects;
            state.error = None;
            state.last_refresh = Some(Utc::now());
        });
    }

    pub fn set_loading(&self, loading: bool) {
        self.update(|state| state.loading = loading);
    }

    pub fn set_error(&self, error: Option<String>) {
        self.update(|state| state.error = error);
    }

    // Templates

    /// Add a template in front of the existing ones
    pub fn add_template(&self, template: SessionTemplate) -> Result<()> {
        self.update_persisted(|state| state.templates.insert(0, template))
    }

    /// Remove a template by id
    ///
    /// Returns whether a template was removed.
    pub fn remove_template(&self, id: &str) -> Result<bool> {
        let mut removed = false;
        self.update_persisted(|state| {
            let before = state.templates.len();
            state.templates.retain(|t| t.id != id);
            removed = state.templates.len() != before;
        })?;
        Ok(removed)
    }

    // Streaming

    /// Merge one connection event into the stream state
    ///
    /// Events older than the current generation are dropped; a `Reset`
    /// starts a new generation.
    pub fn apply_connection_event(&self, event: ConnectionEvent) {
        self.state.send_if_modified(|state| {
            let stream = &mut state.stream;
            match event {
                ConnectionEvent::Reset {
                    generation,
                    session_id,
                    preserve_output,
                } => {
                    if generation < stream.generation {
                        return false;
                    }
                    if preserve_output {
                        stream.generation = generation;
                        stream.session_id = session_id;
                        stream.status = ConnectionStatus::Connecting;
                        stream.last_error = None;
                    } else {
                        *stream = ConnectionState::for_session(generation, session_id);
                    }
                    true
                }
                event if event.generation() != stream.generation => {
                    tracing::trace!(
                        generation = event.generation(),
                        current = stream.generation,
                        "Dropping stale connection event"
                    );
                    false
                }
                ConnectionEvent::Status { status, error, .. } => {
                    stream.status = status;
                    if error.is_some() {
                        stream.last_error = error;
                    }
                    true
                }
                ConnectionEvent::Frame { frame, .. } => {
                    stream.apply_frame(frame);
                    true
                }
                ConnectionEvent::Cleared { .. } => {
                    stream.clear_output();
                    true
                }
            }
        });
    }

    /// Replace the stream state wholesale, e.g. after missing events
    pub fn set_stream(&self, stream: ConnectionState) {
        self.update(|state| state.stream = stream);
    }

    /// Mirror `manager`'s events into this store until the manager's event
    /// channel closes
    ///
    /// The stream state starts from a snapshot taken together with the
    /// subscription; after a lag both are taken again, so no event is
    /// applied on top of a snapshot that already contains it.
    pub fn attach(&self, manager: Arc<ConnectionManager>) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let (snapshot, mut events) = manager.subscribe_with_snapshot().await;
            store.set_stream(snapshot);
            loop {
                match events.recv().await {
                    Ok(event) => store.apply_connection_event(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Store lagged behind connection events, resyncing");
                        let (snapshot, fresh) = manager.subscribe_with_snapshot().await;
                        events = fresh;
                        store.set_stream(snapshot);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::fake::FakeConnector;
    use crate::endpoints::Endpoints;
    use crate::protocol::parse;
    use std::time::Duration;
    use tempfile::tempdir;

    fn output_text(content: &str) -> String {
        serde_json::json!({
            "type": "output",
            "session_id": "s1",
            "data": {"content": content},
        })
        .to_string()
    }

    fn manager() -> (Arc<ConnectionManager>, crate::connection::fake::FakeServer) {
        let (connector, server) = FakeConnector::new();
        let endpoints = Endpoints::new("http://cockpit.test").unwrap();
        (Arc::new(ConnectionManager::new(connector, endpoints)), server)
    }

    async fn wait_for_stream<F>(store: &ClientStore, predicate: F) -> ConnectionState
    where
        F: Fn(&ConnectionState) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let stream = store.snapshot().stream;
            if predicate(&stream) {
                return stream;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "stream condition not reached, last state: {:?}",
                stream
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn output_event(generation: u64, content: &str) -> ConnectionEvent {
        let frame = parse(
            &serde_json::json!({
                "type": "output",
                "session_id": "s1",
                "data": {"content": content},
            })
            .to_string(),
        )
        .unwrap();
        ConnectionEvent::Frame { generation, frame }
    }

    fn reset(generation: u64, session_id: &str) -> ConnectionEvent {
        ConnectionEvent::Reset {
            generation,
            session_id: Some(session_id.to_string()),
            preserve_output: false,
        }
    }

    #[test]
    fn test_add_template_prepends() {
        let store = ClientStore::new();
        store.add_template(SessionTemplate::new("first", "p1", "P")).unwrap();
        store.add_template(SessionTemplate::new("second", "p1", "P")).unwrap();

        let names: Vec<String> = store
            .snapshot()
            .templates
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn test_remove_template_by_id() {
        let store = ClientStore::new();
        let template = SessionTemplate::new("t", "p1", "P");
        let id = template.id.clone();
        store.add_template(template).unwrap();

        assert!(store.remove_template(&id).unwrap());
        assert!(!store.remove_template(&id).unwrap());
        assert!(store.snapshot().templates.is_empty());
    }

    #[test]
    fn test_snapshots_replace_wholesale_and_clear_error() {
        let store = ClientStore::new();
        store.set_error(Some("API error (500): boom".to_string()));
        let session: SessionInfo = serde_json::from_str(r#"{"id":"s1"}"#).unwrap();
        store.set_sessions(vec![session.clone(), session]);

        store.replace_snapshots(Vec::new(), Vec::new(), Vec::new());
        let state = store.snapshot();
        assert!(state.sessions.is_empty());
        assert!(state.error.is_none());
        assert!(state.last_refresh.is_some());
    }

    #[test]
    fn test_persisted_subset_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        {
            let store = ClientStore::with_storage(SqliteStorage::new_with_path(&path).unwrap()).unwrap();
            store.set_active_tab(Tab::Chat).unwrap();
            store.select_session(Some("s1".to_string())).unwrap();
            store.add_template(SessionTemplate::new("t", "p1", "P")).unwrap();
            store.select_project(Some("p1".to_string()));
            store.set_sessions(vec![serde_json::from_str(r#"{"id":"s1"}"#).unwrap()]);
        }

        let store = ClientStore::with_storage(SqliteStorage::new_with_path(&path).unwrap()).unwrap();
        let state = store.snapshot();
        assert_eq!(state.active_tab, Tab::Chat);
        assert_eq!(state.selected_session_id.as_deref(), Some("s1"));
        assert_eq!(state.templates.len(), 1);
        assert_eq!(state.selected_project_id, None);
        assert!(state.sessions.is_empty());
    }

    #[test]
    fn test_stale_generation_events_are_dropped() {
        let store = ClientStore::new();
        store.apply_connection_event(reset(1, "s1"));
        store.apply_connection_event(output_event(1, "one "));
        store.apply_connection_event(reset(2, "s2"));
        store.apply_connection_event(output_event(1, "late"));
        store.apply_connection_event(output_event(2, "two"));

        let stream = store.snapshot().stream;
        assert_eq!(stream.session_id.as_deref(), Some("s2"));
        assert_eq!(stream.output_buffer, "two");
    }

    #[test]
    fn test_reset_with_preserved_output_keeps_buffer() {
        let store = ClientStore::new();
        store.apply_connection_event(reset(1, "s1"));
        store.apply_connection_event(output_event(1, "kept"));
        store.apply_connection_event(ConnectionEvent::Reset {
            generation: 2,
            session_id: Some("s1".to_string()),
            preserve_output: true,
        });

        let stream = store.snapshot().stream;
        assert_eq!(stream.generation, 2);
        assert_eq!(stream.output_buffer, "kept");
        assert_eq!(stream.status, ConnectionStatus::Connecting);
    }

    #[test]
    fn test_status_error_is_kept_until_reset() {
        let store = ClientStore::new();
        store.apply_connection_event(reset(1, "s1"));
        store.apply_connection_event(ConnectionEvent::Status {
            generation: 1,
            status: ConnectionStatus::Error,
            error: Some("reset by peer".to_string()),
        });
        store.apply_connection_event(ConnectionEvent::Status {
            generation: 1,
            status: ConnectionStatus::Closed,
            error: None,
        });

        let stream = store.snapshot().stream;
        assert_eq!(stream.status, ConnectionStatus::Closed);
        assert_eq!(stream.last_error.as_deref(), Some("reset by peer"));
    }

    #[test]
    fn test_subscribers_see_changes() {
        let store = ClientStore::new();
        let mut rx = store.subscribe();
        store.set_loading(true);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().loading);
    }

    #[tokio::test]
    async fn test_attach_applies_each_frame_once() {
        let (manager, mut server) = manager();
        manager.select_session(Some("s1")).await;
        let socket = server.next_socket().await;

        socket.push_text(&output_text("a"));
        socket.push_text(&output_text("b"));
        let store = ClientStore::new();
        let task = store.attach(Arc::clone(&manager));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while manager.output_buffer().await != "ab" {
            assert!(tokio::time::Instant::now() < deadline, "manager never received output");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        socket.push_text(&output_text("c"));

        let stream = wait_for_stream(&store, |s| s.output_buffer.ends_with('c')).await;
        assert_eq!(stream.output_buffer, "abc");
        assert_eq!(stream.messages.len(), 3);
        task.abort();
    }

    #[tokio::test]
    async fn test_lagged_store_resyncs_without_replaying_frames() {
        let (manager, mut server) = manager();
        manager.select_session(Some("s1")).await;
        let socket = server.next_socket().await;

        let store = ClientStore::new();
        let task = store.attach(Arc::clone(&manager));
        wait_for_stream(&store, |s| s.status == ConnectionStatus::Open).await;

        // Queue frames, then overflow the event channel before either the
        // connection task or the store task gets to run.
        socket.push_text(&output_text("b"));
        socket.push_text(&output_text("c"));
        tokio::task::unconstrained(async {
            for _ in 0..1100 {
                manager.clear_output().await;
            }
        })
        .await;

        let stream = wait_for_stream(&store, |s| s.output_buffer.ends_with('c')).await;
        assert_eq!(stream.output_buffer, "bc");
        assert_eq!(stream.messages.len(), 2);

        socket.push_text(&output_text("d"));
        let stream = wait_for_stream(&store, |s| s.output_buffer.ends_with('d')).await;
        assert_eq!(stream.output_buffer, "bcd");
        assert_eq!(stream, manager.snapshot().await);
        task.abort();
    }
}
