//! Chat session persistence
//!
//! Sessions live in memory keyed by id and are mirrored to the
//! `chat_sessions` slot as a JSON array of `[id, session]` pairs after
//! every mutation. Operations on an unknown id are silent no-ops.

use super::types::{ChatSession, Message, ServiceContext, DEFAULT_SESSION_TITLE};
use crate::storage::{KeyValueStore, SESSIONS_KEY};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};
use ulid::Ulid;

/// In-memory session map backed by a durable slot
pub struct ChatSessionStore {
    storage: Arc<dyn KeyValueStore>,
    sessions: RwLock<HashMap<String, ChatSession>>,
}

impl ChatSessionStore {
    /// Open the store and load any persisted sessions
    ///
    /// An absent or unreadable blob yields an empty store; the problem is
    /// logged and not surfaced.
    pub fn open(storage: Arc<dyn KeyValueStore>) -> Self {
        let sessions = load_sessions(storage.as_ref());
        debug!(count = sessions.len(), "Loaded chat sessions");
        Self {
            storage,
            sessions: RwLock::new(sessions),
        }
    }

    /// Create and persist an empty session
    ///
    /// A missing or empty title becomes `New Conversation`.
    pub fn create_session(
        &self,
        title: Option<&str>,
        service_context: Option<ServiceContext>,
    ) -> ChatSession {
        let now = Utc::now();
        let title = title
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_SESSION_TITLE);

        let session = ChatSession {
            id: generate_session_id(),
            title: title.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            service_context,
        };

        self.mutate(|sessions| {
            sessions.insert(session.id.clone(), session.clone());
            true
        });
        session
    }

    pub fn get_session(&self, session_id: &str) -> Option<ChatSession> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    /// Append `message` and bump `updated_at`; returns whether the session
    /// exists.
    pub fn add_message(&self, session_id: &str, message: Message) -> bool {
        self.mutate(|sessions| match sessions.get_mut(session_id) {
            Some(session) => {
                session.messages.push(message);
                session.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    /// Rename a session and bump `updated_at`; returns whether the session
    /// exists.
    pub fn update_session_title(&self, session_id: &str, title: &str) -> bool {
        self.mutate(|sessions| match sessions.get_mut(session_id) {
            Some(session) => {
                session.title = title.to_string();
                session.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    /// Remove a session; returns whether it existed.
    pub fn delete_session(&self, session_id: &str) -> bool {
        self.mutate(|sessions| sessions.remove(session_id).is_some())
    }

    /// All sessions, most recently active first.
    pub fn get_all_sessions(&self) -> Vec<ChatSession> {
        let mut sessions: Vec<ChatSession> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `change` under the write lock and persist if it reports a
    /// modification.
    fn mutate<F>(&self, change: F) -> bool
    where
        F: FnOnce(&mut HashMap<String, ChatSession>) -> bool,
    {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let changed = change(&mut sessions);
        if changed {
            save_sessions(self.storage.as_ref(), &sessions);
        }
        changed
    }
}

/// Opaque, time-sortable session id.
fn generate_session_id() -> String {
    Ulid::new().to_string()
}

fn load_sessions(storage: &dyn KeyValueStore) -> HashMap<String, ChatSession> {
    let stored = match storage.get(SESSIONS_KEY) {
        Ok(Some(stored)) => stored,
        Ok(None) => return HashMap::new(),
        Err(err) => {
            warn!(error = %err, "Failed to read chat sessions");
            return HashMap::new();
        }
    };

    match serde_json::from_str::<Vec<(String, ChatSession)>>(&stored) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(err) => {
            warn!(error = %err, "Failed to load chat sessions");
            HashMap::new()
        }
    }
}

fn save_sessions(storage: &dyn KeyValueStore, sessions: &HashMap<String, ChatSession>) {
    let pairs: Vec<(&String, &ChatSession)> = sessions.iter().collect();
    let result = serde_json::to_string(&pairs)
        .map_err(anyhow::Error::from)
        .and_then(|serialized| storage.set(SESSIONS_KEY, &serialized));

    if let Err(err) = result {
        warn!(error = %err, "Failed to save chat sessions");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::thread::sleep;
    use std::time::Duration;

    fn create_store() -> (ChatSessionStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        (ChatSessionStore::open(storage.clone()), storage)
    }

    #[test]
    fn test_create_session_defaults() {
        let (store, _) = create_store();
        let session = store.create_session(None, None);

        assert_eq!(session.title, "New Conversation");
        assert!(session.messages.is_empty());
        assert_eq!(session.created_at, session.updated_at);
        assert_eq!(store.get_session(&session.id), Some(session));
    }

    #[test]
    fn test_empty_title_falls_back() {
        let (store, _) = create_store();
        assert_eq!(store.create_session(Some(""), None).title, "New Conversation");
        assert_eq!(store.create_session(Some("Tickets"), None).title, "Tickets");
    }

    #[test]
    fn test_session_ids_are_distinct() {
        let (store, _) = create_store();
        let a = store.create_session(None, None);
        let b = store.create_session(None, None);
        assert_ne!(a.id, b.id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_session_id_is_full_ulid() {
        let id = generate_session_id();
        assert_eq!(id.len(), 26);
        assert!(id.parse::<Ulid>().is_ok());
    }

    #[test]
    fn test_add_message_bumps_updated_at() {
        let (store, _) = create_store();
        let session = store.create_session(Some("Chat"), None);
        sleep(Duration::from_millis(2));

        assert!(store.add_message(&session.id, Message::user("hi")));
        let updated = store.get_session(&session.id).unwrap();
        assert_eq!(updated.messages.len(), 1);
        assert!(updated.updated_at > session.updated_at);
        assert_eq!(updated.created_at, session.created_at);
    }

    #[test]
    fn test_unknown_id_operations_are_noops() {
        let (store, storage) = create_store();
        let session = store.create_session(Some("Keep"), None);
        let snapshot = storage.get(SESSIONS_KEY).unwrap();

        assert!(!store.add_message("missing", Message::user("hi")));
        assert!(!store.update_session_title("missing", "New"));
        assert!(!store.delete_session("missing"));

        assert_eq!(store.get_all_sessions(), vec![session]);
        assert_eq!(storage.get(SESSIONS_KEY).unwrap(), snapshot);
    }

    #[test]
    fn test_round_trip_through_storage() {
        let (store, storage) = create_store();
        let session = store.create_session(
            Some("Round trip"),
            Some(ServiceContext::for_service("tickets")),
        );
        for text in ["one", "two", "three"] {
            store.add_message(&session.id, Message::user(text));
        }

        let reopened = ChatSessionStore::open(storage);
        let sessions = reopened.get_all_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].messages.len(), 3);
        assert_eq!(sessions[0].messages[2].content, "three");
        assert_eq!(sessions[0], store.get_session(&session.id).unwrap());
    }

    #[test]
    fn test_persisted_blob_is_array_of_pairs() {
        let (store, storage) = create_store();
        let session = store.create_session(None, None);

        let stored = storage.get(SESSIONS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(value[0][0], session.id.as_str());
        assert_eq!(value[0][1]["title"], "New Conversation");
        assert!(value[0][1]["created_at"].is_string());
    }

    #[test]
    fn test_corrupt_blob_loads_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(SESSIONS_KEY, "[[\"id\", {\"title\": 3}]]").unwrap();
        let store = ChatSessionStore::open(storage.clone());
        assert!(store.is_empty());

        storage.set(SESSIONS_KEY, "not json").unwrap();
        assert!(ChatSessionStore::open(storage).is_empty());
    }

    #[test]
    fn test_sessions_ordered_by_recent_activity() {
        let (store, _) = create_store();
        let first = store.create_session(Some("first"), None);
        sleep(Duration::from_millis(2));
        let second = store.create_session(Some("second"), None);
        sleep(Duration::from_millis(2));
        let third = store.create_session(Some("third"), None);
        sleep(Duration::from_millis(2));
        store.update_session_title(&first.id, "first, renamed");

        let order: Vec<String> = store
            .get_all_sessions()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(order, vec![first.id, third.id, second.id]);
    }

    #[test]
    fn test_delete_session_persists() {
        let (store, storage) = create_store();
        let session = store.create_session(None, None);
        assert!(store.delete_session(&session.id));
        assert!(ChatSessionStore::open(storage).is_empty());
    }
}
