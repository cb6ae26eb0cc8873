//! Per-browser session state.
//!
//! Each session owns its API key, at most one vector index and its chat
//! history. Handlers lock only their own session, so requests from one
//! browser are serialized while different browsers proceed in parallel.

mod upload;

pub use upload::{StoredUpload, UploadStore};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{ChatHistory, IngestReport, SessionConfig};
use crate::services::VectorStore;

pub type SharedSession = Arc<Mutex<Session>>;

pub struct Session {
    pub id: Uuid,
    /// Key that passed the last check; never copied into the environment.
    pub api_key: Option<String>,
    pub index: Option<Box<dyn VectorStore>>,
    /// Report for the document currently indexed.
    pub document: Option<IngestReport>,
    pub history: ChatHistory,
    pub chunk_size: usize,
    pub k: u32,
    last_seen: Instant,
}

impl Session {
    pub fn new(id: Uuid, chunk_size: usize, k: u32) -> Self {
        Self {
            id,
            api_key: None,
            index: None,
            document: None,
            history: ChatHistory::new(),
            chunk_size,
            k,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() >= timeout
    }

    pub fn has_valid_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Install the index built from a new upload and hand back the previous
    /// one, which the caller must `destroy`.
    #[must_use]
    pub fn replace_index(
        &mut self,
        index: Box<dyn VectorStore>,
        report: IngestReport,
    ) -> Option<Box<dyn VectorStore>> {
        self.document = Some(report);
        self.index.replace(index)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Drop the index and the history, keeping the key and form settings.
    pub async fn reset(&mut self) {
        self.release_index().await;
        self.history.clear();
    }

    async fn release_index(&mut self) {
        if let Some(index) = self.index.take()
            && let Err(e) = index.destroy().await
        {
            warn!(session = %self.id, error = %e, "failed to release vector index");
        }
        self.document = None;
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
    idle_timeout: Duration,
    default_chunk_size: usize,
    default_k: u32,
}

impl SessionStore {
    pub fn new(config: &SessionConfig, default_chunk_size: usize, default_k: u32) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            default_chunk_size,
            default_k,
        }
    }

    /// Look up `id`, or start a new session when it is absent or unknown.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, SharedSession) {
        if let Some(id) = id
            && let Some(session) = self.sessions.read().await.get(&id)
        {
            return (id, session.clone());
        }

        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new(
            id,
            self.default_chunk_size,
            self.default_k,
        )));
        self.sessions.write().await.insert(id, session.clone());
        debug!(session = %id, "session created");
        (id, session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove sessions idle for longer than the timeout and return them.
    ///
    /// Sessions that a request has handed out or locked are in use and never
    /// evicted. Handles are cloned under the map lock, so the reference count
    /// seen here cannot grow during the sweep.
    pub async fn sweep_idle(&self) -> Vec<SharedSession> {
        let mut sessions = self.sessions.write().await;
        let idle: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, s)| Arc::strong_count(s) == 1)
            .filter(|(_, s)| {
                s.try_lock()
                    .map(|s| s.is_idle(self.idle_timeout))
                    .unwrap_or(false)
            })
            .map(|(id, _)| *id)
            .collect();

        let evicted: Vec<SharedSession> = idle
            .iter()
            .filter_map(|id| sessions.remove(id))
            .collect();

        if !evicted.is_empty() {
            info!(evicted = evicted.len(), remaining = sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    /// Remove every session, for shutdown.
    pub async fn drain(&self) -> Vec<SharedSession> {
        self.sessions.write().await.drain().map(|(_, s)| s).collect()
    }
}

/// Release everything an evicted session held.
pub async fn close_session(session: &SharedSession, uploads: &UploadStore) {
    let mut session = session.lock().await;
    session.release_index().await;
    uploads.remove_session_dir(session.id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, CostEstimate, DocumentRecord, RecordMetadata, VectorEntry};
    use crate::services::MemoryIndex;

    fn new_store(idle_timeout_secs: u64) -> SessionStore {
        let config = SessionConfig {
            idle_timeout_secs,
            ..Default::default()
        };
        SessionStore::new(&config, 512, 3)
    }

    fn report() -> IngestReport {
        IngestReport {
            filename: "a.txt".to_string(),
            records: 1,
            chunk_size: 512,
            chunks: 1,
            cost: CostEstimate {
                total_tokens: 1,
                cost_usd: 0.0,
                model: "m".to_string(),
            },
            embedded: true,
            duration_ms: 0,
        }
    }

    async fn one_entry_index() -> Box<dyn VectorStore> {
        let record = DocumentRecord::new("x".to_string(), RecordMetadata::default());
        let mut index = MemoryIndex::new();
        index
            .insert(vec![VectorEntry {
                chunk: Chunk::from_record(&record, "x".to_string(), 0, 1, 0, 1),
                vector: vec![1.0],
            }])
            .await
            .unwrap();
        Box::new(index)
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_known_id() {
        let store = new_store(3600);
        let (id, first) = store.get_or_create(None).await;
        let (same_id, second) = store.get_or_create(Some(id)).await;

        assert_eq!(id, same_id);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_starts_new_session() {
        let store = new_store(3600);
        let stale = Uuid::new_v4();
        let (id, session) = store.get_or_create(Some(stale)).await;

        assert_ne!(id, stale);
        let session = session.lock().await;
        assert_eq!(session.chunk_size, 512);
        assert_eq!(session.k, 3);
        assert!(!session.has_valid_key());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = new_store(3600);
        let (_, a) = store.get_or_create(None).await;
        let (_, b) = store.get_or_create(None).await;

        a.lock().await.history.push("q", "a");
        assert_eq!(a.lock().await.history.len(), 1);
        assert!(b.lock().await.history.is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_index_and_history() {
        let store = new_store(3600);
        let (_, shared) = store.get_or_create(None).await;
        let mut session = shared.lock().await;
        session.api_key = Some("sk".to_string());
        let previous = session.replace_index(one_entry_index().await, report());
        assert!(previous.is_none());
        session.history.push("q", "a");

        session.reset().await;
        assert!(session.index.is_none());
        assert!(session.document.is_none());
        assert!(session.history.is_empty());
        assert!(session.has_valid_key());
    }

    #[tokio::test]
    async fn test_replace_index_returns_previous() {
        let mut session = Session::new(Uuid::new_v4(), 512, 3);
        assert!(session.replace_index(one_entry_index().await, report()).is_none());

        let mut second = report();
        second.filename = "b.txt".to_string();
        let previous = session.replace_index(one_entry_index().await, second);

        assert_eq!(previous.unwrap().count().await.unwrap(), 1);
        assert_eq!(session.document.as_ref().unwrap().filename, "b.txt");
        assert!(session.index.is_some());
    }

    #[tokio::test]
    async fn test_clear_history_keeps_index() {
        let store = new_store(3600);
        let (_, shared) = store.get_or_create(None).await;
        let mut session = shared.lock().await;
        let _ = session.replace_index(one_entry_index().await, report());
        session.history.push("q", "a");

        session.clear_history();
        assert!(session.history.is_empty());
        assert!(session.index.is_some());
    }

    #[tokio::test]
    async fn test_sweep_evicts_idle_sessions() {
        let store = new_store(0);
        store.get_or_create(None).await;
        store.get_or_create(None).await;

        let evicted = store.sweep_idle().await;
        assert_eq!(evicted.len(), 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_keeps_active_and_locked_sessions() {
        let store = new_store(3600);
        store.get_or_create(None).await;
        assert!(store.sweep_idle().await.is_empty());

        let idle_store = new_store(0);
        let (_, busy) = idle_store.get_or_create(None).await;
        let _guard = busy.lock().await;
        assert!(idle_store.sweep_idle().await.is_empty());
        assert_eq!(idle_store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_skips_session_handed_to_a_request() {
        let store = new_store(0);
        let (id, handle) = store.get_or_create(None).await;

        assert!(store.sweep_idle().await.is_empty());
        assert_eq!(store.get_or_create(Some(id)).await.0, id);

        drop(handle);
        let evicted = store.sweep_idle().await;
        assert_eq!(evicted.len(), 1);
        assert!(store.is_empty().await);
    }
}
