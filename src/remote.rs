use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Task;

/// Collection the shared snapshots live under in the document database.
pub const SHARED_COLLECTION: &str = "shared_lists";

/// The stored form of a shared snapshot. Records have no expiry; a
/// missing record is treated as permanently invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    pub name: String,
    pub tasks: Vec<Task>,
    pub created_at: String,
}

#[derive(Debug)]
pub enum RemoteError {
    /// The identifier does not resolve; surfaced as "link invalid or
    /// expired", never a crash.
    NotFound,
    /// A write was rejected. Local state keeps its optimistic value.
    WriteFailed(String),
    Unavailable(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::NotFound => write!(f, "share link is invalid or has expired"),
            RemoteError::WriteFailed(msg) => write!(f, "remote write failed: {msg}"),
            RemoteError::Unavailable(msg) => write!(f, "remote store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Detaches a live subscription when dropped, so the handle is released
/// on every exit path of the surrounding view.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// The remote document-store collaborator. Writes are fire-and-forget
/// from the core's perspective; subscription pushes are authoritative
/// whole-profile replace events (last-writer-wins, no field merge).
pub trait DocumentStore {
    fn get_document(&self, id: &str) -> Result<ShareRecord, RemoteError>;
    fn set_document(&self, id: &str, record: &ShareRecord) -> Result<(), RemoteError>;
    fn update_fields(&self, id: &str, partial: serde_json::Value) -> Result<(), RemoteError>;
    fn subscribe(
        &self,
        id: &str,
        on_change: Box<dyn Fn(ShareRecord) + Send>,
    ) -> Result<Subscription, RemoteError>;
}

/// Lifecycle of an optimistic remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePhase {
    /// Applied to the in-memory view, remote write still in flight.
    Optimistic,
    /// The remote store accepted the write.
    Confirmed,
    /// An external subscription push replaced the local value.
    Reverted,
}

/// Short server-side identifier for a shared snapshot.
pub fn mint_share_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// Stores a `{name, tasks}` snapshot and returns the minted identifier.
/// Rejects sharing when there is no name yet (nothing worth a link).
pub fn create_share(
    store: &impl DocumentStore,
    name: &str,
    tasks: &[Task],
    created_at: String,
) -> Result<String, RemoteError> {
    if name.trim().is_empty() {
        return Err(RemoteError::WriteFailed(
            "profile has no name to share".to_string(),
        ));
    }
    let id = mint_share_id();
    let record = ShareRecord {
        name: name.to_string(),
        tasks: tasks.to_vec(),
        created_at,
    };
    store.set_document(&id, &record)?;
    log::info!("created share {id} with {} task(s)", record.tasks.len());
    Ok(id)
}

/// Resolves a share identifier to its stored record.
pub fn resolve_share(store: &impl DocumentStore, id: &str) -> Result<ShareRecord, RemoteError> {
    store.get_document(id)
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryDocumentStore;
    use super::*;

    fn task(id: &str) -> Task {
        Task::new(
            id.to_string(),
            format!("task-{id}"),
            "2024-01-10T00:00:00+00:00".to_string(),
        )
    }

    #[test]
    fn create_and_resolve_share() {
        let store = MemoryDocumentStore::default();
        let id = create_share(
            &store,
            "Ana",
            &[task("a")],
            "2024-01-10T00:00:00+00:00".to_string(),
        )
        .expect("share created");
        assert_eq!(id.len(), 8);

        let record = resolve_share(&store, &id).expect("record resolves");
        assert_eq!(record.name, "Ana");
        assert_eq!(record.tasks.len(), 1);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = MemoryDocumentStore::default();
        assert!(matches!(
            resolve_share(&store, "missing1"),
            Err(RemoteError::NotFound)
        ));
    }

    #[test]
    fn share_requires_a_name() {
        let store = MemoryDocumentStore::default();
        let result = create_share(&store, "  ", &[], "now".to_string());
        assert!(matches!(result, Err(RemoteError::WriteFailed(_))));
        assert!(store.docs.lock().unwrap().is_empty());
    }

    #[test]
    fn rejected_write_surfaces_as_error() {
        let store = MemoryDocumentStore::default();
        store
            .reject_writes
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let result = create_share(&store, "Ana", &[task("a")], "now".to_string());
        assert!(matches!(result, Err(RemoteError::WriteFailed(_))));
    }

    #[test]
    fn update_fields_merges_at_top_level() {
        let store = MemoryDocumentStore::default();
        let id = create_share(&store, "Ana", &[task("a")], "now".to_string()).expect("share");
        store
            .update_fields(&id, serde_json::json!({ "name": "Ana Maria" }))
            .expect("update");
        let record = resolve_share(&store, &id).expect("record");
        assert_eq!(record.name, "Ana Maria");
        assert_eq!(record.tasks.len(), 1);
    }

    #[test]
    fn subscription_releases_on_drop() {
        let store = MemoryDocumentStore::default();
        let released = store.unsubscribed.clone();
        {
            let _sub = store
                .subscribe("abc12345", Box::new(|_| {}))
                .expect("subscribe");
            assert!(!released.load(std::sync::atomic::Ordering::SeqCst));
        }
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn minted_ids_are_short_and_unique() {
        let a = mint_share_id();
        let b = mint_share_id();
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }
}
