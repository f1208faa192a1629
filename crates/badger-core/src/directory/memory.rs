//! In-process realtime directory backend.
//!
//! The tree lives behind a lock. Every committed write bumps a revision on a
//! `watch` channel; subscribers re-read their path whenever the revision
//! moves. A `watch` receiver only ever holds the latest revision, which gives
//! subscriptions their coalescing behaviour for free.
//!
//! Writers are serialized by their own mutex and build the next tree from a
//! copy, so the tree lock is only held for the final swap. When the directory
//! is persisted, commits run on the blocking pool and readers keep seeing the
//! previous tree until the save has finished.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use async_trait::async_trait;
use futures::future;
use futures::stream::StreamExt;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};
use uuid::Uuid;

use super::stream::{failed, snapshots};
use super::{
    Child, Directory, DirectoryError, DirectoryPath, DirectoryResult, Guard, ListQuery,
    ListStream, ValueStream, WriteOutcome,
};
use crate::storage::Storage;

/// Realtime hierarchical JSON store held in memory, optionally backed by a file.
///
/// Cloning is cheap; clones share the same tree.
#[derive(Clone)]
pub struct MemoryDirectory {
    inner: Arc<Inner>,
}

struct Inner {
    tree: RwLock<Value>,
    writer: Mutex<()>,
    revision: watch::Sender<u64>,
    online: AtomicBool,
    storage: Option<Storage>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    /// An empty, purely in-memory directory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tree(Value::Object(Map::new()), None)
    }

    /// Open a directory persisted in `storage`, loading any saved tree.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Persistence`] if the saved tree cannot be read.
    pub fn open(storage: Storage) -> DirectoryResult<Self> {
        let tree = storage
            .load_tree()
            .map_err(|e| DirectoryError::Persistence {
                message: e.to_string(),
            })?
            .unwrap_or_else(|| Value::Object(Map::new()));
        info!(path = %storage.tree_path().display(), "Opened persistent directory");
        Ok(Self::with_tree(tree, Some(storage)))
    }

    fn with_tree(mut tree: Value, storage: Option<Storage>) -> Self {
        prune(&mut tree);
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                tree: RwLock::new(tree),
                writer: Mutex::new(()),
                revision,
                online: AtomicBool::new(true),
                storage,
            }),
        }
    }

    /// Simulate connectivity loss (`false`) or recovery (`true`).
    ///
    /// While offline every read and write fails with
    /// [`DirectoryError::Unavailable`]; open subscriptions stay open.
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
        info!(online, "Directory connectivity changed");
    }

    /// Number of writes committed so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    fn ensure_online(&self) -> DirectoryResult<()> {
        if self.inner.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DirectoryError::Unavailable {
                message: "directory backend is offline".to_string(),
            })
        }
    }

    /// Run [`Inner::commit`], off the async runtime when a save is involved.
    async fn commit<T, F>(&self, mutate: F) -> DirectoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Value) -> DirectoryResult<T> + Send + 'static,
    {
        if self.inner.storage.is_none() {
            return self.inner.commit(mutate);
        }
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.commit(mutate))
            .await
            .map_err(|e| DirectoryError::Internal {
                message: format!("commit task failed: {e}"),
            })?
    }

    fn subscribe<T, F>(&self, read: F) -> futures::stream::BoxStream<'static, DirectoryResult<T>>
    where
        T: PartialEq + Clone + Send + 'static,
        F: Fn(&Inner) -> DirectoryResult<T> + Send + 'static,
    {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let changes = WatchStream::new(self.inner.revision.subscribe());
        snapshots(changes.filter_map(move |_| {
            future::ready(inner.upgrade().map(|inner| read(&inner)))
        }))
    }
}

impl Inner {
    fn read<T>(&self, f: impl FnOnce(&Value) -> T) -> DirectoryResult<T> {
        let tree = self.tree.read().map_err(|_| poisoned())?;
        Ok(f(&tree))
    }

    /// Apply `mutate` to a copy of the tree, persist it, then swap it in.
    ///
    /// Nothing is visible to readers unless every step succeeds.
    fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut Value) -> DirectoryResult<T>,
    ) -> DirectoryResult<T> {
        let _writer = self.writer.lock().map_err(|_| poisoned())?;
        let mut next = self.read(Value::clone)?;
        let result = mutate(&mut next)?;
        prune(&mut next);

        if self.read(|tree| *tree == next)? {
            return Ok(result);
        }
        if let Some(storage) = &self.storage {
            storage
                .save_tree(&next)
                .map_err(|e| DirectoryError::Persistence {
                    message: e.to_string(),
                })?;
        }
        *self.tree.write().map_err(|_| poisoned())? = next;

        self.revision.send_modify(|revision| *revision += 1);
        Ok(result)
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn create(&self, path: &str, value: Value) -> DirectoryResult<String> {
        self.ensure_online()?;
        let key = Uuid::now_v7().simple().to_string();
        let target = DirectoryPath::parse(path)?.child(&key)?;
        let segments = target.segments().to_vec();
        self.commit(move |tree| {
            set_at(tree, &segments, value);
            Ok(())
        })
        .await?;
        info!(path = %target, "Created node");
        Ok(key)
    }

    async fn replace(&self, path: &str, value: Value) -> DirectoryResult<()> {
        self.ensure_online()?;
        let target = DirectoryPath::parse(path)?;
        let segments = target.segments().to_vec();
        self.commit(move |tree| {
            set_at(tree, &segments, value);
            Ok(())
        })
        .await?;
        debug!(path = %target, "Replaced node");
        Ok(())
    }

    async fn patch(&self, path: &str, fields: Map<String, Value>) -> DirectoryResult<()> {
        self.ensure_online()?;
        let base = DirectoryPath::parse(path)?;
        let writes = resolve_fields(&base, fields)?;
        self.commit(move |tree| {
            for (target, value) in writes {
                set_at(tree, target.segments(), value);
            }
            Ok(())
        })
        .await?;
        debug!(path = %base, "Patched node");
        Ok(())
    }

    async fn remove(&self, path: &str) -> DirectoryResult<()> {
        self.ensure_online()?;
        let target = DirectoryPath::parse(path)?;
        let segments = target.segments().to_vec();
        self.commit(move |tree| {
            set_at(tree, &segments, Value::Null);
            Ok(())
        })
        .await?;
        info!(path = %target, "Removed node");
        Ok(())
    }

    async fn get_once(&self, path: &str) -> DirectoryResult<Option<Value>> {
        self.ensure_online()?;
        let target = DirectoryPath::parse(path)?;
        self.inner.read(|tree| node_at(tree, &target).cloned())
    }

    async fn get_once_list(&self, path: &str, query: &ListQuery) -> DirectoryResult<Vec<Child>> {
        self.ensure_online()?;
        let target = DirectoryPath::parse(path)?;
        self.inner.read(|tree| query.apply(node_at(tree, &target)))
    }

    async fn compare_and_patch(
        &self,
        path: &str,
        guard: &Guard,
        fields: Map<String, Value>,
    ) -> DirectoryResult<WriteOutcome> {
        self.ensure_online()?;
        let base = DirectoryPath::parse(path)?;
        let writes = resolve_fields(&base, fields)?;
        let node = base.clone();
        let guard = guard.clone();
        let outcome = self
            .commit(move |tree| {
                let current = node_at(tree, &node);
                if !guard.holds(current) {
                    return Ok(WriteOutcome::Rejected {
                        current: current.cloned(),
                    });
                }
                for (target, value) in writes {
                    set_at(tree, target.segments(), value);
                }
                Ok(WriteOutcome::Applied)
            })
            .await?;
        debug!(path = %base, applied = matches!(outcome, WriteOutcome::Applied), "Conditional patch");
        Ok(outcome)
    }

    fn observe_one(&self, path: &str) -> ValueStream {
        let target = match DirectoryPath::parse(path) {
            Ok(target) => target,
            Err(e) => return failed(e),
        };
        debug!(path = %target, "Opening node subscription");
        self.subscribe(move |inner| inner.read(|tree| node_at(tree, &target).cloned()))
    }

    fn observe_query(&self, path: &str, query: ListQuery) -> ListStream {
        let target = match DirectoryPath::parse(path) {
            Ok(target) => target,
            Err(e) => return failed(e),
        };
        debug!(path = %target, order_by = ?query.order_by, "Opening list subscription");
        self.subscribe(move |inner| inner.read(|tree| query.apply(node_at(tree, &target))))
    }

    fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }
}

fn poisoned() -> DirectoryError {
    DirectoryError::Internal {
        message: "directory lock poisoned".to_string(),
    }
}

fn resolve_fields(
    base: &DirectoryPath,
    fields: Map<String, Value>,
) -> DirectoryResult<Vec<(DirectoryPath, Value)>> {
    fields
        .into_iter()
        .map(|(field, value)| {
            let target = base.join(&field)?;
            if target == *base {
                return Err(DirectoryError::InvalidPath {
                    path: field,
                    reason: "patch field must name a child".to_string(),
                });
            }
            Ok((target, value))
        })
        .collect()
}

/// Node at `path`; empty nodes do not exist.
fn node_at<'a>(root: &'a Value, path: &DirectoryPath) -> Option<&'a Value> {
    let node = path
        .segments()
        .iter()
        .try_fold(root, |node, segment| node.get(segment.as_str()))?;
    (!is_empty(node)).then_some(node)
}

fn set_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(children) = node else {
        return;
    };
    if rest.is_empty() && value.is_null() {
        children.remove(head);
        return;
    }
    let child = children.entry(head.clone()).or_insert(Value::Null);
    set_at(child, rest, value);
}

/// Remove nulls and empty objects, recursively.
fn prune(value: &mut Value) {
    if let Value::Object(children) = value {
        for child in children.values_mut() {
            prune(child);
        }
        children.retain(|_, child| !is_empty(child));
    }
}

fn is_empty(value: &Value) -> bool {
    value.is_null() || value.as_object().is_some_and(Map::is_empty)
}
