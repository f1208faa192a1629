//! Application state shared across handlers.

use std::future::Future;
use std::sync::Arc;

use badger_core::{Config, Directory, GuestRepository, MemoryDirectory, Reconciler};
use tokio::sync::watch;

/// Shared application state handed to every handler.
pub type SharedState = Arc<AppState>;

/// Application state.
///
/// Everything in here is internally synchronized, so handlers only ever
/// need a shared reference.
pub struct AppState {
    /// Configuration the server was started with.
    pub config: Config,
    /// Guest collection.
    pub guests: GuestRepository,
    /// Entrance check-in.
    pub reconciler: Reconciler,
    directory: Arc<dyn Directory>,
    persistent: bool,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Create application state backed by an in-process directory,
    /// persisted on disk when the configuration asks for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage location cannot be determined or the
    /// persisted tree cannot be loaded.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let storage = config.storage()?;
        let persistent = storage.is_some();
        let directory = match storage {
            Some(storage) => {
                tracing::info!(path = %storage.tree_path().display(), "Opening persisted directory");
                MemoryDirectory::open(storage)?
            }
            None => {
                tracing::info!("Directory persistence disabled, starting empty");
                MemoryDirectory::new()
            }
        };
        Ok(Self {
            persistent,
            ..Self::with_directory(config, Arc::new(directory))
        })
    }

    /// Create application state over an existing directory backend.
    ///
    /// The backend is reported as not persisted.
    #[must_use]
    pub fn with_directory(config: Config, directory: Arc<dyn Directory>) -> Self {
        let guests = GuestRepository::new(Arc::clone(&directory), config.guests.clone());
        let reconciler = Reconciler::new(guests.clone());
        Self {
            config,
            guests,
            reconciler,
            directory,
            persistent: false,
            shutdown: watch::channel(false).0,
        }
    }

    /// Wrap in an [`Arc`] for use as router state.
    #[must_use]
    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    /// Whether the directory backend is reachable.
    #[must_use]
    pub fn directory_online(&self) -> bool {
        self.directory.is_online()
    }

    /// Whether committed writes are saved to disk.
    #[must_use]
    pub const fn persistent(&self) -> bool {
        self.persistent
    }

    /// Ask long-lived responses such as guest streams to finish.
    pub fn begin_shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::info!("Shutting down open streams");
        }
    }

    /// Resolves once [`AppState::begin_shutdown`] has been called.
    pub fn shutdown_requested(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut requested = self.shutdown.subscribe();
        async move {
            // Also resolves if the state is dropped.
            let _ = requested.wait_for(|requested| *requested).await;
        }
    }
}
