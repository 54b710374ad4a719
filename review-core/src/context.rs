//! Application context shared by editor sessions.
//!
//! Built once at startup and cloned into every session, so storage,
//! notification and haptics are explicit collaborators rather than
//! module-level singletons.

use std::fmt;
use std::rc::Rc;

use crate::config::EditorConfig;
use crate::haptics::{Haptics, NoHaptics};
use crate::storage::{BlobStorage, MemoryBlobStore, NoopNotifier, ReviewNotifier};

/// External collaborators and configuration for the editor.
#[derive(Clone)]
pub struct AppContext {
    storage: Rc<dyn BlobStorage>,
    notifier: Rc<dyn ReviewNotifier>,
    haptics: Rc<dyn Haptics>,
    config: Rc<EditorConfig>,
}

impl AppContext {
    /// Create a context around a storage backend with no-op notifier and
    /// haptics and the default configuration.
    #[must_use]
    pub fn new(storage: Rc<dyn BlobStorage>) -> Self {
        Self {
            storage,
            notifier: Rc::new(NoopNotifier),
            haptics: Rc::new(NoHaptics),
            config: Rc::new(EditorConfig::default()),
        }
    }

    /// Context backed by in-memory storage.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Rc::new(MemoryBlobStore::new()))
    }

    /// Set the review-complete notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Rc<dyn ReviewNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Set the haptics backend.
    #[must_use]
    pub fn with_haptics(mut self, haptics: Rc<dyn Haptics>) -> Self {
        self.haptics = haptics;
        self
    }

    /// Set the editor configuration.
    #[must_use]
    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = Rc::new(config);
        self
    }

    /// Storage collaborator.
    #[must_use]
    pub fn storage(&self) -> &dyn BlobStorage {
        self.storage.as_ref()
    }

    /// Notification collaborator.
    #[must_use]
    pub fn notifier(&self) -> &dyn ReviewNotifier {
        self.notifier.as_ref()
    }

    /// Haptics collaborator.
    #[must_use]
    pub fn haptics(&self) -> &dyn Haptics {
        self.haptics.as_ref()
    }

    /// Editor configuration.
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
