//! Shell Notification Channel
//!
//! Broadcast channel the package registry uses to tell open editor surfaces
//! (panel views, windows) that their backing files changed.

use std::path::PathBuf;

use tokio::sync::broadcast;

/// Events broadcast to every listening window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    /// A panel's backing files changed without a full package reload.
    /// Carries the fully-qualified panel ID (`<package>.<panel>`).
    PanelDirty { panel_id: String },

    /// A package was reloaded wholesale; `path` is the package root.
    PackageReloaded { path: PathBuf },
}

/// Thin wrapper over a `tokio::sync::broadcast` pair.
///
/// Sending never fails the caller: windows may not be open yet, in which case
/// the event is simply dropped.
#[derive(Debug, Clone)]
pub struct EventChannel {
    tx: broadcast::Sender<ShellEvent>,
}

impl EventChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShellEvent> {
        self.tx.subscribe()
    }

    pub fn send(&self, event: ShellEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("no windows subscribed, dropping shell event");
        }
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new(64)
    }
}
