use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        PoisonError, RwLock as StdRwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Result;
use editor_core_utils::paths;
use tokio::sync::{RwLock, broadcast};

use super::manifest::{MANIFEST_FILE, PackageInfo};
use crate::services::events::{EventChannel, ShellEvent};

/// Package registry with hot-reload support.
///
/// Owns the ordered list of registered package roots and the
/// `root path -> PackageInfo` map. Discovery runs once at startup; after the
/// initial scan completes, every registered root is watched and change events
/// are routed through [`dispatch_change`](Self::dispatch_change).
pub struct PackageRegistry {
    /// Registered package search roots, in registration order.
    roots: StdRwLock<Vec<PathBuf>>,

    /// Loaded packages, keyed by package root.
    packages: RwLock<HashMap<PathBuf, PackageInfo>>,

    /// Broadcast channel toward open windows.
    events: EventChannel,

    /// Set by `shutdown`; the watcher thread exits on its next tick.
    pub(super) shutting_down: AtomicBool,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self {
            roots: StdRwLock::new(Vec::new()),
            packages: RwLock::new(HashMap::new()),
            events: EventChannel::default(),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Subscribe to panel-dirty and package-reloaded notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ShellEvent> {
        self.events.subscribe()
    }

    /// Append a root directory to the package search list. Call before
    /// `load_packages`; registration order is discovery order.
    pub fn register_package_path(&self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        tracing::debug!("registering package path {dir:?}");
        self.roots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(dir);
    }

    pub fn registered_paths(&self) -> Vec<PathBuf> {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Discover and load every package under the registered roots, then start
    /// watching those roots. One package failing to load never aborts the
    /// discovery of its siblings.
    pub async fn load_packages(self: std::sync::Arc<Self>) -> Result<()> {
        for root in self.registered_paths() {
            let mut candidates = match fs::read_dir(&root) {
                Ok(entries) => entries
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|path| path.is_dir())
                    .collect::<Vec<_>>(),
                Err(err) => {
                    tracing::warn!("failed to scan package path {root:?}: {err}");
                    continue;
                }
            };
            candidates.sort();

            for dir in candidates {
                if !dir.join(MANIFEST_FILE).is_file() {
                    continue;
                }
                if let Err(err) = self.load_package(&dir).await {
                    tracing::warn!("failed to load package {dir:?}: {err:#}");
                }
            }
        }

        tracing::info!("loaded {} package(s)", self.package_count().await);

        // Only start watching once the initial scan is complete, so no change
        // event can race a package that has not been discovered yet.
        self.watch_packages()
    }

    /// Load (or replace) the package rooted at `root`.
    pub async fn load_package(&self, root: &Path) -> Result<()> {
        let info = PackageInfo::load(root)?;

        let mut packages = self.packages.write().await;
        if let Some(other) = packages
            .values()
            .find(|p| p.name() == info.name() && p.path != info.path)
        {
            tracing::warn!(
                "package name `{}` is already taken by {:?}; loading {:?} anyway \
                 (first-registered root wins name lookups)",
                info.name(),
                other.path,
                info.path
            );
        }

        tracing::info!("loaded package `{}` from {root:?}", info.name());
        packages.insert(root.to_path_buf(), info);
        Ok(())
    }

    /// Re-parse the manifest at `root` and swap the `PackageInfo` wholesale.
    /// On failure the previous `PackageInfo` stays in place.
    pub async fn reload(&self, root: &Path) -> Result<()> {
        let info = PackageInfo::load(root)?;
        tracing::info!("reloaded package `{}` from {root:?}", info.name());

        self.packages.write().await.insert(root.to_path_buf(), info);
        self.events.send(ShellEvent::PackageReloaded {
            path: root.to_path_buf(),
        });
        Ok(())
    }

    /// Exact lookup by package root.
    pub async fn package_info(&self, root: &Path) -> Option<PackageInfo> {
        self.packages.read().await.get(root).cloned()
    }

    /// Map an arbitrary path back to the package that owns it. The most
    /// specific (longest) matching root wins.
    pub async fn owning_package(&self, path: &Path) -> Option<PackageInfo> {
        self.packages
            .read()
            .await
            .values()
            .filter(|info| paths::contains(&info.path, path))
            .max_by_key(|info| info.path.components().count())
            .cloned()
    }

    pub async fn package_count(&self) -> usize {
        self.packages.read().await.len()
    }

    /// Route a change event for `path`.
    ///
    /// A change under the owning package's `panel/` subtree broadcasts one
    /// stale notification per declared panel and does not reload anything; any
    /// other change inside the package root reloads the whole package. Paths
    /// owned by no package are ignored.
    pub async fn dispatch_change(&self, path: &Path) {
        let Some(info) = self.owning_package(path).await else {
            tracing::trace!("change at {path:?} belongs to no loaded package");
            return;
        };

        if paths::contains(&info.panel_dir(), path) {
            for panel_id in info.panel_ids() {
                self.events.send(ShellEvent::PanelDirty { panel_id });
            }
        } else if let Err(err) = self.reload(&info.path).await {
            tracing::error!("failed to reload package {:?}: {err:#}", info.path);
        }
    }

    /// Stop the package watcher. Idempotent, and safe to call when
    /// `watch_packages` never ran.
    pub fn shutdown(&self) {
        if !self.shutting_down.swap(true, Ordering::SeqCst) {
            tracing::info!("package watcher shutting down");
        }
    }
}

impl Default for PackageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
