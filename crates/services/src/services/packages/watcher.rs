use std::{
    path::PathBuf,
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use anyhow::Result;
use editor_core_utils::paths;
use notify::{
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, event::ModifyKind,
};

use super::registry::PackageRegistry;

impl PackageRegistry {
    /// Start watching every registered package root on a dedicated thread.
    ///
    /// Call after the initial `load_packages` scan; change events are routed
    /// through `dispatch_change` on the caller's runtime.
    pub fn watch_packages(self: Arc<Self>) -> Result<()> {
        let roots = self.registered_paths();
        if roots.is_empty() {
            tracing::debug!("no package paths registered, nothing to watch");
            return Ok(());
        }

        let registry = self;
        let runtime = tokio::runtime::Handle::current();

        std::thread::spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                if let Err(err) = registry.watch_loop(&roots, runtime) {
                    tracing::error!("package watcher error: {err:#}");
                }
            }));

            if let Err(panic) = result {
                tracing::error!("package watcher thread panicked: {panic:?}");
            }
        });

        Ok(())
    }

    fn watch_loop(&self, roots: &[PathBuf], runtime: tokio::runtime::Handle) -> Result<()> {
        let (tx, rx) = std::sync::mpsc::channel();

        // Watch-service errors are logged and the subscription stays up.
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(err) => tracing::error!("package watcher error: {err}"),
            },
            Config::default(),
        )?;

        for root in roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
        }
        tracing::info!("watching {} package path(s) for changes", roots.len());

        loop {
            if self.shutting_down.load(Ordering::SeqCst) {
                break;
            }

            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    if !Self::is_change_event(&event) {
                        continue;
                    }
                    for path in &event.paths {
                        if roots.iter().any(|root| paths::is_hidden_within(root, path)) {
                            continue;
                        }
                        runtime.block_on(self.dispatch_change(path));
                    }
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    tracing::warn!("package watcher channel disconnected");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Only content changes dispatch. Creations, removals, and renames are
    /// deliberately inert.
    fn is_change_event(event: &Event) -> bool {
        match event.kind {
            EventKind::Modify(ModifyKind::Name(_)) => false,
            EventKind::Modify(_) => true,
            _ => false,
        }
    }
}
