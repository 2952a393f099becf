//! Package Registry Service
//!
//! Discovers package manifests under registered root directories, loads them,
//! and watches the same roots for changes. Edits under a package's `panel/`
//! subtree broadcast a stale notification per declared panel; any other edit
//! inside the package root triggers a full reload of that package.

mod manifest;
mod registry;
mod watcher;

pub use manifest::{MANIFEST_FILE, PANEL_DIR, PackageInfo, PackageManifest};
pub use registry::PackageRegistry;
