pub mod events;
pub mod packages;
pub mod profiles;

pub use events::{EventChannel, ShellEvent};
pub use packages::{PackageInfo, PackageManifest, PackageRegistry};
pub use profiles::{Profile, ProfileError, ProfileStore};
