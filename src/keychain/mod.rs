// Keychain Store — Keychain Module
//
// Typed access to generic and internet password items. The accessor turns
// each call into one keychain query; the backend performs it against the
// platform keychain (macOS) or an in-memory store.

mod accessor;
mod attributes;
mod backend;
mod error;
mod memory;

#[cfg(target_os = "macos")]
mod macos;

pub use accessor::{ItemSpec, Keychain};
pub use attributes::{AccountRecord, Accessibility, AttrKey, ItemClass};
pub use backend::{ItemChanges, ItemQuery, KeychainBackend, NewItem};
pub use error::{KeychainError, KeychainResultExt};
pub use memory::MemoryKeychain;

#[cfg(target_os = "macos")]
pub use macos::SystemKeychain;
