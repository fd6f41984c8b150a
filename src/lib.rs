// Keychain Store — Library root
//
// Re-exports the keychain accessor and the command-line front end.

pub mod cli;
pub mod error;
pub mod keychain;

pub use error::{AppError, Result};
pub use keychain::{Keychain, KeychainError};
