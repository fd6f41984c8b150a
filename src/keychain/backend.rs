// Keychain Store — Backend seam
//
// One trait method per Keychain Services item call. The accessor builds
// queries and interprets results; a backend only performs the call and
// reports the OS status.

use std::fmt;

use zeroize::Zeroizing;

use super::attributes::{AccountRecord, Accessibility, ItemClass};
use super::KeychainError;

/// The scoping attributes of a keychain query.
/// `None` for service or account matches any value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemQuery<'a> {
    pub class: ItemClass,
    pub service: Option<&'a str>,
    pub account: Option<&'a str>,
}

impl<'a> ItemQuery<'a> {
    pub fn new(class: ItemClass) -> Self {
        Self {
            class,
            service: None,
            account: None,
        }
    }

    pub fn service(mut self, service: &'a str) -> Self {
        self.service = Some(service);
        self
    }

    pub fn account(mut self, account: &'a str) -> Self {
        self.account = Some(account);
        self
    }
}

/// A complete item to be added to the keychain.
pub struct NewItem<'a> {
    pub query: ItemQuery<'a>,
    pub data: &'a [u8],
    pub label: Option<&'a str>,
    pub description: Option<&'a str>,
    pub accessibility: Option<Accessibility>,
}

impl fmt::Debug for NewItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewItem")
            .field("query", &self.query)
            .field("data", &"[REDACTED]")
            .field("label", &self.label)
            .field("description", &self.description)
            .field("accessibility", &self.accessibility)
            .finish()
    }
}

/// What an update writes to an existing item. The value data is always
/// replaced; the other attributes only when `Some`.
pub struct ItemChanges<'a> {
    pub data: &'a [u8],
    pub label: Option<&'a str>,
    pub description: Option<&'a str>,
    pub accessibility: Option<Accessibility>,
}

impl fmt::Debug for ItemChanges<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemChanges")
            .field("data", &"[REDACTED]")
            .field("label", &self.label)
            .field("description", &self.description)
            .field("accessibility", &self.accessibility)
            .finish()
    }
}

/// Abstraction over the keychain item API, so the accessor can run against
/// the platform keychain or an in-memory store.
pub trait KeychainBackend {
    /// Attributes of every item matching `query`. `NotFound` if none match.
    fn find_attributes(&self, query: &ItemQuery<'_>) -> Result<Vec<AccountRecord>, KeychainError>;

    /// Value data of the first item matching `query`. `NotFound` if none match.
    fn find_data(&self, query: &ItemQuery<'_>) -> Result<Zeroizing<Vec<u8>>, KeychainError>;

    /// Add a new item. `DuplicatedItem` if one with the same class, service
    /// and account already exists.
    fn add(&self, item: &NewItem<'_>) -> Result<(), KeychainError>;

    /// Apply `changes` to every item matching `query`.
    fn update(&self, query: &ItemQuery<'_>, changes: &ItemChanges<'_>) -> Result<(), KeychainError>;

    /// Remove every item matching `query`.
    fn delete(&self, query: &ItemQuery<'_>) -> Result<(), KeychainError>;
}

impl<B: KeychainBackend + ?Sized> KeychainBackend for &B {
    fn find_attributes(&self, query: &ItemQuery<'_>) -> Result<Vec<AccountRecord>, KeychainError> {
        (**self).find_attributes(query)
    }

    fn find_data(&self, query: &ItemQuery<'_>) -> Result<Zeroizing<Vec<u8>>, KeychainError> {
        (**self).find_data(query)
    }

    fn add(&self, item: &NewItem<'_>) -> Result<(), KeychainError> {
        (**self).add(item)
    }

    fn update(&self, query: &ItemQuery<'_>, changes: &ItemChanges<'_>) -> Result<(), KeychainError> {
        (**self).update(query, changes)
    }

    fn delete(&self, query: &ItemQuery<'_>) -> Result<(), KeychainError> {
        (**self).delete(query)
    }
}
