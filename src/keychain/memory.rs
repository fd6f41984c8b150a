// Keychain Store — In-memory backend
//
// Mirrors the matching and status behavior of the platform item API without
// persisting anything. Used by the tests and wherever no OS keychain exists.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use super::attributes::{AccountRecord, Accessibility, ItemClass};
use super::backend::{ItemChanges, ItemQuery, KeychainBackend, NewItem};
use super::KeychainError;

struct StoredItem {
    class: ItemClass,
    service: Option<String>,
    account: Option<String>,
    data: Zeroizing<Vec<u8>>,
    label: Option<String>,
    description: Option<String>,
    accessibility: Option<Accessibility>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl StoredItem {
    fn matches(&self, query: &ItemQuery<'_>) -> bool {
        self.class == query.class
            && query.service.map_or(true, |s| self.service.as_deref() == Some(s))
            && query.account.map_or(true, |a| self.account.as_deref() == Some(a))
    }

    fn record(&self) -> AccountRecord {
        AccountRecord {
            class: self.class,
            service: self.service.clone(),
            account: self.account.clone(),
            label: self.label.clone(),
            description: self.description.clone(),
            created_at: Some(self.created_at),
            modified_at: Some(self.modified_at),
            accessibility: self.accessibility,
        }
    }
}

#[derive(Default)]
pub struct MemoryKeychain {
    items: Mutex<Vec<StoredItem>>,
    failure: Mutex<Option<KeychainError>>,
    calls: AtomicUsize,
}

impl MemoryKeychain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next backend call fail with `error` instead of running.
    pub fn fail_next(&self, error: KeychainError) {
        *lock(&self.failure) = Some(error);
    }

    /// Number of backend calls made so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn enter(&self, call: &str) -> Result<MutexGuard<'_, Vec<StoredItem>>, KeychainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = lock(&self.failure).take() {
            tracing::debug!(call, status = error.code(), "Injected keychain failure");
            return Err(error);
        }
        Ok(lock(&self.items))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl KeychainBackend for MemoryKeychain {
    fn find_attributes(&self, query: &ItemQuery<'_>) -> Result<Vec<AccountRecord>, KeychainError> {
        let items = self.enter("find_attributes")?;
        let records: Vec<AccountRecord> = items
            .iter()
            .filter(|item| item.matches(query))
            .map(StoredItem::record)
            .collect();

        if records.is_empty() {
            return Err(KeychainError::NotFound);
        }
        Ok(records)
    }

    fn find_data(&self, query: &ItemQuery<'_>) -> Result<Zeroizing<Vec<u8>>, KeychainError> {
        let items = self.enter("find_data")?;
        items
            .iter()
            .find(|item| item.matches(query))
            .map(|item| item.data.clone())
            .ok_or(KeychainError::NotFound)
    }

    fn add(&self, item: &NewItem<'_>) -> Result<(), KeychainError> {
        let mut items = self.enter("add")?;
        let exists = items.iter().any(|stored| {
            stored.class == item.query.class
                && stored.service.as_deref() == item.query.service
                && stored.account.as_deref() == item.query.account
        });
        if exists {
            return Err(KeychainError::DuplicatedItem);
        }

        let now = Utc::now();
        items.push(StoredItem {
            class: item.query.class,
            service: item.query.service.map(str::to_string),
            account: item.query.account.map(str::to_string),
            data: Zeroizing::new(item.data.to_vec()),
            label: item.label.map(str::to_string),
            description: item.description.map(str::to_string),
            accessibility: item.accessibility,
            created_at: now,
            modified_at: now,
        });
        Ok(())
    }

    fn update(&self, query: &ItemQuery<'_>, changes: &ItemChanges<'_>) -> Result<(), KeychainError> {
        let mut items = self.enter("update")?;
        let now = Utc::now();
        let mut updated = 0;
        for item in items.iter_mut().filter(|item| item.matches(query)) {
            item.data = Zeroizing::new(changes.data.to_vec());
            if let Some(label) = changes.label {
                item.label = Some(label.to_string());
            }
            if let Some(description) = changes.description {
                item.description = Some(description.to_string());
            }
            if changes.accessibility.is_some() {
                item.accessibility = changes.accessibility;
            }
            item.modified_at = now;
            updated += 1;
        }

        if updated == 0 {
            return Err(KeychainError::NotFound);
        }
        Ok(())
    }

    fn delete(&self, query: &ItemQuery<'_>) -> Result<(), KeychainError> {
        let mut items = self.enter("delete")?;
        let before = items.len();
        items.retain(|item| !item.matches(query));

        if items.len() == before {
            return Err(KeychainError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_item<'a>(service: &'a str, account: &'a str, data: &'a [u8]) -> NewItem<'a> {
        NewItem {
            query: ItemQuery::new(ItemClass::GenericPassword)
                .service(service)
                .account(account),
            data,
            label: None,
            description: None,
            accessibility: None,
        }
    }

    #[test]
    fn test_add_then_find_data() {
        let backend = MemoryKeychain::new();
        backend.add(&new_item("mail", "alice", b"hunter2")).unwrap();

        let query = ItemQuery::new(ItemClass::GenericPassword).service("mail").account("alice");
        assert_eq!(backend.find_data(&query).unwrap().as_slice(), b"hunter2");
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let backend = MemoryKeychain::new();
        backend.add(&new_item("mail", "alice", b"one")).unwrap();
        let err = backend.add(&new_item("mail", "alice", b"two")).unwrap_err();
        assert_eq!(err, KeychainError::DuplicatedItem);
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_same_account_in_other_class_is_not_duplicate() {
        let backend = MemoryKeychain::new();
        backend.add(&new_item("example.com", "alice", b"one")).unwrap();

        let mut internet = new_item("example.com", "alice", b"two");
        internet.query.class = ItemClass::InternetPassword;
        backend.add(&internet).unwrap();
        assert_eq!(backend.len(), 2);
    }

    #[test]
    fn test_find_on_empty_store_is_not_found() {
        let backend = MemoryKeychain::new();
        let query = ItemQuery::new(ItemClass::GenericPassword);
        assert_eq!(backend.find_attributes(&query).unwrap_err(), KeychainError::NotFound);
        assert_eq!(backend.find_data(&query).unwrap_err(), KeychainError::NotFound);
    }

    #[test]
    fn test_update_and_delete_missing_item_are_not_found() {
        let backend = MemoryKeychain::new();
        let query = ItemQuery::new(ItemClass::GenericPassword).service("mail").account("bob");
        let changes = ItemChanges {
            data: b"x",
            label: None,
            description: None,
            accessibility: None,
        };
        assert_eq!(backend.update(&query, &changes).unwrap_err(), KeychainError::NotFound);
        assert_eq!(backend.delete(&query).unwrap_err(), KeychainError::NotFound);
    }

    #[test]
    fn test_update_keeps_attributes_it_does_not_name() {
        let backend = MemoryKeychain::new();
        let mut item = new_item("mail", "alice", b"one");
        item.label = Some("Work");
        item.description = Some("IMAP");
        backend.add(&item).unwrap();

        let query = ItemQuery::new(ItemClass::GenericPassword).service("mail").account("alice");
        backend
            .update(
                &query,
                &ItemChanges {
                    data: b"two",
                    label: None,
                    description: Some("SMTP"),
                    accessibility: Some(Accessibility::WhenUnlocked),
                },
            )
            .unwrap();

        let record = &backend.find_attributes(&query).unwrap()[0];
        assert_eq!(record.label.as_deref(), Some("Work"));
        assert_eq!(record.description.as_deref(), Some("SMTP"));
        assert_eq!(record.accessibility, Some(Accessibility::WhenUnlocked));
        assert_eq!(backend.find_data(&query).unwrap().as_slice(), b"two");
    }

    #[test]
    fn test_delete_removes_every_match() {
        let backend = MemoryKeychain::new();
        backend.add(&new_item("mail", "alice", b"1")).unwrap();
        backend.add(&new_item("mail", "bob", b"2")).unwrap();
        backend.add(&new_item("chat", "alice", b"3")).unwrap();

        backend
            .delete(&ItemQuery::new(ItemClass::GenericPassword).service("mail"))
            .unwrap();
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_fail_next_applies_once() {
        let backend = MemoryKeychain::new();
        backend.fail_next(KeychainError::InteractionNotAllowed);

        let query = ItemQuery::new(ItemClass::GenericPassword);
        assert_eq!(
            backend.find_attributes(&query).unwrap_err(),
            KeychainError::InteractionNotAllowed
        );
        assert_eq!(backend.find_attributes(&query).unwrap_err(), KeychainError::NotFound);
        assert_eq!(backend.calls(), 2);
    }

    #[test]
    fn test_new_item_debug_redacts_data() {
        let item = new_item("mail", "alice", b"hunter2");
        let debug = format!("{:?}", item);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
