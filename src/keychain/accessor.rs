// Keychain Store — Keychain accessor
//
// The public face of the crate: getting accounts, getting, setting and
// deleting passwords. Each operation validates its arguments, builds one
// query, and hands it to the backend. OS statuses are returned unchanged.
//
// Secret values are never logged. Returned passwords are wrapped in
// `Zeroizing` so they are wiped when dropped.

use zeroize::Zeroizing;

use super::attributes::{AccountRecord, Accessibility, ItemClass};
use super::backend::{ItemChanges, ItemQuery, KeychainBackend, NewItem};
use super::KeychainError;

/// Identifies one item to be written, with the optional descriptive
/// attributes stored alongside it.
#[derive(Debug, Clone, Copy)]
pub struct ItemSpec<'a> {
    pub service: &'a str,
    pub account: &'a str,
    pub class: ItemClass,
    pub label: Option<&'a str>,
    pub description: Option<&'a str>,
}

impl<'a> ItemSpec<'a> {
    pub fn new(service: &'a str, account: &'a str) -> Self {
        Self {
            service,
            account,
            class: ItemClass::GenericPassword,
            label: None,
            description: None,
        }
    }

    pub fn class(mut self, class: ItemClass) -> Self {
        self.class = class;
        self
    }

    pub fn label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn description(mut self, description: &'a str) -> Self {
        self.description = Some(description);
        self
    }
}

/// Accessor for keychain password items.
pub struct Keychain<B> {
    backend: B,
    accessibility: Option<Accessibility>,
}

#[cfg(target_os = "macos")]
impl Keychain<super::SystemKeychain> {
    /// An accessor over the user's default keychain.
    pub fn system() -> Result<Self, KeychainError> {
        Ok(Self::new(super::SystemKeychain::new()))
    }
}

#[cfg(not(target_os = "macos"))]
impl Keychain<super::MemoryKeychain> {
    /// There is no system keychain on this platform; this always fails with
    /// `NotAvailable`. The `MemoryKeychain` parameter only gives the
    /// signature a concrete type, it is not a fallback store.
    pub fn system() -> Result<Self, KeychainError> {
        Err(KeychainError::NotAvailable)
    }
}

impl<B: KeychainBackend> Keychain<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            accessibility: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ─── Configuration ───────────────────────────────────────────────────

    /// Accessibility applied to every password saved from now on, new or
    /// replaced. `None` means the keychain default, and leaves the
    /// accessibility of existing items alone.
    pub fn accessibility(&self) -> Option<Accessibility> {
        self.accessibility
    }

    pub fn set_accessibility(&mut self, accessibility: Option<Accessibility>) {
        self.accessibility = accessibility;
    }

    // ─── Getting Accounts ────────────────────────────────────────────────

    /// All generic password accounts.
    pub fn all_accounts(&self) -> Result<Vec<AccountRecord>, KeychainError> {
        self.all_accounts_of_class(ItemClass::GenericPassword)
    }

    /// All generic password accounts for `service`.
    pub fn accounts_for_service(&self, service: &str) -> Result<Vec<AccountRecord>, KeychainError> {
        self.accounts_for_service_of_class(service, ItemClass::GenericPassword)
    }

    pub fn all_accounts_of_class(&self, class: ItemClass) -> Result<Vec<AccountRecord>, KeychainError> {
        self.find_accounts(ItemQuery::new(class))
    }

    pub fn accounts_for_service_of_class(
        &self,
        service: &str,
        class: ItemClass,
    ) -> Result<Vec<AccountRecord>, KeychainError> {
        self.find_accounts(ItemQuery::new(class).service(service))
    }

    fn find_accounts(&self, query: ItemQuery<'_>) -> Result<Vec<AccountRecord>, KeychainError> {
        tracing::debug!(class = %query.class, service = ?query.service, "Listing keychain accounts");
        let records = self.backend.find_attributes(&query)?;
        tracing::debug!(count = records.len(), "Keychain accounts found");
        Ok(records)
    }

    // ─── Getting Passwords ───────────────────────────────────────────────

    /// The password of a generic item, decoded as UTF-8.
    pub fn password(&self, service: &str, account: &str) -> Result<Zeroizing<String>, KeychainError> {
        self.password_of_class(service, ItemClass::GenericPassword, account)
    }

    pub fn password_of_class(
        &self,
        service: &str,
        class: ItemClass,
        account: &str,
    ) -> Result<Zeroizing<String>, KeychainError> {
        let data = self.password_data_of_class(service, class, account)?;
        let text = std::str::from_utf8(&data).map_err(|_| KeychainError::FailedToDecode)?;
        Ok(Zeroizing::new(text.to_string()))
    }

    /// The raw password data of a generic item.
    pub fn password_data(
        &self,
        service: &str,
        account: &str,
    ) -> Result<Zeroizing<Vec<u8>>, KeychainError> {
        self.password_data_of_class(service, ItemClass::GenericPassword, account)
    }

    pub fn password_data_of_class(
        &self,
        service: &str,
        class: ItemClass,
        account: &str,
    ) -> Result<Zeroizing<Vec<u8>>, KeychainError> {
        let query = item_query(service, class, account)?;
        tracing::debug!(service, account, class = %class, "Reading keychain password");
        self.backend.find_data(&query)
    }

    // ─── Deleting Passwords ──────────────────────────────────────────────

    pub fn delete_password(&self, service: &str, account: &str) -> Result<(), KeychainError> {
        self.delete_password_of_class(service, ItemClass::GenericPassword, account)
    }

    pub fn delete_password_of_class(
        &self,
        service: &str,
        class: ItemClass,
        account: &str,
    ) -> Result<(), KeychainError> {
        let query = item_query(service, class, account)?;
        self.backend.delete(&query)?;
        tracing::info!(service, account, class = %class, "Keychain password deleted");
        Ok(())
    }

    // ─── Setting Passwords ───────────────────────────────────────────────

    pub fn set_password(&self, password: &str, service: &str, account: &str) -> Result<(), KeychainError> {
        self.set_item(&ItemSpec::new(service, account), password.as_bytes())
    }

    pub fn set_password_data(&self, password: &[u8], service: &str, account: &str) -> Result<(), KeychainError> {
        self.set_item(&ItemSpec::new(service, account), password)
    }

    pub fn set_password_of_class(
        &self,
        password: &str,
        service: &str,
        class: ItemClass,
        account: &str,
    ) -> Result<(), KeychainError> {
        self.set_item(&ItemSpec::new(service, account).class(class), password.as_bytes())
    }

    pub fn set_password_data_of_class(
        &self,
        password: &[u8],
        service: &str,
        class: ItemClass,
        account: &str,
    ) -> Result<(), KeychainError> {
        self.set_item(&ItemSpec::new(service, account).class(class), password)
    }

    /// Store `data` for the item, together with the configured
    /// accessibility and the item's label and description. An existing item
    /// is updated in place and keeps any attribute left unset here;
    /// otherwise a new item is added.
    pub fn set_item(&self, spec: &ItemSpec<'_>, data: &[u8]) -> Result<(), KeychainError> {
        let query = item_query(spec.service, spec.class, spec.account)?;
        let changes = ItemChanges {
            data,
            label: spec.label,
            description: spec.description,
            accessibility: self.accessibility,
        };

        match self.backend.update(&query, &changes) {
            Ok(()) => {
                tracing::info!(service = spec.service, account = spec.account, class = %spec.class, "Keychain password updated");
                return Ok(());
            }
            Err(KeychainError::NotFound) => {}
            Err(e) => return Err(e),
        }

        self.backend.add(&NewItem {
            query,
            data,
            label: spec.label,
            description: spec.description,
            accessibility: self.accessibility,
        })?;
        tracing::info!(service = spec.service, account = spec.account, class = %spec.class, "Keychain password added");
        Ok(())
    }
}

/// Build the query for one item, rejecting empty names.
fn item_query<'a>(service: &'a str, class: ItemClass, account: &'a str) -> Result<ItemQuery<'a>, KeychainError> {
    if service.is_empty() || account.is_empty() {
        return Err(KeychainError::BadArguments);
    }
    Ok(ItemQuery::new(class).service(service).account(account))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keychain::{AttrKey, KeychainResultExt, MemoryKeychain};

    fn keychain() -> Keychain<MemoryKeychain> {
        Keychain::new(MemoryKeychain::new())
    }

    #[test]
    fn test_set_then_get_password() {
        let kc = keychain();
        kc.set_password("hunter2", "mail", "alice").unwrap();

        let password = kc.password("mail", "alice").unwrap();
        assert_eq!(password.as_str(), "hunter2");
    }

    #[test]
    fn test_set_then_get_password_data() {
        let kc = keychain();
        let bytes = [0u8, 159, 146, 150, 255];
        kc.set_password_data(&bytes, "vpn", "device").unwrap();

        assert_eq!(kc.password_data("vpn", "device").unwrap().as_slice(), &bytes);
    }

    #[test]
    fn test_non_utf8_password_fails_to_decode() {
        let kc = keychain();
        kc.set_password_data(&[0xff, 0xfe], "vpn", "device").unwrap();

        assert_eq!(
            kc.password("vpn", "device").unwrap_err(),
            KeychainError::FailedToDecode
        );
    }

    #[test]
    fn test_set_twice_updates_in_place() {
        let kc = keychain();
        kc.set_password("first", "mail", "alice").unwrap();
        let created = kc.all_accounts().unwrap()[0].created_at;

        kc.set_password("second", "mail", "alice").unwrap();

        assert_eq!(kc.password("mail", "alice").unwrap().as_str(), "second");
        let accounts = kc.all_accounts().unwrap();
        assert_eq!(accounts.len(), 1, "Setting an existing item must not duplicate it");
        assert_eq!(accounts[0].created_at, created, "Update must keep the creation date");
        assert!(accounts[0].modified_at >= created);
    }

    #[test]
    fn test_missing_password_is_not_found() {
        let kc = keychain();
        let err = kc.password("mail", "nobody").unwrap_err();
        assert_eq!(err, KeychainError::NotFound);
        assert!(kc.password("mail", "nobody").optional().unwrap().is_none());
    }

    #[test]
    fn test_delete_password() {
        let kc = keychain();
        kc.set_password("hunter2", "mail", "alice").unwrap();
        kc.delete_password("mail", "alice").unwrap();

        assert!(kc.password("mail", "alice").unwrap_err().is_not_found());
        assert_eq!(
            kc.delete_password("mail", "alice").unwrap_err(),
            KeychainError::NotFound
        );
    }

    #[test]
    fn test_empty_arguments_never_reach_backend() {
        let kc = keychain();
        assert_eq!(kc.password("", "alice").unwrap_err(), KeychainError::BadArguments);
        assert_eq!(kc.password_data("mail", "").unwrap_err(), KeychainError::BadArguments);
        assert_eq!(kc.set_password("x", "", "alice").unwrap_err(), KeychainError::BadArguments);
        assert_eq!(kc.delete_password("mail", "").unwrap_err(), KeychainError::BadArguments);
        assert_eq!(kc.backend().calls(), 0);
    }

    #[test]
    fn test_empty_password_is_allowed() {
        let kc = keychain();
        kc.set_password("", "mail", "alice").unwrap();
        assert_eq!(kc.password("mail", "alice").unwrap().as_str(), "");
    }

    #[test]
    fn test_accounts_filter_by_service_and_class() {
        let kc = keychain();
        kc.set_password("1", "mail", "alice").unwrap();
        kc.set_password("2", "mail", "bob").unwrap();
        kc.set_password("3", "chat", "alice").unwrap();
        kc.set_password_of_class("4", "example.com", ItemClass::InternetPassword, "carol")
            .unwrap();

        assert_eq!(kc.all_accounts().unwrap().len(), 3);

        let mail = kc.accounts_for_service("mail").unwrap();
        let mut names: Vec<_> = mail.iter().filter_map(|r| r.account.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["alice", "bob"]);

        let internet = kc.all_accounts_of_class(ItemClass::InternetPassword).unwrap();
        assert_eq!(internet.len(), 1);
        assert_eq!(internet[0].get(AttrKey::Server).as_deref(), Some("example.com"));
        assert_eq!(internet[0].get(AttrKey::Account).as_deref(), Some("carol"));

        assert!(kc
            .accounts_for_service_of_class("mail", ItemClass::InternetPassword)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_classes_are_separate_namespaces() {
        let kc = keychain();
        kc.set_password("generic", "example.com", "alice").unwrap();
        kc.set_password_of_class("internet", "example.com", ItemClass::InternetPassword, "alice")
            .unwrap();

        assert_eq!(kc.password("example.com", "alice").unwrap().as_str(), "generic");
        assert_eq!(
            kc.password_of_class("example.com", ItemClass::InternetPassword, "alice")
                .unwrap()
                .as_str(),
            "internet"
        );

        kc.delete_password_of_class("example.com", ItemClass::InternetPassword, "alice")
            .unwrap();
        assert_eq!(kc.password("example.com", "alice").unwrap().as_str(), "generic");
    }

    #[test]
    fn test_accessibility_applies_to_every_saved_password() {
        let mut kc = keychain();
        assert_eq!(kc.accessibility(), None);
        kc.set_password("1", "mail", "alice").unwrap();

        kc.set_accessibility(Some(Accessibility::AfterFirstUnlockThisDeviceOnly));
        kc.set_password("2", "mail", "alice").unwrap();
        kc.set_password("3", "mail", "bob").unwrap();

        let accounts = kc.accounts_for_service("mail").unwrap();
        for record in &accounts {
            assert_eq!(
                record.accessibility,
                Some(Accessibility::AfterFirstUnlockThisDeviceOnly),
                "{:?} should carry the configured accessibility",
                record.account
            );
        }
    }

    #[test]
    fn test_unset_accessibility_keeps_existing_one() {
        let mut kc = keychain();
        kc.set_accessibility(Some(Accessibility::WhenUnlocked));
        kc.set_password("1", "mail", "alice").unwrap();

        kc.set_accessibility(None);
        kc.set_password("2", "mail", "alice").unwrap();

        let record = &kc.accounts_for_service("mail").unwrap()[0];
        assert_eq!(record.accessibility, Some(Accessibility::WhenUnlocked));
    }

    #[test]
    fn test_resaving_existing_item_writes_label_and_accessibility() {
        let mut kc = keychain();
        kc.set_item(&ItemSpec::new("mail", "alice"), b"1").unwrap();

        kc.set_accessibility(Some(Accessibility::WhenUnlockedThisDeviceOnly));
        kc.set_item(&ItemSpec::new("mail", "alice").label("Work"), b"2")
            .unwrap();

        let accounts = kc.accounts_for_service("mail").unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].label.as_deref(), Some("Work"));
        assert_eq!(
            accounts[0].accessibility,
            Some(Accessibility::WhenUnlockedThisDeviceOnly)
        );
        assert_eq!(kc.password("mail", "alice").unwrap().as_str(), "2");
    }

    #[test]
    fn test_set_item_records_label_and_description() {
        let kc = keychain();
        let spec = ItemSpec::new("mail", "alice")
            .label("Work mail")
            .description("IMAP password");
        kc.set_item(&spec, b"hunter2").unwrap();

        let record = &kc.accounts_for_service("mail").unwrap()[0];
        assert_eq!(record.label.as_deref(), Some("Work mail"));
        assert_eq!(record.description.as_deref(), Some("IMAP password"));
    }

    #[test]
    fn test_os_status_surfaces_unchanged() {
        let kc = keychain();
        kc.backend().fail_next(KeychainError::from_status(-25293));
        let err = kc.password("mail", "alice").unwrap_err();
        assert_eq!(err, KeychainError::AuthorizationFailed);
        assert_eq!(err.code(), -25293);

        kc.backend().fail_next(KeychainError::Os(-34018));
        assert_eq!(kc.all_accounts().unwrap_err().code(), -34018);
    }

    #[test]
    fn test_set_does_not_add_when_update_fails_otherwise() {
        let kc = keychain();
        kc.backend().fail_next(KeychainError::InteractionNotAllowed);

        let err = kc.set_password("hunter2", "mail", "alice").unwrap_err();
        assert_eq!(err, KeychainError::InteractionNotAllowed);
        assert!(kc.backend().is_empty());
        assert_eq!(kc.backend().calls(), 1);
    }

    #[test]
    fn test_accessor_over_borrowed_backend() {
        let backend = MemoryKeychain::new();
        Keychain::new(&backend).set_password("hunter2", "mail", "alice").unwrap();
        assert_eq!(backend.len(), 1);
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_system_keychain_unavailable_off_macos() {
        assert_eq!(Keychain::system().err(), Some(KeychainError::NotAvailable));
    }
}
