// Keychain Store — Platform keychain backend (macOS)
//
// Lookups and deletes go through `security_framework::item::ItemSearchOptions`.
// Adds, updates, and lookups scoped by server (which the search builder cannot
// express) build a Core Foundation dictionary from the `kSec*` constants and
// make one SecItem* call. Non-zero statuses are returned unchanged through
// `KeychainError::from_status`.

use std::ptr;

use chrono::{DateTime, Utc};
use core_foundation::base::{CFType, CFTypeRef, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::data::CFData;
use core_foundation::date::CFDate;
use core_foundation::dictionary::CFDictionary;
use core_foundation::string::CFString;
use security_framework::item::{self as sec_item, ItemSearchOptions, Limit, SearchResult};
use security_framework_sys::item::{
    kSecAttrAccount, kSecAttrLabel, kSecAttrServer, kSecAttrService, kSecClass,
    kSecClassGenericPassword, kSecClassInternetPassword, kSecMatchLimit, kSecMatchLimitOne,
    kSecReturnData, kSecValueData,
};
use security_framework_sys::keychain_item::{
    SecItemAdd, SecItemCopyMatching, SecItemDelete, SecItemUpdate,
};
use zeroize::Zeroizing;

use super::attributes::{AccountRecord, Accessibility, AttrKey, ItemClass};
use super::backend::{ItemChanges, ItemQuery, KeychainBackend, NewItem};
use super::KeychainError;

/// Seconds between the Unix epoch and the Core Foundation epoch (2001-01-01).
const CF_ABSOLUTE_TIME_OFFSET: f64 = 978_307_200.0;

/// The user's default keychain, reached through Security.framework.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemKeychain;

impl SystemKeychain {
    pub fn new() -> Self {
        Self
    }
}

// ─── Status Mapping ──────────────────────────────────────────────────────────

fn fail(call: &str, status: i32) -> KeychainError {
    let error = KeychainError::from_status(status);
    if !error.is_not_found() {
        let message = security_framework::base::Error::from_code(status)
            .message()
            .unwrap_or_default();
        tracing::warn!(call, status, %message, "Keychain call failed");
    }
    error
}

fn check(call: &str, status: i32) -> Result<(), KeychainError> {
    if status == 0 {
        return Ok(());
    }
    Err(fail(call, status))
}

// ─── Search Builder Path ─────────────────────────────────────────────────────

fn sec_class(class: ItemClass) -> sec_item::ItemClass {
    match class {
        ItemClass::GenericPassword => sec_item::ItemClass::generic_password(),
        ItemClass::InternetPassword => sec_item::ItemClass::internet_password(),
    }
}

/// A query naming a server can only be matched through a raw dictionary.
fn scoped_by_server(query: &ItemQuery<'_>) -> bool {
    query.class == ItemClass::InternetPassword && query.service.is_some()
}

/// Search options for `query`, minus any server (see `scoped_by_server`).
fn search_options(query: &ItemQuery<'_>) -> ItemSearchOptions {
    let mut options = ItemSearchOptions::new();
    options.class(sec_class(query.class));
    if query.class == ItemClass::GenericPassword {
        if let Some(service) = query.service {
            options.service(service);
        }
    }
    if let Some(account) = query.account {
        options.account(account);
    }
    options
}

// ─── Raw Dictionary Path ─────────────────────────────────────────────────────

/// Keys and class values exported by Security.framework.
struct SecKeys {
    class: CFString,
    generic_password: CFString,
    internet_password: CFString,
    service: CFString,
    server: CFString,
    account: CFString,
    label: CFString,
    value_data: CFString,
    return_data: CFString,
    match_limit: CFString,
    match_limit_one: CFString,
}

impl SecKeys {
    fn load() -> Self {
        unsafe {
            Self {
                class: CFString::wrap_under_get_rule(kSecClass),
                generic_password: CFString::wrap_under_get_rule(kSecClassGenericPassword),
                internet_password: CFString::wrap_under_get_rule(kSecClassInternetPassword),
                service: CFString::wrap_under_get_rule(kSecAttrService),
                server: CFString::wrap_under_get_rule(kSecAttrServer),
                account: CFString::wrap_under_get_rule(kSecAttrAccount),
                label: CFString::wrap_under_get_rule(kSecAttrLabel),
                value_data: CFString::wrap_under_get_rule(kSecValueData),
                return_data: CFString::wrap_under_get_rule(kSecReturnData),
                match_limit: CFString::wrap_under_get_rule(kSecMatchLimit),
                match_limit_one: CFString::wrap_under_get_rule(kSecMatchLimitOne),
            }
        }
    }
}

/// Accumulates the key/value pairs of one SecItem dictionary.
struct ItemDictionary {
    keys: SecKeys,
    pairs: Vec<(CFString, CFType)>,
}

impl ItemDictionary {
    fn empty() -> Self {
        Self {
            keys: SecKeys::load(),
            pairs: Vec::new(),
        }
    }

    fn from_query(query: &ItemQuery<'_>) -> Self {
        let mut dict = Self::empty();
        let class = match query.class {
            ItemClass::GenericPassword => dict.keys.generic_password.clone(),
            ItemClass::InternetPassword => dict.keys.internet_password.clone(),
        };
        dict.push(dict.keys.class.clone(), class.as_CFType());

        if let Some(service) = query.service {
            let key = match query.class {
                ItemClass::GenericPassword => dict.keys.service.clone(),
                ItemClass::InternetPassword => dict.keys.server.clone(),
            };
            dict.push(key, CFString::new(service).as_CFType());
        }
        if let Some(account) = query.account {
            dict.push(dict.keys.account.clone(), CFString::new(account).as_CFType());
        }
        dict
    }

    fn push(&mut self, key: CFString, value: CFType) {
        self.pairs.push((key, value));
    }

    fn data(&mut self, bytes: &[u8]) {
        let key = self.keys.value_data.clone();
        self.push(key, CFData::from_buffer(bytes).as_CFType());
    }

    /// Label, description and accessibility, when given. Description and
    /// accessibility are keyed by the same codes `AttrKey` reads back.
    fn descriptive(
        &mut self,
        label: Option<&str>,
        description: Option<&str>,
        accessibility: Option<Accessibility>,
    ) {
        if let Some(label) = label {
            let key = self.keys.label.clone();
            self.push(key, CFString::new(label).as_CFType());
        }
        if let Some(description) = description {
            self.push(
                CFString::new(AttrKey::Description.code()),
                CFString::new(description).as_CFType(),
            );
        }
        if let Some(accessibility) = accessibility {
            self.push(
                CFString::new(AttrKey::Accessibility.code()),
                CFString::new(accessibility.code()).as_CFType(),
            );
        }
    }

    fn build(&self) -> CFDictionary<CFString, CFType> {
        CFDictionary::from_CFType_pairs(&self.pairs)
    }
}

// ─── Record Conversion ───────────────────────────────────────────────────────

fn cf_absolute_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    let unix = seconds + CF_ABSOLUTE_TIME_OFFSET;
    let secs = unix.floor();
    let nanos = ((unix - secs) * 1e9) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

/// Converts one returned attribute dictionary into a record.
fn record_from_dict(class: ItemClass, dict: &CFDictionary<CFString, CFType>) -> AccountRecord {
    let string = |key: AttrKey| {
        dict.find(&CFString::new(key.code()))
            .and_then(|value| value.downcast::<CFString>())
            .map(|s| s.to_string())
    };
    let date = |key: AttrKey| {
        dict.find(&CFString::new(key.code()))
            .and_then(|value| value.downcast::<CFDate>())
            .and_then(|d| cf_absolute_to_utc(d.abs_time()))
    };

    let class = string(AttrKey::Class)
        .and_then(|code| ItemClass::from_code(&code))
        .unwrap_or(class);

    AccountRecord {
        class,
        service: string(class.service_key()),
        account: string(AttrKey::Account),
        label: string(AttrKey::Label),
        description: string(AttrKey::Description),
        created_at: date(AttrKey::CreatedAt),
        modified_at: date(AttrKey::LastModified),
        accessibility: string(AttrKey::Accessibility)
            .and_then(|code| Accessibility::from_code(&code)),
    }
}

fn record_from_result(class: ItemClass, result: SearchResult) -> Option<AccountRecord> {
    match result {
        SearchResult::Dict(dict) => {
            // The search builder hands back the untyped dictionary; every key
            // of an attribute reply is a CFString.
            let typed = unsafe {
                CFDictionary::<CFString, CFType>::wrap_under_get_rule(dict.as_concrete_TypeRef())
            };
            Some(record_from_dict(class, &typed))
        }
        _ => None,
    }
}

// ─── Backend ─────────────────────────────────────────────────────────────────

impl KeychainBackend for SystemKeychain {
    fn find_attributes(&self, query: &ItemQuery<'_>) -> Result<Vec<AccountRecord>, KeychainError> {
        tracing::debug!(class = %query.class, service = ?query.service, "Keychain search (attributes)");
        let mut options = search_options(query);
        options.load_attributes(true).limit(Limit::All);

        let results = options
            .search()
            .map_err(|e| fail("SecItemCopyMatching", e.code()))?;
        let records: Vec<AccountRecord> = results
            .into_iter()
            .filter_map(|result| record_from_result(query.class, result))
            .filter(|record| {
                !scoped_by_server(query) || record.service.as_deref() == query.service
            })
            .collect();

        if records.is_empty() {
            return Err(KeychainError::NotFound);
        }
        Ok(records)
    }

    fn find_data(&self, query: &ItemQuery<'_>) -> Result<Zeroizing<Vec<u8>>, KeychainError> {
        tracing::debug!(class = %query.class, service = ?query.service, account = ?query.account, "Keychain search (data)");
        if scoped_by_server(query) {
            return find_data_raw(query);
        }

        let mut options = search_options(query);
        options.load_data(true).limit(Limit::Max(1));

        let results = options
            .search()
            .map_err(|e| fail("SecItemCopyMatching", e.code()))?;
        match results.into_iter().next() {
            Some(SearchResult::Data(data)) => Ok(Zeroizing::new(data)),
            Some(_) => Err(KeychainError::NoPassword),
            None => Err(KeychainError::NotFound),
        }
    }

    fn add(&self, item: &NewItem<'_>) -> Result<(), KeychainError> {
        let mut dict = ItemDictionary::from_query(&item.query);
        dict.data(item.data);
        dict.descriptive(item.label, item.description, item.accessibility);

        let attributes = dict.build();
        let status = unsafe { SecItemAdd(attributes.as_concrete_TypeRef(), ptr::null_mut()) };
        check("SecItemAdd", status)
    }

    fn update(&self, query: &ItemQuery<'_>, changes: &ItemChanges<'_>) -> Result<(), KeychainError> {
        let lookup = ItemDictionary::from_query(query).build();
        let mut update = ItemDictionary::empty();
        update.data(changes.data);
        update.descriptive(changes.label, changes.description, changes.accessibility);

        let status = unsafe {
            SecItemUpdate(
                lookup.as_concrete_TypeRef(),
                update.build().as_concrete_TypeRef(),
            )
        };
        check("SecItemUpdate", status)
    }

    fn delete(&self, query: &ItemQuery<'_>) -> Result<(), KeychainError> {
        if scoped_by_server(query) {
            let lookup = ItemDictionary::from_query(query).build();
            let status = unsafe { SecItemDelete(lookup.as_concrete_TypeRef()) };
            return check("SecItemDelete", status);
        }

        search_options(query)
            .delete()
            .map_err(|e| fail("SecItemDelete", e.code()))
    }
}

fn find_data_raw(query: &ItemQuery<'_>) -> Result<Zeroizing<Vec<u8>>, KeychainError> {
    let mut dict = ItemDictionary::from_query(query);
    let (return_data, match_limit, match_limit_one) = (
        dict.keys.return_data.clone(),
        dict.keys.match_limit.clone(),
        dict.keys.match_limit_one.clone(),
    );
    dict.push(return_data, CFBoolean::true_value().as_CFType());
    dict.push(match_limit, match_limit_one.as_CFType());
    let lookup = dict.build();

    let mut result: CFTypeRef = ptr::null();
    let status = unsafe { SecItemCopyMatching(lookup.as_concrete_TypeRef(), &mut result) };
    check("SecItemCopyMatching", status)?;
    if result.is_null() {
        return Err(KeychainError::NotFound);
    }

    let value = unsafe { CFType::wrap_under_create_rule(result) };
    let data = value.downcast::<CFData>().ok_or(KeychainError::NoPassword)?;
    Ok(Zeroizing::new(data.bytes().to_vec()))
}
