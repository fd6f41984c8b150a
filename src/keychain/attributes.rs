// Keychain Store — Item attributes
//
// Item classes, accessibility levels, and the attribute dictionary keys used
// by Keychain Services. The string codes are the values of the matching
// `kSec*` constants, so they can be put directly into query dictionaries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Item Class ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemClass {
    /// `kSecClassGenericPassword`
    #[default]
    GenericPassword,
    /// `kSecClassInternetPassword`
    InternetPassword,
}

impl ItemClass {
    pub fn code(self) -> &'static str {
        match self {
            Self::GenericPassword => "genp",
            Self::InternetPassword => "inet",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "genp" => Some(Self::GenericPassword),
            "inet" => Some(Self::InternetPassword),
            _ => None,
        }
    }

    /// Attribute under which the service name is stored for this class.
    /// Internet passwords have no `svce` attribute; they are keyed by server.
    pub fn service_key(self) -> AttrKey {
        match self {
            Self::GenericPassword => AttrKey::Where,
            Self::InternetPassword => AttrKey::Server,
        }
    }
}

impl fmt::Display for ItemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenericPassword => f.write_str("generic"),
            Self::InternetPassword => f.write_str("internet"),
        }
    }
}

impl FromStr for ItemClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "generic-password" | "genp" => Ok(Self::GenericPassword),
            "internet" | "internet-password" | "inet" => Ok(Self::InternetPassword),
            other => Err(format!("unknown item class '{}' (expected generic or internet)", other)),
        }
    }
}

// ─── Accessibility ───────────────────────────────────────────────────────────

/// When a keychain item may be read (`kSecAttrAccessible*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accessibility {
    WhenUnlocked,
    AfterFirstUnlock,
    Always,
    WhenPasscodeSetThisDeviceOnly,
    WhenUnlockedThisDeviceOnly,
    AfterFirstUnlockThisDeviceOnly,
    AlwaysThisDeviceOnly,
}

impl Accessibility {
    const ALL: [Accessibility; 7] = [
        Self::WhenUnlocked,
        Self::AfterFirstUnlock,
        Self::Always,
        Self::WhenPasscodeSetThisDeviceOnly,
        Self::WhenUnlockedThisDeviceOnly,
        Self::AfterFirstUnlockThisDeviceOnly,
        Self::AlwaysThisDeviceOnly,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::WhenUnlocked => "ak",
            Self::AfterFirstUnlock => "ck",
            Self::Always => "dk",
            Self::WhenPasscodeSetThisDeviceOnly => "akpu",
            Self::WhenUnlockedThisDeviceOnly => "aku",
            Self::AfterFirstUnlockThisDeviceOnly => "cku",
            Self::AlwaysThisDeviceOnly => "dku",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.code() == code)
    }

    fn name(self) -> &'static str {
        match self {
            Self::WhenUnlocked => "when-unlocked",
            Self::AfterFirstUnlock => "after-first-unlock",
            Self::Always => "always",
            Self::WhenPasscodeSetThisDeviceOnly => "when-passcode-set-this-device-only",
            Self::WhenUnlockedThisDeviceOnly => "when-unlocked-this-device-only",
            Self::AfterFirstUnlockThisDeviceOnly => "after-first-unlock-this-device-only",
            Self::AlwaysThisDeviceOnly => "always-this-device-only",
        }
    }
}

impl fmt::Display for Accessibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Accessibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.name() == wanted || a.code() == wanted)
            .ok_or_else(|| format!("unknown accessibility '{}'", s))
    }
}

// ─── Attribute Keys ──────────────────────────────────────────────────────────

/// Keys of the attribute dictionaries returned when listing accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKey {
    Account,
    CreatedAt,
    Class,
    Description,
    Label,
    LastModified,
    /// Service name of a generic password.
    Where,
    /// Server of an internet password.
    Server,
    Accessibility,
}

impl AttrKey {
    pub fn code(self) -> &'static str {
        match self {
            Self::Account => "acct",
            Self::CreatedAt => "cdat",
            Self::Class => "class",
            Self::Description => "desc",
            Self::Label => "labl",
            Self::LastModified => "mdat",
            Self::Where => "svce",
            Self::Server => "srvr",
            Self::Accessibility => "pdmn",
        }
    }
}

// ─── Account Record ──────────────────────────────────────────────────────────

/// The attributes of one keychain item, as returned by an account listing.
/// Never carries the password itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub class: ItemClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<Accessibility>,
}

impl AccountRecord {
    pub fn new(class: ItemClass) -> Self {
        Self {
            class,
            service: None,
            account: None,
            label: None,
            description: None,
            created_at: None,
            modified_at: None,
            accessibility: None,
        }
    }

    /// Look up one attribute by key, rendered as a string.
    /// Timestamps are rendered as RFC 3339.
    pub fn get(&self, key: AttrKey) -> Option<String> {
        match key {
            AttrKey::Account => self.account.clone(),
            AttrKey::CreatedAt => self.created_at.map(|t| t.to_rfc3339()),
            AttrKey::Class => Some(self.class.code().to_string()),
            AttrKey::Description => self.description.clone(),
            AttrKey::Label => self.label.clone(),
            AttrKey::LastModified => self.modified_at.map(|t| t.to_rfc3339()),
            AttrKey::Where | AttrKey::Server => {
                if self.class.service_key() == key {
                    self.service.clone()
                } else {
                    None
                }
            }
            AttrKey::Accessibility => self.accessibility.map(|a| a.code().to_string()),
        }
    }
}

impl fmt::Display for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} │ {} │ {}",
            self.service.as_deref().unwrap_or("-"),
            self.account.as_deref().unwrap_or("-"),
            self.class
        )?;
        if let Some(ref label) = self.label {
            write!(f, " │ {}", label)?;
        }
        Ok(())
    }
}
