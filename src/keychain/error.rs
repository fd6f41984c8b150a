// Keychain Store — Keychain error types
//
// Every variant corresponds to one OSStatus (or one of the two local
// argument codes). Statuses the OS returns that are not listed here are
// carried unchanged in `Os`.

use thiserror::Error;

/// `errSecParam`
pub(crate) const ERR_SEC_PARAM: i32 = -50;
/// `errSecAllocate`
pub(crate) const ERR_SEC_ALLOCATE: i32 = -108;
/// `errSecNotAvailable`
pub(crate) const ERR_SEC_NOT_AVAILABLE: i32 = -25291;
/// `errSecAuthFailed`
pub(crate) const ERR_SEC_AUTH_FAILED: i32 = -25293;
/// `errSecDuplicateItem`
pub(crate) const ERR_SEC_DUPLICATE_ITEM: i32 = -25299;
/// `errSecItemNotFound`
pub(crate) const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;
/// `errSecInteractionNotAllowed`
pub(crate) const ERR_SEC_INTERACTION_NOT_ALLOWED: i32 = -25308;
/// `errSecDecode`
pub(crate) const ERR_SEC_DECODE: i32 = -26275;

/// Local code: a required argument was empty.
pub(crate) const ERR_BAD_ARGUMENTS: i32 = -1001;
/// Local code: the item exists but carries no password data.
pub(crate) const ERR_NO_PASSWORD: i32 = -1002;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeychainError {
    #[error("Some of the arguments were invalid (-1001)")]
    BadArguments,

    #[error("There was no password (-1002)")]
    NoPassword,

    #[error("One or more parameters passed to the keychain were not valid (-50)")]
    InvalidParameter,

    #[error("Failed to allocate memory (-108)")]
    FailedToAllocate,

    #[error("The keychain is not available (-25291)")]
    NotAvailable,

    #[error("Authorization/Authentication failed (-25293)")]
    AuthorizationFailed,

    #[error("The item already exists (-25299)")]
    DuplicatedItem,

    #[error("The item cannot be found (-25300)")]
    NotFound,

    #[error("Interaction with the Security Server is not allowed (-25308)")]
    InteractionNotAllowed,

    #[error("Unable to decode the provided data (-26275)")]
    FailedToDecode,

    #[error("Keychain call failed with OSStatus {0}")]
    Os(i32),
}

impl KeychainError {
    /// Map a non-zero OSStatus to its error. Unknown statuses are kept as `Os`.
    pub fn from_status(status: i32) -> Self {
        match status {
            ERR_BAD_ARGUMENTS => Self::BadArguments,
            ERR_NO_PASSWORD => Self::NoPassword,
            ERR_SEC_PARAM => Self::InvalidParameter,
            ERR_SEC_ALLOCATE => Self::FailedToAllocate,
            ERR_SEC_NOT_AVAILABLE => Self::NotAvailable,
            ERR_SEC_AUTH_FAILED => Self::AuthorizationFailed,
            ERR_SEC_DUPLICATE_ITEM => Self::DuplicatedItem,
            ERR_SEC_ITEM_NOT_FOUND => Self::NotFound,
            ERR_SEC_INTERACTION_NOT_ALLOWED => Self::InteractionNotAllowed,
            ERR_SEC_DECODE => Self::FailedToDecode,
            other => Self::Os(other),
        }
    }

    /// The status code this error was built from.
    pub fn code(&self) -> i32 {
        match self {
            Self::BadArguments => ERR_BAD_ARGUMENTS,
            Self::NoPassword => ERR_NO_PASSWORD,
            Self::InvalidParameter => ERR_SEC_PARAM,
            Self::FailedToAllocate => ERR_SEC_ALLOCATE,
            Self::NotAvailable => ERR_SEC_NOT_AVAILABLE,
            Self::AuthorizationFailed => ERR_SEC_AUTH_FAILED,
            Self::DuplicatedItem => ERR_SEC_DUPLICATE_ITEM,
            Self::NotFound => ERR_SEC_ITEM_NOT_FOUND,
            Self::InteractionNotAllowed => ERR_SEC_INTERACTION_NOT_ALLOWED,
            Self::FailedToDecode => ERR_SEC_DECODE,
            Self::Os(status) => *status,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Turns "item not found" into an absent value, leaving other failures intact.
pub trait KeychainResultExt<T> {
    fn optional(self) -> Result<Option<T>, KeychainError>;
}

impl<T> KeychainResultExt<T> for Result<T, KeychainError> {
    fn optional(self) -> Result<Option<T>, KeychainError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(KeychainError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
