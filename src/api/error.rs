use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TypeTag;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the endpoint, the value codec and address parsing.
///
/// These are always fatal for the request that produced them. The client's
/// strict/lenient policy never changes how the endpoint reports them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid address `{path}`: {reason}")]
    InvalidAddress { path: String, reason: &'static str },

    #[error("insufficient permissions to access {namespace}/{key}")]
    AccessDenied { namespace: String, key: String },

    #[error("unknown namespace: {namespace}")]
    UnknownNamespace { namespace: String },

    #[error("conflicting keys in address ({address_key}) and payload ({row_key})")]
    ConflictingKey {
        address_key: String,
        row_key: String,
    },

    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },

    #[error("malformed string set encoding: {reason}")]
    MalformedEncoding { reason: &'static str },

    #[error("store refused to commit changes to namespace {namespace}")]
    CommitRejected { namespace: String },

    #[error("store backend failure: {reason}")]
    Backend { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

impl StoreError {
    pub(crate) fn invalid_value(reason: impl Into<String>) -> Self {
        StoreError::InvalidValue {
            reason: reason.into(),
        }
    }

    pub(crate) fn type_mismatch(expected: TypeTag, found: &'static str) -> Self {
        StoreError::InvalidValue {
            reason: format!("expected {expected}, got {found}"),
        }
    }

    /// Wire code used when this error crosses the process boundary.
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::InvalidAddress { .. } => ErrorCode::InvalidAddress,
            StoreError::AccessDenied { .. } => ErrorCode::AccessDenied,
            StoreError::UnknownNamespace { .. } => ErrorCode::UnknownNamespace,
            StoreError::ConflictingKey { .. } => ErrorCode::ConflictingKey,
            StoreError::InvalidValue { .. } => ErrorCode::InvalidValue,
            StoreError::MalformedEncoding { .. } => ErrorCode::MalformedEncoding,
            StoreError::CommitRejected { .. } => ErrorCode::CommitRejected,
            StoreError::Backend { .. } | StoreError::InvalidConfiguration { .. } => {
                ErrorCode::StoreFailure
            }
        }
    }
}

/// Stable one-byte error codes shared by the endpoint and its remote peers.
///
/// Codes 1..=5 are transport-level failures produced by the network server
/// before a request reaches the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum ErrorCode {
    InvalidHeader = 1,
    InvalidPayload = 2,
    StoreFailure = 3,
    Unauthorized = 4,
    Timeout = 5,
    InvalidAddress = 10,
    AccessDenied = 11,
    UnknownNamespace = 12,
    ConflictingKey = 13,
    InvalidValue = 14,
    MalformedEncoding = 15,
    CommitRejected = 16,
}

impl ErrorCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        let code = match code {
            1 => ErrorCode::InvalidHeader,
            2 => ErrorCode::InvalidPayload,
            3 => ErrorCode::StoreFailure,
            4 => ErrorCode::Unauthorized,
            5 => ErrorCode::Timeout,
            10 => ErrorCode::InvalidAddress,
            11 => ErrorCode::AccessDenied,
            12 => ErrorCode::UnknownNamespace,
            13 => ErrorCode::ConflictingKey,
            14 => ErrorCode::InvalidValue,
            15 => ErrorCode::MalformedEncoding,
            16 => ErrorCode::CommitRejected,
            _ => return None,
        };
        Some(code)
    }

    /// Security-class failures (the access-control hook refused the request).
    pub fn is_security(self) -> bool {
        matches!(self, ErrorCode::AccessDenied | ErrorCode::Unauthorized)
    }
}

impl From<ErrorCode> for u8 {
    fn from(code: ErrorCode) -> Self {
        code.as_u8()
    }
}

impl TryFrom<u8> for ErrorCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ErrorCode::from_u8(value).ok_or_else(|| format!("unknown error code {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_survive_byte_conversion() {
        for code in [
            ErrorCode::InvalidHeader,
            ErrorCode::Unauthorized,
            ErrorCode::AccessDenied,
            ErrorCode::CommitRejected,
        ] {
            assert_eq!(ErrorCode::from_u8(code.as_u8()), Some(code));
        }
        assert_eq!(ErrorCode::from_u8(0), None);
        assert_eq!(ErrorCode::from_u8(200), None);
    }

    #[test]
    fn access_denied_is_security_class() {
        let err = StoreError::AccessDenied {
            namespace: "prefs".into(),
            key: "secret".into(),
        };
        assert_eq!(err.code(), ErrorCode::AccessDenied);
        assert!(err.code().is_security());
        assert!(!ErrorCode::InvalidValue.is_security());
    }
}
