//! Error types for tether-session.
//!
//! The taxonomy mirrors the corrective action a caller must take: a decode
//! error means re-export from the foreign client, a corruption error means
//! migrate or re-login, an I/O error with `NotFound` means nothing was ever
//! exported here in the first place.

use std::{fmt, io};

use tether_store::StoreError;

/// The error type for session resolution and format decoding.
#[derive(Debug)]
pub enum SessionError {
    /// Malformed or unsupported foreign-format input. Never retried, never
    /// subject to cross-format fallback.
    Decode {
        /// Which format's decoder rejected the input.
        format: &'static str,
        /// Which field or step failed.
        reason: String,
    },
    /// A canonical record failed its internal consistency check.
    Corrupt(CorruptError),
    /// Filesystem failure; `e.kind() == NotFound` distinguishes a missing
    /// source from an undecodable one.
    Io(io::Error),
    /// Failure in the backing session/peer store.
    Store(StoreError),
    /// A TDesktop profile directory with no usable accounts.
    NoAccounts,
    /// A TDesktop profile directory with several accounts while the
    /// selection policy refuses to guess.
    AmbiguousAccounts(usize),
}

/// Consistency failures of a canonical record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorruptError {
    /// Schema version differs from the store's current version.
    Version { found: i32 },
    /// `auth_key_id` is not the fingerprint derived from `auth_key`.
    AuthKeyId,
}

impl SessionError {
    pub(crate) fn decode(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Decode { format, reason: reason.into() }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode { format, reason } => write!(f, "{format} session: {reason}"),
            Self::Corrupt(e)                => write!(f, "corrupt session record: {e}"),
            Self::Io(e)                     => write!(f, "I/O error: {e}"),
            Self::Store(e)                  => write!(f, "{e}"),
            Self::NoAccounts                => write!(f, "no accounts found in tdata directory"),
            Self::AmbiguousAccounts(n)      => {
                write!(f, "{n} accounts found in tdata directory, refusing to pick one")
            }
        }
    }
}

impl fmt::Display for CorruptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version { found } => {
                write!(f, "schema version {found}, expected {}", crate::record::LATEST_VERSION)
            }
            Self::AuthKeyId => write!(f, "auth key id does not match the auth key"),
        }
    }
}

impl std::error::Error for CorruptError {}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e)    => Some(e),
            Self::Store(e) => Some(e),
            _              => None,
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self { Self::Io(e) }
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self { Self::Store(e) }
}
