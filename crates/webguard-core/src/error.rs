//! Shared error type across webguard crates.

use thiserror::Error;

/// Stable error codes, used in logs and by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A targeted prototype member does not exist anywhere in the chain.
    Lookup,
    /// The member was already patched once.
    AlreadyInstalled,
    /// No URL could be found in the captured stack trace.
    Attribution,
    /// Durable or volatile store read/write failed.
    Storage,
    /// Malformed URL, JSON or payload.
    Parse,
    /// Invalid configuration.
    BadConfig,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// String representation used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Lookup => "LOOKUP_ERROR",
            ErrorKind::AlreadyInstalled => "ALREADY_INSTALLED",
            ErrorKind::Attribution => "ATTRIBUTION_FAILURE",
            ErrorKind::Storage => "STORAGE_FAILURE",
            ErrorKind::Parse => "PARSE_FAILURE",
            ErrorKind::BadConfig => "BAD_CONFIG",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, GuardError>;

/// Unified error type used by core and engine.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("no member {member} found for {target}")]
    Lookup { target: String, member: String },
    #[error("{target}.{member} is already intercepted")]
    AlreadyInstalled { target: String, member: String },
    #[error("no url found in stack trace")]
    Attribution,
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("parse failure: {0}")]
    Parse(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl GuardError {
    /// Map the error to its stable code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GuardError::Lookup { .. } => ErrorKind::Lookup,
            GuardError::AlreadyInstalled { .. } => ErrorKind::AlreadyInstalled,
            GuardError::Attribution => ErrorKind::Attribution,
            GuardError::Storage(_) => ErrorKind::Storage,
            GuardError::Parse(_) => ErrorKind::Parse,
            GuardError::BadConfig(_) => ErrorKind::BadConfig,
            GuardError::UnsupportedVersion => ErrorKind::UnsupportedVersion,
            GuardError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn lookup(target: &str, member: &str) -> Self {
        GuardError::Lookup {
            target: target.to_string(),
            member: member.to_string(),
        }
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(e: serde_json::Error) -> Self {
        GuardError::Parse(e.to_string())
    }
}
