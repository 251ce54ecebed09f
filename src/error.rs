use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// Use of Internal is never a guarantee the error is not, for example,
    /// due to a user error - merely that the code cannot confidently
    /// determine that.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No source bytes were provided, or the password is empty.
    InvalidInput,
    /// The password does not meet the strength requirements for encryption.
    WeakPassword,
    /// A transform is already in flight; the submission was not admitted.
    Busy,
    /// The handle does not refer to the currently tracked job.
    UnknownJob,
    /// Container framing is malformed (magic, version, or layout).
    BinaryFormat,
    /// Input data ended before the expected component could be read.
    TruncatedInput,
    /// Additional bytes were present after the sealed payload.
    TrailingData,
    /// Authentication failed due to an incorrect password or tampering
    /// or corruption.
    AuthenticationFailed,
    /// Sealing the plaintext failed inside the engine.
    EncryptFailed,
    /// Low-level scrypt key derivation failed.
    ScryptFailure,
    /// NaCl secretbox (XSalsa20Poly1305) failed to seal or open data.
    SecretboxFailure,
    /// The armored representation is malformed (prefix or encoding).
    ArmorInvalid,
    /// Base64 decoding of the armored payload failed.
    ArmorDecode,
    /// Input claimed to be strongbox armor but used a future/unsupported version.
    ArmorFromFuture,
    /// Unexpected state reached within strongbox logic.
    InternalInvariant,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct StrongboxError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag for consumers that need to
    /// branch their behavior. Any code consuming errors MUST handle
    /// the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl StrongboxError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: None,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, StrongboxError>;

/// User-facing snapshot of a terminal job failure.
///
/// Unlike [`StrongboxError`], this is cloneable and deliberately lossy: the
/// message is a canonical phrase chosen per kind, never the raw text of an
/// underlying library error. Terminal jobs store this so that nothing
/// sensitive (password material, plaintext fragments, low-level engine
/// detail) can travel to the presentation layer by accident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub category: ErrorCategory,
    pub kind: Option<ErrorKind>,
    message: String,
}

impl FailureReason {
    /// The canonical human-readable message for this failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&StrongboxError> for FailureReason {
    fn from(err: &StrongboxError) -> Self {
        let message = match err.kind {
            Some(ErrorKind::InvalidInput) => "select a file and provide a non-empty password",
            Some(ErrorKind::WeakPassword) => {
                "password is too weak; it must have at least 8 characters \
                 and include upper and lower case letters, numbers and symbols"
            }
            Some(ErrorKind::Busy) => "another transform is already in progress",
            Some(ErrorKind::UnknownJob) => "no such transform is being tracked",
            Some(ErrorKind::AuthenticationFailed) => {
                "could not decrypt: wrong password, or the data is corrupted"
            }
            Some(ErrorKind::EncryptFailed)
            | Some(ErrorKind::ScryptFailure)
            | Some(ErrorKind::SecretboxFailure) => "the encryption engine failed",
            Some(ErrorKind::BinaryFormat)
            | Some(ErrorKind::TruncatedInput)
            | Some(ErrorKind::TrailingData) => "the file is not a valid strongbox container",
            Some(ErrorKind::ArmorInvalid)
            | Some(ErrorKind::ArmorDecode)
            | Some(ErrorKind::ArmorFromFuture) => "the armored input is not valid strongbox data",
            Some(ErrorKind::Io) => "the file could not be read",
            Some(ErrorKind::InternalInvariant) | None => "the operation failed unexpectedly",
        };
        Self {
            category: err.category,
            kind: err.kind,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_category_and_kind() {
        let inner = StrongboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::AuthenticationFailed,
            "open failed",
        );
        let wrapped = inner.with_context("failed to decrypt");
        assert_eq!(wrapped.category, ErrorCategory::User);
        assert_eq!(wrapped.kind, Some(ErrorKind::AuthenticationFailed));
        assert_eq!(wrapped.message(), "failed to decrypt");
        assert!(wrapped.source_error().is_some());
    }

    #[test]
    fn test_failure_reason_uses_canonical_message() {
        let err = StrongboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::AuthenticationFailed,
            "secretbox open error: mac mismatch for pw 'hunter2'",
        );
        let reason = FailureReason::from(&err);
        assert_eq!(reason.kind, Some(ErrorKind::AuthenticationFailed));
        assert!(!reason.message().contains("hunter2"));
        assert!(reason.message().contains("wrong password"));
    }

    #[test]
    fn test_failure_reason_without_kind() {
        let err = StrongboxError::new(ErrorCategory::Internal, "boom");
        let reason = FailureReason::from(&err);
        assert_eq!(reason.kind, None);
        assert_eq!(reason.message(), "the operation failed unexpectedly");
    }
}
