//! Versioned armoring for containers
//!
//! Provides base64url encoding with a version prefix so a container can
//! travel through text channels. The armored form is:
//! - Free of whitespace (including newlines)
//! - Safe to embed in URLs
//! - Safe to pass unescaped in a POSIX shell

use crate::error::{ErrorCategory, ErrorKind, Result, StrongboxError};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

/// Magic prefix for all strongbox armor versions
const MAGIC_PREFIX: &str = "strongbox";

/// Version 1 magic marker
const V1_MAGIC: &str = "strongbox1:";

/// Wrap container bytes in armor, returning the armored string
///
/// Format: strongbox1:{base64url-no-padding}
pub fn wrap(body: &[u8]) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(body);
    format!("{}{}", V1_MAGIC, encoded)
}

/// Unwrap an armored string, returning the original container bytes
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    if armored.len() < V1_MAGIC.len() {
        return Err(StrongboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmorInvalid,
            "input size smaller than magic marker; likely truncated",
        ));
    }

    if let Some(encoded) = armored.strip_prefix(V1_MAGIC) {
        let body = URL_SAFE_NO_PAD.decode(encoded).map_err(|e| {
            StrongboxError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::ArmorDecode,
                format!("base64 decoding failed: {}", e),
                e,
            )
        })?;
        Ok(body)
    } else if armored.starts_with(MAGIC_PREFIX) {
        Err(StrongboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmorFromFuture,
            "input claims to be strongbox armor, but not a version we support",
        ))
    } else {
        Err(StrongboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmorInvalid,
            "input unrecognized as strongbox armor",
        ))
    }
}

/// True when the bytes look like armored text rather than a raw container.
///
/// Lets callers accept either form without trial decoding.
pub fn looks_armored(bytes: &[u8]) -> bool {
    bytes.starts_with(MAGIC_PREFIX.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bytes() {
        let bytes = b"";
        let armored = wrap(bytes);
        let unwrapped = unwrap(&armored).unwrap();
        assert_eq!(bytes, &unwrapped[..]);
    }

    #[test]
    fn test_roundtrip() {
        let bytes = b"container bytes";
        let armored = wrap(bytes);
        let unwrapped = unwrap(&armored).unwrap();
        assert_eq!(bytes, &unwrapped[..]);
    }

    #[test]
    fn test_all_byte_values() {
        let bytes: Vec<u8> = (0..=255).collect();
        let armored = wrap(&bytes);
        let unwrapped = unwrap(&armored).unwrap();
        assert_eq!(bytes, unwrapped);
    }

    #[test]
    fn test_truncated_input() {
        let err = unwrap("").expect_err("expected truncated input error");
        assert_eq!(err.kind, Some(ErrorKind::ArmorInvalid));
    }

    #[test]
    fn test_wrong_version() {
        let err = unwrap("strongbox999999:...").expect_err("expected unsupported version error");
        assert_eq!(err.kind, Some(ErrorKind::ArmorFromFuture));
    }

    #[test]
    fn test_not_strongbox() {
        let err =
            unwrap("something not looking like strongbox data").expect_err("expected rejection");
        assert_eq!(err.kind, Some(ErrorKind::ArmorInvalid));
    }

    #[test]
    fn test_bad_base64() {
        let err = unwrap("strongbox1:bad$$").expect_err("expected base64 decode error");
        assert_eq!(err.kind, Some(ErrorKind::ArmorDecode));
    }

    #[test]
    fn test_no_whitespace_and_url_safe() {
        let armored = wrap(&[0xFFu8; 100]);
        assert!(!armored.contains(' '));
        assert!(!armored.contains('\n'));
        assert!(!armored.contains('+'));
        assert!(!armored.contains('/'));
        assert!(!armored.contains('='));
    }

    #[test]
    fn test_looks_armored() {
        assert!(looks_armored(wrap(b"x").as_bytes()));
        assert!(!looks_armored(b"SBX1rawbytes"));
    }
}
