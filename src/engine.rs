//! Encryption engine: scrypt + XSalsa20Poly1305 with embedded metadata
//!
//! The workflow only depends on the [`CipherEngine`] trait; the default
//! implementation here derives a key from the password with scrypt and
//! seals the payload with NaCl secretbox (XSalsa20Poly1305).
//!
//! The container format is:
//! - magic: 4 bytes (`SBX1`)
//! - salt: 8 bytes
//! - nonce: 24 bytes
//! - length: 8 bytes (big-endian signed int64)
//! - sealed box: variable length (includes 16-byte Poly1305 MAC)
//!
//! The sealed box opens to an envelope that carries the file-name metadata
//! alongside the payload, so the original name is confidential too:
//! - metadata length: 2 bytes (big-endian u16)
//! - metadata: UTF-8 bytes
//! - payload: remaining bytes

use crate::error::{ErrorCategory, ErrorKind, Result, StrongboxError};
use crate::secret::SecretBuffer;
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Nonce, XSalsa20Poly1305};
use rand::RngCore;
use rand::rngs::OsRng;
use scrypt::{Params, scrypt};
use std::mem::size_of;
use zeroize::Zeroize;

/// Magic prefix identifying a strongbox container.
pub const MAGIC: &[u8; 4] = b"SBX1";

/// Length of salt in bytes
const SALT_LEN: usize = 8;

/// Length of nonce in bytes
const NONCE_LEN: usize = 24;

/// Length of derived key in bytes
const KEY_LEN: usize = 32;

/// scrypt N parameter (CPU/memory cost)
const SCRYPT_N: u32 = 32768;

/// scrypt r parameter (block size)
const SCRYPT_R: u32 = 8;

/// scrypt p parameter (parallelization)
const SCRYPT_P: u32 = 1;

/// A successfully opened container.
#[derive(Debug)]
pub struct Opened {
    pub plaintext: Vec<u8>,
    /// The embedded metadata string, byte-for-byte as stored.
    pub metadata: String,
}

/// Authenticated encryption with an embedded metadata string.
///
/// Implementations must treat the container as opaque to callers: the only
/// cross-call contract is that `decrypt(encrypt(p, m, pw), pw)` returns
/// `p` and `m` unchanged, and that authentication failures surface as
/// [`ErrorKind::AuthenticationFailed`] so callers can tell a wrong
/// password apart from other failures.
pub trait CipherEngine: Send + Sync {
    fn encrypt(
        &self,
        plaintext: &[u8],
        metadata: &str,
        password: &SecretBuffer,
    ) -> Result<Vec<u8>>;

    fn decrypt(&self, container: &[u8], password: &SecretBuffer) -> Result<Opened>;
}

/// Derive a 32-byte key from a password and salt using scrypt
fn derive_key(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<[u8; KEY_LEN]> {
    let params = Params::new(
        (SCRYPT_N as f64).log2() as u8, // log_n
        SCRYPT_R,
        SCRYPT_P,
        KEY_LEN,
    )
    .map_err(|e| {
        StrongboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::ScryptFailure,
            "failed to create scrypt params",
            e,
        )
    })?;

    let mut key = [0u8; KEY_LEN];
    scrypt(password, salt, &params, &mut key).map_err(|e| {
        StrongboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::ScryptFailure,
            "scrypt key derivation failed",
            e,
        )
    })?;

    Ok(key)
}

/// Builds the inner envelope: metadata length + metadata + payload.
fn build_envelope(plaintext: &[u8], metadata: &str) -> Result<Vec<u8>> {
    let meta = metadata.as_bytes();
    if meta.len() > u16::MAX as usize {
        return Err(StrongboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::BinaryFormat,
            "metadata exceeds the maximum embeddable length",
        ));
    }
    let mut envelope = Vec::with_capacity(size_of::<u16>() + meta.len() + plaintext.len());
    envelope.extend_from_slice(&(meta.len() as u16).to_be_bytes());
    envelope.extend_from_slice(meta);
    envelope.extend_from_slice(plaintext);
    Ok(envelope)
}

/// Splits an opened envelope back into metadata and payload.
fn parse_envelope(envelope: &[u8]) -> Result<Opened> {
    if envelope.len() < size_of::<u16>() {
        return Err(StrongboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::BinaryFormat,
            "envelope too short to hold a metadata length",
        ));
    }
    let meta_len = u16::from_be_bytes([envelope[0], envelope[1]]) as usize;
    let rest = &envelope[size_of::<u16>()..];
    if rest.len() < meta_len {
        return Err(StrongboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::BinaryFormat,
            "envelope metadata length exceeds envelope size",
        ));
    }
    let metadata = std::str::from_utf8(&rest[..meta_len])
        .map_err(|e| {
            StrongboxError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::BinaryFormat,
                "envelope metadata is not valid UTF-8",
                e,
            )
        })?
        .to_string();
    Ok(Opened {
        plaintext: rest[meta_len..].to_vec(),
        metadata,
    })
}

/// The default engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecretboxEngine;

impl SecretboxEngine {
    pub fn new() -> Self {
        Self
    }

    /// Seals with caller-provided salt and nonce. Kept separate so tests
    /// can exercise the framing deterministically; production sealing
    /// always goes through [`CipherEngine::encrypt`] with random values.
    fn seal_with(
        plaintext: &[u8],
        metadata: &str,
        password: &[u8],
        salt: &[u8; SALT_LEN],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>> {
        let mut key = derive_key(password, salt)?;
        let cipher = XSalsa20Poly1305::new(&key.into());
        key.zeroize();

        let mut envelope = build_envelope(plaintext, metadata)?;
        let nonce_obj = Nonce::from(*nonce);
        let sealed_box = cipher.encrypt(&nonce_obj, envelope.as_slice()).map_err(|_| {
            StrongboxError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::SecretboxFailure,
                "secretbox seal failed",
            )
        });
        // The envelope holds a plaintext copy; wipe it whether or not
        // sealing succeeded.
        envelope.zeroize();
        let sealed_box = sealed_box?;

        let sealed_box_len = sealed_box.len() as i64;
        let mut output = Vec::with_capacity(
            MAGIC.len() + SALT_LEN + NONCE_LEN + size_of::<i64>() + sealed_box.len(),
        );
        output.extend_from_slice(MAGIC);
        output.extend_from_slice(salt);
        output.extend_from_slice(nonce);
        output.extend_from_slice(&sealed_box_len.to_be_bytes()); // big-endian i64
        output.extend_from_slice(&sealed_box);

        Ok(output)
    }
}

impl CipherEngine for SecretboxEngine {
    fn encrypt(
        &self,
        plaintext: &[u8],
        metadata: &str,
        password: &SecretBuffer,
    ) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        Self::seal_with(plaintext, metadata, password.expose(), &salt, &nonce)
    }

    fn decrypt(&self, container: &[u8], password: &SecretBuffer) -> Result<Opened> {
        let mut pos = 0;

        if container.len() < pos + MAGIC.len() {
            return Err(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::TruncatedInput,
                "input likely truncated while reading magic",
            ));
        }
        if &container[pos..pos + MAGIC.len()] != MAGIC {
            return Err(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::BinaryFormat,
                "input unrecognized as a strongbox container",
            ));
        }
        pos += MAGIC.len();

        if container.len() < pos + SALT_LEN {
            return Err(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::TruncatedInput,
                "input likely truncated while reading salt",
            ));
        }
        let salt: [u8; SALT_LEN] = container[pos..pos + SALT_LEN].try_into().map_err(|e| {
            StrongboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "failed to read salt",
                e,
            )
        })?;
        pos += SALT_LEN;

        if container.len() < pos + NONCE_LEN {
            return Err(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::TruncatedInput,
                "input likely truncated while reading nonce",
            ));
        }
        let nonce: [u8; NONCE_LEN] = container[pos..pos + NONCE_LEN].try_into().map_err(|e| {
            StrongboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "failed to read nonce",
                e,
            )
        })?;
        pos += NONCE_LEN;

        if container.len() < pos + size_of::<i64>() {
            return Err(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::TruncatedInput,
                "input likely truncated while reading sealed box",
            ));
        }
        let length_bytes: [u8; 8] = container[pos..pos + size_of::<i64>()]
            .try_into()
            .map_err(|e| {
                StrongboxError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::InternalInvariant,
                    "failed to read length",
                    e,
                )
            })?;
        let sealed_box_len = i64::from_be_bytes(length_bytes);
        pos += size_of::<i64>();

        if sealed_box_len < 0 {
            return Err(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::BinaryFormat,
                "negative sealed box length (when interpreted as a big-endian i64)",
            ));
        }

        // Valid input can fail this check if the platform's isize is small.
        if sealed_box_len > isize::MAX as i64 {
            return Err(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::BinaryFormat,
                "sealed box length exceeds this system's max isize",
            ));
        }

        let sealed_box_len = sealed_box_len as usize;

        if container.len() < pos + sealed_box_len {
            return Err(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::TruncatedInput,
                "truncated or corrupt input; claimed length greater than available input",
            ));
        }
        let sealed_box = &container[pos..pos + sealed_box_len];
        pos += sealed_box_len;

        if pos < container.len() {
            return Err(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::TrailingData,
                "invalid input: unexpected data after sealed box",
            ));
        }

        let mut key = derive_key(password.expose(), &salt)?;
        let cipher = XSalsa20Poly1305::new(&key.into());
        key.zeroize();
        let nonce_obj = Nonce::from(nonce);
        let mut envelope = cipher.decrypt(&nonce_obj, sealed_box).map_err(|_| {
            StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::AuthenticationFailed,
                "corrupt input, tampered-with data, or bad password",
            )
        })?;

        let opened = parse_envelope(&envelope);
        envelope.zeroize();
        opened
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SecretboxEngine {
        SecretboxEngine::new()
    }

    fn password(s: &str) -> SecretBuffer {
        SecretBuffer::new(s.to_string())
    }

    #[test]
    fn test_roundtrip_with_metadata() {
        let container = engine()
            .encrypt(b"hello", "notes.txt", &password("test"))
            .unwrap();
        let opened = engine().decrypt(&container, &password("test")).unwrap();
        assert_eq!(opened.plaintext, b"hello");
        assert_eq!(opened.metadata, "notes.txt");
    }

    #[test]
    fn test_roundtrip_empty_payload() {
        let container = engine()
            .encrypt(b"", "empty.bin", &password("test"))
            .unwrap();
        let opened = engine().decrypt(&container, &password("test")).unwrap();
        assert!(opened.plaintext.is_empty());
        assert_eq!(opened.metadata, "empty.bin");
    }

    #[test]
    fn test_roundtrip_unicode_metadata() {
        let container = engine()
            .encrypt(b"data", "r\u{e9}sum\u{e9}.\u{1f512}.pdf", &password("test"))
            .unwrap();
        let opened = engine().decrypt(&container, &password("test")).unwrap();
        assert_eq!(opened.metadata, "r\u{e9}sum\u{e9}.\u{1f512}.pdf");
    }

    #[test]
    fn test_roundtrip_all_byte_values() {
        let plaintext: Vec<u8> = (0..=255).collect();
        let container = engine()
            .encrypt(&plaintext, "bytes.bin", &password("test"))
            .unwrap();
        let opened = engine().decrypt(&container, &password("test")).unwrap();
        assert_eq!(opened.plaintext, plaintext);
    }

    #[test]
    fn test_wrong_password() {
        let container = engine()
            .encrypt(b"secret data", "f.txt", &password("correct"))
            .unwrap();
        let err = engine()
            .decrypt(&container, &password("wrong"))
            .expect_err("expected authentication failure");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
        assert!(!err.message().contains("secret data"));
        assert!(!err.message().contains("correct"));
    }

    #[test]
    fn test_deterministic_sealing() {
        let salt = [1u8; SALT_LEN];
        let nonce = [2u8; NONCE_LEN];
        let ct1 = SecretboxEngine::seal_with(b"hello", "a.txt", b"pw", &salt, &nonce).unwrap();
        let ct2 = SecretboxEngine::seal_with(b"hello", "a.txt", b"pw", &salt, &nonce).unwrap();
        assert_eq!(ct1, ct2);

        let nonce2 = [3u8; NONCE_LEN];
        let ct3 = SecretboxEngine::seal_with(b"hello", "a.txt", b"pw", &salt, &nonce2).unwrap();
        assert_ne!(ct1, ct3);
    }

    #[test]
    fn test_tampered_payload_fails_authentication() {
        let mut container = engine()
            .encrypt(b"hello", "a.txt", &password("pw"))
            .unwrap();
        let last = container.len() - 1;
        container[last] ^= 0x01;
        let err = engine()
            .decrypt(&container, &password("pw"))
            .expect_err("expected tamper detection");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
    }

    #[test]
    fn test_bad_magic() {
        let err = engine()
            .decrypt(b"NOPE definitely not a container", &password("pw"))
            .expect_err("expected magic rejection");
        assert_eq!(err.kind, Some(ErrorKind::BinaryFormat));
    }

    #[test]
    fn test_truncated_magic() {
        let err = engine()
            .decrypt(b"SB", &password("pw"))
            .expect_err("expected truncation error");
        assert_eq!(err.kind, Some(ErrorKind::TruncatedInput));
    }

    #[test]
    fn test_truncated_salt() {
        let mut container = MAGIC.to_vec();
        container.extend_from_slice(&[1, 2, 3]);
        let err = engine()
            .decrypt(&container, &password("pw"))
            .expect_err("expected truncation error");
        assert_eq!(err.kind, Some(ErrorKind::TruncatedInput));
    }

    #[test]
    fn test_truncated_nonce() {
        let mut container = MAGIC.to_vec();
        container.extend_from_slice(&[0u8; SALT_LEN + 3]);
        let err = engine()
            .decrypt(&container, &password("pw"))
            .expect_err("expected truncation error");
        assert_eq!(err.kind, Some(ErrorKind::TruncatedInput));
    }

    #[test]
    fn test_negative_length() {
        let mut container = MAGIC.to_vec();
        container.extend_from_slice(&[0u8; SALT_LEN + NONCE_LEN]);
        container.extend_from_slice(&(-1i64).to_be_bytes());
        let err = engine()
            .decrypt(&container, &password("pw"))
            .expect_err("expected negative length error");
        assert_eq!(err.kind, Some(ErrorKind::BinaryFormat));
    }

    #[test]
    fn test_length_exceeds_available() {
        let mut container = engine().encrypt(b"hello", "a.txt", &password("pw")).unwrap();
        let off = MAGIC.len() + SALT_LEN + NONCE_LEN;
        container[off..off + 8].copy_from_slice(&1_000_000i64.to_be_bytes());
        let err = engine()
            .decrypt(&container, &password("pw"))
            .expect_err("expected truncation error");
        assert_eq!(err.kind, Some(ErrorKind::TruncatedInput));
    }

    #[test]
    fn test_trailing_data() {
        let mut container = engine().encrypt(b"hello", "a.txt", &password("pw")).unwrap();
        container.push(0xFF);
        let err = engine()
            .decrypt(&container, &password("pw"))
            .expect_err("expected trailing data error");
        assert_eq!(err.kind, Some(ErrorKind::TrailingData));
    }

    #[test]
    fn test_oversized_metadata_rejected() {
        let metadata = "x".repeat(u16::MAX as usize + 1);
        let err = engine()
            .encrypt(b"data", &metadata, &password("pw"))
            .expect_err("expected metadata length rejection");
        assert_eq!(err.kind, Some(ErrorKind::BinaryFormat));
    }

    #[test]
    fn test_envelope_parse_rejects_bad_meta_length() {
        let err = parse_envelope(&[0xFF, 0xFF, b'x']).expect_err("expected length rejection");
        assert_eq!(err.kind, Some(ErrorKind::BinaryFormat));
    }

    #[test]
    fn test_envelope_parse_rejects_short_input() {
        let err = parse_envelope(&[0x00]).expect_err("expected short-input rejection");
        assert_eq!(err.kind, Some(ErrorKind::BinaryFormat));
    }

    #[test]
    fn test_envelope_parse_rejects_non_utf8_metadata() {
        let mut envelope = 2u16.to_be_bytes().to_vec();
        envelope.extend_from_slice(&[0xFF, 0xFE]);
        let err = parse_envelope(&envelope).expect_err("expected utf-8 rejection");
        assert_eq!(err.kind, Some(ErrorKind::BinaryFormat));
    }
}
