//! Wipe-on-use holder for sensitive bytes
//!
//! Passwords and plaintext travel through the transform workflow inside a
//! [`SecretBuffer`]. Once the secret has been consumed the buffer is wiped:
//! every byte is overwritten with a fixed sentinel and the buffer becomes
//! logically empty. The backing storage stays addressable so that callers
//! can verify the erasure took place.
//!
//! The wipe is best-effort only. Nothing here guarantees the secret never
//! existed elsewhere (swapped pages, copies made before the buffer was
//! constructed, compiler-introduced temporaries). The guarantee is limited
//! to this buffer's own storage.

use zeroize::Zeroize;

/// Byte written over the contents during a wipe.
pub const WIPE_SENTINEL: u8 = b'0';

/// Owned sensitive bytes with sentinel-overwrite erasure.
///
/// A wiped buffer reads as empty; wiping twice is a no-op. Whatever remains
/// at drop time is zeroized as a backstop.
pub struct SecretBuffer {
    bytes: Vec<u8>,
    wiped: bool,
}

impl SecretBuffer {
    /// Takes ownership of a secret string without copying its bytes.
    pub fn new(secret: String) -> Self {
        Self::from_bytes(secret.into_bytes())
    }

    /// Takes ownership of secret bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            wiped: false,
        }
    }

    /// Number of secret bytes held; zero once wiped.
    pub fn len(&self) -> usize {
        if self.wiped { 0 } else { self.bytes.len() }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The live secret. Empty once the buffer has been wiped.
    pub fn expose(&self) -> &[u8] {
        if self.wiped { &[] } else { &self.bytes }
    }

    /// Overwrites every byte with [`WIPE_SENTINEL`] and empties the buffer.
    pub fn wipe(&mut self) {
        self.wipe_with(WIPE_SENTINEL);
    }

    /// Overwrites every byte with `sentinel` and empties the buffer.
    ///
    /// Calling this on an already-wiped buffer is a no-op, not an error;
    /// the first sentinel wins.
    pub fn wipe_with(&mut self, sentinel: u8) {
        if self.wiped {
            return;
        }
        for b in self.bytes.iter_mut() {
            *b = sentinel;
        }
        self.wiped = true;
    }

    pub fn is_wiped(&self) -> bool {
        self.wiped
    }

    /// Backing storage, including after a wipe.
    ///
    /// Exposed so the erasure discipline is verifiable: after [`wipe`]
    /// this is all sentinel bytes. Not for consuming the secret; use
    /// [`expose`] for that.
    ///
    /// [`wipe`]: Self::wipe
    /// [`expose`]: Self::expose
    pub fn storage(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBuffer")
            .field("len", &self.bytes.len())
            .field("wiped", &self.wiped)
            .finish()
    }
}
