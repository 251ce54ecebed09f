//! Filename metadata carried through the container
//!
//! The original file name rides inside the encrypted container so that
//! decryption can restore it. This module owns both directions of that
//! mapping plus the extension-to-type lookup used when exporting a
//! decrypted file.

use std::path::Path;

/// Extension given to encrypted containers.
pub const CONTAINER_EXTENSION: &str = "sbx";

/// Export name used when the source name is empty.
const FALLBACK_STEM: &str = "file";

/// The metadata string embedded on encryption: the file name, verbatim.
///
/// Identity on purpose. The container framing is what serializes the
/// string; this function is the codec's commitment that nothing is
/// added, stripped or re-encoded on the way in.
pub fn encode(file_name: &str) -> &str {
    file_name
}

/// A stored file name split back into export hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName {
    /// Name to suggest for the restored file; the stored name verbatim.
    pub suggested_name: String,
    /// Extension component, without the dot. Empty when the stored name
    /// has none (no dot, hidden files like `.bashrc`, trailing dot).
    pub extension: String,
}

/// Splits a stored metadata string into export hints.
pub fn decode(metadata: &str) -> DecodedName {
    let extension = Path::new(metadata)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();
    DecodedName {
        suggested_name: metadata.to_string(),
        extension,
    }
}

/// Name to suggest for an encrypted container: the original stem with
/// the container extension.
pub fn container_name(original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_STEM);
    format!("{}.{}", stem, CONTAINER_EXTENSION)
}

/// Platform-neutral type hint for an export artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    mime: &'static str,
}

impl TypeDescriptor {
    /// The descriptor for data with no better classification.
    pub const OCTET_STREAM: TypeDescriptor = TypeDescriptor {
        mime: "application/octet-stream",
    };

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    /// True when this is the opaque-binary fallback.
    pub fn is_generic(&self) -> bool {
        *self == Self::OCTET_STREAM
    }
}

/// Maps an extension to a type descriptor.
///
/// Total: an unknown or empty extension is a normal case and resolves to
/// [`TypeDescriptor::OCTET_STREAM`], never an error.
pub fn resolve_type_descriptor(extension: &str) -> TypeDescriptor {
    let mime = match extension.to_ascii_lowercase().as_str() {
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => return TypeDescriptor::OCTET_STREAM,
    };
    TypeDescriptor { mime }
}
