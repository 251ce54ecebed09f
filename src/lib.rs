//! Strongbox - password-based file encryption preserving the original name
//!
//! A file becomes an encrypted container and back again, driven by a
//! password. The original file name rides inside the container so that
//! decryption can suggest the right name and type for the restored file.
//!
//! The pieces, leaves first: [`secret::SecretBuffer`] holds sensitive
//! bytes under a zero-on-use discipline; [`policy::Strength`] classifies
//! passwords; [`metadata`] maps file names to and from the embedded
//! metadata; [`engine::CipherEngine`] is the seam to the cryptography,
//! with [`engine::SecretboxEngine`] (scrypt + XSalsa20Poly1305) as the
//! default; [`job::TransformJob`] is the per-operation state machine; and
//! [`controller::WorkflowController`] coordinates one job at a time on a
//! background worker.

#![forbid(unsafe_code)]

pub mod armor;
pub mod controller;
pub mod engine;
pub mod error;
pub mod job;
pub mod metadata;
pub mod policy;
pub mod secret;

pub use controller::{JobHandle, JobStatus, WorkflowController};
pub use engine::{CipherEngine, SecretboxEngine};
pub use error::{ErrorCategory, ErrorKind, FailureReason, Result, StrongboxError};
pub use job::{ExportArtifact, JobKind, JobState, TransformJob};
pub use policy::Strength;
pub use secret::SecretBuffer;
