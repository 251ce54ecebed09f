//! One encrypt-or-decrypt operation as a state machine
//!
//! A [`TransformJob`] owns everything a single transform needs: the source
//! bytes, the original file name and the password. It moves
//! `Created -> Running -> {Succeeded, Failed}` and never leaves a terminal
//! state. The password is wiped before the job becomes observably
//! terminal, on every path, and the wipe is idempotent so the guarantee
//! holds structurally rather than by call-site discipline.

use crate::engine::CipherEngine;
use crate::error::{ErrorCategory, ErrorKind, FailureReason, Result, StrongboxError};
use crate::metadata::{self, TypeDescriptor};
use crate::secret::SecretBuffer;
use zeroize::Zeroize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Encrypt,
    Decrypt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// The finished bytes plus naming and type hints, ready for export.
///
/// Constructed only by a job reaching `Succeeded`; immutable after that.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    payload: Vec<u8>,
    suggested_name: String,
    descriptor: TypeDescriptor,
}

impl ExportArtifact {
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn suggested_name(&self) -> &str {
        &self.suggested_name
    }

    pub fn descriptor(&self) -> TypeDescriptor {
        self.descriptor
    }

    /// Consumes the artifact, yielding the payload bytes.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

pub struct TransformJob {
    id: u64,
    kind: JobKind,
    source_name: String,
    source: Vec<u8>,
    password: SecretBuffer,
    state: JobState,
    result: Option<ExportArtifact>,
    error: Option<FailureReason>,
}

impl TransformJob {
    /// A job in `Created`, owning its inputs. Ownership of the password
    /// and source bytes transfers here and is released only when the job
    /// is dropped.
    pub fn new(
        id: u64,
        kind: JobKind,
        source_name: impl Into<String>,
        source: Vec<u8>,
        password: SecretBuffer,
    ) -> Self {
        Self {
            id,
            kind,
            source_name: source_name.into(),
            source,
            password,
            state: JobState::Created,
            result: None,
            error: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// The artifact, present exactly when the job is `Succeeded`.
    pub fn result(&self) -> Option<&ExportArtifact> {
        self.result.as_ref()
    }

    /// The failure, present exactly when the job is `Failed`.
    pub fn error(&self) -> Option<&FailureReason> {
        self.error.as_ref()
    }

    /// The password buffer, exposed so the erasure discipline is
    /// verifiable after termination.
    pub fn password(&self) -> &SecretBuffer {
        &self.password
    }

    /// Runs the job to a terminal state on the calling thread.
    ///
    /// Calling this on an already-terminal job is a no-op.
    pub fn run(&mut self, engine: &dyn CipherEngine) {
        if self.state.is_terminal() {
            return;
        }

        // Fail fast without entering Running.
        if self.source.is_empty() || self.password.is_empty() {
            self.fail(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidInput,
                "source bytes and password must both be non-empty",
            ));
            return;
        }

        self.state = JobState::Running;
        let outcome = match self.kind {
            JobKind::Encrypt => self.run_encrypt(engine),
            JobKind::Decrypt => self.run_decrypt(engine),
        };
        match outcome {
            Ok(artifact) => self.succeed(artifact),
            Err(err) => self.fail(err),
        }
    }

    fn run_encrypt(&mut self, engine: &dyn CipherEngine) -> Result<ExportArtifact> {
        let sealed = {
            let meta = metadata::encode(&self.source_name);
            engine.encrypt(&self.source, meta, &self.password)
        };
        // The source holds plaintext; zero it whether or not sealing
        // succeeded.
        self.source.zeroize();
        let sealed = sealed?;
        Ok(ExportArtifact {
            payload: sealed,
            suggested_name: metadata::container_name(&self.source_name),
            descriptor: TypeDescriptor::OCTET_STREAM,
        })
    }

    fn run_decrypt(&mut self, engine: &dyn CipherEngine) -> Result<ExportArtifact> {
        let opened = engine.decrypt(&self.source, &self.password)?;
        let decoded = metadata::decode(&opened.metadata);
        let descriptor = metadata::resolve_type_descriptor(&decoded.extension);
        Ok(ExportArtifact {
            payload: opened.plaintext,
            suggested_name: decoded.suggested_name,
            descriptor,
        })
    }

    /// Terminal success. The password wipe precedes the state change so
    /// no observer can see a succeeded job with a live password.
    fn succeed(&mut self, artifact: ExportArtifact) {
        self.password.wipe();
        self.result = Some(artifact);
        self.state = JobState::Succeeded;
    }

    /// Terminal failure. Wipes the password and, for encryption, any
    /// plaintext still held, before the state change.
    fn fail(&mut self, err: StrongboxError) {
        self.password.wipe();
        if self.kind == JobKind::Encrypt {
            self.source.zeroize();
        }
        self.error = Some(FailureReason::from(&err));
        self.state = JobState::Failed;
    }
}
