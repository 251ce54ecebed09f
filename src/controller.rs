//! Single-flight coordinator between the presentation layer and jobs
//!
//! The controller admits at most one [`TransformJob`] at a time, runs it on
//! a background thread, and publishes the terminal job for non-blocking
//! observation. Admission re-opens only when the caller acknowledges the
//! terminal result with [`WorkflowController::complete_and_clear`]; a job
//! left unacknowledged blocks new submissions by design.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use crate::engine::{CipherEngine, SecretboxEngine};
use crate::error::{ErrorCategory, ErrorKind, FailureReason, Result, StrongboxError};
use crate::job::{ExportArtifact, JobKind, TransformJob};
use crate::policy::Strength;
use crate::secret::SecretBuffer;

/// Identifies a submitted job to `poll` and `complete_and_clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    id: u64,
}

/// Non-blocking view of a job's progress.
#[derive(Debug, Clone)]
pub enum JobStatus {
    Pending,
    Succeeded(ExportArtifact),
    Failed(FailureReason),
}

/// What occupies the single admission slot.
///
/// While the worker owns the job only its id is tracked; the worker hands
/// the whole terminal job back in a single slot write, so observers see
/// either `Running` or a complete terminal snapshot, never a job in
/// between.
enum Slot {
    Running { id: u64 },
    Terminal { job: TransformJob },
}

pub struct WorkflowController {
    engine: Arc<dyn CipherEngine>,
    slot: Arc<Mutex<Option<Slot>>>,
    next_id: AtomicU64,
}

impl WorkflowController {
    /// A controller backed by the default engine.
    pub fn new() -> Self {
        Self::with_engine(Arc::new(SecretboxEngine::new()))
    }

    /// A controller backed by the given engine.
    pub fn with_engine(engine: Arc<dyn CipherEngine>) -> Self {
        Self {
            engine,
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Submits a transform for background execution.
    ///
    /// Encrypt submissions are gated on password strength before anything
    /// is admitted: a password that does not classify as
    /// [`Strength::Strong`] is rejected with `WeakPassword`. Rejected
    /// password buffers (weak or `Busy`) are wiped before this returns;
    /// the caller must obtain the password again to retry.
    ///
    /// Fails with `Busy` while another job occupies the slot. Empty
    /// source bytes or an empty password are admitted and fail the job
    /// itself with `InvalidInput`, observable through [`Self::poll`].
    pub fn submit(
        &self,
        kind: JobKind,
        source_name: &str,
        source: Vec<u8>,
        mut password: SecretBuffer,
    ) -> Result<JobHandle> {
        if kind == JobKind::Encrypt && !Self::password_is_strong(&password) {
            password.wipe();
            return Err(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::WeakPassword,
                "password does not meet the strength requirements for encryption",
            ));
        }

        let mut slot = self.lock_slot();
        if slot.is_some() {
            password.wipe();
            return Err(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::Busy,
                "a transform is already in progress",
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut job = TransformJob::new(id, kind, source_name, source, password);
        *slot = Some(Slot::Running { id });
        drop(slot);

        let engine = Arc::clone(&self.engine);
        let shared = Arc::clone(&self.slot);
        thread::spawn(move || {
            job.run(engine.as_ref());
            let mut slot = shared.lock().unwrap_or_else(|p| p.into_inner());
            *slot = Some(Slot::Terminal { job });
        });

        Ok(JobHandle { id })
    }

    /// Non-blocking observation of the job's state.
    ///
    /// Terminal results stay observable until acknowledged; a handle that
    /// does not match the tracked job is an `UnknownJob` error.
    pub fn poll(&self, handle: &JobHandle) -> Result<JobStatus> {
        let slot = self.lock_slot();
        match slot.as_ref() {
            Some(Slot::Running { id }) if *id == handle.id => Ok(JobStatus::Pending),
            Some(Slot::Terminal { job }) if job.id() == handle.id => {
                if let Some(artifact) = job.result() {
                    Ok(JobStatus::Succeeded(artifact.clone()))
                } else if let Some(reason) = job.error() {
                    Ok(JobStatus::Failed(reason.clone()))
                } else {
                    Err(StrongboxError::with_kind(
                        ErrorCategory::Internal,
                        ErrorKind::InternalInvariant,
                        "terminal job has neither result nor error",
                    ))
                }
            }
            _ => Err(Self::unknown_job()),
        }
    }

    /// Acknowledges a terminal result and re-opens admission.
    ///
    /// Mandatory housekeeping: until this runs for the tracked job, every
    /// new submission is rejected with `Busy`. Acknowledging a job that is
    /// still running is itself a `Busy` error.
    pub fn complete_and_clear(&self, handle: &JobHandle) -> Result<()> {
        let mut slot = self.lock_slot();
        match slot.as_ref() {
            Some(Slot::Terminal { job }) if job.id() == handle.id => {
                *slot = None;
                Ok(())
            }
            Some(Slot::Running { id }) if *id == handle.id => Err(StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::Busy,
                "the transform is still running; wait for a terminal result",
            )),
            _ => Err(Self::unknown_job()),
        }
    }

    /// True while a job occupies the admission slot (running or awaiting
    /// acknowledgement).
    pub fn is_busy(&self) -> bool {
        self.lock_slot().is_some()
    }

    fn password_is_strong(password: &SecretBuffer) -> bool {
        match std::str::from_utf8(password.expose()) {
            Ok(text) => Strength::classify(text) == Strength::Strong,
            Err(_) => false,
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<Slot>> {
        // A worker panic poisons nothing we cannot recover: the slot value
        // itself is always consistent.
        self.slot.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn unknown_job() -> StrongboxError {
        StrongboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::UnknownJob,
            "handle does not refer to the tracked job",
        )
    }

    #[cfg(test)]
    pub(crate) fn with_terminal_job<R>(&self, f: impl FnOnce(&TransformJob) -> R) -> Option<R> {
        let slot = self.lock_slot();
        match slot.as_ref() {
            Some(Slot::Terminal { job }) => Some(f(job)),
            _ => None,
        }
    }
}

impl Default for WorkflowController {
    fn default() -> Self {
        Self::new()
    }
}
