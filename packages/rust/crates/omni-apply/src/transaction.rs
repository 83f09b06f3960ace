//! Patch transaction.
//!
//! Drives one invocation through
//! `Idle -> BackedUp? -> Applied -> (Committed | RolledBack) -> Idle`:
//! read, parse, optional backup, apply, atomic write, optional git record.
//! Parse errors abort before anything is touched; a failed write restores
//! the backup; version-control trouble is reported but never undoes the
//! written file.

use std::fmt;
use std::path::{Path, PathBuf};

use omni_io::{BackupGuard, IoError, read_text_safe, read_text_strict, write_text_atomic};
use omni_patch::{
    ApplyOptions, DirectiveOutcome, PatchEngine, PatchMode, generate_unified_diff, parse_patch,
};
use omni_vcs::{VcsError, VersionControl};
use serde::Serialize;

use crate::error::ApplyError;

/// Destination for the patched document.
pub trait DocumentWriter {
    /// Replace the content of `path` with `content`.
    ///
    /// # Errors
    /// Returns `IoError` when the content could not be persisted.
    fn write(&self, path: &Path, content: &str) -> Result<(), IoError>;
}

/// Temp file in the target directory, then rename.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicWriter;

impl DocumentWriter for AtomicWriter {
    fn write(&self, path: &Path, content: &str) -> Result<(), IoError> {
        write_text_atomic(path, content)
    }
}

/// Version-control follow-up requested for a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    /// Commit message.
    pub message: String,
    /// Run `init` when the target is not inside a repository.
    pub init: bool,
    /// Push after committing.
    pub push: bool,
}

/// Everything one invocation needs to know.
#[derive(Debug, Clone)]
pub struct ApplyRequest {
    /// File to patch.
    pub target: PathBuf,
    /// Patch file.
    pub patch: PathBuf,
    /// Directive language of the patch.
    pub mode: PatchMode,
    /// Matching options.
    pub options: ApplyOptions,
    /// Take a backup and restore it on failure.
    pub backup: bool,
    /// Compute and report the result without writing.
    pub dry_run: bool,
    /// Read limit for target and patch.
    pub max_file_size: u64,
    /// Optional git follow-up.
    pub commit: Option<CommitRequest>,
}

/// Transaction states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Nothing written (no-op, dry run, or not started).
    Idle,
    /// Backup taken, target not yet written.
    BackedUp,
    /// Target written.
    Applied,
    /// Target written and recorded in version control.
    Committed,
    /// Write failed and the target was restored.
    RolledBack,
}

/// What happened on the version-control side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VcsOutcome {
    /// No commit was requested, or nothing was written.
    NotRequested,
    /// Target staged and committed.
    Committed {
        /// Push also succeeded.
        pushed: bool,
    },
    /// A step failed; the written file stays in place.
    Failed {
        /// Step that failed.
        step: VcsStep,
        /// Error text.
        error: String,
    },
}

impl VcsOutcome {
    /// Whether a commit was created, even if the later push failed.
    #[must_use]
    pub fn committed(&self) -> bool {
        matches!(
            self,
            Self::Committed { .. }
                | Self::Failed {
                    step: VcsStep::Push,
                    ..
                }
        )
    }
}

/// Version-control steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VcsStep {
    /// Repository detection.
    Detect,
    /// Repository creation.
    Init,
    /// Staging the target.
    Stage,
    /// Creating the commit.
    Commit,
    /// Pushing to the remote.
    Push,
}

impl fmt::Display for VcsStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Detect => "detect",
            Self::Init => "init",
            Self::Stage => "stage",
            Self::Commit => "commit",
            Self::Push => "push",
        })
    }
}

/// Result of a completed invocation.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionReport {
    /// Target path as given.
    pub target: PathBuf,
    /// Patch mode used.
    pub mode: PatchMode,
    /// Final state.
    pub state: TransactionState,
    /// Whether any directive applied.
    pub changed: bool,
    /// Whether the write was skipped on request.
    pub dry_run: bool,
    /// Per-directive outcomes.
    pub outcomes: Vec<DirectiveOutcome>,
    /// Version-control result.
    pub vcs: VcsOutcome,
    /// Unified diff of the change; empty when nothing changed.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub diff: String,
    /// Human summary with unified diff.
    #[serde(skip)]
    pub summary: String,
}

/// One patch transaction over a writer and an optional VCS collaborator.
pub struct Transaction<'a> {
    writer: &'a dyn DocumentWriter,
    vcs: Option<&'a dyn VersionControl>,
}

impl<'a> Transaction<'a> {
    /// Transaction writing through `writer`, without version control.
    #[must_use]
    pub fn new(writer: &'a dyn DocumentWriter) -> Self {
        Self { writer, vcs: None }
    }

    /// Attach a version-control collaborator used for commit requests.
    #[must_use]
    pub fn with_vcs(mut self, vcs: &'a dyn VersionControl) -> Self {
        self.vcs = Some(vcs);
        self
    }

    /// Run one invocation.
    ///
    /// # Errors
    /// - `FileNotFound` / `PatchNotFound` when an input is missing
    /// - `Patch` when the patch is malformed (nothing touched)
    /// - `Io` when reading or taking the backup fails, including a target that
    ///   is not valid UTF-8
    /// - `WriteFailure` when persisting fails (backup restored if taken)
    pub fn run(&self, request: &ApplyRequest) -> Result<TransactionReport, ApplyError> {
        let patch_text = read_text_safe(&request.patch, request.max_file_size).map_err(|e| match e {
            IoError::NotFound(_) => ApplyError::PatchNotFound(request.patch.clone()),
            other => ApplyError::Io(other),
        })?;
        let document = read_text_strict(&request.target, request.max_file_size).map_err(|e| match e {
            IoError::NotFound(_) => ApplyError::FileNotFound(request.target.clone()),
            other => ApplyError::Io(other),
        })?;
        let directives = parse_patch(&patch_text, request.mode)?;

        let mut state = TransactionState::Idle;
        let guard = if request.backup && !request.dry_run {
            let guard = BackupGuard::create(&request.target)?;
            transition(&mut state, TransactionState::BackedUp, &request.target);
            Some(guard)
        } else {
            None
        };

        let result = PatchEngine::apply(&document, &directives, request.options);
        let label = display_name(&request.target);
        let summary = PatchEngine::format_result(&result, Some(&label));
        let mut report = TransactionReport {
            target: request.target.clone(),
            mode: request.mode,
            state,
            changed: result.changed,
            dry_run: request.dry_run,
            outcomes: result.outcomes.clone(),
            vcs: VcsOutcome::NotRequested,
            diff: generate_unified_diff(&result.original, &result.document, &label),
            summary,
        };

        if !result.changed || request.dry_run {
            release_backup(guard, &request.target);
            if result.changed {
                tracing::info!(path = %request.target.display(), "dry run; nothing written");
            } else {
                tracing::info!(path = %request.target.display(), "already up to date; no directive applied");
            }
            report.state = TransactionState::Idle;
            return Ok(report);
        }

        if let Err(source) = self.writer.write(&request.target, &result.document) {
            let restored = match guard {
                Some(guard) => match guard.restore() {
                    Ok(()) => true,
                    Err(error) => {
                        tracing::error!(
                            path = %request.target.display(),
                            error = %error,
                            "failed to restore backup"
                        );
                        false
                    }
                },
                None => false,
            };
            if restored {
                transition(&mut state, TransactionState::RolledBack, &request.target);
            }
            return Err(ApplyError::WriteFailure {
                path: request.target.clone(),
                restored,
                source,
            });
        }
        release_backup(guard, &request.target);
        transition(&mut state, TransactionState::Applied, &request.target);
        tracing::info!(
            path = %request.target.display(),
            applied = result.applied_count(),
            total = result.outcomes.len(),
            "patch written"
        );

        if let (Some(commit), Some(vcs)) = (&request.commit, self.vcs) {
            report.vcs = record(vcs, &request.target, commit);
            if report.vcs.committed() {
                transition(&mut state, TransactionState::Committed, &request.target);
            }
        }
        report.state = state;
        Ok(report)
    }
}

/// Remove a backup that is no longer needed; failure is logged, never returned.
fn release_backup(guard: Option<BackupGuard>, target: &Path) {
    if let Some(guard) = guard
        && let Err(error) = guard.discard()
    {
        tracing::warn!(path = %target.display(), error = %error, "could not remove backup");
    }
}

fn transition(state: &mut TransactionState, next: TransactionState, path: &Path) {
    tracing::debug!(from = ?*state, to = ?next, path = %path.display(), "transaction state");
    *state = next;
}

/// Stage and commit `target` (plus push on request); the first failing step
/// ends the sequence.
fn record(vcs: &dyn VersionControl, target: &Path, request: &CommitRequest) -> VcsOutcome {
    let work_dir = parent_dir(target);
    let file = target
        .file_name()
        .map_or_else(|| target.to_path_buf(), PathBuf::from);

    let failed = |step: VcsStep, error: &VcsError| {
        tracing::error!(step = ?step, error = %error, "version control step failed");
        VcsOutcome::Failed {
            step,
            error: error.to_string(),
        }
    };

    if !vcs.is_available() {
        return failed(
            VcsStep::Detect,
            &VcsError::Unavailable {
                program: "git".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            },
        );
    }
    if !vcs.is_repository(work_dir) {
        if !request.init {
            return failed(
                VcsStep::Detect,
                &VcsError::NotRepository(work_dir.to_path_buf()),
            );
        }
        if let Err(error) = vcs.init(work_dir) {
            return failed(VcsStep::Init, &error);
        }
    }
    if let Err(error) = vcs.stage(&file) {
        return failed(VcsStep::Stage, &error);
    }
    if let Err(error) = vcs.commit(&request.message) {
        return failed(VcsStep::Commit, &error);
    }
    if request.push {
        // The commit stands even when the push fails.
        if let Err(error) = vcs.push() {
            return failed(VcsStep::Push, &error);
        }
    }
    VcsOutcome::Committed {
        pushed: request.push,
    }
}

/// Directory containing `path`; `.` for a bare file name.
#[must_use]
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_release_backup_tolerates_missing_backup() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.js");
        std::fs::write(&target, "foo\n").unwrap();
        let guard = BackupGuard::create(&target).unwrap();
        std::fs::remove_file(guard.backup_path()).unwrap();

        release_backup(Some(guard), &target);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "foo\n");
    }

    #[test]
    fn test_missing_git_is_a_detect_failure() {
        struct NoGit;
        impl VersionControl for NoGit {
            fn is_available(&self) -> bool {
                false
            }
            fn is_repository(&self, _path: &Path) -> bool {
                true
            }
            fn init(&self, _path: &Path) -> Result<(), VcsError> {
                unreachable!()
            }
            fn stage(&self, _path: &Path) -> Result<(), VcsError> {
                unreachable!()
            }
            fn commit(&self, _message: &str) -> Result<(), VcsError> {
                unreachable!()
            }
            fn push(&self) -> Result<(), VcsError> {
                unreachable!()
            }
        }

        let request = CommitRequest {
            message: "m".to_string(),
            init: true,
            push: false,
        };
        let outcome = record(&NoGit, Path::new("/tmp/app.js"), &request);
        assert!(matches!(
            outcome,
            VcsOutcome::Failed {
                step: VcsStep::Detect,
                ..
            }
        ));
        assert!(!outcome.committed());
    }
}
