//! Scoped backup of a single file.
//!
//! A [`BackupGuard`] copies the target to a sibling path when created and must
//! be consumed exactly once: [`BackupGuard::discard`] after a successful edit,
//! [`BackupGuard::restore`] after a failed one. A guard that is dropped without
//! being consumed restores the target, so early returns and panics leave the
//! filesystem as it was before the guard existed.

use std::fs::{self as std_fs, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::IoError;

const BACKUP_EXTENSION: &str = "bak";
const MAX_COLLISION_SUFFIX: u32 = 1000;

/// Backup copy of a file that is restored unless explicitly discarded.
#[derive(Debug)]
pub struct BackupGuard {
    target: PathBuf,
    backup: PathBuf,
    armed: bool,
}

impl BackupGuard {
    /// Copy `target` to a fresh timestamped sibling path.
    ///
    /// The backup is named `<file>.<YYYYmmddHHMMSS>.bak`; if that path is
    /// taken, `.1`, `.2`, ... is inserted before the extension. Existing files
    /// are never overwritten.
    ///
    /// # Errors
    /// `IoError::NotFound` if the target is missing, `IoError::Backup` when the
    /// copy cannot be created.
    pub fn create<P: AsRef<Path>>(target: P) -> Result<Self, IoError> {
        let stamp = Local::now().format("%Y%m%d%H%M%S").to_string();
        Self::create_with_stamp(target, &stamp)
    }

    /// Same as [`BackupGuard::create`] with an explicit name stamp.
    ///
    /// # Errors
    /// See [`BackupGuard::create`].
    pub fn create_with_stamp<P: AsRef<Path>>(target: P, stamp: &str) -> Result<Self, IoError> {
        let target = target.as_ref().to_path_buf();
        let mut source = std_fs::File::open(&target)
            .map_err(|_| IoError::NotFound(target.to_string_lossy().to_string()))?;

        let (backup, mut dest) = open_unique_sibling(&target, stamp)?;
        let backup_err = |source: io::Error| IoError::Backup {
            path: backup.clone(),
            source,
        };

        let copied = io::copy(&mut source, &mut dest).map_err(backup_err);
        let synced = copied.and_then(|_| dest.sync_all().map_err(backup_err));
        if let Err(err) = synced {
            let _ = std_fs::remove_file(&backup);
            return Err(err);
        }
        if let Ok(metadata) = source.metadata() {
            let _ = std_fs::set_permissions(&backup, metadata.permissions());
        }

        tracing::info!(
            target = %target.display(),
            backup = %backup.display(),
            "created backup"
        );
        Ok(Self {
            target,
            backup,
            armed: true,
        })
    }

    /// Path of the file being protected.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Path of the backup copy.
    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Keep the current target content and delete the backup.
    ///
    /// # Errors
    /// `IoError::Backup` if the backup file cannot be removed.
    pub fn discard(mut self) -> Result<(), IoError> {
        self.armed = false;
        std_fs::remove_file(&self.backup).map_err(|source| IoError::Backup {
            path: self.backup.clone(),
            source,
        })?;
        tracing::debug!(backup = %self.backup.display(), "removed backup");
        Ok(())
    }

    /// Copy the backup over the target and delete the backup.
    ///
    /// # Errors
    /// `IoError::Backup` if either the copy or the removal fails. When the copy
    /// fails the backup file is kept so it can be recovered manually.
    pub fn restore(mut self) -> Result<(), IoError> {
        self.armed = false;
        self.restore_inner()
    }

    fn restore_inner(&self) -> Result<(), IoError> {
        let backup_err = |source: io::Error| IoError::Backup {
            path: self.backup.clone(),
            source,
        };
        std_fs::copy(&self.backup, &self.target).map_err(backup_err)?;
        std_fs::remove_file(&self.backup).map_err(backup_err)?;
        tracing::info!(
            target = %self.target.display(),
            backup = %self.backup.display(),
            "restored from backup"
        );
        Ok(())
    }
}

impl Drop for BackupGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(error) = self.restore_inner() {
            tracing::error!(
                target = %self.target.display(),
                backup = %self.backup.display(),
                error = %error,
                "failed to restore unconsumed backup"
            );
        }
    }
}

/// Build the backup path for `target` with the given stamp and collision index.
#[must_use]
pub fn backup_path_for(target: &Path, stamp: &str, collision: u32) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = if collision == 0 {
        format!("{file_name}.{stamp}.{BACKUP_EXTENSION}")
    } else {
        format!("{file_name}.{stamp}.{collision}.{BACKUP_EXTENSION}")
    };
    target.with_file_name(name)
}

fn open_unique_sibling(target: &Path, stamp: &str) -> Result<(PathBuf, std_fs::File), IoError> {
    let mut last_err = None;
    for collision in 0..=MAX_COLLISION_SUFFIX {
        let candidate = backup_path_for(target, stamp, collision);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                last_err = Some((candidate, err));
            }
            Err(source) => {
                return Err(IoError::Backup {
                    path: candidate,
                    source,
                });
            }
        }
    }
    let (path, source) = last_err.unwrap_or_else(|| {
        (
            backup_path_for(target, stamp, 0),
            io::Error::from(ErrorKind::AlreadyExists),
        )
    });
    Err(IoError::Backup { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_name_layout() {
        let p = Path::new("/work/src/main.rs");
        assert_eq!(
            backup_path_for(p, "20240101120000", 0),
            Path::new("/work/src/main.rs.20240101120000.bak")
        );
        assert_eq!(
            backup_path_for(p, "20240101120000", 2),
            Path::new("/work/src/main.rs.20240101120000.2.bak")
        );
    }

    #[test]
    fn test_collision_skips_existing_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.txt");
        std_fs::write(&target, "payload").unwrap();
        let taken = backup_path_for(&target, "stamp", 0);
        std_fs::write(&taken, "unrelated").unwrap();

        let guard = BackupGuard::create_with_stamp(&target, "stamp").unwrap();
        assert_eq!(guard.backup_path(), backup_path_for(&target, "stamp", 1));
        assert_eq!(std_fs::read_to_string(&taken).unwrap(), "unrelated");
        guard.discard().unwrap();
    }

    #[test]
    fn test_drop_restores() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.txt");
        std_fs::write(&target, "before").unwrap();
        let backup;
        {
            let guard = BackupGuard::create(&target).unwrap();
            backup = guard.backup_path().to_path_buf();
            std_fs::write(&target, "after").unwrap();
        }
        assert_eq!(std_fs::read_to_string(&target).unwrap(), "before");
        assert!(!backup.exists());
    }
}
