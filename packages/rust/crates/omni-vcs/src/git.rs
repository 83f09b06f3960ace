//! Git collaborator.
//!
//! Repository discovery uses libgit2; mutations (init, add, commit, push) shell
//! out to the `git` executable so hooks, credential helpers and user config
//! behave exactly as on the command line. Every subprocess runs with a bounded
//! wait and is killed when the budget runs out.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use git2::Repository;

use crate::error::VcsError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Capability surface the patch transaction needs from a version-control
/// system.
pub trait VersionControl {
    /// Whether the tool can be started at all.
    fn is_available(&self) -> bool;

    /// Whether `path` (file or directory) lies inside a repository.
    fn is_repository(&self, path: &Path) -> bool;

    /// Create a repository rooted at `path`.
    ///
    /// # Errors
    /// Returns `VcsError` when the command cannot run, fails or times out.
    fn init(&self, path: &Path) -> Result<(), VcsError>;

    /// Stage a single file.
    ///
    /// # Errors
    /// Returns `VcsError` when the command cannot run, fails or times out.
    fn stage(&self, path: &Path) -> Result<(), VcsError>;

    /// Commit whatever is staged.
    ///
    /// # Errors
    /// Returns `VcsError` when the command cannot run, fails or times out.
    fn commit(&self, message: &str) -> Result<(), VcsError>;

    /// Push the current branch to its upstream.
    ///
    /// # Errors
    /// Returns `VcsError` when the command cannot run, fails or times out.
    fn push(&self) -> Result<(), VcsError>;
}

/// Author identity forced onto commits via `-c user.name= -c user.email=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitIdentity {
    /// `user.name`.
    pub name: String,
    /// `user.email`.
    pub email: String,
}

/// Configuration for the git CLI collaborator.
#[derive(Debug, Clone)]
pub struct GitConfig {
    /// Path to the git binary.
    pub git_path: String,
    /// Budget for each git invocation.
    pub timeout: Duration,
    /// Identity override; `None` uses the user's git config.
    pub identity: Option<GitIdentity>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            git_path: "git".to_string(),
            timeout: Duration::from_secs(60),
            identity: None,
        }
    }
}

/// `VersionControl` backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    work_dir: PathBuf,
    config: GitConfig,
}

impl GitCli {
    /// Collaborator running git inside `work_dir` with default config.
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(work_dir, GitConfig::default())
    }

    /// Create with custom configuration.
    #[must_use]
    pub fn with_config(work_dir: impl Into<PathBuf>, config: GitConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            config,
        }
    }

    /// Directory git commands run in.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Get reference to the configuration (for testing).
    #[must_use]
    pub fn config(&self) -> &GitConfig {
        &self.config
    }

    /// Run `git <args>` in `dir`, returning stdout on success.
    fn run<I, S>(&self, dir: &Path, args: I) -> Result<String, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let command = std::iter::once(self.config.git_path.clone())
            .chain(args.iter().map(|a| a.as_ref().to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ");

        let mut cmd = Command::new(&self.config.git_path);
        if let Some(identity) = &self.config.identity {
            cmd.arg("-c")
                .arg(format!("user.name={}", identity.name))
                .arg("-c")
                .arg(format!("user.email={}", identity.email));
        }
        cmd.args(&args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(command = %command, dir = %dir.display(), "running git");
        let mut child = cmd.spawn().map_err(|source| VcsError::Unavailable {
            program: self.config.git_path.clone(),
            source,
        })?;

        // Drain pipes concurrently so a chatty child cannot block on a full pipe.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let deadline = Instant::now() + self.config.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    tracing::debug!(error = %e, "kill after timeout failed");
                }
                let _ = child.wait();
                tracing::warn!(command = %command, "git timed out; process killed");
                return Err(VcsError::Timeout {
                    command,
                    secs: self.config.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = join_reader(stdout);
        let stderr = join_reader(stderr);
        if status.success() {
            Ok(stdout)
        } else {
            Err(VcsError::CommandFailed {
                command,
                code: status.code(),
                stderr: stderr.trim().to_string(),
            })
        }
    }
}

impl VersionControl for GitCli {
    fn is_available(&self) -> bool {
        self.run(&self.work_dir, ["--version"]).is_ok()
    }

    fn is_repository(&self, path: &Path) -> bool {
        let start = if path.is_file() {
            path.parent().unwrap_or(path)
        } else {
            path
        };
        Repository::discover(start).is_ok()
    }

    fn init(&self, path: &Path) -> Result<(), VcsError> {
        self.run(path, ["init"])?;
        tracing::info!(path = %path.display(), "initialized git repository");
        Ok(())
    }

    fn stage(&self, path: &Path) -> Result<(), VcsError> {
        self.run(
            &self.work_dir,
            [OsStr::new("add"), OsStr::new("--"), path.as_os_str()],
        )?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<(), VcsError> {
        self.run(&self.work_dir, ["commit", "-m", message])?;
        tracing::info!(message, "committed");
        Ok(())
    }

    fn push(&self) -> Result<(), VcsError> {
        self.run(&self.work_dir, ["push"])?;
        tracing::info!("pushed to remote");
        Ok(())
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        // A read error just truncates the captured output.
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
