use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use omni_apply::{ApplyRequest, ApplySettings, CommitRequest};
use omni_patch::{ApplyOptions, PatchMode};

#[derive(Parser)]
#[command(name = "omni-apply", version)]
#[command(about = "Apply a directive patch file to a source file, optionally committing the result to git.")]
pub(crate) struct Cli {
    /// File to patch
    pub(crate) file: PathBuf,

    /// Patch file containing directive blocks
    pub(crate) patch: PathBuf,

    /// Patch mode (default: replace, or apply.default_mode from settings)
    #[arg(long, value_enum)]
    pub(crate) mode: Option<ModeArg>,

    /// Also try whitespace-normalized and fuzzy matching
    #[arg(long)]
    pub(crate) ignore_whitespace: bool,

    /// Back up the file first and restore it if writing fails
    #[arg(long, visible_alias = "safe-mode")]
    pub(crate) backup: bool,

    /// Commit the patched file to git
    #[arg(long)]
    pub(crate) git_commit: bool,

    /// Commit message (default: "Applied patch to <file>")
    #[arg(long, value_name = "MSG", requires = "git_commit")]
    pub(crate) commit_msg: Option<String>,

    /// Run `git init` when the file is not inside a repository
    #[arg(long, requires = "git_commit")]
    pub(crate) git_init: bool,

    /// Push after a successful commit
    #[arg(long, requires = "git_commit")]
    pub(crate) git_push: bool,

    /// Show the diff without writing anything
    #[arg(long, conflicts_with = "git_commit")]
    pub(crate) dry_run: bool,

    /// Print the report as JSON on stdout
    #[arg(long)]
    pub(crate) json: bool,

    /// Override config directory (same semantics as Python `--conf`).
    #[arg(long)]
    pub(crate) conf: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum ModeArg {
    Replace,
    Append,
    Prepend,
    Smart,
    Functions,
}

impl From<ModeArg> for PatchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Replace => Self::Replace,
            ModeArg::Append => Self::Append,
            ModeArg::Prepend => Self::Prepend,
            ModeArg::Smart => Self::Smart,
            ModeArg::Functions => Self::Functions,
        }
    }
}

impl Cli {
    /// Combine flags with settings; a flag that is set always wins.
    pub(crate) fn to_request(&self, settings: &ApplySettings) -> ApplyRequest {
        let file_name = self
            .file
            .file_name()
            .map_or_else(|| self.file.display().to_string(), |n| n.to_string_lossy().into_owned());
        let commit = self.git_commit.then(|| CommitRequest {
            message: self
                .commit_msg
                .clone()
                .unwrap_or_else(|| settings.commit_message(&file_name)),
            init: self.git_init,
            push: self.git_push,
        });

        ApplyRequest {
            target: self.file.clone(),
            patch: self.patch.clone(),
            mode: self.mode.map_or_else(|| settings.mode(), PatchMode::from),
            options: ApplyOptions {
                ignore_whitespace: self.ignore_whitespace
                    || settings.ignore_whitespace.unwrap_or(false),
            },
            backup: self.backup || settings.backup.unwrap_or(false),
            dry_run: self.dry_run,
            max_file_size: settings.max_file_size(),
            commit,
        }
    }
}
