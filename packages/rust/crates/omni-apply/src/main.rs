//! omni-apply CLI: apply one patch file to one target file.
//!
//! Exit codes: `0` on success or when nothing needed changing, `1` on any
//! fatal error, `2` on invalid arguments.
//!
//! Logging: set `RUST_LOG=omni_apply=debug` (or pass `--verbose`) to see
//! per-directive logs on stderr.

mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use omni_apply::{
    AtomicWriter, Transaction, TransactionReport, VcsOutcome, load_runtime_settings, parent_dir,
    set_config_home_override,
};
use omni_vcs::{GitCli, GitConfig};

use crate::cli::Cli;

const INFO_FILTER: &str = "omni_apply=info,omni_patch=info,omni_io=info,omni_vcs=info";
const DEBUG_FILTER: &str = "omni_apply=debug,omni_patch=debug,omni_io=debug,omni_vcs=debug";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    // Initialize tracing: RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            DEBUG_FILTER
        } else {
            INFO_FILTER
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let settings = load_runtime_settings().apply;
    let request = cli.to_request(&settings);

    let git = GitCli::with_config(
        parent_dir(&request.target),
        GitConfig {
            timeout: settings.git_timeout(),
            ..GitConfig::default()
        },
    );
    let writer = AtomicWriter;
    let report = Transaction::new(&writer).with_vcs(&git).run(&request)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &TransactionReport) {
    let path = report.target.display();
    if report.dry_run || !report.changed {
        print!("{}", report.summary);
    }
    if !report.changed {
        println!("{path} is already up to date; no changes applied.");
        return;
    }
    if report.dry_run {
        println!("Dry run: {path} was not modified.");
        return;
    }

    let applied = report
        .outcomes
        .iter()
        .filter(|o| o.status.is_applied())
        .count();
    println!(
        "Patched {path}: {applied}/{} directive(s) applied.",
        report.outcomes.len()
    );

    match &report.vcs {
        VcsOutcome::NotRequested => {}
        VcsOutcome::Committed { pushed } => {
            println!("Changes to {path} committed to git.");
            if *pushed {
                println!("Changes pushed to git remote.");
            }
        }
        VcsOutcome::Failed { step, error } => {
            if report.vcs.committed() {
                println!("Changes to {path} committed to git.");
            }
            eprintln!("warning: git {step} failed: {error}");
        }
    }
}
