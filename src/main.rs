//! syncid - filesystem-id reconciliation diagnostics.
//!
//! Usage:
//!   syncid check [PATH]      Track PATH and run one id assignment pass
//!   syncid --help            Show help

use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use tracing_subscriber::EnvFilter;

use syncid_core::{ReconcileConfig, join};
use syncid_reconcile::{AllowAll, ReconcileReport, Reconciler};
use syncid_scan::{LocalFsAccess, track};

#[derive(Parser)]
#[command(
    name = "syncid",
    version,
    about = "Filesystem-id reconciliation diagnostics",
    long_about = "syncid tracks a directory the way the sync engine does and runs \
                  a filesystem-id assignment pass over it, reporting which files \
                  kept their identity."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Track a directory and run one id assignment pass
    Check {
        /// Directory to check
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Name of the debris folder inside PATH
        #[arg(short, long)]
        debris: Option<String>,

        /// Fail when any directory or file below PATH cannot be read
        #[arg(short, long)]
        strict: bool,

        /// Follow symbolic links
        #[arg(short = 'L', long)]
        follow_symlinks: bool,

        /// Load reconcile settings from a TOML file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Check {
            path,
            debris,
            strict,
            follow_symlinks,
            config,
            format,
        } => {
            let ok = run_check(
                &path,
                debris.as_deref(),
                strict,
                follow_symlinks,
                config.as_deref(),
                format,
            )?;
            if !ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Install a stderr tracing subscriber honouring `RUST_LOG`.
fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| eyre!(e))
}

/// Build the reconcile config from an optional file and command-line flags.
fn load_config(
    root: &str,
    debris: Option<&str>,
    strict: bool,
    file: Option<&Path>,
) -> Result<ReconcileConfig> {
    let mut config = match file {
        Some(file) => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("Cannot read {}", file.display()))?;
            toml::from_str(&text).with_context(|| format!("Invalid config {}", file.display()))?
        }
        None => ReconcileConfig::for_root(root),
    };

    if let Some(name) = debris {
        config.debris_path = join(root, name, MAIN_SEPARATOR_STR);
    }
    config.strict |= strict;
    Ok(config)
}

/// Track a directory and run one assignment pass over it.
fn run_check(
    path: &Path,
    debris: Option<&str>,
    strict: bool,
    follow_symlinks: bool,
    config_file: Option<&Path>,
    format: OutputFormat,
) -> Result<bool> {
    let path = path.canonicalize().context("Invalid path")?;
    let root = path
        .to_str()
        .ok_or_else(|| eyre!("Path is not valid UTF-8: {}", path.display()))?;

    let config = load_config(root, debris, strict, config_file)?;
    tracing::info!(root, debris = %config.debris_path, strict = config.strict, "checking");

    let access = LocalFsAccess::new().follow_symlinks(follow_symlinks);
    let mut snapshot = track(&access, root, &config).context("Tracking failed")?;

    let reconciler = Reconciler::new(config);
    let tree_root = snapshot.tree.root();
    reconciler.invalidate(&mut snapshot.tree, tree_root);
    let report = reconciler
        .assign(&mut snapshot.tree, &AllowAll, &access)
        .context("Assignment pass failed")?;

    match format {
        OutputFormat::Text => print_report(&report, snapshot.files),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(report.success)
}

fn print_report(report: &ReconcileReport, tracked_files: u64) {
    println!();
    println!("{}", "─".repeat(60));
    println!(" {}", report.root);
    println!(
        " {} tracked files, {} directories scanned",
        tracked_files, report.dirs_scanned
    );
    println!(" Checked in {:.2}s", report.duration.as_secs_f64());
    println!("{}", "─".repeat(60));
    println!();
    println!(" ids assigned          {:>8}", report.ids_assigned);
    println!(" identity mismatches   {:>8}", report.identity_mismatches);
    println!(" duplicate ids         {:>8}", report.duplicate_ids);
    println!(" missing platform ids  {:>8}", report.missing_ids);
    println!(" debris entries        {:>8}", report.debris_skipped);
    println!(" untracked entries     {:>8}", report.untracked);
    println!(" skipped subtrees      {:>8}", report.skipped_subtrees);
    println!(" unreadable files      {:>8}", report.unreadable_files);

    if report.has_warnings() {
        println!();
        println!("{} warning(s) during pass", report.warnings.len());
        for warning in report.warnings.iter().take(20) {
            println!("  {:?}: {}", warning.kind, warning.path.display());
        }
    }

    println!();
    println!(" result: {}", if report.success { "ok" } else { "FAILED" });
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncid_core::DEFAULT_DEBRIS_NAME;

    #[test]
    fn test_load_config_flags_override_defaults() {
        let config = load_config("/data", Some("trash"), true, None).unwrap();
        assert!(config.debris_path.ends_with("trash"));
        assert!(config.strict);

        let config = load_config("/data", None, false, None).unwrap();
        assert!(config.debris_path.ends_with(DEFAULT_DEBRIS_NAME));
        assert!(!config.strict);
    }
}
