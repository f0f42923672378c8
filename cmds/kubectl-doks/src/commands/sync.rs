//! Sync command handler.
//!
//! Lists every cluster the credentials can see and reconciles the kubeconfig against that
//! list: entries of deleted clusters are removed, new and recreated clusters are added.

use std::{
	io::{self, Write},
	path::Path,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Args};
use doks_kubeconfig::{sync, ClusterDirectory, KubeconfigFile, SyncOptions, SyncReport};
use tracing::instrument;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct SyncArgs {
	/// Fetch fresh credentials for every cluster, not only new and recreated ones
	#[arg(long)]
	pub force: bool,

	/// Select the new context when it is the only one added and no valid context is selected
	#[arg(
		long,
		action = ArgAction::Set,
		num_args = 0..=1,
		default_value_t = true,
		default_missing_value = "true"
	)]
	pub set_current_context: bool,
}

#[instrument(skip_all)]
pub async fn run_async<W: Write>(
	args: SyncArgs,
	kubeconfig: Option<&Path>,
	global: &GlobalArgs,
	mut writer: W,
) -> Result<()> {
	let directory = global.directory()?;
	let file = KubeconfigFile::load(kubeconfig).context("loading kubeconfig")?;

	let clusters = directory
		.list_clusters()
		.await
		.context("fetching clusters")?;
	if clusters.is_empty() {
		writeln!(writer, "No DOKS clusters found.")?;
	}

	let opts = SyncOptions {
		force: args.force,
		set_current_context: args.set_current_context,
		ttl_seconds: global.ttl_seconds(),
	};
	let report = sync(&file, &clusters, &directory, opts)
		.await
		.with_context(|| format!("syncing {}", file.path().display()))?;

	write_report(&mut writer, &mut io::stderr(), &report, file.path())?;
	Ok(())
}

/// Summarize a sync pass. Skipped clusters are written to `warnings`.
pub fn write_report<W: Write, E: Write>(
	out: &mut W,
	warnings: &mut E,
	report: &SyncReport,
	path: &Path,
) -> io::Result<()> {
	for collision in &report.collisions {
		writeln!(warnings, "Warning: skipped cluster: {collision}")?;
	}

	if !report.written {
		writeln!(out, "{} is up to date.", path.display())?;
		return Ok(());
	}

	for context in &report.removed {
		writeln!(out, "Removed context {context}")?;
	}
	for context in &report.added {
		writeln!(out, "Added context {context}")?;
	}
	if let Some(backup) = &report.backup {
		writeln!(out, "Backed up previous kubeconfig to {}", backup.display())?;
	}
	if report.current_context.is_empty() {
		writeln!(out, "No current context is set.")?;
	} else {
		writeln!(out, "Current context is {}", report.current_context)?;
	}
	Ok(())
}
