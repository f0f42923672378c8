//! Save command handler.

use std::{
	io::{IsTerminal, Write},
	path::Path,
};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args};
use dialoguer::{theme::ColorfulTheme, FuzzySelect};
use doks_kubeconfig::{
	ownership::context_name, save, ClusterDescriptor, ClusterDirectory, KubeconfigFile,
	SaveOptions,
};
use tracing::instrument;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct SaveArgs {
	/// Cluster name, or its context name (`do-<region>-<name>`). Prompts when omitted.
	pub name: Option<String>,

	/// Set current-context to the saved cluster's context
	#[arg(
		long,
		action = ArgAction::Set,
		num_args = 0..=1,
		default_value_t = true,
		default_missing_value = "true"
	)]
	pub set_current_context: bool,
}

#[instrument(skip_all, fields(name = ?args.name))]
pub async fn run_async<W: Write>(
	args: SaveArgs,
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
		return Ok(());
	}

	let cluster = match &args.name {
		Some(name) => find_cluster(&clusters, name)?,
		None => pick_cluster(&clusters).context("selecting cluster")?,
	};

	let opts = SaveOptions {
		set_current_context: args.set_current_context,
		ttl_seconds: global.ttl_seconds(),
	};
	let report = save(&file, cluster, &directory, opts)
		.await
		.with_context(|| format!("saving cluster {}", cluster.name))?;

	writeln!(
		writer,
		"Saved credentials for cluster {:?} to {} as context {}",
		cluster.name,
		file.path().display(),
		report.context
	)?;
	if let Some(backup) = &report.backup {
		writeln!(writer, "Backed up previous kubeconfig to {}", backup.display())?;
	}
	if args.set_current_context {
		writeln!(writer, "Current context is {}", report.current_context)?;
	}
	Ok(())
}

/// Find a cluster by name, or by context name when several regions share the name.
pub fn find_cluster<'a>(clusters: &'a [ClusterDescriptor], name: &str) -> Result<&'a ClusterDescriptor> {
	if let Some(cluster) = clusters.iter().find(|c| context_name(c) == name) {
		return Ok(cluster);
	}
	let matching: Vec<_> = clusters.iter().filter(|c| c.name == name).collect();
	match matching.as_slice() {
		[] => bail!("cluster {name:?} not found"),
		[cluster] => Ok(*cluster),
		several => {
			let contexts: Vec<_> = several.iter().map(|c| context_name(c)).collect();
			bail!(
				"cluster name {name:?} is used in several regions, pass one of: {}",
				contexts.join(", ")
			)
		}
	}
}

fn pick_cluster(clusters: &[ClusterDescriptor]) -> Result<&ClusterDescriptor> {
	if !std::io::stdin().is_terminal() {
		bail!("cannot prompt for a cluster in non-interactive mode, pass the cluster name");
	}
	let items: Vec<_> = clusters
		.iter()
		.map(|c| format!("{} ({})", c.name, c.region))
		.collect();
	let index = FuzzySelect::with_theme(&ColorfulTheme::default())
		.with_prompt("Select a cluster")
		.items(&items)
		.default(0)
		.interact()?;
	clusters.get(index).context("selection out of range")
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;

	use super::*;

	fn clusters() -> Vec<ClusterDescriptor> {
		[("1", "web", "nyc1"), ("2", "web", "ams3"), ("3", "db", "nyc1")]
			.into_iter()
			.map(|(id, name, region)| ClusterDescriptor {
				id: id.into(),
				name: name.into(),
				region: region.into(),
			})
			.collect()
	}

	#[test]
	fn test_find_by_unique_name() {
		let clusters = clusters();
		assert_eq!(find_cluster(&clusters, "db").unwrap().id, "3");
	}

	#[test]
	fn test_find_by_context_name() {
		let clusters = clusters();
		assert_eq!(find_cluster(&clusters, "do-ams3-web").unwrap().id, "2");
	}

	#[test]
	fn test_ambiguous_name() {
		let clusters = clusters();
		let err = find_cluster(&clusters, "web").unwrap_err().to_string();
		assert!(err.contains("do-nyc1-web, do-ams3-web"), "{err}");
	}

	#[test]
	fn test_unknown_name() {
		assert_matches!(find_cluster(&clusters(), "nope"), Err(e) if e.to_string() == "cluster \"nope\" not found");
	}
}
