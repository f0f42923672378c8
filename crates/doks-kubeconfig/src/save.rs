//! Saving the credentials of a single cluster.

use std::path::PathBuf;

use tracing::{info, instrument};

use crate::{
	directory::{ClusterDescriptor, ClusterDirectory},
	error::{Collision, CollisionKind, Result},
	file::KubeconfigFile,
	merge::merge,
	ownership::{context_name, is_foreign_occupied},
	reconcile::{fetch_fragment, stamp},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
	/// Select the saved cluster's context.
	pub set_current_context: bool,
	pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
	pub context: String,
	pub current_context: String,
	pub backup: Option<PathBuf>,
}

/// Fetch the kubeconfig of `cluster` and merge it into `file`, replacing any managed entry
/// of the same name. Refuses to overwrite an unmanaged entry.
#[instrument(skip_all, fields(path = %file.path().display(), cluster = %cluster.name))]
pub async fn save<D: ClusterDirectory>(
	file: &KubeconfigFile,
	cluster: &ClusterDescriptor,
	directory: &D,
	opts: SaveOptions,
) -> Result<SaveReport> {
	let config = file.document()?;
	let name = context_name(cluster);

	if is_foreign_occupied(&config, &name) {
		return Err(Collision {
			context: name,
			cluster_id: cluster.id.clone(),
			kind: CollisionKind::Foreign,
		}
		.into());
	}

	let fragment = fetch_fragment(directory, cluster, &name, opts.ttl_seconds).await?;
	let mut config = merge(&config, &fragment, opts.set_current_context)?;
	stamp(&mut config, &name, &cluster.id)?;

	let backup = file.commit(&config)?;
	info!(context = %name, "saved cluster credentials");

	Ok(SaveReport {
		context: name,
		current_context: config.current_context,
		backup,
	})
}
