//! Removing managed entries whose cluster no longer exists.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::{
	directory::ClusterDescriptor,
	document::{remove, Kubeconfig},
	error::Result,
	ownership::{context_name, is_managed},
};

/// Remove every managed context that does not correspond to a live cluster, together with
/// its cluster and user unless another remaining context still uses them. Returns the
/// removed context names in document order.
///
/// If the current context is removed it is cleared.
#[instrument(skip_all, fields(live = live_clusters.len()))]
pub fn prune(config: &mut Kubeconfig, live_clusters: &[ClusterDescriptor]) -> Vec<String> {
	let expected: HashSet<String> = live_clusters.iter().map(context_name).collect();

	let stale: Vec<String> = config
		.context_names()
		.filter(|name| is_managed(config, name) && !expected.contains(*name))
		.map(str::to_owned)
		.collect();

	for name in &stale {
		let Some(removed) = remove(&mut config.contexts, name) else {
			continue;
		};
		let ctx = removed.context;

		if !config.contexts.iter().any(|c| c.context.cluster == ctx.cluster) {
			remove(&mut config.clusters, &ctx.cluster);
		}
		if !config.contexts.iter().any(|c| c.context.user == ctx.user) {
			remove(&mut config.users, &ctx.user);
		}
		debug!(context = %name, "pruned stale context");
	}

	if stale.contains(&config.current_context) {
		config.current_context.clear();
	}

	stale
}

/// [`prune`] over a serialized document. Empty input is a document that does not exist
/// yet: it is returned unchanged with nothing removed.
pub fn prune_bytes(
	config: &[u8],
	live_clusters: &[ClusterDescriptor],
) -> Result<(Vec<u8>, Vec<String>)> {
	if config.is_empty() {
		return Ok((Vec::new(), Vec::new()));
	}
	let mut parsed = Kubeconfig::parse(config)?;
	let removed = prune(&mut parsed, live_clusters);
	Ok((parsed.to_yaml()?.into_bytes(), removed))
}
