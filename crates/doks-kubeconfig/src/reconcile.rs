//! One sync pass: prune stale entries, add or refresh live clusters, pick a current
//! context, and write the result if anything changed.

use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};

use crate::{
	directory::{ClusterDescriptor, ClusterDirectory},
	document::Kubeconfig,
	error::{Collision, CollisionKind, Error, Result},
	file::KubeconfigFile,
	identity::{cluster_id, set_cluster_id},
	merge::merge,
	ownership::{context_name, is_foreign_occupied, is_managed, user_name},
	prune::prune,
};

/// Options for a sync pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
	/// Re-fetch every live cluster, even ones that are already up to date.
	pub force: bool,
	/// Select the added context when exactly one was added and nothing valid is selected.
	pub set_current_context: bool,
	/// Lifetime of fetched credentials. `None` asks for credentials that do not expire.
	pub ttl_seconds: Option<u64>,
}

/// The in-memory result of reconciling a document against the live clusters.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
	pub config: Kubeconfig,
	/// Managed contexts removed because their cluster is gone.
	pub removed: Vec<String>,
	/// Contexts written from a freshly fetched kubeconfig, new or refreshed.
	pub added: Vec<String>,
	/// Live clusters that were skipped.
	pub collisions: Vec<Collision>,
}

impl Reconciliation {
	pub fn changed(&self) -> bool {
		!self.removed.is_empty() || !self.added.is_empty()
	}
}

/// Outcome of [`sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
	pub removed: Vec<String>,
	pub added: Vec<String>,
	pub collisions: Vec<Collision>,
	/// The selected context after the pass.
	pub current_context: String,
	/// Whether the kubeconfig file was rewritten.
	pub written: bool,
	/// Where the previous file was backed up, if it was.
	pub backup: Option<PathBuf>,
}

/// Bring the managed entries of `file` in line with `live_clusters` and write the result.
///
/// Nothing is written when no context was removed or added. Any error, including a failed
/// fetch for a single cluster, aborts the pass before the file is touched.
#[instrument(skip_all, fields(path = %file.path().display(), live = live_clusters.len()))]
pub async fn sync<D: ClusterDirectory>(
	file: &KubeconfigFile,
	live_clusters: &[ClusterDescriptor],
	directory: &D,
	opts: SyncOptions,
) -> Result<SyncReport> {
	let config = file.document()?;
	let Reconciliation {
		config,
		removed,
		added,
		collisions,
	} = reconcile(config, live_clusters, directory, opts).await?;

	let (written, backup) = if removed.is_empty() && added.is_empty() {
		info!("kubeconfig is already up to date");
		(false, None)
	} else {
		(true, file.commit(&config)?)
	};

	Ok(SyncReport {
		removed,
		added,
		collisions,
		current_context: config.current_context,
		written,
		backup,
	})
}

/// Reconcile `config` against `live_clusters` without touching the filesystem.
#[instrument(skip_all, fields(live = live_clusters.len()))]
pub async fn reconcile<D: ClusterDirectory>(
	mut config: Kubeconfig,
	live_clusters: &[ClusterDescriptor],
	directory: &D,
	opts: SyncOptions,
) -> Result<Reconciliation> {
	let previous_context = config.current_context.clone();

	let removed = prune(&mut config, live_clusters);
	if !removed.is_empty() {
		info!(contexts = ?removed, "removing stale contexts");
	}

	let (clusters, mut collisions) = dedup_by_context(&config, live_clusters);
	let mut added = Vec::new();

	for cluster in clusters {
		let name = context_name(cluster);

		if is_foreign_occupied(&config, &name) {
			warn!(context = %name, cluster_id = %cluster.id, "skipping cluster, name is used by an unmanaged entry");
			collisions.push(Collision {
				context: name,
				cluster_id: cluster.id.clone(),
				kind: CollisionKind::Foreign,
			});
			continue;
		}

		let tagged = config.cluster(&name).and_then(cluster_id);
		let up_to_date = config.has_context(&name)
			&& config.user(&user_name(&name)).is_some()
			&& tagged == Some(cluster.id.as_str());
		if up_to_date && !opts.force {
			debug!(context = %name, "already up to date");
			continue;
		}
		if let Some(old) = tagged.filter(|old| *old != cluster.id) {
			info!(context = %name, old_id = %old, new_id = %cluster.id, "cluster was recreated, refreshing");
		}

		let fragment = fetch_fragment(directory, cluster, &name, opts.ttl_seconds).await?;
		config = merge(&config, &fragment, false)?;
		stamp(&mut config, &name, &cluster.id)?;
		added.push(name);
	}

	if !added.is_empty() {
		info!(contexts = ?added, "adding contexts");
	}

	let was_cleared = !previous_context.is_empty() && removed.contains(&previous_context);
	if opts.set_current_context
		&& added.len() == 1
		&& (config.current_context.is_empty() || was_cleared)
	{
		config.current_context.clone_from(&added[0]);
		info!(context = %config.current_context, "set current context");
	}

	Ok(Reconciliation {
		config,
		removed,
		added,
		collisions,
	})
}

/// Pick one live cluster per context name. When several share a region and name, the one
/// the existing entry is tagged with wins, otherwise the first listed; the rest are
/// reported as collisions.
fn dedup_by_context<'a>(
	config: &Kubeconfig,
	live_clusters: &'a [ClusterDescriptor],
) -> (Vec<&'a ClusterDescriptor>, Vec<Collision>) {
	let mut winners: Vec<(String, &ClusterDescriptor)> = Vec::new();
	let mut collisions = Vec::new();

	for cluster in live_clusters {
		let name = context_name(cluster);
		let Some(slot) = winners.iter_mut().find(|(n, _)| *n == name) else {
			winners.push((name, cluster));
			continue;
		};

		let tagged = is_managed(config, &name)
			.then(|| config.cluster(&name).and_then(cluster_id))
			.flatten();
		let loser = if tagged == Some(cluster.id.as_str()) {
			std::mem::replace(&mut slot.1, cluster)
		} else {
			cluster
		};
		warn!(context = %name, cluster_id = %loser.id, "another live cluster has the same region and name");
		collisions.push(Collision {
			context: name,
			cluster_id: loser.id.clone(),
			kind: CollisionKind::DuplicateName,
		});
	}

	(winners.into_iter().map(|(_, c)| c).collect(), collisions)
}

/// Fetch and parse the kubeconfig for `cluster`, checking that it holds exactly the managed
/// entries for `expected_context`.
pub(crate) async fn fetch_fragment<D: ClusterDirectory>(
	directory: &D,
	cluster: &ClusterDescriptor,
	expected_context: &str,
	ttl_seconds: Option<u64>,
) -> Result<Kubeconfig> {
	let bytes = directory
		.fetch_fragment(cluster, ttl_seconds)
		.await
		.map_err(|e| Error::Upstream {
			cluster: cluster.name.clone(),
			source: Box::new(e),
		})?;
	let fragment = Kubeconfig::parse_named(&bytes, "cluster kubeconfig")?;

	let single = fragment.clusters.len() == 1
		&& fragment.users.len() == 1
		&& fragment.contexts.len() == 1;
	if !single || !is_managed(&fragment, expected_context) {
		return Err(Error::Validation(format!(
			"kubeconfig for cluster {} does not hold a single `{expected_context}` context",
			cluster.name
		)));
	}
	Ok(fragment)
}

pub(crate) fn stamp(config: &mut Kubeconfig, context: &str, id: &str) -> Result<()> {
	let entry = config
		.cluster_mut(context)
		.ok_or_else(|| Error::Validation(format!("cluster `{context}` missing after merge")))?;
	set_cluster_id(entry, id);
	Ok(())
}
