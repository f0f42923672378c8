//! Clusters across several accounts, each reached with its own token.

use std::{
	collections::HashMap,
	sync::{PoisonError, RwLock},
};

use doks_kubeconfig::{ClusterDescriptor, ClusterDirectory};
use tracing::{debug, instrument};

use crate::{
	client::Client,
	error::{Error, Result},
};

/// A [`ClusterDirectory`] over one or more accounts.
///
/// Listing records which account each cluster was found in, so that credentials are later
/// requested from the same account. A cluster visible to several accounts belongs to the
/// first one that listed it.
pub struct AccountDirectory {
	clients: Vec<Client>,
	owners: RwLock<HashMap<String, usize>>,
}

impl AccountDirectory {
	pub fn new(clients: Vec<Client>) -> Self {
		Self {
			clients,
			owners: RwLock::default(),
		}
	}

	pub fn from_tokens<S: AsRef<str>>(tokens: &[S], api_url: Option<&str>) -> Result<Self> {
		let clients = tokens
			.iter()
			.map(|t| Client::new(t.as_ref(), api_url))
			.collect::<Result<Vec<_>>>()?;
		Ok(Self::new(clients))
	}
}

impl ClusterDirectory for AccountDirectory {
	type Error = Error;

	#[instrument(skip_all, fields(accounts = self.clients.len()))]
	async fn list_clusters(&self) -> Result<Vec<ClusterDescriptor>> {
		let mut clusters = Vec::new();
		let mut owners = HashMap::new();

		for (account, client) in self.clients.iter().enumerate() {
			for cluster in client.list_clusters().await? {
				if owners.contains_key(&cluster.id) {
					debug!(cluster_id = %cluster.id, account, "cluster already listed by another account");
					continue;
				}
				owners.insert(cluster.id.clone(), account);
				clusters.push(cluster);
			}
		}

		*self.owners.write().unwrap_or_else(PoisonError::into_inner) = owners;
		Ok(clusters)
	}

	#[instrument(skip_all, fields(cluster = %cluster.name))]
	async fn fetch_fragment(
		&self,
		cluster: &ClusterDescriptor,
		ttl_seconds: Option<u64>,
	) -> Result<Vec<u8>> {
		let owner = self
			.owners
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(&cluster.id)
			.copied();
		let client = owner
			.and_then(|account| self.clients.get(account))
			.ok_or_else(|| Error::UnknownCluster(cluster.id.clone()))?;
		client.kubeconfig(&cluster.id, ttl_seconds).await
	}
}
