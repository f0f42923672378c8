//! The remote side of a sync: which clusters exist and how to get their kubeconfigs.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// A cluster as reported by the directory service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterDescriptor {
	pub id: String,
	pub name: String,
	pub region: String,
}

/// Source of live clusters and their single-cluster kubeconfig fragments.
pub trait ClusterDirectory {
	type Error: std::error::Error + Send + Sync + 'static;

	/// Every cluster reachable with the configured credentials.
	fn list_clusters(&self) -> impl Future<Output = Result<Vec<ClusterDescriptor>, Self::Error>>;

	/// The raw kubeconfig for one cluster. `ttl_seconds` of `None` asks for credentials
	/// that do not expire.
	fn fetch_fragment(
		&self,
		cluster: &ClusterDescriptor,
		ttl_seconds: Option<u64>,
	) -> impl Future<Output = Result<Vec<u8>, Self::Error>>;
}
