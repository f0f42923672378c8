use std::{io, path::PathBuf};

use thiserror::Error;

/// Boxed error produced by a [`ClusterDirectory`](crate::ClusterDirectory) implementation.
pub type UpstreamError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
	/// Input was rejected before any work was done: empty documents, fragments of the
	/// wrong shape, a missing current-context when one must be adopted.
	#[error("{0}")]
	Validation(String),

	#[error("failed to parse {what}: {source}")]
	Parse {
		what: &'static str,
		#[source]
		source: serde_yaml_with_quirks::Error,
	},

	#[error("failed to serialize kubeconfig: {0}")]
	Serialize(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

	#[error("{} does not exist", .0.display())]
	NotFound(PathBuf),

	/// Carried as a warning by [`sync`](crate::sync), returned as an error by
	/// [`save`](crate::save).
	#[error(transparent)]
	Collision(#[from] Collision),

	#[error("fetching kubeconfig for cluster {cluster}: {source}")]
	Upstream {
		cluster: String,
		#[source]
		source: UpstreamError,
	},

	#[error("{context} {}: {source}", path.display())]
	Io {
		context: &'static str,
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

impl Error {
	pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
		Self::Io {
			context,
			path: path.into(),
			source,
		}
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A live cluster that could not be written because its entry name is taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} `{context}` for cluster {cluster_id}")]
pub struct Collision {
	pub context: String,
	pub cluster_id: String,
	pub kind: CollisionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
	/// A context, cluster or user the tool does not own already uses the name.
	Foreign,
	/// Another live cluster with the same region and name claimed the entry first.
	DuplicateName,
}

impl std::fmt::Display for CollisionKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Foreign => write!(f, "kubeconfig already has an unmanaged entry"),
			Self::DuplicateName => write!(f, "another live cluster already maps to"),
		}
	}
}
