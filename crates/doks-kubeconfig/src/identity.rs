//! The cluster ID tag stored in a cluster entry's extensions.
//!
//! Context names are derived from region and name only, so a cluster that was deleted
//! and recreated under the same name maps to the same entry. The tag records which
//! remote cluster the entry was written for.

use serde_json::{json, Value as JsonValue};

use crate::document::{ClusterEntry, NamedExtension};

/// Extension name holding the DigitalOcean cluster ID.
pub const CLUSTER_ID_EXTENSION: &str = "digitalocean.com/cluster-id";

/// Read the tagged cluster ID, if there is a well-formed one.
pub fn cluster_id(cluster: &ClusterEntry) -> Option<&str> {
	cluster
		.extensions
		.as_ref()?
		.iter()
		.find(|e| e.name == CLUSTER_ID_EXTENSION)?
		.extension
		.get("id")
		.and_then(JsonValue::as_str)
}

/// Tag the entry with `id`, replacing any previous tag.
pub fn set_cluster_id(cluster: &mut ClusterEntry, id: &str) {
	let value = json!({ "id": id });
	let extensions = cluster.extensions.get_or_insert_with(Vec::new);
	match extensions
		.iter_mut()
		.find(|e| e.name == CLUSTER_ID_EXTENSION)
	{
		Some(existing) => existing.extension = value,
		None => extensions.push(NamedExtension {
			name: CLUSTER_ID_EXTENSION.to_owned(),
			extension: value,
		}),
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	fn with_extension(name: &str, extension: JsonValue) -> ClusterEntry {
		ClusterEntry {
			extensions: Some(vec![NamedExtension {
				name: name.to_owned(),
				extension,
			}]),
			..ClusterEntry::default()
		}
	}

	#[rstest]
	#[case::no_extensions(ClusterEntry::default(), None)]
	#[case::tagged(with_extension(CLUSTER_ID_EXTENSION, json!({"id": "test-id"})), Some("test-id"))]
	#[case::other_extension(with_extension("other-extension", json!({"key": "value"})), None)]
	#[case::not_an_object(with_extension(CLUSTER_ID_EXTENSION, json!("test-id")), None)]
	#[case::id_not_a_string(with_extension(CLUSTER_ID_EXTENSION, json!({"id": 42})), None)]
	fn test_cluster_id(#[case] cluster: ClusterEntry, #[case] expected: Option<&str>) {
		assert_eq!(cluster_id(&cluster), expected);
	}

	#[rstest]
	#[case::fresh_cluster(ClusterEntry::default())]
	#[case::replaces_tag(with_extension(CLUSTER_ID_EXTENSION, json!({"id": "old-id"})))]
	#[case::keeps_other(with_extension("other-extension", json!({"key": "value"})))]
	fn test_set_cluster_id(#[case] mut cluster: ClusterEntry) {
		let before = cluster.extensions.as_ref().map_or(0, Vec::len);
		set_cluster_id(&mut cluster, "updated-id");

		assert_eq!(cluster_id(&cluster), Some("updated-id"));
		let tags = cluster
			.extensions
			.as_ref()
			.expect("extensions created")
			.iter()
			.filter(|e| e.name == CLUSTER_ID_EXTENSION)
			.count();
		assert_eq!(tags, 1);
		assert!(cluster.extensions.as_ref().unwrap().len() >= before);
	}
}
