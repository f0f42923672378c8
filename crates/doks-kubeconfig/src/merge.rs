//! Folding a single-cluster kubeconfig into a larger one.

use tracing::instrument;

use crate::{
	document::{upsert, Kubeconfig},
	error::{Error, Result},
};

/// Merge `fragment` into a copy of `target`.
///
/// Clusters, users and contexts present in `fragment` replace the entries of the same name
/// in `target`; all other entries are kept. With `adopt_current_context` the result selects
/// the fragment's current context, which must then be set. `target` is never modified, so a
/// failed merge leaves the caller's document as it was.
#[instrument(skip_all, fields(adopt_current_context))]
pub fn merge(
	target: &Kubeconfig,
	fragment: &Kubeconfig,
	adopt_current_context: bool,
) -> Result<Kubeconfig> {
	if adopt_current_context && fragment.current_context.is_empty() {
		return Err(Error::Validation(
			"cannot set current context: new config does not have a current context set".into(),
		));
	}

	let mut merged = target.clone();
	for cluster in &fragment.clusters {
		upsert(&mut merged.clusters, cluster.clone());
	}
	for user in &fragment.users {
		upsert(&mut merged.users, user.clone());
	}
	for context in &fragment.contexts {
		upsert(&mut merged.contexts, context.clone());
	}
	if adopt_current_context {
		merged.current_context.clone_from(&fragment.current_context);
	}

	Ok(merged)
}

/// [`merge`] over serialized documents. Both sides must be non-empty: pass a serialized
/// [`Kubeconfig::new`] when there is nothing to merge into.
pub fn merge_bytes(source: &[u8], fragment: &[u8], adopt_current_context: bool) -> Result<String> {
	let target = Kubeconfig::parse_named(source, "source kubeconfig")?;
	let fragment = Kubeconfig::parse_named(fragment, "new kubeconfig")?;
	merge(&target, &fragment, adopt_current_context)?.to_yaml()
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;

	use super::*;

	const SOURCE: &str = indoc! {"
		apiVersion: v1
		clusters:
		- cluster:
		    certificate-authority-data: c291cmNlLWNhLWRhdGE=
		    server: https://source.example.com
		  name: source-cluster
		contexts:
		- context:
		    cluster: source-cluster
		    user: source-user
		  name: source-context
		current-context: source-context
		kind: Config
		users:
		- name: source-user
		  user:
		    client-certificate-data: c291cmNlLWNlcnQtZGF0YQ==
		    client-key-data: c291cmNlLWtleS1kYXRh
	"};

	const NEW: &str = indoc! {"
		apiVersion: v1
		clusters:
		- cluster:
		    certificate-authority-data: bmV3LWNhLWRhdGE=
		    server: https://new.example.com
		  name: new-cluster
		contexts:
		- context:
		    cluster: new-cluster
		    user: new-user
		  name: new-context
		current-context: new-context
		kind: Config
		users:
		- name: new-user
		  user:
		    client-certificate-data: bmV3LWNlcnQtZGF0YQ==
		    client-key-data: bmV3LWtleS1kYXRh
	"};

	fn parse(s: &str) -> Kubeconfig {
		Kubeconfig::parse(s.as_bytes()).expect("valid config")
	}

	#[test]
	fn test_merge_keeps_both_sides() {
		let source = parse(SOURCE);
		let new = parse(NEW);
		let merged = merge(&source, &new, false).expect("merge succeeds");

		for name in ["source-cluster", "new-cluster"] {
			assert!(merged.cluster(name).is_some(), "{name} missing");
		}
		for name in ["source-user", "new-user"] {
			assert!(merged.user(name).is_some(), "{name} missing");
		}
		for name in ["source-context", "new-context"] {
			assert!(merged.has_context(name), "{name} missing");
		}
		assert_eq!(merged.cluster("source-cluster"), source.cluster("source-cluster"));
		assert_eq!(merged.cluster("new-cluster"), new.cluster("new-cluster"));
		assert_eq!(merged.current_context, "source-context");
	}

	#[test]
	fn test_merge_adopts_current_context() {
		let merged = merge(&parse(SOURCE), &parse(NEW), true).expect("merge succeeds");
		assert_eq!(merged.current_context, "new-context");
	}

	#[test]
	fn test_merge_overwrites_same_name() {
		let source = parse(SOURCE);
		let mut update = parse(SOURCE);
		update.clusters[0]
			.cluster
			.other
			.insert("server".into(), "https://moved.example.com".into());
		update.current_context.clear();

		let merged = merge(&source, &update, false).expect("merge succeeds");
		assert_eq!(merged.clusters.len(), 1);
		assert_eq!(
			merged.cluster("source-cluster").unwrap().other["server"],
			"https://moved.example.com"
		);
	}

	#[test]
	fn test_adopt_requires_current_context() {
		let source = parse(SOURCE);
		let mut new = parse(NEW);
		new.current_context.clear();

		assert_matches!(merge(&source, &new, true), Err(Error::Validation(_)));
		// Without adoption the missing current context is fine.
		assert!(merge(&source, &new, false).is_ok());
	}

	#[test]
	fn test_merge_bytes_rejects_empty() {
		assert_matches!(
			merge_bytes(b"", NEW.as_bytes(), false),
			Err(Error::Validation(_))
		);
		assert_matches!(
			merge_bytes(SOURCE.as_bytes(), b"", false),
			Err(Error::Validation(_))
		);
	}

	#[test]
	fn test_merge_bytes_rejects_invalid() {
		assert_matches!(
			merge_bytes(b"not-valid-yaml!", NEW.as_bytes(), false),
			Err(Error::Parse { .. })
		);
		assert_matches!(
			merge_bytes(SOURCE.as_bytes(), b"not-valid-yaml!", false),
			Err(Error::Parse { .. })
		);
	}

	#[test]
	fn test_merge_bytes_into_new_document() {
		let empty = Kubeconfig::new().to_yaml().expect("serializes");
		let merged = merge_bytes(empty.as_bytes(), NEW.as_bytes(), true).expect("merge succeeds");
		let merged = parse(&merged);
		assert_eq!(merged.current_context, "new-context");
		assert_eq!(merged.contexts.len(), 1);
	}
}
