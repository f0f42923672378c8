//! Which kubeconfig entries belong to this tool.
//!
//! A context `do-<region>-<name>` is managed when it points at a cluster of the same name
//! and a user named `<context>-admin`. Anything else, including a `do-` context that
//! breaks one of those rules, is foreign and must never be changed.

use crate::{directory::ClusterDescriptor, document::Kubeconfig};

/// Prefix shared by every managed context name.
pub const CONTEXT_PREFIX: &str = "do-";

/// Suffix appended to a managed context name to form its user name.
pub const USER_SUFFIX: &str = "-admin";

/// The context name a live cluster is written under.
pub fn context_name(cluster: &ClusterDescriptor) -> String {
	format!("{CONTEXT_PREFIX}{}-{}", cluster.region, cluster.name)
}

/// The user name belonging to a managed context.
pub fn user_name(context_name: &str) -> String {
	format!("{context_name}{USER_SUFFIX}")
}

/// Whether `context_name` names a context this tool owns.
pub fn is_managed(config: &Kubeconfig, context_name: &str) -> bool {
	if !context_name.starts_with(CONTEXT_PREFIX) {
		return false;
	}
	config
		.context(context_name)
		.is_some_and(|ctx| ctx.cluster == context_name && ctx.user == user_name(context_name))
}

/// Whether any entry of the managed triple for `context_name` exists without being
/// managed, so that writing the triple would overwrite someone else's data.
pub(crate) fn is_foreign_occupied(config: &Kubeconfig, context_name: &str) -> bool {
	if config.has_context(context_name) {
		return !is_managed(config, context_name);
	}
	config.cluster(context_name).is_some() || config.user(&user_name(context_name)).is_some()
}
