//! Kubeconfig document model and codec.
//!
//! Only the parts of the schema the reconciler reads are typed. Everything else is kept
//! in flattened maps, so entries this crate never touches survive a parse/serialize
//! cycle with the same content.

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::instrument;

use crate::error::{Error, Result};

/// A kubeconfig file: named clusters, users and contexts plus the current context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kubeconfig {
	#[serde(rename = "apiVersion", default, skip_serializing_if = "Option::is_none")]
	pub api_version: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub clusters: Vec<NamedCluster>,
	/// Credentials. Kubeconfig calls these users.
	#[serde(rename = "users", default, deserialize_with = "null_as_default")]
	pub users: Vec<NamedUser>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub contexts: Vec<NamedContext>,
	/// Empty when no context is selected.
	#[serde(rename = "current-context", default, deserialize_with = "null_as_default")]
	pub current_context: String,
	#[serde(flatten)]
	pub other: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
	pub name: String,
	#[serde(default)]
	pub cluster: ClusterEntry,
}

/// Connection data for a cluster. Only the extension list is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterEntry {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extensions: Option<Vec<NamedExtension>>,
	#[serde(flatten)]
	pub other: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedExtension {
	pub name: String,
	#[serde(default)]
	pub extension: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedUser {
	pub name: String,
	#[serde(default)]
	pub user: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
	pub name: String,
	#[serde(default)]
	pub context: ContextEntry,
}

/// A context: the pairing of one cluster with one user, by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
	#[serde(default, deserialize_with = "null_as_default")]
	pub cluster: String,
	#[serde(default, deserialize_with = "null_as_default")]
	pub user: String,
	#[serde(flatten)]
	pub other: Map<String, JsonValue>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Entries that can be addressed by name inside one of the document's collections.
pub trait Named {
	fn name(&self) -> &str;
}

impl Named for NamedCluster {
	fn name(&self) -> &str {
		&self.name
	}
}

impl Named for NamedUser {
	fn name(&self) -> &str {
		&self.name
	}
}

impl Named for NamedContext {
	fn name(&self) -> &str {
		&self.name
	}
}

/// Replace the entry with the same name, keeping its position, or append a new one.
pub(crate) fn upsert<T: Named>(entries: &mut Vec<T>, entry: T) {
	match entries.iter_mut().find(|e| e.name() == entry.name()) {
		Some(slot) => *slot = entry,
		None => entries.push(entry),
	}
}

pub(crate) fn remove<T: Named>(entries: &mut Vec<T>, name: &str) -> Option<T> {
	let idx = entries.iter().position(|e| e.name() == name)?;
	Some(entries.remove(idx))
}

impl Default for Kubeconfig {
	fn default() -> Self {
		Self::new()
	}
}

impl Kubeconfig {
	/// An empty `v1` config with nothing selected.
	pub fn new() -> Self {
		Self {
			api_version: Some("v1".to_owned()),
			kind: Some("Config".to_owned()),
			clusters: Vec::new(),
			users: Vec::new(),
			contexts: Vec::new(),
			current_context: String::new(),
			other: Map::new(),
		}
	}

	/// Parse a kubeconfig. Empty input, or input holding only comments, is rejected rather
	/// than read as an empty document.
	#[instrument(skip_all, fields(len = bytes.len()))]
	pub fn parse(bytes: &[u8]) -> Result<Self> {
		Self::parse_named(bytes, "kubeconfig")
	}

	pub(crate) fn parse_named(bytes: &[u8], what: &'static str) -> Result<Self> {
		if is_blank(bytes) {
			return Err(Error::Validation(format!("{what} cannot be empty")));
		}
		let text = std::str::from_utf8(bytes)
			.map_err(|e| Error::Validation(format!("{what} is not valid utf-8: {e}")))?;
		serde_yaml_with_quirks::from_str(text).map_err(|source| Error::Parse { what, source })
	}

	/// Serialize to YAML with keys ordered the way kubectl writes them.
	#[instrument(skip_all)]
	pub fn to_yaml(&self) -> Result<String> {
		let value = serde_json::to_value(self).map_err(|e| Error::Serialize(Box::new(e)))?;
		let sorted = sort_json_keys(value);

		let options = serde_saphyr::SerializerOptions {
			indent_step: 2,
			indent_array: Some(0),
			prefer_block_scalars: false,
			line_width: None,
			empty_map_as_braces: true,
			empty_array_as_brackets: true,
			quote_ambiguous_keys: true,
			quote_numeric_strings: true,
			..Default::default()
		};

		let mut output = String::new();
		serde_saphyr::to_fmt_writer_with_options(&mut output, &sorted, options)
			.map_err(|e| Error::Serialize(Box::new(e)))?;
		Ok(output)
	}

	pub fn cluster(&self, name: &str) -> Option<&ClusterEntry> {
		self.clusters
			.iter()
			.find(|c| c.name == name)
			.map(|c| &c.cluster)
	}

	pub fn cluster_mut(&mut self, name: &str) -> Option<&mut ClusterEntry> {
		self.clusters
			.iter_mut()
			.find(|c| c.name == name)
			.map(|c| &mut c.cluster)
	}

	pub fn user(&self, name: &str) -> Option<&Map<String, JsonValue>> {
		self.users.iter().find(|u| u.name == name).map(|u| &u.user)
	}

	pub fn context(&self, name: &str) -> Option<&ContextEntry> {
		self.contexts
			.iter()
			.find(|c| c.name == name)
			.map(|c| &c.context)
	}

	pub fn has_context(&self, name: &str) -> bool {
		self.context(name).is_some()
	}

	pub fn context_names(&self) -> impl Iterator<Item = &str> {
		self.contexts.iter().map(|c| c.name.as_str())
	}
}

/// Whether `bytes` holds no YAML content at all: only whitespace and `#` comments.
pub(crate) fn is_blank(bytes: &[u8]) -> bool {
	bytes.split(|b| *b == b'\n').all(|line| {
		let line = line.trim_ascii_start();
		line.is_empty() || line.starts_with(b"#")
	})
}

/// Sort object keys recursively in go-yaml's order, which is what kubectl emits.
fn sort_json_keys(value: JsonValue) -> JsonValue {
	match value {
		JsonValue::Object(map) => {
			let mut entries: Vec<(String, JsonValue)> = map.into_iter().collect();
			entries.sort_by(|(a, _), (b, _)| natural_key_cmp(a, b));
			JsonValue::Object(
				entries
					.into_iter()
					.map(|(k, v)| (k, sort_json_keys(v)))
					.collect(),
			)
		}
		JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(sort_json_keys).collect()),
		other => other,
	}
}

/// go-yaml's key order: digit runs compare numerically, and letters sort after other
/// characters unless they directly follow a digit.
fn natural_key_cmp(a: &str, b: &str) -> Ordering {
	let a: Vec<char> = a.chars().collect();
	let b: Vec<char> = b.chars().collect();
	let mut after_digit = false;

	for i in 0..a.len().min(b.len()) {
		if a[i] == b[i] {
			after_digit = a[i].is_ascii_digit();
			continue;
		}

		let (a_letter, b_letter) = (a[i].is_alphabetic(), b[i].is_alphabetic());
		if a_letter && b_letter {
			return a[i].cmp(&b[i]);
		}
		if a_letter != b_letter {
			let letter_first = if after_digit { a_letter } else { b_letter };
			return if letter_first {
				Ordering::Less
			} else {
				Ordering::Greater
			};
		}

		let (a_num, a_end) = digit_run(&a, i);
		let (b_num, b_end) = digit_run(&b, i);
		if a_num != b_num {
			return a_num.cmp(&b_num);
		}
		if a_end != b_end {
			return a_end.cmp(&b_end);
		}
		return a[i].cmp(&b[i]);
	}

	a.len().cmp(&b.len())
}

fn digit_run(chars: &[char], start: usize) -> (u64, usize) {
	let mut value: u64 = 0;
	let mut end = start;
	while let Some(d) = chars.get(end).and_then(|c| c.to_digit(10)) {
		value = value.saturating_mul(10).saturating_add(u64::from(d));
		end += 1;
	}
	(value, end)
}
