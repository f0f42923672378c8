//! Finding the DigitalOcean access tokens to use.

use std::{
	collections::{BTreeMap, HashSet},
	fs,
	io::ErrorKind,
	path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, instrument};

pub const TOKEN_ENV: &str = "DIGITALOCEAN_ACCESS_TOKEN";

/// Where tokens were asked to come from on the command line. The variants are mutually
/// exclusive; the CLI refuses more than one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSource {
	/// `--access-token`
	Tokens(Vec<String>),
	/// `--auth-context`
	Contexts(Vec<String>),
	/// `--all-auth-contexts`
	AllContexts,
	/// No flag: the environment, then the current doctl context.
	Ambient,
}

impl AuthSource {
	pub fn from_flags(tokens: &[String], contexts: &[String], all_contexts: bool) -> Self {
		if !tokens.is_empty() {
			Self::Tokens(tokens.to_vec())
		} else if !contexts.is_empty() {
			Self::Contexts(contexts.to_vec())
		} else if all_contexts {
			Self::AllContexts
		} else {
			Self::Ambient
		}
	}
}

/// The part of doctl's `config.yaml` that holds credentials.
#[derive(Debug, Default, Deserialize)]
pub struct DoctlConfig {
	#[serde(rename = "access-token", default)]
	access_token: Option<String>,
	#[serde(default)]
	context: Option<String>,
	#[serde(rename = "auth-contexts", default)]
	auth_contexts: BTreeMap<String, Option<ContextToken>>,
}

/// doctl stores `true` instead of a token for a context that uses the top-level
/// `access-token`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContextToken {
	Flag(bool),
	Token(String),
}

impl DoctlConfig {
	pub fn parse(data: &str) -> Result<Self> {
		if data.trim().is_empty() {
			return Ok(Self::default());
		}
		Ok(serde_yaml_with_quirks::from_str(data)?)
	}

	/// Read the config at `path`. A missing file is `None`.
	pub fn load(path: &Path) -> Result<Option<Self>> {
		let data = match fs::read_to_string(path) {
			Ok(data) => data,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => {
				return Err(e).with_context(|| {
					format!("failed to read doctl config file at {:?}", path.display())
				})
			}
		};
		Self::parse(&data)
			.with_context(|| format!("failed to parse doctl config file at {:?}", path.display()))
			.map(Some)
	}

	/// The token of the context called `name`, if there is a non-empty one.
	pub fn context_token(&self, name: &str) -> Option<&str> {
		let token = match self.auth_contexts.get(name)?.as_ref()? {
			ContextToken::Flag(true) => self.access_token.as_deref()?,
			ContextToken::Flag(false) => return None,
			ContextToken::Token(t) if t == "true" => self.access_token.as_deref()?,
			ContextToken::Token(t) => t,
		};
		(!token.is_empty()).then_some(token)
	}

	pub fn current_context(&self) -> &str {
		self.context
			.as_deref()
			.filter(|c| !c.is_empty())
			.unwrap_or("default")
	}

	/// Context names in sorted order.
	pub fn context_names(&self) -> impl Iterator<Item = &str> {
		self.auth_contexts.keys().map(String::as_str)
	}
}

/// `--config`, else doctl's default location for this platform.
pub fn doctl_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
	if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
		return Some(path.to_path_buf());
	}
	let home = dirs::home_dir()?;
	Some(if cfg!(target_os = "macos") {
		home.join("Library/Application Support/doctl/config.yaml")
	} else {
		home.join(".config/doctl/config.yaml")
	})
}

/// Resolve the tokens to use, de-duplicated in the order they were found.
///
/// `env_token` is the value of [`TOKEN_ENV`].
#[instrument(skip_all)]
pub fn resolve(
	source: &AuthSource,
	config_path: Option<&Path>,
	env_token: Option<String>,
) -> Result<Vec<String>> {
	let contexts = match source {
		AuthSource::Tokens(tokens) => {
			let tokens = unique(tokens.iter().map(String::as_str).filter(|t| !t.is_empty()));
			if tokens.is_empty() {
				bail!("--access-token was given without a token");
			}
			return Ok(tokens);
		}
		AuthSource::Contexts(names) => Some(names.clone()),
		AuthSource::AllContexts => None,
		AuthSource::Ambient => {
			if let Some(token) = env_token.filter(|t| !t.is_empty()) {
				debug!("using token from {TOKEN_ENV}");
				return Ok(vec![token]);
			}
			let config = match config_path {
				Some(path) => DoctlConfig::load(path)?,
				None => None,
			};
			let Some(config) = config else {
				bail!("no DigitalOcean access token found");
			};
			let current = config.current_context();
			debug!(context = current, "using current doctl context");
			return config
				.context_token(current)
				.map(|t| vec![t.to_owned()])
				.context("no DigitalOcean access token found");
		}
	};

	let Some(path) = config_path else {
		bail!("cannot locate the doctl config file: no home directory");
	};
	let Some(config) = DoctlConfig::load(path)? else {
		bail!("doctl config file not found at {:?}", path.display());
	};
	let tokens = match &contexts {
		Some(names) => unique(names.iter().filter_map(|n| config.context_token(n))),
		None => unique(config.context_names().filter_map(|n| config.context_token(n))),
	};
	if tokens.is_empty() {
		bail!("no tokens found for the specified auth contexts");
	}
	Ok(tokens)
}

fn unique<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Vec<String> {
	let mut seen = HashSet::new();
	tokens
		.into_iter()
		.filter(|t| seen.insert(*t))
		.map(str::to_owned)
		.collect()
}
