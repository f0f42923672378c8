//! Command handlers and the flags they share.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use doks_api::AccountDirectory;
use tracing::Level;

use crate::credentials::{self, AuthSource, TOKEN_ENV};

pub mod kubeconfig;
pub mod save;
pub mod sync;
pub mod version;

/// Flags accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
	/// DigitalOcean API V2 token (can be given multiple times)
	#[arg(
		short = 't',
		long = "access-token",
		global = true,
		value_delimiter = ',',
		conflicts_with_all = ["auth_contexts", "all_auth_contexts"]
	)]
	pub access_tokens: Vec<String>,

	/// Use this doctl authentication context (can be given multiple times)
	#[arg(
		long = "auth-context",
		global = true,
		value_delimiter = ',',
		conflicts_with = "all_auth_contexts"
	)]
	pub auth_contexts: Vec<String>,

	/// Use every doctl authentication context
	#[arg(long, global = true)]
	pub all_auth_contexts: bool,

	/// Override the default DigitalOcean API endpoint
	#[arg(short = 'u', long, global = true)]
	pub api_url: Option<String>,

	/// Path to the doctl config file (default: $HOME/.config/doctl/config.yaml)
	#[arg(short = 'c', long, global = true)]
	pub config: Option<PathBuf>,

	/// Lifetime of fetched credentials in seconds; 0 asks for credentials that do not expire
	#[arg(long, global = true, default_value_t = 0)]
	pub expiry_seconds: u64,

	/// Report what is being changed
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Log level (overrides RUST_LOG)
	#[arg(long, global = true)]
	pub log_level: Option<Level>,
}

impl GlobalArgs {
	pub fn auth_source(&self) -> AuthSource {
		AuthSource::from_flags(
			&self.access_tokens,
			&self.auth_contexts,
			self.all_auth_contexts,
		)
	}

	pub fn ttl_seconds(&self) -> Option<u64> {
		(self.expiry_seconds > 0).then_some(self.expiry_seconds)
	}

	/// A directory over every account the resolved tokens give access to.
	pub fn directory(&self) -> Result<AccountDirectory> {
		let tokens = credentials::resolve(
			&self.auth_source(),
			credentials::doctl_config_path(self.config.as_deref()).as_deref(),
			std::env::var(TOKEN_ENV).ok(),
		)?;
		AccountDirectory::from_tokens(&tokens, self.api_url.as_deref())
			.context("creating DigitalOcean client")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ttl_seconds() {
		let mut args = GlobalArgs::default();
		assert_eq!(args.ttl_seconds(), None);
		args.expiry_seconds = 600;
		assert_eq!(args.ttl_seconds(), Some(600));
	}
}
