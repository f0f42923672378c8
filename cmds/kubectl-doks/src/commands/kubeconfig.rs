//! `kubectl doks kubeconfig ...`

use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use super::{save, sync, GlobalArgs};

#[derive(Args, Debug)]
pub struct KubeconfigArgs {
	/// Path to the kubeconfig file (default: first entry of $KUBECONFIG, else ~/.kube/config)
	#[arg(long, global = true)]
	pub kubeconfig: Option<PathBuf>,

	#[command(subcommand)]
	pub command: KubeconfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum KubeconfigCommands {
	/// Synchronize all DOKS clusters to the kubeconfig file
	Sync(sync::SyncArgs),

	/// Save a single cluster's credentials
	Save(save::SaveArgs),
}

pub fn run<W: Write>(args: KubeconfigArgs, global: &GlobalArgs, writer: W) -> Result<()> {
	let runtime = tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()
		.context("creating tokio runtime")?;

	let kubeconfig = args.kubeconfig.as_deref();
	match args.command {
		KubeconfigCommands::Sync(sync_args) => {
			runtime.block_on(sync::run_async(sync_args, kubeconfig, global, writer))
		}
		KubeconfigCommands::Save(save_args) => {
			runtime.block_on(save::run_async(save_args, kubeconfig, global, writer))
		}
	}
}
