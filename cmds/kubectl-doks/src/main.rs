use anyhow::Result;
use clap::{Parser, Subcommand};
use kubectl_doks::{commands, telemetry};

#[derive(Parser)]
#[command(name = "kubectl-doks")]
#[command(
	about = "A kubectl plugin to sync DigitalOcean Kubernetes (DOKS) kubeconfig entries",
	long_about = "Synchronize all active DOKS clusters to your local kubeconfig and remove \
	              stale contexts, or save a single cluster's credentials interactively or by name."
)]
#[command(version = concat!(env!("KUBECTL_DOKS_VERSION"), "-", env!("KUBECTL_DOKS_COMMIT")))]
struct Cli {
	#[command(flatten)]
	global: commands::GlobalArgs,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Sync DOKS kubeconfig entries
	Kubeconfig(commands::kubeconfig::KubeconfigArgs),

	/// Print the version number of kubectl-doks
	Version,
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	let _telemetry = telemetry::init(cli.global.log_level, cli.global.verbose)?;

	let stdout = std::io::stdout();
	match cli.command {
		Commands::Kubeconfig(args) => commands::kubeconfig::run(args, &cli.global, stdout),
		Commands::Version => commands::version::run(stdout),
	}
}
