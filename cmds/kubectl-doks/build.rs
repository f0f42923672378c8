use std::process::Command;

fn main() {
	// Re-run if git HEAD changes
	println!("cargo:rerun-if-changed=.git/HEAD");
	println!("cargo:rerun-if-changed=.git/refs/");

	println!("cargo:rustc-env=KUBECTL_DOKS_VERSION={}", version());
	println!(
		"cargo:rustc-env=KUBECTL_DOKS_COMMIT={}",
		git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "dev".into())
	);
}

/// The release tag HEAD points at, else the crate version, always with a `v` prefix.
fn version() -> String {
	let version = git(&["describe", "--tags", "--exact-match", "HEAD"])
		.unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
	if version.starts_with('v') {
		version
	} else {
		format!("v{version}")
	}
}

fn git(args: &[&str]) -> Option<String> {
	let output = Command::new("git").args(args).output().ok()?;
	if !output.status.success() {
		return None;
	}
	let out = String::from_utf8(output.stdout).ok()?;
	let out = out.trim();
	(!out.is_empty()).then(|| out.to_string())
}
