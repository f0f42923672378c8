use std::io::Write;

use anyhow::Result;

pub const VERSION: &str = env!("KUBECTL_DOKS_VERSION");
pub const COMMIT: &str = env!("KUBECTL_DOKS_COMMIT");

/// Print `<version>-<commit>`.
pub fn run<W: Write>(mut writer: W) -> Result<()> {
	writeln!(writer, "{VERSION}-{COMMIT}")?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_version_line() {
		let mut out = Vec::new();
		run(&mut out).unwrap();
		let line = String::from_utf8(out).unwrap();
		assert!(line.starts_with('v'), "{line}");
		assert!(line.ends_with(&format!("-{COMMIT}\n")), "{line}");
	}
}
