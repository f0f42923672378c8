//! Crash-safe backups of the kubeconfig file.

use std::{
	fs::{self, File},
	io::{self, ErrorKind},
	path::{Path, PathBuf},
};

use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Copy `source` to `backup`, keeping its permission bits.
///
/// The copy is written to a temporary file next to `backup` and renamed into place, so
/// `backup` is either a complete copy or untouched. Both paths may start with `~`.
#[instrument(skip_all, fields(source = %source.as_ref().display(), backup = %backup.as_ref().display()))]
pub fn backup(source: impl AsRef<Path>, backup: impl AsRef<Path>) -> Result<()> {
	let source = expand_tilde(source.as_ref());
	let backup = expand_tilde(backup.as_ref());

	let metadata = match fs::metadata(&source) {
		Ok(m) => m,
		Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::NotFound(source)),
		Err(e) => return Err(Error::io("checking source file", source, e)),
	};

	let dir = match backup.parent() {
		Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
		_ => PathBuf::from("."),
	};
	fs::create_dir_all(&dir).map_err(|e| Error::io("creating backup directory", &dir, e))?;

	let mut temp = tempfile::Builder::new()
		.prefix(".kubectl-doks-backup-")
		.suffix(".tmp")
		.tempfile_in(&dir)
		.map_err(|e| Error::io("creating temp file in", &dir, e))?;

	let mut reader = File::open(&source).map_err(|e| Error::io("opening", &source, e))?;
	io::copy(&mut reader, &mut temp).map_err(|e| Error::io("copying", &source, e))?;
	fs::set_permissions(temp.path(), metadata.permissions())
		.map_err(|e| Error::io("setting permissions on", temp.path(), e))?;
	temp.as_file()
		.sync_all()
		.map_err(|e| Error::io("flushing", temp.path(), e))?;

	temp.persist(&backup)
		.map_err(|e| Error::io("renaming backup to", &backup, e.error))?;
	debug!("backup written");
	Ok(())
}

/// Expand a leading `~` to the home directory. Paths that cannot be expanded are returned
/// unchanged.
pub fn expand_tilde(path: &Path) -> PathBuf {
	let Ok(rest) = path.strip_prefix("~") else {
		return path.to_path_buf();
	};
	match dirs::home_dir() {
		Some(home) => home.join(rest),
		None => path.to_path_buf(),
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn test_backup_copies_content() {
		let dir = TempDir::new().unwrap();
		let source = dir.path().join("config");
		let target = dir.path().join("config.bak");
		fs::write(&source, "test kubeconfig content").unwrap();

		backup(&source, &target).expect("backup succeeds");

		assert_eq!(fs::read(&target).unwrap(), b"test kubeconfig content");
		// Only the source and the backup are left behind.
		assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
	}

	#[test]
	fn test_backup_creates_directory() {
		let dir = TempDir::new().unwrap();
		let source = dir.path().join("config");
		let target = dir.path().join("nested").join("dir").join("config.bak");
		fs::write(&source, "nested").unwrap();

		backup(&source, &target).expect("backup succeeds");
		assert_eq!(fs::read_to_string(&target).unwrap(), "nested");
	}

	#[test]
	fn test_backup_replaces_previous() {
		let dir = TempDir::new().unwrap();
		let source = dir.path().join("config");
		let target = dir.path().join("config.bak");
		fs::write(&target, "old backup").unwrap();
		fs::write(&source, "new content").unwrap();

		backup(&source, &target).expect("backup succeeds");
		assert_eq!(fs::read_to_string(&target).unwrap(), "new content");
	}

	#[test]
	fn test_backup_missing_source() {
		let dir = TempDir::new().unwrap();
		let target = dir.path().join("config.bak");

		assert_matches!(
			backup(dir.path().join("missing"), &target),
			Err(Error::NotFound(_))
		);
		assert!(!target.exists());
	}

	#[cfg(unix)]
	#[test]
	fn test_backup_keeps_permissions() {
		use std::os::unix::fs::PermissionsExt;

		let dir = TempDir::new().unwrap();
		let source = dir.path().join("config");
		let target = dir.path().join("config.bak");
		fs::write(&source, "secret").unwrap();
		fs::set_permissions(&source, fs::Permissions::from_mode(0o640)).unwrap();

		backup(&source, &target).expect("backup succeeds");
		let mode = fs::metadata(&target).unwrap().permissions().mode();
		assert_eq!(mode & 0o777, 0o640);
	}

	#[test]
	fn test_expand_tilde() {
		assert_eq!(
			expand_tilde(Path::new("/etc/kube/config")),
			PathBuf::from("/etc/kube/config")
		);
		if let Some(home) = dirs::home_dir() {
			assert_eq!(expand_tilde(Path::new("~")), home);
			assert_eq!(
				expand_tilde(Path::new("~/.kube/config")),
				home.join(".kube/config")
			);
		}
		assert_eq!(
			expand_tilde(Path::new("~other/config")),
			PathBuf::from("~other/config")
		);
	}
}
