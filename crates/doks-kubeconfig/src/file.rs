//! Locating, reading and writing the kubeconfig file.

use std::{
	env,
	ffi::OsString,
	fs,
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};

use tracing::{debug, info, instrument};

use crate::{
	backup::{backup, expand_tilde},
	document::{is_blank, Kubeconfig},
	error::{Error, Result},
};

/// Appended to the kubeconfig path to name its backup.
pub const BACKUP_SUFFIX: &str = ".kubectl-doks.bak";

/// The kubeconfig file as it was found on disk at the start of a run.
#[derive(Debug, Clone)]
pub struct KubeconfigFile {
	path: PathBuf,
	contents: Option<Vec<u8>>,
}

impl KubeconfigFile {
	/// Read the kubeconfig at `path`, or at the default location. A missing file is not an
	/// error; it loads as a file with no contents.
	#[instrument(skip_all)]
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let path = resolve_path(path, env::var_os("KUBECONFIG"), dirs::home_dir())?;
		Self::load_from(path)
	}

	pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
		let path = path.into();
		let contents = match fs::read(&path) {
			Ok(bytes) => Some(bytes),
			Err(e) if e.kind() == ErrorKind::NotFound => None,
			Err(e) => return Err(Error::io("reading kubeconfig at", path, e)),
		};
		debug!(path = %path.display(), exists = contents.is_some(), "loaded kubeconfig");
		Ok(Self { path, contents })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Whether the file existed when it was loaded.
	pub fn exists(&self) -> bool {
		self.contents.is_some()
	}

	pub fn backup_path(&self) -> PathBuf {
		let mut path = self.path.clone().into_os_string();
		path.push(BACKUP_SUFFIX);
		PathBuf::from(path)
	}

	/// The parsed document. A missing file, or one holding only whitespace and comments, is
	/// a new, empty document.
	pub fn document(&self) -> Result<Kubeconfig> {
		match &self.contents {
			Some(bytes) if !is_blank(bytes) => Kubeconfig::parse(bytes),
			_ => Ok(Kubeconfig::new()),
		}
	}

	/// Back up the file as it was loaded, then replace it with `config`.
	///
	/// No backup is taken when the file did not exist. Returns the backup path if one was
	/// written.
	#[instrument(skip_all, fields(path = %self.path.display()))]
	pub fn commit(&self, config: &Kubeconfig) -> Result<Option<PathBuf>> {
		let yaml = config.to_yaml()?;

		let backup_path = if self.exists() {
			let backup_path = self.backup_path();
			backup(&self.path, &backup_path)?;
			info!(backup = %backup_path.display(), "backed up kubeconfig");
			Some(backup_path)
		} else {
			None
		};

		write_private(&self.path, yaml.as_bytes())?;
		Ok(backup_path)
	}
}

/// Pick the kubeconfig path: an explicit path, then the first entry of `KUBECONFIG`, then
/// `~/.kube/config`.
pub fn resolve_path(
	explicit: Option<&Path>,
	kubeconfig_env: Option<OsString>,
	home: Option<PathBuf>,
) -> Result<PathBuf> {
	if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
		return Ok(expand_tilde(path));
	}
	if let Some(first) = kubeconfig_env
		.as_deref()
		.and_then(|v| env::split_paths(v).find(|p| !p.as_os_str().is_empty()))
	{
		return Ok(first);
	}
	let home = home.ok_or_else(|| {
		Error::Validation("finding home directory: no home directory for the current user".into())
	})?;
	Ok(home.join(".kube").join("config"))
}

/// Replace `path` with `data`, readable and writable by the owner only.
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
	let dir = match path.parent() {
		Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
		_ => PathBuf::from("."),
	};
	fs::create_dir_all(&dir).map_err(|e| Error::io("creating directory", &dir, e))?;

	let mut temp =
		tempfile::NamedTempFile::new_in(&dir).map_err(|e| Error::io("creating temp file in", &dir, e))?;
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600))
			.map_err(|e| Error::io("setting permissions on", temp.path(), e))?;
	}
	temp.write_all(data)
		.and_then(|()| temp.as_file().sync_all())
		.map_err(|e| Error::io("writing", path, e))?;
	temp.persist(path)
		.map_err(|e| Error::io("writing updated kubeconfig to", path, e.error))?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn test_load_existing() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("config");
		fs::write(&path, "apiVersion: v1\nkind: Config\ncurrent-context: dev\n").unwrap();

		let file = KubeconfigFile::load(Some(path.as_path())).expect("loads");
		assert_eq!(file.path(), path);
		assert!(file.exists());
		assert_eq!(file.document().unwrap().current_context, "dev");
	}

	#[test]
	fn test_load_missing() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("non-existent-config");

		let file = KubeconfigFile::load_from(&path).expect("missing file is not an error");
		assert!(!file.exists());
		assert_eq!(file.document().unwrap(), Kubeconfig::new());
	}

	#[test]
	fn test_load_directory_fails() {
		let dir = TempDir::new().unwrap();
		assert_matches!(KubeconfigFile::load_from(dir.path()), Err(Error::Io { .. }));
	}

	#[test]
	fn test_blank_file_is_new_document() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("config");
		fs::write(&path, "\n").unwrap();

		let file = KubeconfigFile::load_from(&path).unwrap();
		assert!(file.exists());
		assert_eq!(file.document().unwrap(), Kubeconfig::new());
	}

	#[test]
	fn test_comment_only_file_is_new_document() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("config");
		fs::write(&path, "# managed by hand\n\n# nothing here yet\n").unwrap();

		let file = KubeconfigFile::load_from(&path).unwrap();
		assert_eq!(file.document().unwrap(), Kubeconfig::new());
	}

	#[test]
	fn test_resolve_path_precedence() {
		let home = PathBuf::from("/home/user");
		assert_eq!(
			resolve_path(None, None, Some(home.clone())).unwrap(),
			PathBuf::from("/home/user/.kube/config")
		);
		assert_eq!(
			resolve_path(None, Some("/a/one:/b/two".into()), Some(home.clone())).unwrap(),
			PathBuf::from("/a/one")
		);
		assert_eq!(
			resolve_path(
				Some(Path::new("/explicit")),
				Some("/a/one".into()),
				Some(home)
			)
			.unwrap(),
			PathBuf::from("/explicit")
		);
		assert_matches!(resolve_path(None, None, None), Err(Error::Validation(_)));
	}

	#[test]
	fn test_backup_path() {
		let file = KubeconfigFile::load_from("/nonexistent/dir/config").unwrap();
		assert_eq!(
			file.backup_path(),
			PathBuf::from("/nonexistent/dir/config.kubectl-doks.bak")
		);
	}

	#[test]
	fn test_commit_without_existing_file_skips_backup() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("kube").join("config");
		let file = KubeconfigFile::load_from(&path).unwrap();

		let backup = file.commit(&Kubeconfig::new()).expect("commit succeeds");
		assert_eq!(backup, None);
		assert!(path.exists());
		assert!(!file.backup_path().exists());
	}

	#[test]
	fn test_commit_backs_up_previous_contents() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("config");
		fs::write(&path, "apiVersion: v1\nkind: Config\n").unwrap();
		let file = KubeconfigFile::load_from(&path).unwrap();

		let backup = file.commit(&Kubeconfig::new()).expect("commit succeeds");
		assert_eq!(backup.as_deref(), Some(file.backup_path().as_path()));
		assert_eq!(
			fs::read_to_string(file.backup_path()).unwrap(),
			"apiVersion: v1\nkind: Config\n"
		);
		let written = Kubeconfig::parse(&fs::read(&path).unwrap()).unwrap();
		assert_eq!(written, Kubeconfig::new());
	}

	#[cfg(unix)]
	#[test]
	fn test_commit_restricts_permissions() {
		use std::os::unix::fs::PermissionsExt;

		let dir = TempDir::new().unwrap();
		let path = dir.path().join("config");
		let file = KubeconfigFile::load_from(&path).unwrap();
		file.commit(&Kubeconfig::new()).unwrap();

		let mode = fs::metadata(&path).unwrap().permissions().mode();
		assert_eq!(mode & 0o777, 0o600);
	}
}
