//! Dotenv-style secrets store
//!
//! One `KEY=value` line per secret, keyed by the field's `env_key`. Comments,
//! blank lines and keys this process does not manage are written back as
//! they were read.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod envfile;
mod error;

pub use envfile::{EnvFile, ParseError};
pub use error::Error;

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use confhub_types::error::ChResult;
use confhub_types::store_adapter::{SecretAdapter, SecretChange};

#[derive(Debug)]
pub struct DotenvSecretAdapter {
	path: PathBuf,
	lock: Mutex<()>,
}

impl DotenvSecretAdapter {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into(), lock: Mutex::new(()) }
	}

	/// `None` when the file does not exist yet
	fn read_file(&self) -> Result<Option<EnvFile>, Error> {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};
		let text = String::from_utf8(bytes).map_err(|e| {
			let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
			Error::Parse {
				path: self.path.clone(),
				line: valid.iter().filter(|b| **b == b'\n').count() + 1,
				reason: "not valid UTF-8".into(),
			}
		})?;
		EnvFile::parse(&text).map(Some).map_err(|e| Error::Parse {
			path: self.path.clone(),
			line: e.line,
			reason: e.reason,
		})
	}

	fn write_file(&self, file: &EnvFile) -> Result<(), Error> {
		if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
			fs::create_dir_all(dir)?;
		}

		let tmp_path = tmp_file_path(&self.path);
		let written = create_private(&tmp_path).and_then(|mut out| {
			out.write_all(file.to_string().as_bytes())?;
			out.sync_all()
		});
		if let Err(e) = written.and_then(|()| fs::rename(&tmp_path, &self.path)) {
			debug!("Write of {} failed, removing tmpfile: {:?}", self.path.display(), &tmp_path);
			fs::remove_file(&tmp_path).ok();
			return Err(e.into());
		}
		Ok(())
	}
}

impl SecretAdapter for DotenvSecretAdapter {
	fn load(&self) -> ChResult<HashMap<String, String>> {
		let _guard = self.lock.lock();
		let Some(file) = self.read_file()? else {
			info!("Secrets file {} not found, using defaults", self.path.display());
			return Ok(HashMap::new());
		};

		let entries = file.entries();
		debug!("Loaded {} secrets from {}", entries.len(), self.path.display());
		Ok(entries)
	}

	fn save(&self, changes: &[SecretChange]) -> ChResult<()> {
		let _guard = self.lock.lock();
		let mut file = self.read_file()?.unwrap_or_default();
		for change in changes {
			match &change.value {
				Some(value) => file.set(&change.env_key, value),
				None => {
					file.remove(&change.env_key);
				}
			}
		}
		self.write_file(&file)?;

		// Values are never logged
		debug!("Wrote {} secret change(s) to {}", changes.len(), self.path.display());
		Ok(())
	}

	fn path(&self) -> Option<&Path> {
		Some(&self.path)
	}
}

fn tmp_file_path(path: &Path) -> PathBuf {
	let name = path.file_name().map_or_else(|| "secrets".into(), |n| n.to_string_lossy());
	path.with_file_name(format!(".{}.tmp", name))
}

/// Secrets files are created owner-readable only
#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<fs::File> {
	use std::os::unix::fs::OpenOptionsExt;

	fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<fs::File> {
	fs::File::create(path)
}

// vim: ts=4
