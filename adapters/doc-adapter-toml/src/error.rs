//! Error types for the TOML document adapter

use std::fmt;
use std::path::PathBuf;

use confhub_types::error::Error as ConfhubError;

#[derive(Debug)]
pub enum Error {
	/// The file exists but is not valid UTF-8 TOML
	Parse { path: PathBuf, reason: String },

	/// A namespace section exists but is not a table
	NotATable { path: PathBuf, section: String },

	IoError(std::io::Error),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::Parse { path, reason } => write!(f, "{}: {}", path.display(), reason),
			Error::NotATable { path, section } => {
				write!(f, "{}: section [{}] is not a table", path.display(), section)
			}
			Error::IoError(e) => write!(f, "io error: {}", e),
		}
	}
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
	fn from(e: std::io::Error) -> Self {
		Error::IoError(e)
	}
}

impl From<Error> for ConfhubError {
	fn from(err: Error) -> Self {
		match err {
			Error::Parse { path, reason } => ConfhubError::LoadCorrupted { path, reason },
			Error::NotATable { .. } => ConfhubError::PersistenceFailed(err.to_string()),
			Error::IoError(e) => ConfhubError::Io(e),
		}
	}
}

// vim: ts=4
