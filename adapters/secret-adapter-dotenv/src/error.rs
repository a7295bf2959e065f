//! Error types for the dotenv secrets adapter

use std::fmt;
use std::path::PathBuf;

use confhub_types::error::Error as ConfhubError;

#[derive(Debug)]
pub enum Error {
	/// A non-comment line is not `KEY=value`, or the file is not UTF-8
	Parse { path: PathBuf, line: usize, reason: String },

	IoError(std::io::Error),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::Parse { path, line, reason } => {
				write!(f, "{}:{}: {}", path.display(), line, reason)
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
			Error::Parse { path, line, reason } => {
				ConfhubError::LoadCorrupted { path, reason: format!("line {}: {}", line, reason) }
			}
			Error::IoError(e) => ConfhubError::Io(e),
		}
	}
}

// vim: ts=4
