//! Error types shared by every confhub crate

use std::fmt;
use std::path::PathBuf;

pub type ChResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// Unregistered namespace or field key
	NotFound(String),

	/// A schema declares the same field key twice
	DuplicateKey { namespace: String, key: String },

	/// Schema validation or an external validator rejected a value
	ValidationFailed { namespace: String, key: String, reason: String },

	/// Backend write failed; the triggering `set` is aborted
	PersistenceFailed(String),

	/// A backing file exists but could not be parsed at load time
	LoadCorrupted { path: PathBuf, reason: String },

	/// Invalid field or namespace descriptor
	ConfigError(String),

	// externals
	Io(std::io::Error),
}

impl Error {
	pub fn validation(
		namespace: impl Into<String>,
		key: impl Into<String>,
		reason: impl Into<String>,
	) -> Self {
		Error::ValidationFailed {
			namespace: namespace.into(),
			key: key.into(),
			reason: reason.into(),
		}
	}

	pub fn not_found(namespace: &str, key: Option<&str>) -> Self {
		match key {
			Some(key) => Error::NotFound(format!("{}.{}", namespace, key)),
			None => Error::NotFound(namespace.to_string()),
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::NotFound(what) => write!(f, "Setting not found: {}", what),
			Error::DuplicateKey { namespace, key } => {
				write!(f, "Duplicate key '{}' in namespace '{}'", key, namespace)
			}
			Error::ValidationFailed { namespace, key, reason } => {
				write!(f, "Invalid value for {}.{}: {}", namespace, key, reason)
			}
			Error::PersistenceFailed(msg) => write!(f, "Persistence failed: {}", msg),
			Error::LoadCorrupted { path, reason } => {
				write!(f, "Corrupted settings file {}: {}", path.display(), reason)
			}
			Error::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
			Error::Io(err) => write!(f, "I/O error: {}", err),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Io(err) => Some(err),
			_ => None,
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display_messages() {
		let err = Error::validation("voice_core", "temperature", "must be at most 1");
		assert_eq!(err.to_string(), "Invalid value for voice_core.temperature: must be at most 1");

		let err = Error::not_found("voice_core", Some("api_key"));
		assert_eq!(err.to_string(), "Setting not found: voice_core.api_key");

		let err = Error::DuplicateKey { namespace: "ns".into(), key: "k".into() };
		assert_eq!(err.to_string(), "Duplicate key 'k' in namespace 'ns'");
	}

	#[test]
	fn test_io_error_source() {
		let err: Error = std::io::Error::other("disk full").into();
		assert!(std::error::Error::source(&err).is_some());
		assert!(matches!(err, Error::Io(_)));
	}
}

// vim: ts=4
