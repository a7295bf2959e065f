//! File locations of the two settings stores

use std::env;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_ENV: &str = "CONFHUB_SETTINGS_FILE";
pub const SECRETS_FILE_ENV: &str = "CONFHUB_SECRETS_FILE";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const SETTINGS_FILE_NAME: &str = "settings.toml";
pub const SECRETS_FILE_NAME: &str = "secrets.env";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsConfig {
	/// Non-secret values (TOML)
	pub document_path: PathBuf,
	/// Secret values (`KEY=value`)
	pub secrets_path: PathBuf,
}

impl SettingsConfig {
	pub fn new(document_path: impl Into<PathBuf>, secrets_path: impl Into<PathBuf>) -> Self {
		Self { document_path: document_path.into(), secrets_path: secrets_path.into() }
	}

	/// Both stores under one directory, with their default file names
	pub fn in_dir(dir: impl AsRef<Path>) -> Self {
		let dir = dir.as_ref();
		Self::new(dir.join(SETTINGS_FILE_NAME), dir.join(SECRETS_FILE_NAME))
	}

	/// Paths from `CONFHUB_SETTINGS_FILE` / `CONFHUB_SECRETS_FILE`, falling
	/// back to `./data/settings.toml` and `./data/secrets.env`
	pub fn from_env() -> Self {
		Self::from_lookup(|name| env::var(name).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let defaults = Self::default();
		let path = |name: &str, default: PathBuf| {
			lookup(name).filter(|value| !value.trim().is_empty()).map_or(default, PathBuf::from)
		};
		Self {
			document_path: path(SETTINGS_FILE_ENV, defaults.document_path),
			secrets_path: path(SECRETS_FILE_ENV, defaults.secrets_path),
		}
	}
}

impl Default for SettingsConfig {
	fn default() -> Self {
		Self::in_dir(DEFAULT_DATA_DIR)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = SettingsConfig::from_lookup(|_| None);
		assert_eq!(config.document_path, PathBuf::from("./data/settings.toml"));
		assert_eq!(config.secrets_path, PathBuf::from("./data/secrets.env"));
	}

	#[test]
	fn test_env_overrides() {
		let config = SettingsConfig::from_lookup(|name| match name {
			SETTINGS_FILE_ENV => Some("/etc/hub/settings.toml".into()),
			SECRETS_FILE_ENV => Some("  ".into()),
			_ => None,
		});
		assert_eq!(config.document_path, PathBuf::from("/etc/hub/settings.toml"));
		// Blank values fall back to the default
		assert_eq!(config.secrets_path, PathBuf::from("./data/secrets.env"));
	}
}

// vim: ts=4
