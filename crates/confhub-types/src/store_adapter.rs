//! Storage adapter traits
//!
//! Settings are persisted in two physically separate stores: a structured
//! document for non-secret values (one section per namespace) and a key/value
//! file for secrets (one entry per `env_key`). Adapters must rewrite only the
//! entries they are asked to change and leave everything else in the file
//! untouched.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::path::Path;

use crate::prelude::*;
use crate::value::SettingValue;

/// (namespace, key) address of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettingKey {
	pub namespace: String,
	pub key: String,
}

impl SettingKey {
	pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
		Self { namespace: namespace.into(), key: key.into() }
	}
}

impl fmt::Display for SettingKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}", self.namespace, self.key)
	}
}

/// One entry to write into the document store; `None` removes the entry
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
	pub key: SettingKey,
	pub value: Option<SettingValue>,
}

/// One entry to write into the secrets store; `None` removes the entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretChange {
	pub env_key: String,
	pub value: Option<String>,
}

/// Contents of the document store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSnapshot {
	pub values: HashMap<SettingKey, SettingValue>,
	/// Entries whose value has no `SettingValue` form (nested tables and the
	/// like), with a short description of what was found. They are reported
	/// rather than dropped so a field that owns one can refuse to load.
	pub unsupported: HashMap<SettingKey, String>,
}

impl DocumentSnapshot {
	pub fn is_empty(&self) -> bool {
		self.values.is_empty() && self.unsupported.is_empty()
	}
}

/// Non-secret value store
pub trait DocumentAdapter: Debug + Send + Sync {
	/// Read every entry of every namespace section.
	///
	/// A missing backing file is an empty store. A malformed one is
	/// `Error::LoadCorrupted`.
	fn load(&self) -> ChResult<DocumentSnapshot>;

	/// Apply the changes in place, preserving unrelated content
	fn save(&self, changes: &[DocumentChange]) -> ChResult<()>;

	/// Backing file, if the store has one
	fn path(&self) -> Option<&Path> {
		None
	}
}

/// Secret value store, keyed by `env_key`
pub trait SecretAdapter: Debug + Send + Sync {
	/// Read every entry. Same missing/malformed rules as `DocumentAdapter::load`.
	fn load(&self) -> ChResult<HashMap<String, String>>;

	/// Apply the changes in place, preserving comments and unmanaged keys
	fn save(&self, changes: &[SecretChange]) -> ChResult<()>;

	fn path(&self) -> Option<&Path> {
		None
	}
}

// vim: ts=4
