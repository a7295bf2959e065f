//! Self-describing settings providers
//!
//! Backend and provider modules describe their own settings by implementing
//! [`SettingsProvider`]. The manager invokes the hook once when the provider is
//! registered; it never inspects the provider otherwise.

use crate::namespace::Namespace;
use crate::prelude::*;

pub trait SettingsProvider {
	/// The namespace (id, display metadata and schema) this provider owns
	fn settings_schema(&self) -> ChResult<Namespace>;
}

impl<F> SettingsProvider for F
where
	F: Fn() -> ChResult<Namespace>,
{
	fn settings_schema(&self) -> ChResult<Namespace> {
		self()
	}
}

// vim: ts=4
