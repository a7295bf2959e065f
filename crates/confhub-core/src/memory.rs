//! In-memory storage adapters
//!
//! Used by tests and by embedders that do not want file persistence. Every
//! save is counted, and saves can be made to fail on demand to exercise the
//! persistence failure path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use confhub_types::store_adapter::{
	DocumentAdapter, DocumentChange, DocumentSnapshot, SecretAdapter, SecretChange, SettingKey,
};
use confhub_types::value::SettingValue;

use crate::prelude::*;

#[derive(Debug, Default)]
pub struct MemoryDocumentAdapter {
	values: Mutex<HashMap<SettingKey, SettingValue>>,
	unsupported: Mutex<HashMap<SettingKey, String>>,
	saves: AtomicUsize,
	fail_saves: AtomicBool,
}

impl MemoryDocumentAdapter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Pre-populate the store, as if loaded from disk
	pub fn with_values(values: impl IntoIterator<Item = (SettingKey, SettingValue)>) -> Self {
		Self { values: Mutex::new(values.into_iter().collect()), ..Self::default() }
	}

	/// Pretend the store holds an entry with no `SettingValue` form
	pub fn with_unsupported(self, key: SettingKey, found: impl Into<String>) -> Self {
		self.unsupported.lock().insert(key, found.into());
		self
	}

	pub fn snapshot(&self) -> HashMap<SettingKey, SettingValue> {
		self.values.lock().clone()
	}

	pub fn save_count(&self) -> usize {
		self.saves.load(Ordering::SeqCst)
	}

	pub fn fail_saves(&self, fail: bool) {
		self.fail_saves.store(fail, Ordering::SeqCst);
	}
}

impl DocumentAdapter for MemoryDocumentAdapter {
	fn load(&self) -> ChResult<DocumentSnapshot> {
		Ok(DocumentSnapshot {
			values: self.values.lock().clone(),
			unsupported: self.unsupported.lock().clone(),
		})
	}

	fn save(&self, changes: &[DocumentChange]) -> ChResult<()> {
		if self.fail_saves.load(Ordering::SeqCst) {
			return Err(Error::PersistenceFailed("memory document store is read-only".into()));
		}
		let mut values = self.values.lock();
		let mut unsupported = self.unsupported.lock();
		for change in changes {
			unsupported.remove(&change.key);
			match &change.value {
				Some(value) => values.insert(change.key.clone(), value.clone()),
				None => values.remove(&change.key),
			};
		}
		self.saves.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

#[derive(Debug, Default)]
pub struct MemorySecretAdapter {
	values: Mutex<HashMap<String, String>>,
	saves: AtomicUsize,
	fail_saves: AtomicBool,
}

impl MemorySecretAdapter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		let values = values.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
		Self { values: Mutex::new(values), ..Self::default() }
	}

	pub fn snapshot(&self) -> HashMap<String, String> {
		self.values.lock().clone()
	}

	pub fn save_count(&self) -> usize {
		self.saves.load(Ordering::SeqCst)
	}

	pub fn fail_saves(&self, fail: bool) {
		self.fail_saves.store(fail, Ordering::SeqCst);
	}
}

impl SecretAdapter for MemorySecretAdapter {
	fn load(&self) -> ChResult<HashMap<String, String>> {
		Ok(self.values.lock().clone())
	}

	fn save(&self, changes: &[SecretChange]) -> ChResult<()> {
		if self.fail_saves.load(Ordering::SeqCst) {
			return Err(Error::PersistenceFailed("memory secret store is read-only".into()));
		}
		let mut values = self.values.lock();
		for change in changes {
			match &change.value {
				Some(value) => values.insert(change.env_key.clone(), value.clone()),
				None => values.remove(&change.env_key),
			};
		}
		self.saves.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

// vim: ts=4
