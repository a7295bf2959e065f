//! Settings registry - registered namespaces and their presentation order

use std::collections::HashMap;
use std::sync::Arc;

use confhub_types::namespace::Namespace;
use confhub_types::schema::SettingField;

use crate::prelude::*;

/// Registry of namespaces, in registration order
///
/// Re-registering an id replaces its schema but keeps its original position,
/// so the ordering tie-break stays stable across repeated registration.
pub struct SettingsRegistry {
	namespaces: Vec<Arc<Namespace>>,
	index: HashMap<String, usize>,
}

impl SettingsRegistry {
	pub fn new() -> Self {
		Self { namespaces: Vec::new(), index: HashMap::new() }
	}

	/// Insert or replace a namespace
	///
	/// Returns the replaced namespace, if any.
	pub fn register(&mut self, namespace: Namespace) -> ChResult<Option<Arc<Namespace>>> {
		self.check_env_keys(&namespace)?;

		let namespace = Arc::new(namespace);
		if let Some(&pos) = self.index.get(&namespace.id) {
			debug!("Replacing settings namespace: {}", namespace.id);
			let previous = std::mem::replace(&mut self.namespaces[pos], namespace);
			return Ok(Some(previous));
		}

		debug!(
			"Registering settings namespace: {} ({} fields, tab '{}')",
			namespace.id,
			namespace.schema.len(),
			namespace.tab
		);
		self.index.insert(namespace.id.clone(), self.namespaces.len());
		self.namespaces.push(namespace);
		Ok(None)
	}

	/// Secrets share one file keyed by env_key, so an env_key may only be
	/// claimed by one field across all namespaces.
	fn check_env_keys(&self, namespace: &Namespace) -> ChResult<()> {
		let mut claimed: HashMap<&str, &str> = HashMap::new();
		for field in &namespace.schema {
			if let Some(env_key) = field.env_key.as_deref() {
				if let Some(other) = claimed.insert(env_key, &field.key) {
					return Err(Error::ConfigError(format!(
						"env_key '{}' is used by both '{}' and '{}' in namespace '{}'",
						env_key, other, field.key, namespace.id
					)));
				}
			}
		}

		for existing in self.namespaces.iter().filter(|ns| ns.id != namespace.id) {
			for field in &existing.schema {
				if let Some(env_key) = field.env_key.as_deref() {
					if claimed.contains_key(env_key) {
						return Err(Error::ConfigError(format!(
							"env_key '{}' is already used by {}.{}",
							env_key, existing.id, field.key
						)));
					}
				}
			}
		}
		Ok(())
	}

	pub fn namespace(&self, id: &str) -> Option<&Arc<Namespace>> {
		self.index.get(id).map(|&pos| &self.namespaces[pos])
	}

	/// Look up a field descriptor
	pub fn resolve_field(&self, namespace_id: &str, key: &str) -> ChResult<&SettingField> {
		let namespace =
			self.namespace(namespace_id).ok_or_else(|| Error::not_found(namespace_id, None))?;
		namespace.field(key).ok_or_else(|| Error::not_found(namespace_id, Some(key)))
	}

	/// Namespaces in presentation order
	///
	/// Tabs sort by the minimum `order` among their namespaces (equal minimums:
	/// the tab registered first wins), namespaces within a tab by `order`, ties
	/// by registration order.
	pub fn get_namespaces(&self) -> Vec<Arc<Namespace>> {
		let tabs = self.tab_ranks();
		let mut ordered: Vec<(usize, &Arc<Namespace>)> = self.namespaces.iter().enumerate().collect();
		ordered.sort_by_key(|(seq, ns)| {
			let (tab_order, tab_seq) = tabs.get(ns.tab.as_str()).copied().unwrap_or((i64::MAX, usize::MAX));
			(tab_order, tab_seq, ns.order, *seq)
		});
		ordered.into_iter().map(|(_, ns)| Arc::clone(ns)).collect()
	}

	/// Tabs in presentation order with their effective order
	pub fn tabs(&self) -> Vec<(String, i64)> {
		let mut tabs: Vec<(&str, (i64, usize))> =
			self.tab_ranks().into_iter().collect();
		tabs.sort_by_key(|(_, rank)| *rank);
		tabs.into_iter().map(|(tab, (order, _))| (tab.to_string(), order)).collect()
	}

	/// tab -> (minimum order, first registration index)
	fn tab_ranks(&self) -> HashMap<&str, (i64, usize)> {
		let mut ranks: HashMap<&str, (i64, usize)> = HashMap::new();
		for (seq, ns) in self.namespaces.iter().enumerate() {
			ranks
				.entry(ns.tab.as_str())
				.and_modify(|(order, _)| *order = (*order).min(ns.order))
				.or_insert((ns.order, seq));
		}
		ranks
	}

	/// Get number of registered namespaces
	pub fn len(&self) -> usize {
		self.namespaces.len()
	}

	/// Check if registry is empty
	pub fn is_empty(&self) -> bool {
		self.namespaces.is_empty()
	}
}

impl Default for SettingsRegistry {
	fn default() -> Self {
		Self::new()
	}
}


// vim: ts=4
