//! Settings manager - get/set with validation, split persistence, environment
//! sync and change notification
//!
//! A `set` goes through `Validating` without holding any lock, then takes the
//! commit lock for persistence, the in-memory swap and the environment update,
//! and finally notifies listeners after the lock is released. Concurrent `get`
//! calls read the in-memory map, which is swapped under its own write lock, so
//! they observe either the old or the new value.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use confhub_types::namespace::Namespace;
use confhub_types::provider::SettingsProvider;
use confhub_types::schema::{normalize, validate, SettingField};
use confhub_types::store_adapter::{
	DocumentAdapter, DocumentChange, SecretAdapter, SecretChange, SettingKey,
};
use confhub_types::value::SettingValue;

use crate::env;
use crate::prelude::*;
use crate::registry::SettingsRegistry;
use crate::view::SettingsView;

/// Caller-supplied check beyond the schema rules; `Some(reason)` rejects
pub type ExternalValidator = Arc<dyn Fn(&SettingValue) -> Option<String> + Send + Sync>;

/// Invoked with (namespace, key, committed value) after every successful set
pub type ChangeListener = Arc<dyn Fn(&str, &str, &SettingValue) -> ChResult<()> + Send + Sync>;

/// Handle of a registered change listener, in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// A listener that returned an error or panicked during notification
#[derive(Debug, Clone)]
pub struct ListenerFailure {
	pub listener: ListenerId,
	pub reason: String,
}

/// Result of a committed `set` or `reset`
#[derive(Debug, Clone)]
pub struct SetOutcome {
	pub namespace: String,
	pub key: String,
	pub value: SettingValue,
	pub previous: SettingValue,
	pub listener_errors: Vec<ListenerFailure>,
}

/// Mirror of what is currently on disk, used to hydrate namespaces that are
/// registered after the stores were loaded
#[derive(Default)]
struct PersistedState {
	documents: HashMap<SettingKey, SettingValue>,
	/// Document entries with no `SettingValue` form
	unsupported: HashMap<SettingKey, String>,
	secrets: HashMap<String, String>,
}

impl PersistedState {
	fn record_document(&mut self, key: &SettingKey, value: Option<SettingValue>) {
		self.unsupported.remove(key);
		match value {
			Some(value) => self.documents.insert(key.clone(), value),
			None => self.documents.remove(key),
		};
	}

	fn record_secret(&mut self, env_key: &str, value: Option<String>) {
		match value {
			Some(value) => self.secrets.insert(env_key.to_string(), value),
			None => self.secrets.remove(env_key),
		};
	}
}

pub struct SettingsManager {
	registry: RwLock<SettingsRegistry>,
	/// Committed values; fields missing here resolve to their default
	values: RwLock<HashMap<SettingKey, SettingValue>>,
	persisted: Mutex<PersistedState>,
	documents: Arc<dyn DocumentAdapter>,
	secrets: Arc<dyn SecretAdapter>,
	validators: RwLock<HashMap<SettingKey, Vec<ExternalValidator>>>,
	listeners: RwLock<Vec<(ListenerId, ChangeListener)>>,
	next_listener: AtomicU64,
	/// Serializes persistence, the in-memory swap and environment updates
	commit: Mutex<()>,
}

impl SettingsManager {
	/// Create a manager, loading both stores
	///
	/// A malformed backing file fails here with `Error::LoadCorrupted`.
	pub fn new(
		documents: Arc<dyn DocumentAdapter>,
		secrets: Arc<dyn SecretAdapter>,
	) -> ChResult<Self> {
		let snapshot = documents.load()?;
		let persisted = PersistedState {
			documents: snapshot.values,
			unsupported: snapshot.unsupported,
			secrets: secrets.load()?,
		};
		info!(
			"Loaded settings stores: {} document values, {} secrets",
			persisted.documents.len(),
			persisted.secrets.len()
		);

		Ok(Self {
			registry: RwLock::new(SettingsRegistry::new()),
			values: RwLock::new(HashMap::new()),
			persisted: Mutex::new(persisted),
			documents,
			secrets,
			validators: RwLock::new(HashMap::new()),
			listeners: RwLock::new(Vec::new()),
			next_listener: AtomicU64::new(1),
			commit: Mutex::new(()),
		})
	}

	// Registration
	//**************

	/// Register (or replace) a namespace and hydrate its values from the
	/// loaded stores
	///
	/// Secret fields with a stored value are mirrored into the process
	/// environment.
	pub fn register(&self, namespace: Namespace) -> ChResult<()> {
		let _commit = self.commit.lock();

		let hydrated = self.hydrate(&namespace)?;
		let replaced = self.registry.write().register(namespace.clone())?;

		let mut values = self.values.write();
		if let Some(replaced) = replaced {
			for field in &replaced.schema {
				values.remove(&SettingKey::new(&replaced.id, &field.key));
			}
		}
		for (field, value) in namespace.schema.iter().zip(hydrated) {
			let Some(value) = value else { continue };
			if let Some(env_key) = secret_env_key(field) {
				env::set_env(env_key, Some(&value.to_env_string()));
			}
			values.insert(SettingKey::new(&namespace.id, &field.key), value);
		}

		info!("Registered settings namespace: {}", namespace.id);
		Ok(())
	}

	/// Register a namespace from its parts
	pub fn register_schema(
		&self,
		id: impl Into<String>,
		display_name: impl Into<String>,
		schema: Vec<SettingField>,
		tab: impl Into<String>,
		order: i64,
	) -> ChResult<()> {
		self.register(Namespace::new(id, display_name, schema, tab, order)?)
	}

	/// Register the namespace a provider describes about itself
	pub fn register_provider(&self, provider: &dyn SettingsProvider) -> ChResult<()> {
		self.register(provider.settings_schema()?)
	}

	/// Stored value per field of `namespace`, in schema order
	fn hydrate(&self, namespace: &Namespace) -> ChResult<Vec<Option<SettingValue>>> {
		let persisted = self.persisted.lock();
		namespace
			.schema
			.iter()
			.map(|field| {
				let key = SettingKey::new(&namespace.id, &field.key);
				let (stored, path) = match secret_env_key(field) {
					Some(env_key) => (
						persisted.secrets.get(env_key).map(|raw| {
							if raw.contains('\0') {
								return Err("value contains a NUL byte".to_string());
							}
							field.field_type.coerce_str(raw)
						}),
						self.secrets.path(),
					),
					None => {
						let stored = match persisted.unsupported.get(&key) {
							Some(found) => Some(Err(format!("unsupported {} value", found))),
							None => persisted
								.documents
								.get(&key)
								.cloned()
								.map(|v| field.field_type.coerce_value(v)),
						};
						(stored, self.documents.path())
					}
				};

				match stored {
					None => Ok(None),
					Some(Ok(value)) => {
						if let Err(reason) = validate(field, &value) {
							warn!("Stored value of {} violates its schema: {}", key, reason);
						}
						Ok(Some(value))
					}
					Some(Err(reason)) => Err(Error::LoadCorrupted {
						path: path.map(Path::to_path_buf).unwrap_or_default(),
						reason: format!("{}: {}", key, reason),
					}),
				}
			})
			.collect()
	}

	pub fn register_validator<F>(&self, namespace: &str, key: &str, validator: F) -> ChResult<()>
	where
		F: Fn(&SettingValue) -> Option<String> + Send + Sync + 'static,
	{
		self.registry.read().resolve_field(namespace, key)?;
		self.validators
			.write()
			.entry(SettingKey::new(namespace, key))
			.or_default()
			.push(Arc::new(validator));
		Ok(())
	}

	/// Register a global change listener
	pub fn on_change<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(&str, &str, &SettingValue) -> ChResult<()> + Send + Sync + 'static,
	{
		let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
		self.listeners.write().push((id, Arc::new(listener)));
		id
	}

	// Queries
	//*********

	/// Namespaces in presentation order
	pub fn namespaces(&self) -> Vec<Arc<Namespace>> {
		self.registry.read().get_namespaces()
	}

	pub fn namespace(&self, id: &str) -> Option<Arc<Namespace>> {
		self.registry.read().namespace(id).cloned()
	}

	/// Tabs in presentation order with their effective order
	pub fn tabs(&self) -> Vec<(String, i64)> {
		self.registry.read().tabs()
	}

	pub fn resolve_field(&self, namespace: &str, key: &str) -> ChResult<SettingField> {
		self.registry.read().resolve_field(namespace, key).cloned()
	}

	/// Current value, or the field's default if it was never set
	pub fn get(&self, namespace: &str, key: &str) -> ChResult<SettingValue> {
		let field = self.resolve_field(namespace, key)?;
		let value = self.values.read().get(&SettingKey::new(namespace, key)).cloned();
		Ok(value.unwrap_or(field.default))
	}

	/// Current values of every field of a namespace, in schema order
	pub fn namespace_values(&self, namespace: &str) -> ChResult<Vec<(String, SettingValue)>> {
		let ns = self.namespace(namespace).ok_or_else(|| Error::not_found(namespace, None))?;
		let values = self.values.read();
		Ok(ns
			.schema
			.iter()
			.map(|field| {
				let value = values
					.get(&SettingKey::new(&ns.id, &field.key))
					.cloned()
					.unwrap_or_else(|| field.default.clone());
				(field.key.clone(), value)
			})
			.collect())
	}

	pub fn get_string(&self, namespace: &str, key: &str) -> ChResult<String> {
		match self.get(namespace, key)? {
			SettingValue::String(s) => Ok(s),
			v => Err(type_mismatch(namespace, key, "a string", &v)),
		}
	}

	pub fn get_int(&self, namespace: &str, key: &str) -> ChResult<i64> {
		match self.get(namespace, key)? {
			SettingValue::Int(i) => Ok(i),
			v => Err(type_mismatch(namespace, key, "an integer", &v)),
		}
	}

	/// Ints are widened
	pub fn get_float(&self, namespace: &str, key: &str) -> ChResult<f64> {
		let value = self.get(namespace, key)?;
		value.as_f64().ok_or_else(|| type_mismatch(namespace, key, "a number", &value))
	}

	pub fn get_bool(&self, namespace: &str, key: &str) -> ChResult<bool> {
		match self.get(namespace, key)? {
			SettingValue::Bool(b) => Ok(b),
			v => Err(type_mismatch(namespace, key, "a boolean", &v)),
		}
	}

	pub fn get_list(&self, namespace: &str, key: &str) -> ChResult<Vec<SettingValue>> {
		match self.get(namespace, key)? {
			SettingValue::List(items) => Ok(items),
			v => Err(type_mismatch(namespace, key, "a list", &v)),
		}
	}

	/// Read-only presentation projection
	pub fn view(&self) -> SettingsView<'_> {
		SettingsView::new(self)
	}

	// Mutation
	//**********

	/// Validate, persist and commit a value, then notify listeners
	///
	/// A rejected value leaves memory, files and environment untouched.
	/// Listener failures are returned in the outcome and do not fail the call.
	pub fn set(
		&self,
		namespace: &str,
		key: &str,
		value: impl Into<SettingValue>,
	) -> ChResult<SetOutcome> {
		let field = self.resolve_field(namespace, key)?;
		let setting_key = SettingKey::new(namespace, key);

		let value = self.check(&field, &setting_key, &value.into())?;

		let previous = {
			let _commit = self.commit.lock();
			self.ensure_unchanged(&field, &setting_key)?;
			self.persist(&field, &setting_key, Some(&value))?;
			let previous = self.values.write().insert(setting_key.clone(), value.clone());
			if let Some(env_key) = secret_env_key(&field) {
				env::set_env(env_key, Some(&value.to_env_string()));
			}
			previous.unwrap_or_else(|| field.default.clone())
		};

		if field.secret {
			info!("Setting {} updated (secret)", setting_key);
		} else {
			info!("Setting {} updated: {} -> {}", setting_key, previous, value);
		}

		let listener_errors = self.notify(namespace, key, &value);
		Ok(SetOutcome {
			namespace: namespace.to_string(),
			key: key.to_string(),
			value,
			previous,
			listener_errors,
		})
	}

	/// Drop the stored value so the field falls back to its default
	///
	/// The environment variable of a secret field is restored to the default,
	/// or removed when the default is empty.
	pub fn reset(&self, namespace: &str, key: &str) -> ChResult<SetOutcome> {
		let field = self.resolve_field(namespace, key)?;
		let setting_key = SettingKey::new(namespace, key);

		let previous = {
			let _commit = self.commit.lock();
			self.ensure_unchanged(&field, &setting_key)?;
			self.persist(&field, &setting_key, None)?;
			let previous = self.values.write().remove(&setting_key);
			if let Some(env_key) = secret_env_key(&field) {
				let default = Some(field.default.to_env_string()).filter(|s| !s.is_empty());
				env::set_env(env_key, default.as_deref());
			}
			previous.unwrap_or_else(|| field.default.clone())
		};
		info!("Setting {} reset to default", setting_key);

		let listener_errors = self.notify(namespace, key, &field.default);
		Ok(SetOutcome {
			namespace: namespace.to_string(),
			key: key.to_string(),
			value: field.default,
			previous,
			listener_errors,
		})
	}

	/// Schema rules first, then the external validator chain
	fn check(
		&self,
		field: &SettingField,
		key: &SettingKey,
		candidate: &SettingValue,
	) -> ChResult<SettingValue> {
		let reject = |reason: String| {
			warn!("Rejected value for {}: {}", key, reason);
			Error::validation(&key.namespace, &key.key, reason)
		};

		let value = normalize(field, candidate).map_err(reject)?;
		if field.secret && value.to_env_string().contains('\0') {
			return Err(reject("secret values must not contain NUL bytes".into()));
		}

		let validators = self.validators.read().get(key).cloned().unwrap_or_default();
		for validator in validators {
			if let Some(reason) = validator(&value) {
				return Err(reject(reason));
			}
		}
		Ok(value)
	}

	/// Fail if the field was re-registered with a different type or storage
	/// since it was resolved. Must be called with the commit lock held.
	fn ensure_unchanged(&self, field: &SettingField, key: &SettingKey) -> ChResult<()> {
		let registry = self.registry.read();
		let current = registry.resolve_field(&key.namespace, &key.key)?;
		if current.field_type != field.field_type
			|| current.secret != field.secret
			|| current.env_key != field.env_key
		{
			warn!("Setting {} was re-registered during the update", key);
			return Err(Error::validation(
				&key.namespace,
				&key.key,
				"the field was re-registered during the update",
			));
		}
		Ok(())
	}

	/// Write one entry to the backend the field belongs to
	fn persist(
		&self,
		field: &SettingField,
		key: &SettingKey,
		value: Option<&SettingValue>,
	) -> ChResult<()> {
		let result = match secret_env_key(field) {
			Some(env_key) => {
				let stored = value.map(SettingValue::to_env_string);
				self.secrets
					.save(&[SecretChange { env_key: env_key.to_string(), value: stored.clone() }])
					.map(|()| self.persisted.lock().record_secret(env_key, stored))
			}
			None => self
				.documents
				.save(&[DocumentChange { key: key.clone(), value: value.cloned() }])
				.map(|()| self.persisted.lock().record_document(key, value.cloned())),
		};

		result.map_err(|err| {
			error!("Failed to persist {}: {}", key, err);
			match err {
				Error::PersistenceFailed(_) => err,
				other => Error::PersistenceFailed(format!("{}: {}", key, other)),
			}
		})
	}

	/// Invoke every listener in registration order, collecting failures
	fn notify(&self, namespace: &str, key: &str, value: &SettingValue) -> Vec<ListenerFailure> {
		let listeners = self.listeners.read().clone();
		let mut failures = Vec::new();

		for (id, listener) in listeners {
			let reason = match panic::catch_unwind(AssertUnwindSafe(|| listener(namespace, key, value))) {
				Ok(Ok(())) => continue,
				Ok(Err(err)) => err.to_string(),
				Err(payload) => panic_message(payload.as_ref()),
			};
			warn!("Change listener {:?} failed for {}.{}: {}", id, namespace, key, reason);
			failures.push(ListenerFailure { listener: id, reason });
		}
		failures
	}
}

impl std::fmt::Debug for SettingsManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SettingsManager")
			.field("namespaces", &self.registry.read().len())
			.field("documents", &self.documents)
			.field("secrets", &self.secrets)
			.field("listeners", &self.listeners.read().len())
			.finish_non_exhaustive()
	}
}

fn secret_env_key(field: &SettingField) -> Option<&str> {
	field.env_key.as_deref().filter(|_| field.secret)
}

fn type_mismatch(namespace: &str, key: &str, expected: &str, got: &SettingValue) -> Error {
	Error::validation(
		namespace,
		key,
		format!("Setting '{}.{}' is not {}, got {}", namespace, key, expected, got.type_name()),
	)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&str>() {
		format!("listener panicked: {}", msg)
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		format!("listener panicked: {}", msg)
	} else {
		"listener panicked".to_string()
	}
}

// vim: ts=4
