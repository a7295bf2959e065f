//! Hub builder - wires the storage adapters, the manager and the registered
//! namespaces together

use std::sync::Arc;

use confhub_core::SettingsManager;
use confhub_doc_adapter_toml::TomlDocumentAdapter;
use confhub_secret_adapter_dotenv::DotenvSecretAdapter;
use confhub_types::namespace::Namespace;
use confhub_types::provider::SettingsProvider;
use confhub_types::store_adapter::{DocumentAdapter, SecretAdapter};

use crate::config::SettingsConfig;
use crate::prelude::*;

pub struct SettingsHubBuilder {
	config: SettingsConfig,
	document_adapter: Option<Arc<dyn DocumentAdapter>>,
	secret_adapter: Option<Arc<dyn SecretAdapter>>,
	providers: Vec<Box<dyn SettingsProvider>>,
	namespaces: Vec<Namespace>,
	logging: bool,
}

impl SettingsHubBuilder {
	/// Builder with file locations taken from the environment
	pub fn new() -> Self {
		Self::with_config(SettingsConfig::from_env())
	}

	pub fn with_config(config: SettingsConfig) -> Self {
		SettingsHubBuilder {
			config,
			document_adapter: None,
			secret_adapter: None,
			providers: Vec::new(),
			namespaces: Vec::new(),
			logging: false,
		}
	}

	// Locations
	pub fn document_path(&mut self, path: impl Into<std::path::PathBuf>) -> &mut Self {
		self.config.document_path = path.into();
		self
	}

	pub fn secrets_path(&mut self, path: impl Into<std::path::PathBuf>) -> &mut Self {
		self.config.secrets_path = path.into();
		self
	}

	// Adapters (override the file based ones)
	pub fn document_adapter(&mut self, adapter: Arc<dyn DocumentAdapter>) -> &mut Self {
		self.document_adapter = Some(adapter);
		self
	}

	pub fn secret_adapter(&mut self, adapter: Arc<dyn SecretAdapter>) -> &mut Self {
		self.secret_adapter = Some(adapter);
		self
	}

	// Schemas
	pub fn provider(&mut self, provider: impl SettingsProvider + 'static) -> &mut Self {
		self.providers.push(Box::new(provider));
		self
	}

	pub fn namespace(&mut self, namespace: Namespace) -> &mut Self {
		self.namespaces.push(namespace);
		self
	}

	/// Install the `RUST_LOG` driven subscriber on build
	pub fn logging(&mut self, enable: bool) -> &mut Self {
		self.logging = enable;
		self
	}

	/// Load both stores and register every queued namespace and provider
	///
	/// Queued schemas are consumed; adapters and paths stay configured.
	pub fn build(&mut self) -> ChResult<Arc<SettingsManager>> {
		if self.logging {
			crate::init_logging();
		}

		let documents = self.document_adapter.clone().unwrap_or_else(|| {
			debug!("Using settings file {}", self.config.document_path.display());
			Arc::new(TomlDocumentAdapter::new(&self.config.document_path))
		});
		let secrets = self.secret_adapter.clone().unwrap_or_else(|| {
			debug!("Using secrets file {}", self.config.secrets_path.display());
			Arc::new(DotenvSecretAdapter::new(&self.config.secrets_path))
		});

		let manager = SettingsManager::new(documents, secrets).inspect_err(|e| {
			error!("FATAL: Failed to load settings stores: {}", e);
		})?;

		for namespace in std::mem::take(&mut self.namespaces) {
			manager.register(namespace)?;
		}
		for provider in std::mem::take(&mut self.providers) {
			manager.register_provider(provider.as_ref())?;
		}

		info!("Settings hub initialized with {} namespaces", manager.namespaces().len());
		Ok(Arc::new(manager))
	}
}

impl Default for SettingsHubBuilder {
	fn default() -> Self {
		Self::new()
	}
}

// vim: ts=4
