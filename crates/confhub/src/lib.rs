//! confhub is a namespace-isolated settings hub.
//!
//! Backend and provider modules describe their settings as namespaces of typed
//! fields. The hub validates every change against the field schema and any
//! registered validators, persists non-secret values to a line-preserving TOML
//! file and secrets to a comment-preserving `KEY=value` file, mirrors secrets
//! into the process environment and notifies change listeners.
//!
//! ```no_run
//! use confhub::{FieldType, Namespace, SettingField, SettingsHubBuilder};
//!
//! # fn main() -> confhub::ChResult<()> {
//! let voice = Namespace::builder("voice_core")
//! 	.display_name("Voice")
//! 	.tab("Voice")
//! 	.order(5)
//! 	.field(SettingField::builder("api_key", FieldType::Password)
//! 		.secret(true)
//! 		.env_key("HUB_API_KEY")
//! 		.build()?)
//! 	.build()?;
//!
//! let hub = SettingsHubBuilder::new().namespace(voice).logging(true).build()?;
//! hub.set("voice_core", "api_key", "sk-123")?;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod builder;
pub mod config;
pub mod prelude;

pub use builder::SettingsHubBuilder;
pub use config::SettingsConfig;

pub use confhub_types::error;
pub use confhub_types::namespace;
pub use confhub_types::provider;
pub use confhub_types::schema;
pub use confhub_types::store_adapter;
pub use confhub_types::value;
pub use confhub_types::{
	expand_namespace_template, is_valid_env_key, normalize, validate, ChResult, Error, FieldType,
	Namespace, SelectOption, SettingField, SettingKey, SettingValue, SettingsProvider,
	ValidationMode,
};

pub use confhub_core as core;
pub use confhub_core::{
	FieldView, ListenerFailure, ListenerId, MemoryDocumentAdapter, MemorySecretAdapter,
	SetOutcome, SettingsManager, SettingsView, TabGroup,
};
pub use confhub_doc_adapter_toml::TomlDocumentAdapter;
pub use confhub_secret_adapter_dotenv::DotenvSecretAdapter;

/// Install a `tracing` subscriber filtered by `RUST_LOG`
///
/// Does nothing if the embedding application already installed one.
pub fn init_logging() {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_target(false)
		.try_init()
		.ok();
}

// vim: ts=4
