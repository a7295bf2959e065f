//! Shared types, schema model and adapter traits for confhub.
//!
//! This crate contains the foundational types that are shared between the
//! settings core and all storage adapter implementations: the error taxonomy,
//! setting values, field descriptors with their validation rules, namespaces,
//! and the traits the storage backends implement.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod error;
pub mod namespace;
pub mod prelude;
pub mod provider;
pub mod schema;
pub mod store_adapter;
pub mod value;

pub use error::{ChResult, Error};
pub use namespace::{expand_namespace_template, Namespace, NamespaceBuilder};
pub use provider::SettingsProvider;
pub use schema::{
	is_valid_env_key, normalize, validate, FieldType, OptionsProvider, SelectOption, SettingField,
	SettingFieldBuilder, ValidationMode, ValidationResult,
};
pub use store_adapter::{
	DocumentAdapter, DocumentChange, DocumentSnapshot, SecretAdapter, SecretChange, SettingKey,
};
pub use value::SettingValue;

// vim: ts=4
