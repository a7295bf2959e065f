//! Settings core for confhub.
//!
//! [`SettingsRegistry`] holds the registered namespaces and their ordering,
//! [`SettingsManager`] owns the committed values and drives validation,
//! persistence through the storage adapters, environment mirroring of secrets
//! and change notification. [`SettingsView`] is a read-only projection for
//! presentation layers.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod env;
pub mod manager;
pub mod memory;
pub mod prelude;
pub mod registry;
pub mod view;

pub use manager::{
	ChangeListener, ExternalValidator, ListenerFailure, ListenerId, SetOutcome, SettingsManager,
};
pub use memory::{MemoryDocumentAdapter, MemorySecretAdapter};
pub use registry::SettingsRegistry;
pub use view::{FieldView, SettingsView, TabGroup, SECRET_MASK};

// vim: ts=4
