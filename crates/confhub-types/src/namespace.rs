//! Namespaces: independently owned groups of settings fields

use std::collections::HashSet;

use crate::prelude::*;
use crate::schema::SettingField;

pub const DEFAULT_TAB: &str = "General";
pub const DEFAULT_ORDER: i64 = 100;

/// Registration unit - a uniquely identified schema with display metadata
#[derive(Debug, Clone)]
pub struct Namespace {
	pub id: String,
	pub display_name: String,
	/// Ordered field descriptors, keys unique within the namespace
	pub schema: Vec<SettingField>,
	pub tab: String,
	/// Sort priority within the tab (lower first)
	pub order: i64,
}

impl Namespace {
	/// Create a namespace, rejecting schemas with duplicate keys
	pub fn new(
		id: impl Into<String>,
		display_name: impl Into<String>,
		schema: Vec<SettingField>,
		tab: impl Into<String>,
		order: i64,
	) -> ChResult<Self> {
		let id = id.into();
		if id.trim().is_empty() {
			return Err(Error::ConfigError("Namespace id must not be empty".into()));
		}

		let mut seen = HashSet::new();
		for field in &schema {
			if !seen.insert(field.key.as_str()) {
				return Err(Error::DuplicateKey { namespace: id, key: field.key.clone() });
			}
		}

		Ok(Self { id, display_name: display_name.into(), schema, tab: tab.into(), order })
	}

	pub fn builder(id: impl Into<String>) -> NamespaceBuilder {
		NamespaceBuilder::new(id)
	}

	pub fn field(&self, key: &str) -> Option<&SettingField> {
		self.schema.iter().find(|field| field.key == key)
	}
}

/// Builder for Namespace with fluent API
pub struct NamespaceBuilder {
	id: String,
	display_name: Option<String>,
	schema: Vec<SettingField>,
	tab: String,
	order: i64,
}

impl NamespaceBuilder {
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			display_name: None,
			schema: Vec::new(),
			tab: DEFAULT_TAB.into(),
			order: DEFAULT_ORDER,
		}
	}

	/// Set the display name (defaults to the id)
	pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
		self.display_name = Some(display_name.into());
		self
	}

	pub fn tab(mut self, tab: impl Into<String>) -> Self {
		self.tab = tab.into();
		self
	}

	pub fn order(mut self, order: i64) -> Self {
		self.order = order;
		self
	}

	pub fn field(mut self, field: SettingField) -> Self {
		self.schema.push(field);
		self
	}

	pub fn build(self) -> ChResult<Namespace> {
		let display_name = self.display_name.unwrap_or_else(|| self.id.clone());
		Namespace::new(self.id, display_name, self.schema, self.tab, self.order)
	}
}

/// Substitute `{value}` in a PROVIDER_SELECT template
///
/// `expand_namespace_template("voice.stt.{value}", "leopard")` yields
/// `"voice.stt.leopard"`.
pub fn expand_namespace_template(template: &str, value: &str) -> String {
	template.replace("{value}", value)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::FieldType;

	fn text(key: &str) -> SettingField {
		SettingField::builder(key, FieldType::Text)
			.build()
			.unwrap_or_else(|e| panic!("field should build: {}", e))
	}

	#[test]
	fn test_duplicate_keys_rejected() {
		let result = Namespace::new("ns", "NS", vec![text("a"), text("b"), text("a")], "General", 1);
		match result {
			Err(Error::DuplicateKey { namespace, key }) => {
				assert_eq!(namespace, "ns");
				assert_eq!(key, "a");
			}
			other => panic!("expected DuplicateKey, got {:?}", other),
		}
	}

	#[test]
	fn test_builder_defaults() {
		let ns = Namespace::builder("voice_core")
			.field(text("model"))
			.build()
			.unwrap_or_else(|e| panic!("namespace should build: {}", e));
		assert_eq!(ns.display_name, "voice_core");
		assert_eq!(ns.tab, DEFAULT_TAB);
		assert_eq!(ns.order, DEFAULT_ORDER);
		assert!(ns.field("model").is_some());
		assert!(ns.field("missing").is_none());
	}

	#[test]
	fn test_empty_id_rejected() {
		assert!(matches!(Namespace::builder(" ").build(), Err(Error::ConfigError(_))));
	}

	#[test]
	fn test_expand_namespace_template() {
		assert_eq!(expand_namespace_template("voice.stt.{value}", "leopard"), "voice.stt.leopard");
		assert_eq!(expand_namespace_template("llm.{value}.{value}", "x"), "llm.x.x");
		assert_eq!(expand_namespace_template("static", "x"), "static");
	}
}

// vim: ts=4
