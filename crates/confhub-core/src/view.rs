//! Read-only presentation projection of the registry
//!
//! Every query is answered from the live registry; nothing is cached between
//! calls.

use std::sync::Arc;

use itertools::Itertools;
use serde::Serialize;

use confhub_types::namespace::{expand_namespace_template, Namespace};
use confhub_types::schema::FieldType;
use confhub_types::value::SettingValue;

use crate::manager::SettingsManager;
use crate::prelude::*;

/// Displayed in place of a set secret value
pub const SECRET_MASK: &str = "********";

/// One tab with its namespaces, in presentation order
#[derive(Debug, Clone)]
pub struct TabGroup {
	pub tab: String,
	/// Minimum `order` among the tab's namespaces
	pub order: i64,
	pub namespaces: Vec<Arc<Namespace>>,
}

/// Presentation row for one field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
	pub key: String,
	pub label: String,
	pub field_type: FieldType,
	pub value: SettingValue,
	pub secret: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dependent_namespace: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct SettingsView<'a> {
	manager: &'a SettingsManager,
}

impl<'a> SettingsView<'a> {
	pub fn new(manager: &'a SettingsManager) -> Self {
		Self { manager }
	}

	pub fn grouped_by_tab(&self) -> Vec<TabGroup> {
		let chunks = self.manager.namespaces().into_iter().chunk_by(|ns| ns.tab.clone());
		chunks
			.into_iter()
			.map(|(tab, namespaces)| {
				let namespaces: Vec<Arc<Namespace>> = namespaces.collect();
				let order = namespaces.iter().map(|ns| ns.order).min().unwrap_or_default();
				TabGroup { tab, order, namespaces }
			})
			.collect()
	}

	/// Rows for every field of a namespace, secrets masked
	pub fn field_views(&self, namespace: &str) -> ChResult<Vec<FieldView>> {
		let ns =
			self.manager.namespace(namespace).ok_or_else(|| Error::not_found(namespace, None))?;
		let values = self.manager.namespace_values(namespace)?;

		Ok(ns
			.schema
			.iter()
			.zip(values)
			.map(|(field, (_, value))| {
				let dependent_namespace = dependent_id(
					field.provider_namespace_template.as_deref(),
					field.field_type,
					&value,
				);
				let value = if field.secret { mask(&value) } else { value };
				FieldView {
					key: field.key.clone(),
					label: field.label.clone(),
					field_type: field.field_type,
					value,
					secret: field.secret,
					dependent_namespace,
				}
			})
			.collect())
	}

	/// Namespace id a PROVIDER_SELECT field's current value points at
	///
	/// Only computes the id; whether that namespace is registered is up to the
	/// consumer. `None` for other field types and for an empty value.
	pub fn dependent_namespace(&self, namespace: &str, key: &str) -> ChResult<Option<String>> {
		let field = self.manager.resolve_field(namespace, key)?;
		let value = self.manager.get(namespace, key)?;
		Ok(dependent_id(field.provider_namespace_template.as_deref(), field.field_type, &value))
	}
}

fn dependent_id(
	template: Option<&str>,
	field_type: FieldType,
	value: &SettingValue,
) -> Option<String> {
	if field_type != FieldType::ProviderSelect || value.is_empty() {
		return None;
	}
	template.map(|template| expand_namespace_template(template, &value.to_env_string()))
}

fn mask(value: &SettingValue) -> SettingValue {
	if value.is_empty() {
		SettingValue::String(String::new())
	} else {
		SettingValue::String(SECRET_MASK.into())
	}
}

// vim: ts=4
