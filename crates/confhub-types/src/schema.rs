//! Field descriptors and schema-driven validation
//!
//! A [`SettingField`] describes one setting inside a namespace: its
//! presentation kind ([`FieldType`]), default, constraints and whether it is a
//! secret. [`validate`] checks a candidate value against the descriptor and
//! [`normalize`] additionally returns the value in the shape it is committed
//! in (e.g. a numeric string for a NUMBER field becomes a number).
//!
//! Validation never fails with an error: malformed input is itself reported as
//! a validation failure with a human-readable reason.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use crate::prelude::*;
use crate::value::SettingValue;

/// Outcome of a schema check: `Err` carries the human-readable reason
pub type ValidationResult = Result<(), String>;

/// Produces the current option list of a DYNAMIC_SELECT (or provider-backed
/// SELECT) field. Invoked on every validation, never cached.
pub type OptionsProvider = Arc<dyn Fn() -> Vec<SelectOption> + Send + Sync>;

/// Presentation and validation kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
	Text,
	Password,
	Number,
	Checkbox,
	Select,
	DynamicSelect,
	ProviderSelect,
	List,
	Action,
	Multiline,
	FilePath,
	DirectoryPath,
	Color,
	Slider,
	Date,
	Time,
	Datetime,
}

impl FieldType {
	pub const ALL: [FieldType; 17] = [
		FieldType::Text,
		FieldType::Password,
		FieldType::Number,
		FieldType::Checkbox,
		FieldType::Select,
		FieldType::DynamicSelect,
		FieldType::ProviderSelect,
		FieldType::List,
		FieldType::Action,
		FieldType::Multiline,
		FieldType::FilePath,
		FieldType::DirectoryPath,
		FieldType::Color,
		FieldType::Slider,
		FieldType::Date,
		FieldType::Time,
		FieldType::Datetime,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			FieldType::Text => "TEXT",
			FieldType::Password => "PASSWORD",
			FieldType::Number => "NUMBER",
			FieldType::Checkbox => "CHECKBOX",
			FieldType::Select => "SELECT",
			FieldType::DynamicSelect => "DYNAMIC_SELECT",
			FieldType::ProviderSelect => "PROVIDER_SELECT",
			FieldType::List => "LIST",
			FieldType::Action => "ACTION",
			FieldType::Multiline => "MULTILINE",
			FieldType::FilePath => "FILE_PATH",
			FieldType::DirectoryPath => "DIRECTORY_PATH",
			FieldType::Color => "COLOR",
			FieldType::Slider => "SLIDER",
			FieldType::Date => "DATE",
			FieldType::Time => "TIME",
			FieldType::Datetime => "DATETIME",
		}
	}

	/// SELECT, DYNAMIC_SELECT and PROVIDER_SELECT
	pub fn is_select_family(&self) -> bool {
		matches!(self, FieldType::Select | FieldType::DynamicSelect | FieldType::ProviderSelect)
	}

	/// Whether `min_value`/`max_value` are meaningful
	pub fn supports_range(&self) -> bool {
		matches!(self, FieldType::Number | FieldType::Slider)
	}

	/// Neutral default used when a field declares none
	pub fn zero_value(&self) -> SettingValue {
		match self {
			FieldType::Number | FieldType::Slider => SettingValue::Int(0),
			FieldType::Checkbox => SettingValue::Bool(false),
			FieldType::List => SettingValue::List(Vec::new()),
			_ => SettingValue::String(String::new()),
		}
	}

	/// Parse a value stored as a bare string (secrets file, environment)
	/// back into the shape this field type works with.
	pub fn coerce_str(&self, raw: &str) -> Result<SettingValue, String> {
		self.coerce_value(SettingValue::String(raw.to_string()))
	}

	/// Bring a stored value into the shape this field type works with.
	///
	/// Only the value's type is checked here, constraints (range, options) are
	/// left to [`normalize`]. Scalars are stringified for string-typed fields,
	/// strings are parsed for numeric, boolean and list fields.
	pub fn coerce_value(&self, value: SettingValue) -> Result<SettingValue, String> {
		match (self, value) {
			(FieldType::Number | FieldType::Slider, v @ (SettingValue::Int(_) | SettingValue::Float(_))) => {
				Ok(v)
			}
			(FieldType::Number | FieldType::Slider, SettingValue::String(s)) => {
				SettingValue::parse_number(&s).ok_or_else(|| format!("'{}' is not a number", s))
			}
			(FieldType::Checkbox, SettingValue::Bool(b)) => Ok(SettingValue::Bool(b)),
			(FieldType::Checkbox, SettingValue::String(s)) => parse_bool(&s).map(SettingValue::Bool),
			(FieldType::List, v @ SettingValue::List(_)) => Ok(v),
			(FieldType::List, SettingValue::String(s)) => parse_list(&s),
			(FieldType::Action, v) if v.is_scalar() => Ok(v),
			(
				FieldType::Number | FieldType::Slider | FieldType::Checkbox | FieldType::List,
				other,
			) => Err(format!("expected {}, got {}", self.as_str(), other.type_name())),
			(_, SettingValue::List(_)) => Err(format!("expected {}, got list", self.as_str())),
			(_, SettingValue::String(s)) => Ok(SettingValue::String(s)),
			(_, scalar) => Ok(SettingValue::String(scalar.to_env_string())),
		}
	}
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_env_key(key: &str) -> bool {
	let mut chars = key.chars();
	match chars.next() {
		Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
		_ => return false,
	}
	chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl std::fmt::Display for FieldType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// When presentation layers should trigger validation. The core validates
/// every `set` in full regardless of the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationMode {
	#[default]
	OnChange,
	OnBlur,
	OnSave,
	Async,
}

/// One selectable choice of a SELECT-family or LIST field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
	pub value: String,
	pub label: String,
}

impl SelectOption {
	pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
		Self { value: value.into(), label: label.into() }
	}
}

/// Field descriptor - defines metadata for each setting of a namespace
#[derive(Clone)]
pub struct SettingField {
	/// Unique within the namespace
	pub key: String,
	pub label: String,
	pub description: Option<String>,
	pub field_type: FieldType,
	pub default: SettingValue,

	/// Routes the value to the secrets store and the process environment
	pub secret: bool,
	pub env_key: Option<String>,

	pub options: Vec<SelectOption>,
	pub options_provider: Option<OptionsProvider>,
	pub min_value: Option<f64>,
	pub max_value: Option<f64>,
	pub validation_mode: ValidationMode,

	/// Type-specific hints (`pattern`, `max_length`, `min_items`, `max_items`,
	/// `action`, `must_exist`, ...)
	pub metadata: serde_json::Map<String, serde_json::Value>,

	/// PROVIDER_SELECT only: format string producing a dependent namespace id
	pub provider_namespace_template: Option<String>,
}

impl Debug for SettingField {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SettingField")
			.field("key", &self.key)
			.field("label", &self.label)
			.field("field_type", &self.field_type)
			.field("default", &self.default)
			.field("secret", &self.secret)
			.field("env_key", &self.env_key)
			.field("options", &self.options)
			.field("options_provider", &self.options_provider.is_some())
			.field("min_value", &self.min_value)
			.field("max_value", &self.max_value)
			.field("validation_mode", &self.validation_mode)
			.field("metadata", &self.metadata)
			.field("provider_namespace_template", &self.provider_namespace_template)
			.finish_non_exhaustive()
	}
}

impl SettingField {
	/// Create a builder for constructing a SettingField
	pub fn builder(key: impl Into<String>, field_type: FieldType) -> SettingFieldBuilder {
		SettingFieldBuilder::new(key, field_type)
	}

	/// Current option list: provider output when present, else the static list
	pub fn current_options(&self) -> Vec<SelectOption> {
		match &self.options_provider {
			Some(provider) => provider(),
			None => self.options.clone(),
		}
	}

	fn metadata_str(&self, name: &str) -> Option<&str> {
		self.metadata.get(name).and_then(serde_json::Value::as_str)
	}

	fn metadata_u64(&self, name: &str) -> Option<u64> {
		self.metadata.get(name).and_then(serde_json::Value::as_u64)
	}

	fn metadata_bool(&self, name: &str) -> bool {
		self.metadata.get(name).and_then(serde_json::Value::as_bool).unwrap_or(false)
	}
}

/// Builder for SettingField with fluent API
pub struct SettingFieldBuilder {
	key: String,
	field_type: FieldType,
	label: Option<String>,
	description: Option<String>,
	default: Option<SettingValue>,
	secret: bool,
	env_key: Option<String>,
	options: Vec<SelectOption>,
	options_provider: Option<OptionsProvider>,
	min_value: Option<f64>,
	max_value: Option<f64>,
	validation_mode: ValidationMode,
	metadata: serde_json::Map<String, serde_json::Value>,
	provider_namespace_template: Option<String>,
}

impl SettingFieldBuilder {
	pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			key: key.into(),
			field_type,
			label: None,
			description: None,
			default: None,
			secret: false,
			env_key: None,
			options: Vec::new(),
			options_provider: None,
			min_value: None,
			max_value: None,
			validation_mode: ValidationMode::default(),
			metadata: serde_json::Map::new(),
			provider_namespace_template: None,
		}
	}

	/// Set the label (defaults to the key)
	pub fn label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	/// Set the default value (defaults to the field type's neutral value)
	pub fn default(mut self, value: impl Into<SettingValue>) -> Self {
		self.default = Some(value.into());
		self
	}

	/// Mark the field as secret; requires `env_key`
	pub fn secret(mut self, secret: bool) -> Self {
		self.secret = secret;
		self
	}

	pub fn env_key(mut self, env_key: impl Into<String>) -> Self {
		self.env_key = Some(env_key.into());
		self
	}

	pub fn option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
		self.options.push(SelectOption::new(value, label));
		self
	}

	pub fn options(mut self, options: impl IntoIterator<Item = SelectOption>) -> Self {
		self.options.extend(options);
		self
	}

	pub fn options_provider<F>(mut self, f: F) -> Self
	where
		F: Fn() -> Vec<SelectOption> + Send + Sync + 'static,
	{
		self.options_provider = Some(Arc::new(f));
		self
	}

	pub fn min(mut self, min: f64) -> Self {
		self.min_value = Some(min);
		self
	}

	pub fn max(mut self, max: f64) -> Self {
		self.max_value = Some(max);
		self
	}

	pub fn validation_mode(mut self, mode: ValidationMode) -> Self {
		self.validation_mode = mode;
		self
	}

	pub fn metadata(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.metadata.insert(name.into(), value.into());
		self
	}

	pub fn provider_namespace_template(mut self, template: impl Into<String>) -> Self {
		self.provider_namespace_template = Some(template.into());
		self
	}

	/// Build the SettingField, checking descriptor invariants
	pub fn build(self) -> ChResult<SettingField> {
		if self.key.is_empty() {
			return Err(Error::ConfigError("Setting key must not be empty".into()));
		}
		if self.key.contains('.') {
			return Err(Error::ConfigError(format!(
				"Setting key '{}' must not contain '.'",
				self.key
			)));
		}

		if self.secret && self.env_key.as_deref().is_none_or(str::is_empty) {
			return Err(Error::ConfigError(format!(
				"Secret setting '{}' requires an env_key",
				self.key
			)));
		}

		if let Some(env_key) = self.env_key.as_deref() {
			if !is_valid_env_key(env_key) {
				return Err(Error::ConfigError(format!(
					"Setting '{}' has an invalid env_key '{}'",
					self.key, env_key
				)));
			}
		}

		if self.field_type.is_select_family()
			&& self.options.is_empty()
			&& self.options_provider.is_none()
		{
			return Err(Error::ConfigError(format!(
				"{} setting '{}' requires options or an options provider",
				self.field_type, self.key
			)));
		}

		if self.field_type == FieldType::DynamicSelect && self.options_provider.is_none() {
			return Err(Error::ConfigError(format!(
				"DYNAMIC_SELECT setting '{}' requires an options provider",
				self.key
			)));
		}

		if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
			if min > max {
				return Err(Error::ConfigError(format!(
					"Setting '{}' has min_value {} greater than max_value {}",
					self.key, min, max
				)));
			}
		}

		if (self.min_value.is_some() || self.max_value.is_some())
			&& !self.field_type.supports_range()
		{
			warn!(
				"Setting '{}' declares a range but {} ignores min_value/max_value",
				self.key, self.field_type
			);
		}

		if self.field_type == FieldType::ProviderSelect
			&& !self.provider_namespace_template.as_deref().is_some_and(|t| t.contains("{value}"))
		{
			return Err(Error::ConfigError(format!(
				"PROVIDER_SELECT setting '{}' requires a provider_namespace_template with {{value}}",
				self.key
			)));
		}

		if let Some(pattern) = self.metadata.get("pattern").and_then(serde_json::Value::as_str) {
			if let Err(e) = regex::Regex::new(pattern) {
				return Err(Error::ConfigError(format!(
					"Setting '{}' has an invalid pattern: {}",
					self.key, e
				)));
			}
		}

		let explicit_default = self.default.clone();
		let default = match &explicit_default {
			Some(value) => value.clone(),
			None => self.implicit_default(),
		};

		let mut field = SettingField {
			label: self.label.unwrap_or_else(|| self.key.clone()),
			key: self.key,
			description: self.description,
			field_type: self.field_type,
			default,
			secret: self.secret,
			env_key: self.env_key,
			options: self.options,
			options_provider: self.options_provider,
			min_value: self.min_value,
			max_value: self.max_value,
			validation_mode: self.validation_mode,
			metadata: self.metadata,
			provider_namespace_template: self.provider_namespace_template,
		};

		// An empty implicit default of a string-like field means "not configured"
		let must_check = explicit_default.is_some()
			|| matches!(field.field_type, FieldType::Number | FieldType::Slider)
			|| !field.default.is_empty();
		if must_check {
			field.default = normalize(&field, &field.default).map_err(|reason| {
				Error::ConfigError(format!(
					"Setting '{}' has an invalid default: {}",
					field.key, reason
				))
			})?;
		}
		Ok(field)
	}

	/// Default used when none was declared
	///
	/// Static selects start on their first option; numbers start at zero
	/// moved into the declared range.
	fn implicit_default(&self) -> SettingValue {
		match self.field_type {
			FieldType::Select | FieldType::ProviderSelect => self
				.options
				.first()
				.map(|opt| SettingValue::String(opt.value.clone()))
				.unwrap_or_else(|| self.field_type.zero_value()),
			FieldType::Number | FieldType::Slider => {
				let zero = 0.0_f64;
				match (self.min_value, self.max_value) {
					(Some(min), _) if zero < min => number_value(min),
					(_, Some(max)) if zero > max => number_value(max),
					_ => SettingValue::Int(0),
				}
			}
			_ => self.field_type.zero_value(),
		}
	}
}

/// Integral bounds become ints so `get_int` keeps working on them
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn number_value(n: f64) -> SettingValue {
	if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
		SettingValue::Int(n as i64)
	} else {
		SettingValue::Float(n)
	}
}

/// Check a candidate value against a field descriptor
pub fn validate(field: &SettingField, value: &SettingValue) -> ValidationResult {
	normalize(field, value).map(|_| ())
}

/// Check a candidate value and return it in its committed shape
///
/// Checks run in order: type compatibility, range, option membership, then
/// shape constraints of ACTION/LIST fields.
pub fn normalize(field: &SettingField, value: &SettingValue) -> Result<SettingValue, String> {
	match field.field_type {
		FieldType::Text | FieldType::Password | FieldType::Multiline => {
			let s = expect_string(value)?;
			check_text(field, s)?;
			Ok(SettingValue::String(s.to_string()))
		}
		FieldType::Number | FieldType::Slider => {
			let number = match value {
				SettingValue::Int(_) | SettingValue::Float(_) => value.clone(),
				SettingValue::String(s) => SettingValue::parse_number(s)
					.ok_or_else(|| format!("'{}' is not a number", s))?,
				other => return Err(format!("expected number, got {}", other.type_name())),
			};
			check_range(field, &number)?;
			Ok(number)
		}
		FieldType::Checkbox => match value {
			SettingValue::Bool(b) => Ok(SettingValue::Bool(*b)),
			SettingValue::String(s) => parse_bool(s).map(SettingValue::Bool),
			other => Err(format!("expected bool, got {}", other.type_name())),
		},
		FieldType::Select | FieldType::DynamicSelect | FieldType::ProviderSelect => {
			let choice = scalar_to_string(value)?;
			let options = field.current_options();
			if !options.iter().any(|opt| opt.value == choice) {
				return Err(format!("'{}' is not one of the available options", choice));
			}
			Ok(SettingValue::String(choice))
		}
		FieldType::List => {
			let list = match value {
				SettingValue::List(items) => items.clone(),
				SettingValue::String(s) => match parse_list(s)? {
					SettingValue::List(items) => items,
					_ => return Err("expected list".into()),
				},
				other => return Err(format!("expected list, got {}", other.type_name())),
			};
			check_list(field, &list)?;
			Ok(SettingValue::List(list))
		}
		FieldType::Action => {
			if !value.is_scalar() {
				return Err(format!("expected scalar, got {}", value.type_name()));
			}
			if field.metadata_str("action").is_none_or(str::is_empty) {
				return Err("action field has no action declared".into());
			}
			Ok(value.clone())
		}
		FieldType::FilePath | FieldType::DirectoryPath => {
			let s = expect_string(value)?;
			check_path(field, s)?;
			Ok(SettingValue::String(s.to_string()))
		}
		FieldType::Color => {
			let s = expect_string(value)?;
			if !is_hex_color(s) {
				return Err(format!("'{}' is not a color (#RGB, #RRGGBB or #RRGGBBAA)", s));
			}
			Ok(SettingValue::String(s.to_string()))
		}
		FieldType::Date => {
			let s = expect_string(value)?;
			chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
				.map_err(|_| format!("'{}' is not a date (YYYY-MM-DD)", s))?;
			Ok(SettingValue::String(s.to_string()))
		}
		FieldType::Time => {
			let s = expect_string(value)?;
			if !is_time(s) {
				return Err(format!("'{}' is not a time (HH:MM or HH:MM:SS)", s));
			}
			Ok(SettingValue::String(s.to_string()))
		}
		FieldType::Datetime => {
			let s = expect_string(value)?;
			if !is_datetime(s) {
				return Err(format!("'{}' is not a date and time (RFC 3339)", s));
			}
			Ok(SettingValue::String(s.to_string()))
		}
	}
}

fn expect_string(value: &SettingValue) -> Result<&str, String> {
	value.as_str().ok_or_else(|| format!("expected string, got {}", value.type_name()))
}

fn scalar_to_string(value: &SettingValue) -> Result<String, String> {
	match value {
		SettingValue::List(_) => Err("expected scalar, got list".into()),
		SettingValue::String(s) => Ok(s.clone()),
		other => Ok(other.to_env_string()),
	}
}

fn parse_bool(raw: &str) -> Result<bool, String> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" | "on" => Ok(true),
		"false" | "0" | "no" | "off" => Ok(false),
		_ => Err(format!("'{}' is not a boolean", raw)),
	}
}

/// JSON array, or a comma separated list of strings
fn parse_list(raw: &str) -> Result<SettingValue, String> {
	let trimmed = raw.trim();
	if trimmed.starts_with('[') {
		return match serde_json::from_str::<SettingValue>(trimmed) {
			Ok(list @ SettingValue::List(_)) => Ok(list),
			_ => Err(format!("'{}' is not a list", raw)),
		};
	}
	Ok(SettingValue::List(
		trimmed
			.split(',')
			.map(str::trim)
			.filter(|item| !item.is_empty())
			.map(SettingValue::from)
			.collect(),
	))
}

fn check_text(field: &SettingField, s: &str) -> ValidationResult {
	if let Some(max_length) = field.metadata_u64("max_length") {
		if s.chars().count() as u64 > max_length {
			return Err(format!("must be at most {} characters", max_length));
		}
	}
	if let Some(pattern) = field.metadata_str("pattern") {
		let re = regex::Regex::new(pattern).map_err(|e| format!("invalid pattern: {}", e))?;
		if !re.is_match(s) {
			return Err(format!("does not match pattern {}", pattern));
		}
	}
	Ok(())
}

fn check_range(field: &SettingField, number: &SettingValue) -> ValidationResult {
	let Some(n) = number.as_f64() else {
		return Err(format!("expected number, got {}", number.type_name()));
	};
	if !n.is_finite() {
		return Err(format!("{} is not a finite number", number));
	}
	if let Some(min) = field.min_value {
		if n < min {
			return Err(format!("{} is below the minimum {}", number, min));
		}
	}
	if let Some(max) = field.max_value {
		if n > max {
			return Err(format!("{} is above the maximum {}", number, max));
		}
	}
	Ok(())
}

fn check_list(field: &SettingField, items: &[SettingValue]) -> ValidationResult {
	if let Some(item) = items.iter().find(|item| !item.is_scalar()) {
		return Err(format!("list items must be scalars, got {}", item.type_name()));
	}
	let len = items.len() as u64;
	if let Some(min) = field.metadata_u64("min_items") {
		if len < min {
			return Err(format!("needs at least {} items", min));
		}
	}
	if let Some(max) = field.metadata_u64("max_items") {
		if len > max {
			return Err(format!("allows at most {} items", max));
		}
	}
	let options = field.current_options();
	if !options.is_empty() {
		for item in items {
			let item = item.to_env_string();
			if !options.iter().any(|opt| opt.value == item) {
				return Err(format!("'{}' is not one of the available options", item));
			}
		}
	}
	Ok(())
}

fn check_path(field: &SettingField, s: &str) -> ValidationResult {
	if !field.metadata_bool("must_exist") {
		return Ok(());
	}
	let path = Path::new(s);
	match field.field_type {
		FieldType::DirectoryPath if !path.is_dir() => Err(format!("'{}' is not a directory", s)),
		FieldType::FilePath if !path.is_file() => Err(format!("'{}' is not a file", s)),
		_ => Ok(()),
	}
}

fn is_hex_color(s: &str) -> bool {
	let Some(hex) = s.strip_prefix('#') else {
		return false;
	};
	matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_time(s: &str) -> bool {
	chrono::NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok()
		|| chrono::NaiveTime::parse_from_str(s, "%H:%M").is_ok()
}

fn is_datetime(s: &str) -> bool {
	chrono::DateTime::parse_from_rfc3339(s).is_ok()
		|| ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
			.iter()
			.any(|fmt| chrono::NaiveDateTime::parse_from_str(s, fmt).is_ok())
}


// vim: ts=4
