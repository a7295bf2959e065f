//! Setting values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Setting value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)] // No type tag - type inferred from the field descriptor
pub enum SettingValue {
	Bool(bool), // Must be before Int to avoid bool -> int coercion
	Int(i64),
	Float(f64),
	String(String),
	List(Vec<SettingValue>),
}

impl SettingValue {
	/// Get the type name for error messages
	pub fn type_name(&self) -> &'static str {
		match self {
			SettingValue::Bool(_) => "bool",
			SettingValue::Int(_) => "int",
			SettingValue::Float(_) => "float",
			SettingValue::String(_) => "string",
			SettingValue::List(_) => "list",
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			SettingValue::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			SettingValue::Bool(b) => Some(*b),
			_ => None,
		}
	}

	/// Numeric view of ints and floats
	#[allow(clippy::cast_precision_loss)]
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			SettingValue::Int(i) => Some(*i as f64),
			SettingValue::Float(f) => Some(*f),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[SettingValue]> {
		match self {
			SettingValue::List(items) => Some(items),
			_ => None,
		}
	}

	pub fn is_scalar(&self) -> bool {
		!matches!(self, SettingValue::List(_))
	}

	/// True for the empty string and the empty list
	pub fn is_empty(&self) -> bool {
		match self {
			SettingValue::String(s) => s.is_empty(),
			SettingValue::List(items) => items.is_empty(),
			_ => false,
		}
	}

	/// Render the value the way it is written into the secrets file and the
	/// process environment.
	///
	/// Floats always keep a decimal point or exponent so that they parse back
	/// as floats; lists are rendered as JSON arrays.
	pub fn to_env_string(&self) -> String {
		match self {
			SettingValue::Bool(b) => b.to_string(),
			SettingValue::Int(i) => i.to_string(),
			SettingValue::Float(f) => format!("{:?}", f),
			SettingValue::String(s) => s.clone(),
			SettingValue::List(_) => serde_json::to_string(self).unwrap_or_default(),
		}
	}

	/// Parse a bare string into the narrowest scalar: int, then float
	pub fn parse_number(s: &str) -> Option<SettingValue> {
		let s = s.trim();
		if let Ok(i) = s.parse::<i64>() {
			return Some(SettingValue::Int(i));
		}
		match s.parse::<f64>() {
			Ok(f) if f.is_finite() => Some(SettingValue::Float(f)),
			_ => None,
		}
	}
}

impl fmt::Display for SettingValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SettingValue::List(items) => {
				write!(f, "[")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{}", item)?;
				}
				write!(f, "]")
			}
			other => write!(f, "{}", other.to_env_string()),
		}
	}
}

impl From<bool> for SettingValue {
	fn from(b: bool) -> Self {
		SettingValue::Bool(b)
	}
}

impl From<i64> for SettingValue {
	fn from(i: i64) -> Self {
		SettingValue::Int(i)
	}
}

impl From<i32> for SettingValue {
	fn from(i: i32) -> Self {
		SettingValue::Int(i64::from(i))
	}
}

impl From<f64> for SettingValue {
	fn from(f: f64) -> Self {
		SettingValue::Float(f)
	}
}

impl From<&str> for SettingValue {
	fn from(s: &str) -> Self {
		SettingValue::String(s.to_string())
	}
}

impl From<String> for SettingValue {
	fn from(s: String) -> Self {
		SettingValue::String(s)
	}
}

impl<T: Into<SettingValue>> From<Vec<T>> for SettingValue {
	fn from(items: Vec<T>) -> Self {
		SettingValue::List(items.into_iter().map(Into::into).collect())
	}
}


// vim: ts=4
