//! TOML document store for non-secret settings
//!
//! Each namespace is one table (`[audio]`, `["voice.stt.leopard"]`), each
//! field a key in it. Saves re-read the file and edit only the keys being
//! changed, so comments, ordering and keys this process does not manage
//! survive untouched. The new content replaces the file through a temp file
//! and a rename.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod error;

pub use error::Error;

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use toml_edit::{DocumentMut, Item, Table, Value};
use tracing::{debug, info};

use confhub_types::error::ChResult;
use confhub_types::store_adapter::{
	DocumentAdapter, DocumentChange, DocumentSnapshot, SettingKey,
};
use confhub_types::value::SettingValue;

#[derive(Debug)]
pub struct TomlDocumentAdapter {
	path: PathBuf,
	lock: Mutex<()>,
}

impl TomlDocumentAdapter {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into(), lock: Mutex::new(()) }
	}

	/// `None` when the file does not exist yet
	fn read_document(&self) -> Result<Option<DocumentMut>, Error> {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};
		let text = String::from_utf8(bytes).map_err(|e| Error::Parse {
			path: self.path.clone(),
			reason: format!("not valid UTF-8: {}", e.utf8_error()),
		})?;
		text.parse::<DocumentMut>()
			.map(Some)
			.map_err(|e| Error::Parse { path: self.path.clone(), reason: e.to_string() })
	}

	fn write_document(&self, doc: &DocumentMut) -> Result<(), Error> {
		if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
			fs::create_dir_all(dir)?;
		}

		let tmp_path = tmp_file_path(&self.path);
		let written = fs::File::create(&tmp_path).and_then(|mut file| {
			file.write_all(doc.to_string().as_bytes())?;
			file.sync_all()
		});
		if let Err(e) = written.and_then(|()| fs::rename(&tmp_path, &self.path)) {
			debug!("Write of {} failed, removing tmpfile: {:?}", self.path.display(), &tmp_path);
			fs::remove_file(&tmp_path).ok();
			return Err(e.into());
		}
		Ok(())
	}

	fn apply_change(&self, doc: &mut DocumentMut, change: &DocumentChange) -> Result<(), Error> {
		let SettingKey { namespace, key } = &change.key;
		let root = doc.as_table_mut();

		let Some(value) = &change.value else {
			if let Some(table) = root.get_mut(namespace).and_then(Item::as_table_like_mut) {
				table.remove(key);
			}
			return Ok(());
		};

		if !root.contains_key(namespace) {
			root.insert(namespace, Item::Table(Table::new()));
		}
		let table = root.get_mut(namespace).and_then(Item::as_table_like_mut).ok_or_else(|| {
			Error::NotATable { path: self.path.clone(), section: namespace.clone() }
		})?;

		let mut new_value = to_toml(value);
		match table.get_mut(key) {
			Some(Item::Value(existing)) => {
				// Keep spacing and trailing comment of the line being edited
				*new_value.decor_mut() = existing.decor().clone();
				*existing = new_value;
			}
			_ => {
				table.insert(key, Item::Value(new_value));
			}
		}
		Ok(())
	}
}

impl DocumentAdapter for TomlDocumentAdapter {
	fn load(&self) -> ChResult<DocumentSnapshot> {
		let _guard = self.lock.lock();
		let Some(doc) = self.read_document()? else {
			info!("Settings file {} not found, using defaults", self.path.display());
			return Ok(DocumentSnapshot::default());
		};

		let mut snapshot = DocumentSnapshot::default();
		for (namespace, item) in doc.iter() {
			let Some(table) = item.as_table_like() else {
				debug!("Skipping top-level key '{}' in {}", namespace, self.path.display());
				continue;
			};
			for (key, item) in table.iter() {
				let setting_key = SettingKey::new(namespace, key);
				match item.as_value().and_then(from_toml) {
					Some(value) => {
						snapshot.values.insert(setting_key, value);
					}
					None => {
						debug!("Unsupported {} at {}", item.type_name(), setting_key);
						snapshot.unsupported.insert(setting_key, item.type_name().to_string());
					}
				}
			}
		}

		debug!(
			"Loaded {} values ({} unsupported) from {}",
			snapshot.values.len(),
			snapshot.unsupported.len(),
			self.path.display()
		);
		Ok(snapshot)
	}

	fn save(&self, changes: &[DocumentChange]) -> ChResult<()> {
		let _guard = self.lock.lock();
		let mut doc = self.read_document()?.unwrap_or_default();
		for change in changes {
			self.apply_change(&mut doc, change)?;
		}
		self.write_document(&doc)?;

		debug!("Wrote {} change(s) to {}", changes.len(), self.path.display());
		Ok(())
	}

	fn path(&self) -> Option<&Path> {
		Some(&self.path)
	}
}

/// Sibling of the target so the final rename stays on one filesystem
fn tmp_file_path(path: &Path) -> PathBuf {
	let name = path.file_name().map_or_else(|| "settings".into(), |n| n.to_string_lossy());
	path.with_file_name(format!(".{}.tmp", name))
}

/// `None` for inline tables (and arrays containing them)
fn from_toml(value: &Value) -> Option<SettingValue> {
	match value {
		Value::String(s) => Some(SettingValue::String(s.value().clone())),
		Value::Integer(i) => Some(SettingValue::Int(*i.value())),
		Value::Float(f) => Some(SettingValue::Float(*f.value())),
		Value::Boolean(b) => Some(SettingValue::Bool(*b.value())),
		Value::Datetime(dt) => Some(SettingValue::String(dt.value().to_string())),
		Value::Array(items) => {
			items.iter().map(from_toml).collect::<Option<Vec<_>>>().map(SettingValue::List)
		}
		Value::InlineTable(_) => None,
	}
}

fn to_toml(value: &SettingValue) -> Value {
	match value {
		SettingValue::Bool(b) => Value::from(*b),
		SettingValue::Int(i) => Value::from(*i),
		SettingValue::Float(f) => Value::from(*f),
		SettingValue::String(s) => Value::from(s.as_str()),
		SettingValue::List(items) => Value::Array(items.iter().map(to_toml).collect()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_value_conversion() {
		let list = SettingValue::List(vec![SettingValue::from("a"), SettingValue::from(2)]);
		assert_eq!(to_toml(&list).to_string(), r#"["a", 2]"#);
		assert_eq!(from_toml(&to_toml(&list)), Some(list));
		assert_eq!(to_toml(&SettingValue::Float(1.0)).to_string(), "1.0");
	}

	#[test]
	fn test_inline_tables_unsupported() {
		let doc = "a = { x = 1 }\nb = [1, { y = 2 }]\n".parse::<DocumentMut>().ok();
		let Some(doc) = doc else { panic!("document should parse") };
		assert!(doc.get("a").and_then(Item::as_value).and_then(from_toml).is_none());
		assert!(doc.get("b").and_then(Item::as_value).and_then(from_toml).is_none());
	}

	#[test]
	fn test_tmp_file_is_hidden_sibling() {
		assert_eq!(
			tmp_file_path(Path::new("/data/settings.toml")),
			PathBuf::from("/data/.settings.toml.tmp")
		);
	}
}

// vim: ts=4
