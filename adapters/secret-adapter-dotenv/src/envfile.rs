//! Line model of a `KEY=value` file
//!
//! Lines that are not touched by an update are written back exactly as they
//! were read, including their own line ending. Supported syntax: `#`
//! comments, blank lines, an optional `export ` prefix, unquoted values (with
//! ` #` trailing comments), single-quoted literal values and double-quoted
//! values with `\n`, `\r`, `\t`, `\"` and `\\` escapes.

use std::collections::HashMap;
use std::fmt;

use confhub_types::is_valid_env_key;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
	Entry { key: String, value: String, export: bool, text: String },
	/// Comment or blank line, kept verbatim
	Other(String),
}

/// A line and the terminator it was read with (empty for a final line
/// without one)
#[derive(Debug, Clone, PartialEq, Eq)]
struct Row {
	line: Line,
	ending: &'static str,
}

/// 1-based line number and reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
	pub line: usize,
	pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFile {
	rows: Vec<Row>,
	/// Terminator for appended lines: the one most lines of the file use
	newline: &'static str,
}

impl Default for EnvFile {
	fn default() -> Self {
		Self { rows: Vec::new(), newline: "\n" }
	}
}

impl EnvFile {
	pub fn parse(text: &str) -> Result<Self, ParseError> {
		let mut crlf = 0_usize;
		let mut lf = 0_usize;

		let rows = text
			.split_inclusive('\n')
			.enumerate()
			.map(|(idx, raw)| {
				let (line, ending) = if let Some(line) = raw.strip_suffix("\r\n") {
					crlf += 1;
					(line, "\r\n")
				} else if let Some(line) = raw.strip_suffix('\n') {
					lf += 1;
					(line, "\n")
				} else {
					(raw, "")
				};
				parse_line(line)
					.map(|line| Row { line, ending })
					.map_err(|reason| ParseError { line: idx + 1, reason })
			})
			.collect::<Result<Vec<_>, _>>()?;

		let newline = if crlf > lf { "\r\n" } else { "\n" };
		Ok(Self { rows, newline })
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.rows.iter().rev().find_map(|row| match &row.line {
			Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
			_ => None,
		})
	}

	/// Every entry; a key repeated later in the file wins
	pub fn entries(&self) -> HashMap<String, String> {
		self.rows
			.iter()
			.filter_map(|row| match &row.line {
				Line::Entry { key, value, .. } => Some((key.clone(), value.clone())),
				Line::Other(_) => None,
			})
			.collect()
	}

	/// Rewrite every line of `key` in place, or append a new line
	pub fn set(&mut self, key: &str, new_value: &str) {
		let mut found = false;
		for row in &mut self.rows {
			if let Line::Entry { key: k, value, export, text } = &mut row.line {
				if k.as_str() == key {
					if value.as_str() != new_value {
						*text = render(*export, key, new_value);
						*value = new_value.to_string();
					}
					found = true;
				}
			}
		}

		if !found {
			// A final line without a terminator stays the final unterminated line
			let ending = match self.rows.last_mut() {
				Some(last) if last.ending.is_empty() => {
					last.ending = self.newline;
					""
				}
				_ => self.newline,
			};
			self.rows.push(Row {
				line: Line::Entry {
					key: key.to_string(),
					value: new_value.to_string(),
					export: false,
					text: render(false, key, new_value),
				},
				ending,
			});
		}
	}

	/// Drop every line of `key`; returns whether any existed
	pub fn remove(&mut self, key: &str) -> bool {
		let unterminated = self.rows.last().is_some_and(|row| row.ending.is_empty());
		let before = self.rows.len();
		self.rows.retain(|row| !matches!(&row.line, Line::Entry { key: k, .. } if k == key));
		if unterminated {
			if let Some(last) = self.rows.last_mut() {
				last.ending = "";
			}
		}
		self.rows.len() != before
	}
}

impl fmt::Display for EnvFile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for row in &self.rows {
			match &row.line {
				Line::Entry { text, .. } | Line::Other(text) => f.write_str(text)?,
			}
			f.write_str(row.ending)?;
		}
		Ok(())
	}
}

fn parse_line(line: &str) -> Result<Line, String> {
	let trimmed = line.trim_start();
	if trimmed.is_empty() || trimmed.starts_with('#') {
		return Ok(Line::Other(line.to_string()));
	}

	let (export, rest) = match trimmed.strip_prefix("export ") {
		Some(rest) => (true, rest.trim_start()),
		None => (false, trimmed),
	};
	let Some((key, raw_value)) = rest.split_once('=') else {
		return Err(format!("expected KEY=value, got '{}'", line));
	};
	let key = key.trim_end();
	if !is_valid_env_key(key) {
		return Err(format!("invalid key '{}'", key));
	}

	Ok(Line::Entry {
		key: key.to_string(),
		value: parse_value(raw_value.trim())?,
		export,
		text: line.to_string(),
	})
}

fn parse_value(raw: &str) -> Result<String, String> {
	if let Some(body) = raw.strip_prefix('\'') {
		let end = body.find('\'').ok_or("unterminated single quote")?;
		check_trailer(&body[end + 1..])?;
		return Ok(body[..end].to_string());
	}

	if let Some(body) = raw.strip_prefix('"') {
		let mut value = String::new();
		let mut chars = body.char_indices();
		while let Some((idx, c)) = chars.next() {
			match c {
				'"' => {
					check_trailer(&body[idx + 1..])?;
					return Ok(value);
				}
				'\\' => match chars.next() {
					Some((_, 'n')) => value.push('\n'),
					Some((_, 'r')) => value.push('\r'),
					Some((_, 't')) => value.push('\t'),
					Some((_, other)) => value.push(other),
					None => break,
				},
				c => value.push(c),
			}
		}
		return Err("unterminated double quote".into());
	}

	// Unquoted: a `#` after whitespace starts a comment
	let value = match raw.find(" #").or_else(|| raw.find("\t#")) {
		Some(pos) => raw[..pos].trim_end(),
		None => raw,
	};
	Ok(value.to_string())
}

/// Only whitespace or a comment may follow a closing quote
fn check_trailer(rest: &str) -> Result<(), String> {
	let rest = rest.trim_start();
	if rest.is_empty() || rest.starts_with('#') {
		Ok(())
	} else {
		Err(format!("unexpected '{}' after closing quote", rest))
	}
}

fn needs_quotes(value: &str) -> bool {
	value != value.trim()
		|| value.chars().any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '\\'))
}

fn render(export: bool, key: &str, value: &str) -> String {
	let prefix = if export { "export " } else { "" };
	if !needs_quotes(value) {
		return format!("{}{}={}", prefix, key, value);
	}

	let mut quoted = String::with_capacity(value.len() + 2);
	quoted.push('"');
	for c in value.chars() {
		match c {
			'\n' => quoted.push_str("\\n"),
			'\r' => quoted.push_str("\\r"),
			'\t' => quoted.push_str("\\t"),
			'"' => quoted.push_str("\\\""),
			'\\' => quoted.push_str("\\\\"),
			c => quoted.push(c),
		}
	}
	quoted.push('"');
	format!("{}{}={}", prefix, key, quoted)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(text: &str) -> EnvFile {
		EnvFile::parse(text).unwrap_or_else(|e| panic!("parse failed: {:?}", e))
	}

	#[test]
	fn test_parse_forms() {
		let file = parse(concat!(
			"# comment\n",
			"\n",
			"PLAIN=abc\n",
			"export EXPORTED=1\n",
			"SPACED = value with spaces  # trailing\n",
			"SINGLE='lit $x \\n'\n",
			"DOUBLE=\"a\\nb \\\"q\\\"\" # c\n",
			"EMPTY=\n",
			"HASH=abc#def\n",
		));

		assert_eq!(file.get("PLAIN"), Some("abc"));
		assert_eq!(file.get("EXPORTED"), Some("1"));
		assert_eq!(file.get("SPACED"), Some("value with spaces"));
		assert_eq!(file.get("SINGLE"), Some("lit $x \\n"));
		assert_eq!(file.get("DOUBLE"), Some("a\nb \"q\""));
		assert_eq!(file.get("EMPTY"), Some(""));
		assert_eq!(file.get("HASH"), Some("abc#def"));
		assert_eq!(file.entries().len(), 7);
	}

	#[test]
	fn test_malformed_lines() {
		let err = EnvFile::parse("A=1\njust some text\n").err();
		assert_eq!(err.map(|e| e.line), Some(2));
		assert!(EnvFile::parse("1BAD=x\n").is_err());
		assert!(EnvFile::parse("A=\"open\n").is_err());
		assert!(EnvFile::parse("A='x' trailing\n").is_err());
	}

	#[test]
	fn test_untouched_file_round_trips() {
		let text = "# header\r\nexport A = 'x' # keep\r\n\r\nB=2";
		assert_eq!(parse(text).to_string(), text);
	}

	#[test]
	fn test_set_rewrites_in_place() {
		let mut file = parse("# secrets\nexport API_KEY=old # rotate\nOTHER=1\n");
		file.set("API_KEY", "sk-123");
		assert_eq!(file.to_string(), "# secrets\nexport API_KEY=sk-123\nOTHER=1\n");
	}

	#[test]
	fn test_set_same_value_keeps_line() {
		let text = "API_KEY=sk-1   # note\n";
		let mut file = parse(text);
		file.set("API_KEY", "sk-1");
		assert_eq!(file.to_string(), text);
	}

	#[test]
	fn test_set_appends_and_keeps_line_endings() {
		let mut file = parse("A=1\r\n");
		file.set("B", "two words");
		assert_eq!(file.to_string(), "A=1\r\nB=\"two words\"\r\n");

		let mut file = parse("A=1");
		file.set("B", "2");
		assert_eq!(file.to_string(), "A=1\nB=2");

		let mut file = EnvFile::default();
		file.set("NEW", "v");
		assert_eq!(file.to_string(), "NEW=v\n");
	}

	#[test]
	fn test_each_line_keeps_its_own_ending() {
		let mut file = parse("A=1\r\nB=2\n# c\r\n");
		file.set("B", "3");
		file.set("C", "4");
		assert_eq!(file.to_string(), "A=1\r\nB=3\n# c\r\nC=4\r\n");

		let mut file = parse("A=1\nB=2");
		assert!(file.remove("B"));
		assert_eq!(file.to_string(), "A=1");
	}

	#[test]
	fn test_remove() {
		let mut file = parse("# c\nA=1\nB=2\nA=3\n");
		assert!(file.remove("A"));
		assert!(!file.remove("A"));
		assert_eq!(file.to_string(), "# c\nB=2\n");
	}

	#[test]
	fn test_quoting_round_trips() {
		for value in ["plain", "", " padded ", "a#b", "line\nbreak", "quote\"s", "back\\slash", "tab\t"] {
			let mut file = EnvFile::default();
			file.set("K", value);
			assert_eq!(parse(&file.to_string()).get("K"), Some(value), "value {:?}", value);
		}
		assert!(!needs_quotes("sk-123"));
		assert!(needs_quotes("has space"));
	}
}

// vim: ts=4
