use std::path::Path;

use hashbrown::HashMap;
use luajit_reader::opcode::Version;
use serde::Deserialize;

use crate::{error::ConfigError, fallback::Fallback};

/// The list used when none is named or the named one is missing.
pub const DEFAULT_LIST: &str = "version_default";

fn default_version() -> String {
	String::from("2.1")
}

/// Which LuaJIT version each input was compiled with, and what to run when
/// decompiling fails.
///
/// ```toml
/// default = "2.1"
///
/// [lists.version_default]
///
/// [lists.game]
/// "scripts/old" = "2.0"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
	#[serde(default = "default_version")]
	pub default: String,

	/// Named lists of path substrings, each checked in document order.
	#[serde(default)]
	pub lists: HashMap<String, toml::Table>,

	#[serde(default)]
	pub fallback: Option<Fallback>,
}

impl Config {
	/// # Errors
	///
	/// Returns an error if the document is not valid TOML or has unknown keys.
	pub fn from_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
		toml::from_str(text).map_err(|source| ConfigError::Parse {
			path: path.to_owned(),
			source,
		})
	}

	/// # Errors
	///
	/// Returns an error if the file cannot be read or parsed.
	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_owned(),
			source,
		})?;

		Self::from_str(&text, path)
	}

	#[must_use]
	pub fn has_list(&self, list: &str) -> bool {
		self.lists.contains_key(list)
	}

	/// Picks the version for the file at `path` from `list`, falling back to
	/// the default list and then to the default version.
	///
	/// # Errors
	///
	/// Returns an error if the matching entry names an unknown version.
	pub fn select(&self, list: &str, path: &str) -> Result<Version, ConfigError> {
		let path = path.replace('\\', "/");
		let entries = self.lists.get(list).or_else(|| self.lists.get(DEFAULT_LIST));
		let matched = entries.and_then(|entries| {
			entries
				.iter()
				.find(|(pattern, _)| path.contains(pattern.as_str()))
		});

		match matched {
			Some((pattern, value)) => {
				tracing::debug!(%pattern, %path, "matched version list entry");

				parse_value(value)
			}
			None => parse_name(&self.default),
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			default: default_version(),
			lists: HashMap::new(),
			fallback: None,
		}
	}
}

/// # Errors
///
/// Returns an error if `name` is neither `2.0` nor `2.1`.
pub fn parse_name(name: &str) -> Result<Version, ConfigError> {
	Version::from_name(name.trim()).ok_or_else(|| ConfigError::UnknownVersion(name.to_owned()))
}

fn parse_value(value: &toml::Value) -> Result<Version, ConfigError> {
	match value {
		toml::Value::String(name) => parse_name(name),
		toml::Value::Float(number) => parse_name(&format!("{number:.1}")),
		value => Err(ConfigError::UnknownVersion(value.to_string())),
	}
}
