//! Named rule-set store.
//!
//! The store file is one JSON object mapping a configuration name to its
//! rule array:
//!
//! ```json
//! {
//!     "lab": [{"action": "delete_segment", "segment": "NTE"}],
//!     "adt": []
//! }
//! ```
//!
//! Each configuration is kept as the JSON it was loaded with and written back
//! unchanged, so entries this version does not understand survive a save.
//! Leniency applies when rules are resolved: a rule or action that does not
//! parse is dropped with a warning and the rest of its set is kept.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hl7_model::RuleSet;
use hl7_output::write_atomic;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::{info, warn};

use crate::error::{ConfigError, Result};

/// Named rule sets backed by a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
    configs: BTreeMap<String, Value>,
}

impl ConfigStore {
    /// Empty store that will save to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            configs: BTreeMap::new(),
        }
    }

    /// Load the store at `path`. A missing file gives an empty store.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not JSON, or is not an object.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let configs = match fs::read_to_string(&path) {
            Ok(text) => parse_configs(&text, &path)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no configuration store yet");
                BTreeMap::new()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    operation: "read",
                    path,
                    source,
                });
            }
        };
        info!(path = %path.display(), count = configs.len(), "loaded configurations");
        Ok(Self { path, configs })
    }

    /// Write the store back to its file atomically.
    pub fn save(&self) -> Result<()> {
        write_atomic(&self.path, &self.to_json()?)?;
        info!(path = %self.path.display(), count = self.configs.len(), "saved configurations");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configuration names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    /// Every configuration with its rules resolved, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Result<RuleSet>)> {
        self.configs
            .iter()
            .map(|(name, raw)| (name.as_str(), resolve(name, raw)))
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.configs.contains_key(name)
    }

    /// The configuration exactly as stored.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.configs.get(name)
    }

    /// Add or replace a configuration. Returns whether a previous one was
    /// replaced.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Serialize`] if the rules cannot be converted to JSON.
    pub fn insert(&mut self, name: impl Into<String>, rules: &RuleSet) -> Result<bool> {
        let value = serde_json::to_value(rules).map_err(ConfigError::Serialize)?;
        Ok(self.configs.insert(name.into(), value).is_some())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.configs.remove(name).is_some()
    }

    /// Shared copy of a named rule set for a processing run.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownConfig`] if no configuration has that name, and
    /// [`ConfigError::InvalidConfig`] if it is not a rule array.
    pub fn rule_set(&self, name: &str) -> Result<Arc<RuleSet>> {
        let raw = self
            .configs
            .get(name)
            .ok_or_else(|| ConfigError::UnknownConfig {
                name: name.to_string(),
            })?;
        resolve(name, raw).map(Arc::new)
    }

    /// Write every configuration to `path` in the store's own format.
    pub fn export_to(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_json()?)?;
        info!(path = %path.display(), count = self.configs.len(), "exported configurations");
        Ok(())
    }

    /// Merge configurations from `path` into the store.
    ///
    /// Imported names replace existing ones. A missing file imports nothing.
    /// Returns the imported names; call [`ConfigStore::save`] to persist.
    pub fn import_from(&mut self, path: &Path) -> Result<Vec<String>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "import file does not exist");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    operation: "read",
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let imported = parse_configs(&text, path)?;
        let names: Vec<String> = imported.keys().cloned().collect();
        for (name, raw) in imported {
            if let Err(error) = resolve(&name, &raw) {
                warn!(config = %name, %error, "imported configuration has no usable rules");
            }
            if self.configs.insert(name.clone(), raw).is_some() {
                info!(config = %name, "replaced configuration on import");
            }
        }
        info!(path = %path.display(), count = names.len(), "imported configurations");
        Ok(names)
    }

    fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.configs
            .serialize(&mut serializer)
            .map_err(ConfigError::Serialize)?;
        let mut text = String::from_utf8_lossy(&buf).into_owned();
        text.push('\n');
        Ok(text)
    }
}

/// Parse one stored configuration, dropping entries that do not parse.
fn resolve(name: &str, raw: &Value) -> Result<RuleSet> {
    let (rules, issues) =
        RuleSet::from_value_lenient(raw).map_err(|source| ConfigError::InvalidConfig {
            name: name.to_string(),
            source,
        })?;
    for issue in &issues {
        warn!(config = %name, %issue, "skipped rule entry");
    }
    Ok(rules)
}

fn parse_configs(text: &str, path: &Path) -> Result<BTreeMap<String, Value>> {
    let value: Value = serde_json::from_str(text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(entries) => Ok(entries.into_iter().collect()),
        other => Err(ConfigError::StoreShape {
            path: path.to_path_buf(),
            found: json_kind(&other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
