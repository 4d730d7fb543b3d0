//! Rule-set selection for commands.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use hl7_config::ConfigStore;
use hl7_model::RuleSet;
use tracing::{info, warn};

/// Rule set named `name` from the store, or an empty set when no name is
/// given.
pub fn select_rules(store: &ConfigStore, name: Option<&str>) -> Result<Arc<RuleSet>> {
    let Some(name) = name else {
        info!("no configuration selected, messages pass through unchanged");
        return Ok(Arc::new(RuleSet::default()));
    };
    let rules = store
        .rule_set(name)
        .with_context(|| format!("select configuration '{name}'"))?;
    info!(config = name, rules = rules.len(), "using configuration");
    Ok(rules)
}

/// Load a stand-alone rule array from a JSON file.
///
/// Entries that do not parse are dropped with a warning.
pub fn load_rules_file(path: &Path) -> Result<Arc<RuleSet>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read rules from {}", path.display()))?;
    let (rules, issues) = RuleSet::from_json_lenient(&text)
        .with_context(|| format!("parse rules from {}", path.display()))?;
    for issue in &issues {
        warn!(path = %path.display(), %issue, "dropped rule entry");
    }
    Ok(Arc::new(rules))
}

/// Number of actions across every rule in `rules`.
pub fn action_count(rules: &RuleSet) -> usize {
    rules.iter().map(|rule| rule.actions().len()).sum()
}
