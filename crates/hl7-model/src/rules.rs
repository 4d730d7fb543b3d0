//! Transformation rule definitions.
//!
//! Rules are stored as JSON. A rule is either a bare action object:
//!
//! ```json
//! {"action": "modify_field", "segment": "PID", "field_index": 2, "new_value": "Jane"}
//! ```
//!
//! or a condition guarding an ordered list of actions:
//!
//! ```json
//! {
//!   "condition": {"segment": "PID", "field_index": 8, "operator": "equals", "value": "F"},
//!   "actions": [{"action": "delete_segment", "segment": "NK1"}]
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ModelError, Result};

/// One atomic edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Remove every segment with this tag.
    DeleteSegment { segment: String },

    /// Insert a new segment `[new_segment] + values`.
    ///
    /// A missing, negative or past-the-end `position` appends.
    AddSegment {
        new_segment: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<i64>,
        #[serde(default, deserialize_with = "nullable_vec")]
        values: Vec<String>,
    },

    /// Overwrite an existing field of the first matching segment.
    ModifyField {
        segment: String,
        field_index: usize,
        new_value: String,
    },

    /// Rebuild the first matching segment from the listed field indices.
    ReorderFields {
        segment: String,
        new_order: Vec<usize>,
    },

    /// Copy one field into another, possibly across segments.
    CopyValue {
        source_segment: String,
        source_field: usize,
        dest_segment: String,
        dest_field: usize,
    },

    /// Insert a block of fields into the first matching segment.
    #[serde(alias = "agregar_campos")]
    InsertFields {
        segment: String,
        #[serde(default, deserialize_with = "nullable_vec")]
        values: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_index: Option<usize>,
    },
}

impl Action {
    /// Wire name of the action.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DeleteSegment { .. } => "delete_segment",
            Self::AddSegment { .. } => "add_segment",
            Self::ModifyField { .. } => "modify_field",
            Self::ReorderFields { .. } => "reorder_fields",
            Self::CopyValue { .. } => "copy_value",
            Self::InsertFields { .. } => "insert_fields",
        }
    }

    /// The segment tag this action edits.
    pub fn target_segment(&self) -> &str {
        match self {
            Self::DeleteSegment { segment }
            | Self::ModifyField { segment, .. }
            | Self::ReorderFields { segment, .. }
            | Self::InsertFields { segment, .. } => segment,
            Self::AddSegment { new_segment, .. } => new_segment,
            Self::CopyValue { dest_segment, .. } => dest_segment,
        }
    }
}

fn nullable_vec<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    #[default]
    Equals,
    /// Any operator name this version does not know. Never satisfied.
    #[serde(other)]
    Unsupported,
}

impl ConditionOperator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guard evaluated against the first segment with the given tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub segment: String,
    pub field_index: usize,
    #[serde(default)]
    pub operator: ConditionOperator,
    pub value: String,
}

impl Condition {
    pub fn equals(segment: impl Into<String>, field_index: usize, value: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            field_index,
            operator: ConditionOperator::Equals,
            value: value.into(),
        }
    }
}

/// A configured edit instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rule {
    /// Actions that run only when the condition holds.
    Conditional {
        condition: Condition,
        actions: Vec<Action>,
    },
    /// A single unconditional action.
    Single(Action),
}

impl Rule {
    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Self::Conditional { condition, .. } => Some(condition),
            Self::Single(_) => None,
        }
    }

    pub fn actions(&self) -> &[Action] {
        match self {
            Self::Conditional { actions, .. } => actions,
            Self::Single(action) => std::slice::from_ref(action),
        }
    }
}

impl From<Action> for Rule {
    fn from(action: Action) -> Self {
        Self::Single(action)
    }
}

/// A rule-set entry that could not be understood and was dropped on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleIssue {
    /// Zero-based position of the rule in the set.
    pub rule_index: usize,
    /// Zero-based position of the action inside a conditional rule.
    pub action_index: Option<usize>,
    pub message: String,
}

impl fmt::Display for RuleIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action_index {
            Some(action) => write!(
                f,
                "rule {} action {}: {}",
                self.rule_index + 1,
                action + 1,
                self.message
            ),
            None => write!(f, "rule {}: {}", self.rule_index + 1, self.message),
        }
    }
}

/// Ordered list of rules applied in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn push(&mut self, rule: impl Into<Rule>) {
        self.rules.push(rule.into());
    }

    /// Build a rule set from JSON, dropping entries that do not parse.
    ///
    /// Unknown action names, missing parameters or malformed conditions only
    /// discard the affected rule (or the affected action of a conditional
    /// rule); each is reported as a [`RuleIssue`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::RuleSetShape`] if `value` is not an array.
    pub fn from_value_lenient(value: &Value) -> Result<(Self, Vec<RuleIssue>)> {
        let Value::Array(entries) = value else {
            return Err(ModelError::RuleSetShape {
                found: json_kind(value),
            });
        };

        let mut rules = Vec::with_capacity(entries.len());
        let mut issues = Vec::new();

        for (rule_index, entry) in entries.iter().enumerate() {
            let Some(condition) = entry.get("condition") else {
                match Action::deserialize(entry) {
                    Ok(action) => rules.push(Rule::Single(action)),
                    Err(error) => issues.push(RuleIssue {
                        rule_index,
                        action_index: None,
                        message: error.to_string(),
                    }),
                }
                continue;
            };

            let condition = match Condition::deserialize(condition) {
                Ok(condition) => condition,
                Err(error) => {
                    issues.push(RuleIssue {
                        rule_index,
                        action_index: None,
                        message: format!("invalid condition: {error}"),
                    });
                    continue;
                }
            };

            let raw_actions = match entry.get("actions") {
                None | Some(Value::Null) => &[][..],
                Some(Value::Array(actions)) => actions.as_slice(),
                Some(other) => {
                    issues.push(RuleIssue {
                        rule_index,
                        action_index: None,
                        message: format!("actions must be an array, found {}", json_kind(other)),
                    });
                    continue;
                }
            };

            let mut actions = Vec::with_capacity(raw_actions.len());
            for (action_index, raw) in raw_actions.iter().enumerate() {
                match Action::deserialize(raw) {
                    Ok(action) => actions.push(action),
                    Err(error) => issues.push(RuleIssue {
                        rule_index,
                        action_index: Some(action_index),
                        message: error.to_string(),
                    }),
                }
            }
            rules.push(Rule::Conditional { condition, actions });
        }

        Ok((Self { rules }, issues))
    }

    /// Parse a JSON document with [`RuleSet::from_value_lenient`].
    ///
    /// # Errors
    ///
    /// Fails if the text is not JSON or not an array.
    pub fn from_json_lenient(text: &str) -> Result<(Self, Vec<RuleIssue>)> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value_lenient(&value)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_action_deserializes() {
        let rule: Rule = serde_json::from_value(json!({
            "action": "modify_field",
            "segment": "PID",
            "field_index": 2,
            "new_value": "Jane"
        }))
        .unwrap();
        assert_eq!(
            rule,
            Rule::Single(Action::ModifyField {
                segment: "PID".to_string(),
                field_index: 2,
                new_value: "Jane".to_string(),
            })
        );
        assert!(rule.condition().is_none());
    }

    #[test]
    fn legacy_insert_fields_name_is_accepted() {
        let action: Action = serde_json::from_value(json!({
            "action": "agregar_campos",
            "segment": "PV1",
            "start_index": null,
            "values": ["A", "B"]
        }))
        .unwrap();
        assert_eq!(action.name(), "insert_fields");
        assert_eq!(action.target_segment(), "PV1");
    }

    #[test]
    fn add_segment_accepts_null_position_and_values() {
        let action: Action = serde_json::from_value(json!({
            "action": "add_segment",
            "new_segment": "NK1",
            "position": null,
            "values": null
        }))
        .unwrap();
        assert_eq!(
            action,
            Action::AddSegment {
                new_segment: "NK1".to_string(),
                position: None,
                values: Vec::new(),
            }
        );
    }

    #[test]
    fn unknown_operator_is_unsupported() {
        let condition: Condition = serde_json::from_value(json!({
            "segment": "PID",
            "field_index": 3,
            "operator": "contains",
            "value": "M"
        }))
        .unwrap();
        assert_eq!(condition.operator, ConditionOperator::Unsupported);
    }

    #[test]
    fn missing_operator_defaults_to_equals() {
        let condition: Condition = serde_json::from_value(json!({
            "segment": "PID",
            "field_index": 3,
            "value": "M"
        }))
        .unwrap();
        assert_eq!(condition.operator, ConditionOperator::Equals);
    }

    #[test]
    fn conditional_rule_serializes_in_wire_shape() {
        let rule = Rule::Conditional {
            condition: Condition::equals("PID", 3, "F"),
            actions: vec![Action::DeleteSegment {
                segment: "NK1".to_string(),
            }],
        };
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({
                "condition": {"segment": "PID", "field_index": 3, "operator": "equals", "value": "F"},
                "actions": [{"action": "delete_segment", "segment": "NK1"}]
            })
        );
    }

    #[test]
    fn lenient_load_drops_only_bad_entries() {
        let value = json!([
            {"action": "delete_segment", "segment": "NTE"},
            {"action": "translate_field", "segment": "PID"},
            {
                "condition": {"segment": "PID", "field_index": 3, "operator": "equals", "value": "F"},
                "actions": [
                    {"action": "modify_field", "segment": "PID", "field_index": -1, "new_value": "x"},
                    {"action": "delete_segment", "segment": "NK1"}
                ]
            },
            {"condition": {"segment": "PID"}, "actions": []}
        ]);
        let (rules, issues) = RuleSet::from_value_lenient(&value).unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules.rules()[1].actions().len(), 1);
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].rule_index, 1);
        assert_eq!(issues[1].action_index, Some(0));
        assert!(issues[2].message.starts_with("invalid condition"));
        assert!(issues[0].to_string().starts_with("rule 2:"));
    }

    #[test]
    fn lenient_load_rejects_non_array() {
        let error = RuleSet::from_value_lenient(&json!({"rules": []})).unwrap_err();
        assert!(matches!(
            error,
            ModelError::RuleSetShape {
                found: "an object"
            }
        ));
    }
}
