//! Rule application.
//!
//! Rules run once, left to right, mutating the record in place. Conditions are
//! evaluated against the record as left by every earlier rule, so later rules
//! see the cumulative effect of earlier ones. There is no rollback: a skipped
//! action is logged and the pass continues.

use hl7_model::{Action, Record, RuleSet};
use tracing::{debug, warn};

use crate::condition::evaluate;
use crate::operations::{OpOutcome, apply_action};
use crate::redact::redact_value;

/// Counters for one pass over a rule set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformReport {
    /// Rules whose actions ran (unconditional, or condition satisfied).
    pub rules_applied: usize,
    /// Conditional rules whose condition did not hold.
    pub rules_skipped: usize,
    pub actions_applied: usize,
    /// Actions that left the record untouched (missing segment, bad index).
    pub actions_skipped: usize,
}

impl TransformReport {
    pub fn merge(&mut self, other: &Self) {
        self.rules_applied += other.rules_applied;
        self.rules_skipped += other.rules_skipped;
        self.actions_applied += other.actions_applied;
        self.actions_skipped += other.actions_skipped;
    }
}

/// Apply every rule in order to `record`.
pub fn apply_rules(record: &mut Record, rules: &RuleSet) -> TransformReport {
    let mut report = TransformReport::default();

    for (index, rule) in rules.iter().enumerate() {
        let rule_number = index + 1;
        if let Some(condition) = rule.condition() {
            if !evaluate(record, condition) {
                warn!(
                    rule = rule_number,
                    segment = %condition.segment,
                    field_index = condition.field_index,
                    operator = %condition.operator,
                    expected = %redact_value(&condition.value),
                    "condition not met, skipping rule"
                );
                report.rules_skipped += 1;
                continue;
            }
            debug!(rule = rule_number, segment = %condition.segment, "condition met");
        }

        report.rules_applied += 1;
        for action in rule.actions() {
            match apply_action(record, action) {
                OpOutcome::Applied => {
                    log_applied(rule_number, action);
                    report.actions_applied += 1;
                }
                OpOutcome::Skipped(reason) => {
                    warn!(
                        rule = rule_number,
                        action = action.name(),
                        %reason,
                        "action skipped"
                    );
                    report.actions_skipped += 1;
                }
            }
        }
    }

    report
}

/// Parse `text`, apply `rules`, and serialize the result.
pub fn transform_text(text: &str, rules: &RuleSet) -> (String, TransformReport) {
    let mut record = Record::parse(text);
    let report = apply_rules(&mut record, rules);
    (record.serialize(), report)
}

fn log_applied(rule: usize, action: &Action) {
    match action {
        Action::DeleteSegment { segment } => {
            debug!(rule, segment = %segment, "deleted segment");
        }
        Action::AddSegment {
            new_segment,
            position,
            values,
        } => {
            debug!(
                rule,
                segment = %new_segment,
                position = ?position,
                value_count = values.len(),
                "added segment"
            );
        }
        Action::ModifyField {
            segment,
            field_index,
            new_value,
        } => {
            debug!(
                rule,
                segment = %segment,
                field_index,
                new_value = %redact_value(new_value),
                "modified field"
            );
        }
        Action::ReorderFields { segment, new_order } => {
            debug!(rule, segment = %segment, new_order = ?new_order, "reordered fields");
        }
        Action::CopyValue {
            source_segment,
            source_field,
            dest_segment,
            dest_field,
        } => {
            debug!(
                rule,
                from = %format!("{source_segment}[{source_field}]"),
                to = %format!("{dest_segment}[{dest_field}]"),
                "copied value"
            );
        }
        Action::InsertFields {
            segment,
            values,
            start_index,
        } => {
            debug!(
                rule,
                segment = %segment,
                start_index = ?start_index,
                value_count = values.len(),
                "inserted fields"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl7_model::{Condition, Rule};

    #[test]
    fn empty_rule_set_is_identity() {
        let text = "MSH|^~\\&|A\nPID|1|John|M\n";
        let mut record = Record::parse(text);
        let report = apply_rules(&mut record, &RuleSet::default());
        assert_eq!(record, Record::parse(text));
        assert_eq!(report, TransformReport::default());
    }

    #[test]
    fn report_counts_applied_and_skipped() {
        let rules = RuleSet::new(vec![
            Rule::Single(Action::DeleteSegment {
                segment: "NTE".to_string(),
            }),
            Rule::Conditional {
                condition: Condition::equals("PID", 3, "F"),
                actions: vec![Action::DeleteSegment {
                    segment: "PID".to_string(),
                }],
            },
            Rule::Single(Action::ModifyField {
                segment: "PID".to_string(),
                field_index: 2,
                new_value: "Jane".to_string(),
            }),
        ]);
        let mut record = Record::parse("PID|1|John|M\n");
        let report = apply_rules(&mut record, &rules);

        assert_eq!(
            report,
            TransformReport {
                rules_applied: 2,
                rules_skipped: 1,
                actions_applied: 1,
                actions_skipped: 1,
            }
        );
        assert_eq!(record.serialize(), "PID|1|Jane|M\n");
    }
}
