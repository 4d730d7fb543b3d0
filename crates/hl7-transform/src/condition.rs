//! Rule guards.

use hl7_model::{Condition, ConditionOperator, Record};
use tracing::warn;

/// Test `condition` against the first segment tagged `condition.segment`.
///
/// A missing segment, an out-of-range index or an operator this version does
/// not support all count as "not satisfied".
pub fn evaluate(record: &Record, condition: &Condition) -> bool {
    match condition.operator {
        ConditionOperator::Equals => record
            .first(&condition.segment)
            .and_then(|segment| segment.field(condition.field_index))
            .is_some_and(|field| field == condition.value),
        ConditionOperator::Unsupported => {
            warn!(
                segment = %condition.segment,
                field_index = condition.field_index,
                "unsupported condition operator, treating as not satisfied"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equals_is_exact_and_case_sensitive() {
        let record = Record::parse("PID|1|John|M\n");
        assert!(evaluate(&record, &Condition::equals("PID", 3, "M")));
        assert!(!evaluate(&record, &Condition::equals("PID", 3, "m")));
        assert!(!evaluate(&record, &Condition::equals("PID", 3, "M ")));
    }

    #[test]
    fn missing_segment_or_index_is_false() {
        let record = Record::parse("PID|1\n");
        assert!(!evaluate(&record, &Condition::equals("PV1", 1, "1")));
        assert!(!evaluate(&record, &Condition::equals("PID", 4, "")));
    }

    #[test]
    fn only_first_segment_is_checked() {
        let record = Record::parse("OBX|1|A\nOBX|2|B\n");
        assert!(evaluate(&record, &Condition::equals("OBX", 2, "A")));
        assert!(!evaluate(&record, &Condition::equals("OBX", 2, "B")));
    }

    #[test]
    fn unsupported_operator_is_false() {
        let record = Record::parse("PID|1\n");
        let mut condition = Condition::equals("PID", 1, "1");
        condition.operator = ConditionOperator::Unsupported;
        assert!(!evaluate(&record, &condition));
    }
}
