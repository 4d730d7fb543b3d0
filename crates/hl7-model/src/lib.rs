//! HL7 message model.
//!
//! - **record**: [`Record`] and [`Segment`], with line-oriented parse/serialize
//! - **rules**: [`Rule`], [`Action`], and [`Condition`] as stored in rule sets
//! - **error**: model error type

pub mod error;
pub mod record;
pub mod rules;

pub use error::{ModelError, Result};
pub use record::{FIELD_DELIMITER, Record, Segment, SegmentTerminator};
pub use rules::{Action, Condition, ConditionOperator, Rule, RuleIssue, RuleSet};
