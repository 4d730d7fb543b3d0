//! HL7 message transformation.
//!
//! - **operations**: the six atomic edits over a [`Record`](hl7_model::Record)
//! - **condition**: equality guards for conditional rules
//! - **engine**: single-pass, in-order rule application
//! - **redact**: PHI-safe rendering of field values in log output

pub mod condition;
pub mod engine;
pub mod operations;
pub mod redact;

pub use condition::evaluate;
pub use engine::{TransformReport, apply_rules, transform_text};
pub use operations::{MAX_FIELDS, OpOutcome, SkipReason, apply_action};
pub use redact::{REDACTED_VALUE, log_data_enabled, redact_value, set_log_data_enabled};
