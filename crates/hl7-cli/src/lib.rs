//! CLI library components for the HL7 interface manager.

pub mod logging;
pub mod rules;
