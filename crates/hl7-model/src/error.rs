use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// A segment must keep at least its tag field.
    #[error("segment must contain at least one field")]
    EmptySegment,

    /// The rule set document is not a JSON array.
    #[error("rule set must be a JSON array, found {found}")]
    RuleSetShape { found: &'static str },

    #[error("invalid rule JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
