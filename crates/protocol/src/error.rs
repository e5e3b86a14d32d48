//! Sentence parse errors

/// Errors from parsing a validated line into a typed sentence
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Sentence type is not part of the recognised vocabulary
    #[error("unsupported sentence type {0:?}")]
    Unsupported(String),

    /// Line is too short to carry a type token
    #[error("malformed sentence: {0}")]
    Malformed(&'static str),

    /// A required field is missing
    #[error("missing field {name} (index {index})")]
    MissingField { name: &'static str, index: usize },

    /// A field failed numeric conversion
    #[error("invalid value {value:?} for field {name}")]
    InvalidField { name: &'static str, value: String },
}

impl ParseError {
    /// True when the line was well-formed but of a type outside the
    /// vocabulary. Consumers count these separately from genuine parse
    /// failures.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ParseError::Unsupported(_))
    }
}
