//! Error types for Stencil operations

/// Errors that can occur while compiling or executing a template
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Template could not be parsed (unknown directive, unbalanced groups, malformed spec)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A seek or relative move would leave the cursor bounds
    #[error("Position out of range: {0}")]
    PositionOutOfRange(String),

    /// Illegal or oversized count
    #[error("Invalid length: {0}")]
    InvalidLength(String),

    /// A value could not be coerced to the type a directive needs
    #[error("Cannot convert {value} into {target}")]
    Conversion {
        /// Inspected form of the offending value.
        value: String,
        /// Name of the type the directive needed.
        target: &'static str,
    },

    /// Argument list exhausted before a required read
    #[error("too few arguments")]
    TooFewArguments,

    /// Bad positional or named argument reference
    #[error("Argument error: {0}")]
    Argument(String),
}

impl FormatError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        FormatError::Parse(message.into())
    }

    pub(crate) fn out_of_range(message: impl Into<String>) -> Self {
        FormatError::PositionOutOfRange(message.into())
    }

    pub(crate) fn conversion(value: &crate::value::Value, target: &'static str) -> Self {
        FormatError::Conversion {
            value: value.inspect(),
            target,
        }
    }
}
