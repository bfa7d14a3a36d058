use thiserror::Error;

/// Error types for rule configuration and document transformation.
///
/// Only [`TransformError::Config`], [`TransformError::InvalidPath`] (for paths
/// written in the configuration) and [`TransformError::InvalidDocument`] ever
/// reach a caller of the engine. Everything else is raised while a rule or an
/// action runs and is contained at that boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// The rule configuration does not have the expected shape
    #[error("Invalid rule configuration at {location}: {message}")]
    Config { location: String, message: String },

    /// A path could not be parsed
    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// A condition used an operator outside the supported vocabulary
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// An action used a keyword outside the supported vocabulary
    #[error("Unknown action type: {0}")]
    UnknownActionType(String),

    /// A strict function action referenced a name missing from the registry
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// A regex or like pattern did not compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// An arithmetic operand was not a number
    #[error("Expected a number for {operation}, got {value}")]
    NotNumeric { operation: String, value: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow in {0}")]
    Overflow(String),

    /// A registered function failed
    #[error("Function '{name}' failed: {message}")]
    Function { name: String, message: String },

    /// The document is neither an object nor an array of records
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl TransformError {
    pub fn config(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn function(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn not_numeric(operation: impl Into<String>, value: &serde_json::Value) -> Self {
        Self::NotNumeric {
            operation: operation.into(),
            value: value.to_string(),
        }
    }

    /// Whether this error can only come from building an engine
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::InvalidPath { .. })
    }
}
