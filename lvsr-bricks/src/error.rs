//! Error types for lvsr-bricks organized by component.

use ndarray::ShapeError;
use rustfst::{Label, StateId};
use thiserror::Error;

/// Brick error variants organized by component.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Brick allocation or application error
    #[error(transparent)]
    Brick(#[from] BrickError),

    /// Transducer operator error
    #[error(transparent)]
    Fst(#[from] FstError),
}

/// Configuration errors (config files, initialization schemes).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Initialization scheme rejected by its distribution
    #[error("invalid {scheme} initialization: {reason}")]
    InvalidInit { scheme: &'static str, reason: String },

    /// IO error while reading a config file
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed JSON config
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Brick allocation and application errors.
#[derive(Debug, Error)]
pub enum BrickError {
    /// Named input absent from the passed values
    #[error("missing input: {name}")]
    MissingInput { name: String },

    /// The same name supplied twice when merging named inputs
    #[error("duplicate input: {name}")]
    DuplicateInput { name: String },

    /// Name not declared by the brick
    #[error("{brick} has no input, state or output named {name}")]
    UnknownName { brick: String, name: String },

    /// Lazy configuration not supplied before allocation
    #[error("{brick}: {field} must be set before allocation")]
    NotConfigured { brick: String, field: &'static str },

    /// Parameters used before allocation
    #[error("{brick} is not allocated")]
    NotAllocated { brick: String },

    /// Array extent does not match the configured dimension
    #[error("{brick}: expected {what} of {expected}, got {got}")]
    DimensionMismatch {
        brick: String,
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Value has the wrong element kind for its port
    #[error("{name}: expected {expected} value")]
    ValueKind { name: String, expected: &'static str },

    /// Output index outside the emitter's vocabulary
    #[error("output {index} out of range for {size} classes")]
    OutputOutOfRange { index: i64, size: usize },

    /// Categorical sampling failed
    #[error("sampling failed: {0}")]
    Sampling(String),

    /// ndarray shape error
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Transducer and transducer operator errors.
#[derive(Debug, Error)]
pub enum FstError {
    /// The automaton declares no start state
    #[error("transducer has no start state")]
    NoStart,

    /// State identifier outside the automaton
    #[error("invalid state {state} (transducer has {num_states} states)")]
    InvalidState { state: i64, num_states: usize },

    /// Network symbol outside the remap table
    #[error("symbol {symbol} out of range for remap table of {size} entries")]
    UnknownSymbol { symbol: i64, size: usize },

    /// Vocabulary entry missing from the transducer input symbols
    #[error("no transducer label for symbol {symbol:?}")]
    UnknownLabel { symbol: String },

    /// Vocabulary line with more than a symbol and a label
    #[error("malformed vocabulary line {line}: {text:?}")]
    MalformedVocabulary { line: usize, text: String },

    /// Neither a matching arc nor a backoff path exists
    #[error("no transition from state {state} on label {label}")]
    NoTransition { state: StateId, label: Label },

    /// Failure reported by the transducer library
    #[error("transducer backend: {0}")]
    Backend(String),
}

/// Result type alias for lvsr-bricks operations.
pub type Result<T> = std::result::Result<T, Error>;

// Nested From implementations for automatic error conversion chains

// ShapeError → BrickError → Error
impl From<ShapeError> for Error {
    fn from(e: ShapeError) -> Self {
        Error::Brick(BrickError::Shape(e))
    }
}

// std::io::Error → ConfigError → Error
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Config(ConfigError::Io(e))
    }
}

// serde_json::Error → ConfigError → Error
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(ConfigError::Json(e))
    }
}
