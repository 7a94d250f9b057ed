//! Error types for checkpoint translation
//!
//! Every failure in this crate signals a structural mismatch between the
//! mapping schema, the source checkpoint, and the target model. None are
//! transient, so none are retried: the error carries enough context (names,
//! shapes, entry index) to diagnose the drift in a single pass.

use thiserror::Error;

/// Error type for all traducir operations
#[derive(Debug, Error)]
pub enum TraducirError {
    /// Malformed mapping schema, detected at construction
    #[error("Schema error: {reason}")]
    SchemaError {
        /// What is wrong with the schema
        reason: String,
    },

    /// Caller passed a layer count the schema cannot be expanded against
    #[error("Invalid layer count {layer_count}: {reason}")]
    InvalidLayerCount {
        /// The rejected layer count
        layer_count: usize,
        /// Why it was rejected
        reason: String,
    },

    /// A source tensor named by the schema is absent from the checkpoint
    #[error("Missing source tensor in checkpoint: {name}")]
    MissingSourceTensor {
        /// Concrete checkpoint tensor name
        name: String,
    },

    /// A target name produced by the schema has no parameter in the store
    #[error("Missing target parameter in model: {name}")]
    MissingTargetParameter {
        /// Concrete parameter name
        name: String,
    },

    /// A combine op was given the wrong number of inputs
    #[error("Arity mismatch for {op}: expected {expected}, got {actual}")]
    ArityMismatch {
        /// Operation name
        op: String,
        /// Arity the op demands
        expected: String,
        /// Number of inputs actually supplied
        actual: usize,
    },

    /// Tensor shapes disagree where they must match
    #[error("Shape mismatch for {name}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Tensor or parameter the mismatch was detected on
        name: String,
        /// Shape the target/op requires
        expected: Vec<usize>,
        /// Shape actually present
        actual: Vec<usize>,
    },

    /// A translation entry failed; wraps the underlying fault with context
    #[error("Translation entry {index} ({target}) failed")]
    EntryFailed {
        /// Index in the expanded entry sequence
        index: usize,
        /// Concrete target parameter name of the entry
        target: String,
        /// The underlying failure
        #[source]
        source: Box<TraducirError>,
    },

    /// Tensor construction rejected the shape
    #[error("Invalid shape: {reason}")]
    InvalidShape {
        /// Why the shape is invalid
        reason: String,
    },

    /// Invalid or corrupt checkpoint container / schema file
    #[error("Format error: {reason}")]
    FormatError {
        /// Error description
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TraducirError {
    /// Strip the `EntryFailed` wrapper, if any, exposing the root fault
    #[must_use]
    pub fn root_cause(&self) -> &TraducirError {
        match self {
            TraducirError::EntryFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type alias for traducir operations
pub type Result<T> = std::result::Result<T, TraducirError>;
