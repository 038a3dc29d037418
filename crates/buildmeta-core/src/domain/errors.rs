//! SerializationError - failures while encoding or decoding metadata

use thiserror::Error;

/// SerializationError is the only failure kind of the metadata container.
///
/// All variants are deterministic and data-dependent: retrying the same call
/// with the same input fails the same way.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// The value's `Serialize` impl reported an error, or a float was `NaN` or infinite.
    #[error("failed to encode metadata value of type '{type_tag}': {source}")]
    Encode {
        type_tag: String,
        #[source]
        source: serde_json::Error,
    },

    /// Wrapper payloads must be JSON objects.
    #[error("metadata value of type '{type_tag}' did not encode to a JSON object")]
    NotAnObject { type_tag: String },

    #[error("malformed metadata JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Valid JSON, but not an array of `{ "<tag>": {...} }` wrappers.
    #[error("unexpected metadata shape: {0}")]
    UnexpectedShape(String),

    #[error("no metadata type registered for tag '{0}'")]
    UnknownTypeTag(String),

    #[error("failed to decode metadata value of type '{type_tag}': {source}")]
    Decode {
        type_tag: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected {expected} metadata value(s), found {found}")]
    Cardinality { expected: usize, found: usize },

    #[error("expected metadata of type '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },
}

impl SerializationError {
    pub(crate) fn unexpected_shape(reason: impl Into<String>) -> Self {
        Self::UnexpectedShape(reason.into())
    }
}
