//! Error types for object mapping operations

use thiserror::Error;

use crate::types::AttributeKind;

/// Errors that can occur while projecting or hydrating objects
#[derive(Debug, Error)]
pub enum MappingError {
    /// Malformed or colliding binding declarations on a mapped type
    #[error("Binding error on {type_name}: {message}")]
    Binding { type_name: String, message: String },

    /// The resolved attribute kind cannot be stored in the bound field type
    #[error("Unsupported attribute: {field_type} cannot hold kind {kind}")]
    UnsupportedAttribute {
        field_type: String,
        kind: AttributeKind,
    },

    /// Writing the converted value into the destination failed
    #[error("Unable to write {field} at index {index} as {kind}: {cause}")]
    UnableToWrite {
        field_type: String,
        field: String,
        index: u32,
        kind: AttributeKind,
        cause: String,
    },

    #[error("Destination is invalid: a destination object is required")]
    DestinationInvalid,

    #[error("Maximum relation depth of {max_depth} exceeded")]
    DepthExceeded { max_depth: usize },

    /// A stored value could not be coerced to the resolved kind
    #[error("Cannot coerce value at index {index} to {kind}: {message}")]
    Coercion {
        index: u32,
        kind: AttributeKind,
        message: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl MappingError {
    pub fn binding(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Binding {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(field_type: impl Into<String>, kind: AttributeKind) -> Self {
        Self::UnsupportedAttribute {
            field_type: field_type.into(),
            kind,
        }
    }

    pub fn coercion(index: u32, kind: AttributeKind, message: impl Into<String>) -> Self {
        Self::Coercion {
            index,
            kind,
            message: message.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether this error aborts the whole call rather than a single field
    pub fn is_call_level(&self) -> bool {
        matches!(
            self,
            MappingError::Binding { .. } | MappingError::DestinationInvalid
        )
    }
}

pub type Result<T> = std::result::Result<T, MappingError>;
