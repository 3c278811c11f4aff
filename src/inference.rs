//! Type inference for bound fields
//!
//! When a record carries no explicit [`AttributeMeta`](crate::AttributeMeta)
//! for an index, the kind is derived from the declared field type. The same
//! table decides which kinds a field type can hold at all.

use crate::field::{FieldShape, FieldType};
use crate::types::AttributeKind;

/// Kind and nullability policy derived from a declared field type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferredMeta {
    pub kind: AttributeKind,
    /// Absent values hydrate as `None` instead of a zero-equivalent
    pub optional: bool,
}

/// Infer the default kind and nullability for a field type
pub fn infer(field_type: &FieldType) -> InferredMeta {
    let kind = match field_type.shape {
        FieldShape::Text | FieldShape::Uuid => AttributeKind::Text,
        FieldShape::Integer32 | FieldShape::Integer64 => AttributeKind::Integer,
        FieldShape::Float32 | FieldShape::Float64 | FieldShape::Decimal => AttributeKind::Real,
        FieldShape::Boolean => AttributeKind::Boolean,
        FieldShape::Date => AttributeKind::Date,
        FieldShape::DateTime => AttributeKind::DateTime,
        FieldShape::Geolocation { .. } => AttributeKind::Geolocation,
        FieldShape::Color { .. } => AttributeKind::Color,
        FieldShape::Attachment => AttributeKind::AttachmentSet,
        FieldShape::Object if field_type.collection => AttributeKind::MultiRelation,
        FieldShape::Object => AttributeKind::SingleRelation,
    };
    InferredMeta {
        kind,
        optional: field_type.optional,
    }
}

/// Whether a field of this type can hold values of `kind`
pub fn supports(field_type: &FieldType, kind: AttributeKind) -> bool {
    let shape = field_type.shape;
    match kind {
        AttributeKind::Text => matches!(shape, FieldShape::Text | FieldShape::Uuid),
        AttributeKind::Integer => matches!(shape, FieldShape::Integer32 | FieldShape::Integer64),
        AttributeKind::Real => matches!(
            shape,
            FieldShape::Float32 | FieldShape::Float64 | FieldShape::Decimal
        ),
        AttributeKind::Boolean => shape == FieldShape::Boolean,
        AttributeKind::Date | AttributeKind::DateTime => {
            matches!(shape, FieldShape::Date | FieldShape::DateTime)
        }
        AttributeKind::EmbeddedValue | AttributeKind::SingleRelation => {
            shape == FieldShape::Object && !field_type.collection
        }
        AttributeKind::MultiRelation => shape == FieldShape::Object && field_type.collection,
        AttributeKind::AttachmentSet => shape == FieldShape::Attachment,
        AttributeKind::Geolocation => matches!(shape, FieldShape::Geolocation { .. }),
        AttributeKind::Color => matches!(shape, FieldShape::Color { .. }),
    }
}
