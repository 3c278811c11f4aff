//! Conversion engines
//!
//! [`Projector`] copies mapped objects into records and [`Hydrator`] copies
//! records back into mapped objects. Both walk a type's cached
//! [`BindingDescriptor`](crate::BindingDescriptor) and resolve each binding's
//! attribute kind the same way.

mod hydrate;
mod project;

pub(crate) use hydrate::Hydrator;
pub(crate) use project::Projector;

use crate::binding::Binding;
use crate::error::{MappingError, Result};
use crate::inference::{infer, supports};
use crate::record::Record;
use crate::types::AttributeKind;

/// Resolve the kind for a binding against a record
///
/// Explicit record metadata wins, then the kind declared on the binding,
/// then the kind inferred from the field type. The result must be one the
/// field type can hold.
pub(crate) fn resolve_kind<T>(binding: &Binding<T>, record: &Record) -> Result<AttributeKind> {
    let field_type = binding.field_type();
    let kind = record
        .attribute_meta(binding.index())
        .map(|meta| meta.kind)
        .or(binding.declared_kind())
        .unwrap_or_else(|| infer(field_type).kind);

    if supports(field_type, kind) {
        Ok(kind)
    } else {
        Err(MappingError::unsupported(field_type.type_name, kind))
    }
}

pub(crate) fn write_error<T>(
    binding: &Binding<T>,
    kind: AttributeKind,
    cause: String,
) -> MappingError {
    MappingError::UnableToWrite {
        field_type: binding.field_type().type_name.to_string(),
        field: binding.name().to_string(),
        index: binding.index(),
        kind,
        cause,
    }
}
