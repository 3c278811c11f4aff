//! Object to record projection

use crate::binding::{Binding, BindingFlags, Mapped, Target, descriptor};
use crate::config::MapperConfig;
use crate::error::{MappingError, Result};
use crate::field::FieldValue;
use crate::record::{Record, Value};
use crate::types::AttributeKind;

use super::resolve_kind;

/// Copies mapped objects into records
pub(crate) struct Projector<'a> {
    config: &'a MapperConfig,
    depth: usize,
}

impl<'a> Projector<'a> {
    pub(crate) fn new(config: &'a MapperConfig) -> Self {
        Self { config, depth: 0 }
    }

    /// Projector for objects one relation level down
    pub(crate) fn descend(&self) -> Result<Projector<'a>> {
        if self.depth >= self.config.max_depth {
            return Err(MappingError::DepthExceeded {
                max_depth: self.config.max_depth,
            });
        }
        Ok(Projector {
            config: self.config,
            depth: self.depth + 1,
        })
    }

    /// Project every binding of `source` into `record`
    ///
    /// A failing field is logged and skipped unless the mapper is strict.
    pub(crate) fn project<S: Mapped>(&self, source: &S, record: &mut Record) -> Result<()> {
        let descriptor = descriptor::<S>()?;

        for binding in descriptor.bindings() {
            if record.is_embedded() && binding.flags().exclude_from_projection {
                continue;
            }
            if let Err(error) = self.project_binding(binding, source, record) {
                if self.config.strict || error.is_call_level() {
                    return Err(error);
                }
                tracing::warn!(
                    type_name = descriptor.type_name(),
                    depth = self.depth,
                    field = binding.name(),
                    index = binding.index(),
                    error = %error,
                    "Skipping field during projection"
                );
            }
        }
        Ok(())
    }

    fn project_binding<S>(
        &self,
        binding: &Binding<S>,
        source: &S,
        record: &mut Record,
    ) -> Result<()> {
        let kind = resolve_kind(binding, record)?;
        let index = binding.index();

        match binding.target() {
            Target::Value(slot) => {
                let value = slot.read(source);
                let roles = value.to_key_string();
                if binding.flags().attribute {
                    store_value(record, index, kind, value)?;
                }
                if let Some(key) = roles {
                    write_roles(record, binding.flags(), key);
                }
            }
            Target::Object(slot) => match kind {
                AttributeKind::EmbeddedValue => {
                    // embedded values never nest inside list rows
                    if record.is_embedded() {
                        return Ok(());
                    }
                    let mut child = record.new_child_embedded(index);
                    if slot.project(source, self, &mut child)? {
                        record.set_embedded(index, child);
                    }
                }
                AttributeKind::SingleRelation => {
                    let mut child = record.new_child_item(index);
                    if slot.project(source, self, &mut child)? {
                        record.set_item(index, child);
                    }
                }
                other => {
                    let type_name = binding.field_type().type_name;
                    return Err(MappingError::unsupported(type_name, other));
                }
            },
            Target::Objects(slot) => {
                if binding.flags().lazy {
                    record.mark_deferred(index);
                    return Ok(());
                }
                let schema = record.schema().child_schema(index);
                let items = slot.project(source, self, &schema)?;
                record.set_items(index, items);
            }
        }
        Ok(())
    }
}

/// Store a field value under the resolved kind
///
/// Absent scalars are stored as an explicit null; absent structured values
/// are not stored at all.
fn store_value(
    record: &mut Record,
    index: u32,
    kind: AttributeKind,
    value: FieldValue,
) -> Result<()> {
    if value.is_null() {
        if kind.is_scalar() {
            record.set(index, Value::Null);
        }
        return Ok(());
    }

    match (kind, value) {
        (AttributeKind::Text, FieldValue::Text(s)) => record.set_text(index, Some(s)),
        (AttributeKind::Integer, FieldValue::Integer(i)) => record.set_integer(index, i),
        (AttributeKind::Real, FieldValue::Real(f)) => record.set_real(index, f),
        (AttributeKind::Boolean, FieldValue::Boolean(b)) => record.set_boolean(index, b),
        (AttributeKind::Date, FieldValue::Instant(d)) => record.set_date(index, d),
        (AttributeKind::DateTime, FieldValue::Instant(d)) => record.set_datetime(index, d),
        (AttributeKind::AttachmentSet, FieldValue::Attachment(a)) => {
            record.set_attachments(index, vec![a])
        }
        (AttributeKind::AttachmentSet, FieldValue::Attachments(list)) => {
            record.set_attachments(index, list)
        }
        (AttributeKind::Geolocation, FieldValue::Location(l)) => record.set_location(index, l),
        (AttributeKind::Color, FieldValue::Color(c)) => record.set_color(index, c),
        (kind, value) => {
            return Err(MappingError::coercion(
                index,
                kind,
                format!("cannot store {:?}", value),
            ));
        }
    }
    Ok(())
}

/// Fill the identity slots claimed by a binding
fn write_roles(record: &mut Record, flags: &BindingFlags, key: String) {
    if flags.parent_value {
        record.set_parent_value(key.clone());
    }
    if flags.primary_value {
        record.set_display_value(key.clone());
    }
    if flags.primary_key {
        if !record.is_display_value_set() {
            record.set_display_value(key.clone());
        }
        record.set_primary_key(key);
    }
}
