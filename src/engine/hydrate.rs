//! Record to object hydration

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::binding::{Binding, Mapped, SlotError, Target, descriptor};
use crate::config::MapperConfig;
use crate::context::{ConversionContext, FieldFailure, FieldPath, ObjectIdentity};
use crate::error::{MappingError, Result};
use crate::field::{FieldType, FieldValue};
use crate::inference::infer;
use crate::record::{Record, Value};
use crate::types::{Attachment, AttributeKind};

use super::{resolve_kind, write_error};

/// Copies records into mapped objects, tracking lifecycle in a context
pub(crate) struct Hydrator<'a> {
    config: &'a MapperConfig,
    context: &'a mut ConversionContext,
    path: FieldPath,
}

impl<'a> Hydrator<'a> {
    pub(crate) fn new(config: &'a MapperConfig, context: &'a mut ConversionContext) -> Self {
        Self {
            config,
            context,
            path: FieldPath::root(),
        }
    }

    /// Hydrator for the single nested object at `index`
    pub(crate) fn child(&mut self, index: u32) -> Result<Hydrator<'_>> {
        let path = self.path.child(index);
        self.nested(path)
    }

    /// Hydrator for element `position` of the relation at `index`
    pub(crate) fn element(&mut self, index: u32, position: usize) -> Result<Hydrator<'_>> {
        let path = self.path.element(index, position);
        self.nested(path)
    }

    fn nested(&mut self, path: FieldPath) -> Result<Hydrator<'_>> {
        if path.depth() > self.config.max_depth {
            return Err(MappingError::DepthExceeded {
                max_depth: self.config.max_depth,
            });
        }
        Ok(Hydrator {
            config: self.config,
            context: &mut *self.context,
            path,
        })
    }

    /// Hydrate every binding of `destination` from `record`
    ///
    /// The record's CRUD status is tracked before any field is copied. A
    /// failing field is logged, recorded in the context and skipped unless
    /// the mapper is strict.
    pub(crate) fn hydrate<D: Mapped>(
        &mut self,
        record: &Record,
        destination: &mut D,
    ) -> Result<()> {
        let descriptor = descriptor::<D>()?;
        let identity = ObjectIdentity::new(descriptor.type_name(), self.path.clone());

        if let Some(status) = record.crud_status() {
            self.context.set_status(identity.clone(), status);
        }

        for binding in descriptor.bindings() {
            if record.is_embedded() && binding.flags().exclude_from_projection {
                continue;
            }
            if let Err(error) = self.hydrate_binding(binding, record, destination) {
                if self.config.strict || error.is_call_level() {
                    return Err(error);
                }
                tracing::warn!(
                    type_name = descriptor.type_name(),
                    path = %self.path,
                    field = binding.name(),
                    index = binding.index(),
                    error = %error,
                    "Skipping field during hydration"
                );
                self.context.record_failure(FieldFailure {
                    owner: identity.clone(),
                    field: binding.name(),
                    index: binding.index(),
                    error,
                });
            }
        }
        Ok(())
    }

    fn hydrate_binding<D>(
        &mut self,
        binding: &Binding<D>,
        record: &Record,
        destination: &mut D,
    ) -> Result<()> {
        let kind = resolve_kind(binding, record)?;
        let index = binding.index();

        match binding.target() {
            Target::Value(slot) => {
                let value = match read_value(binding, record, kind)? {
                    Some(value) => value,
                    None => match absent_value(binding.field_type(), kind) {
                        Some(value) => value,
                        None => return Ok(()),
                    },
                };
                slot.write(destination, value)
                    .map_err(|cause| write_error(binding, kind, cause))
            }
            Target::Object(slot) => {
                let nested = match record.get(index) {
                    None | Some(Value::Null) => return Ok(()),
                    Some(Value::Embedded(nested)) | Some(Value::Item(nested)) => nested,
                    Some(other) => return Err(mismatch(index, kind, other)),
                };
                slot.hydrate(destination, nested, self, index)
                    .map_err(|e| slot_error(binding, kind, e))
            }
            Target::Objects(slot) => {
                let items = match record.get(index) {
                    None | Some(Value::Null) => return Ok(()),
                    Some(Value::Items(items)) => items,
                    Some(other) => return Err(mismatch(index, kind, other)),
                };
                slot.hydrate(destination, items, self, index)
                    .map_err(|e| slot_error(binding, kind, e))
            }
        }
    }
}

fn slot_error<D>(binding: &Binding<D>, kind: AttributeKind, error: SlotError) -> MappingError {
    match error {
        SlotError::Write(cause) => write_error(binding, kind, cause),
        SlotError::Mapping(error) => error,
    }
}

fn mismatch(index: u32, kind: AttributeKind, value: &Value) -> MappingError {
    let found = format!("found {} value", value_label(value));
    MappingError::coercion(index, kind, found)
}

fn cannot_convert(index: u32, kind: AttributeKind, text: &str) -> MappingError {
    let message = format!("cannot convert '{}' to {}", text, kind);
    MappingError::coercion(index, kind, message)
}

fn value_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Text(_) => "text",
        Value::Integer(_) => "integer",
        Value::Real(_) => "real",
        Value::Boolean(_) => "boolean",
        Value::Date(_) => "date",
        Value::DateTime(_) => "datetime",
        Value::Embedded(_) => "embedded",
        Value::Item(_) => "item",
        Value::Items(_) => "items",
        Value::Attachments(_) => "attachments",
        Value::Location(_) => "location",
        Value::Color(_) => "color",
    }
}

/// Stored value for a binding, falling back to the identity slots it claims
fn read_value<D>(
    binding: &Binding<D>,
    record: &Record,
    kind: AttributeKind,
) -> Result<Option<FieldValue>> {
    let index = binding.index();
    let field_type = binding.field_type();
    let flags = binding.flags();
    let stored = record.get(index).filter(|v| !v.is_null());
    if let Some(value) = stored.filter(|_| flags.attribute) {
        return coerce(value, kind, field_type, index).map(Some);
    }

    let slot = if flags.primary_key {
        record.primary_key()
    } else if flags.primary_value {
        record.display_value()
    } else if flags.parent_value {
        record.parent_value()
    } else {
        None
    };
    match slot {
        Some(key) => {
            let stored = Value::Text(key.to_string());
            coerce(&stored, kind, field_type, index).map(Some)
        }
        None => Ok(None),
    }
}

/// Value written when nothing is stored
///
/// Fields inferred as optional become `None` and required scalars take
/// their zero-equivalent. Structured fields are left untouched.
fn absent_value(field_type: &FieldType, kind: AttributeKind) -> Option<FieldValue> {
    if !kind.is_scalar() {
        return None;
    }
    if infer(field_type).optional {
        Some(FieldValue::Null)
    } else {
        FieldValue::zero(field_type.shape)
    }
}

/// Convert a stored value to the canonical value for `kind`
///
/// Text is accepted for numbers, booleans and timestamps, and integers are
/// accepted for reals.
fn coerce(
    value: &Value,
    kind: AttributeKind,
    field_type: &FieldType,
    index: u32,
) -> Result<FieldValue> {
    let coerced = match (kind, value) {
        (AttributeKind::Text, Value::Text(s)) => FieldValue::Text(s.clone()),
        (AttributeKind::Text, Value::Integer(i)) => FieldValue::Text(i.to_string()),
        (AttributeKind::Text, Value::Real(f)) => FieldValue::Text(f.to_string()),
        (AttributeKind::Text, Value::Boolean(b)) => FieldValue::Text(b.to_string()),

        (AttributeKind::Integer, Value::Integer(i)) => FieldValue::Integer(*i),
        (AttributeKind::Integer, Value::Text(s)) => match s.trim().parse::<i64>() {
            Ok(i) => FieldValue::Integer(i),
            Err(_) => return Err(cannot_convert(index, kind, s)),
        },

        (AttributeKind::Real, Value::Real(f)) => FieldValue::Real(*f),
        (AttributeKind::Real, Value::Integer(i)) => FieldValue::Real(*i as f64),
        (AttributeKind::Real, Value::Text(s)) => match s.trim().parse::<f64>() {
            Ok(f) => FieldValue::Real(f),
            Err(_) => return Err(cannot_convert(index, kind, s)),
        },

        (AttributeKind::Boolean, Value::Boolean(b)) => FieldValue::Boolean(*b),
        (AttributeKind::Boolean, Value::Integer(i)) if *i == 0 || *i == 1 => {
            FieldValue::Boolean(*i == 1)
        }
        (AttributeKind::Boolean, Value::Text(s)) => match s.to_lowercase().as_str() {
            "true" | "1" | "yes" => FieldValue::Boolean(true),
            "false" | "0" | "no" => FieldValue::Boolean(false),
            _ => return Err(cannot_convert(index, kind, s)),
        },

        (AttributeKind::Date | AttributeKind::DateTime, Value::Date(d) | Value::DateTime(d)) => {
            FieldValue::Instant(*d)
        }
        (AttributeKind::Date | AttributeKind::DateTime, Value::Text(s)) => match parse_instant(s) {
            Some(d) => FieldValue::Instant(d),
            None => return Err(cannot_convert(index, kind, s)),
        },

        (AttributeKind::AttachmentSet, Value::Attachments(list)) if field_type.collection => {
            FieldValue::Attachments(list.clone())
        }
        (AttributeKind::AttachmentSet, Value::Attachments(list)) => match list.first() {
            Some(first) => FieldValue::Attachment(first.clone()),
            // an empty stored list clears a single attachment
            None if infer(field_type).optional => FieldValue::Null,
            None => FieldValue::Attachment(Attachment::default()),
        },
        (AttributeKind::Geolocation, Value::Location(l)) => FieldValue::Location(l.clone()),
        (AttributeKind::Color, Value::Color(c)) => FieldValue::Color(*c),

        (kind, _) if kind.is_nested() => {
            return Err(MappingError::unsupported(field_type.type_name, kind));
        }
        (kind, other) => return Err(mismatch(index, kind, other)),
    };
    Ok(coerced)
}

/// RFC 3339 timestamp or a bare `YYYY-MM-DD` date at midnight UTC
fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind_field;
    use crate::binding::{Access, BindingBuilder};
    use crate::field::FieldShape;
    use crate::schema::RecordSchema;
    use crate::types::CrudStatus;

    #[derive(Default, Debug)]
    struct Task {
        id: i64,
        title: String,
        done: bool,
        estimate: Option<f64>,
        due: Option<DateTime<Utc>>,
        owner: Option<Person>,
        subtasks: Vec<Task>,
        spec: Option<Attachment>,
        rank: i32,
    }

    impl Task {
        fn rank(&self) -> i32 {
            self.rank
        }

        fn set_rank(&mut self, rank: i32) -> std::result::Result<(), String> {
            if rank < 0 {
                return Err(format!("rank {} is negative", rank));
            }
            self.rank = rank;
            Ok(())
        }
    }

    impl Mapped for Task {
        fn bindings(builder: BindingBuilder<Self>) -> BindingBuilder<Self> {
            builder
                .attribute(0, "id", bind_field!(Task, id))
                .primary_key()
                .attribute(1, "title", bind_field!(Task, title))
                .primary_value()
                .attribute(2, "done", bind_field!(Task, done))
                .attribute(3, "estimate", bind_field!(Task, estimate))
                .attribute(4, "due", bind_field!(Task, due))
                .relation(5, "owner", bind_field!(Task, owner))
                .relations(6, "subtasks", bind_field!(Task, subtasks))
                .attribute(7, "spec", bind_field!(Task, spec))
                .attribute(8, "rank", Access::methods(Task::rank, Task::set_rank))
        }
    }

    #[derive(Default, Debug, PartialEq)]
    struct Person {
        name: String,
    }

    impl Mapped for Person {
        fn bindings(builder: BindingBuilder<Self>) -> BindingBuilder<Self> {
            builder.attribute(0, "name", bind_field!(Person, name))
        }
    }

    fn schema() -> RecordSchema {
        RecordSchema::empty("task")
    }

    fn hydrate(config: &MapperConfig, record: &Record) -> (Task, ConversionContext) {
        let mut context = ConversionContext::new();
        let mut task = Task::default();
        Hydrator::new(config, &mut context)
            .hydrate(record, &mut task)
            .unwrap();
        (task, context)
    }

    // =========================================================================
    // Scalar Tests
    // =========================================================================

    #[test]
    fn test_hydrate_scalars() {
        let mut record = Record::item(schema());
        record.set_integer(0, 7);
        record.set_text(1, Some("Write docs".to_string()));
        record.set_boolean(2, true);
        record.set_real(3, 2.5);

        let (task, context) = hydrate(&MapperConfig::default(), &record);
        assert_eq!(task.id, 7);
        assert_eq!(task.title, "Write docs");
        assert!(task.done);
        assert_eq!(task.estimate, Some(2.5));
        assert!(!context.has_failures());
    }

    #[test]
    fn test_nullability_policy() {
        let mut task = Task {
            title: "old".to_string(),
            done: true,
            estimate: Some(1.0),
            ..Default::default()
        };
        let record = Record::item(schema());
        let mut context = ConversionContext::new();
        Hydrator::new(&MapperConfig::default(), &mut context)
            .hydrate(&record, &mut task)
            .unwrap();

        assert_eq!(task.title, "");
        assert!(!task.done);
        assert_eq!(task.estimate, None);
        assert_eq!(task.due, None);
    }

    #[test]
    fn test_lenient_coercion() {
        let mut record = Record::item(schema());
        record.set_text(0, Some("12".to_string()));
        record.set_text(2, Some("Yes".to_string()));
        record.set_integer(3, 4);
        record.set_text(4, Some("2024-03-01".to_string()));

        let (task, _) = hydrate(&MapperConfig::default(), &record);
        assert_eq!(task.id, 12);
        assert!(task.done);
        assert_eq!(task.estimate, Some(4.0));
        assert_eq!(task.due.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_identity_slots_fill_absent_fields() {
        let mut record = Record::item(schema());
        record.set_primary_key("42");
        record.set_display_value("From display");

        let (task, _) = hydrate(&MapperConfig::default(), &record);
        assert_eq!(task.id, 42);
        assert_eq!(task.title, "From display");
    }

    #[test]
    fn test_key_only_field_reads_primary_key() {
        #[derive(Default)]
        struct Tag {
            code: i64,
        }

        impl Mapped for Tag {
            fn bindings(builder: BindingBuilder<Self>) -> BindingBuilder<Self> {
                builder
                    .attribute(0, "code", bind_field!(Tag, code))
                    .key_only()
            }
        }

        let mut record = Record::item(schema());
        record.set_integer(0, 5);
        record.set_primary_key("9");

        let mut tag = Tag::default();
        let mut context = ConversionContext::new();
        Hydrator::new(&MapperConfig::default(), &mut context)
            .hydrate(&record, &mut tag)
            .unwrap();
        assert_eq!(tag.code, 9);
    }

    // =========================================================================
    // Failure Tests
    // =========================================================================

    #[test]
    fn test_failing_field_is_isolated() {
        let mut record = Record::item(schema());
        record.set_text(0, Some("not a number".to_string()));
        record.set_text(1, Some("Kept".to_string()));
        record.set_integer(8, -1);

        let (task, context) = hydrate(&MapperConfig::default(), &record);
        assert_eq!(task.title, "Kept");
        assert_eq!(task.id, 0);
        assert_eq!(task.rank, 0);

        let failed: Vec<_> = context.failures().iter().map(|f| f.field).collect();
        assert_eq!(failed, vec!["id", "rank"]);
        assert!(matches!(
            context.failures()[1].error,
            MappingError::UnableToWrite { ref cause, .. } if cause.contains("negative")
        ));
    }

    #[test]
    fn test_strict_mode_propagates() {
        let config = MapperConfig::builder().strict(true).build();
        let mut record = Record::item(schema());
        record.set_integer(8, -1);

        let mut context = ConversionContext::new();
        let mut task = Task::default();
        let result = Hydrator::new(&config, &mut context)
            .hydrate(&record, &mut task)
            .map_err(|e| e.to_string());
        let message = result.unwrap_err();
        assert!(message.contains("at index 8"));
    }

    #[test]
    fn test_wrong_nested_shape_is_a_failure() {
        let mut record = Record::item(schema());
        record.set_text(5, Some("not a record".to_string()));
        let (task, context) = hydrate(&MapperConfig::default(), &record);
        assert!(task.owner.is_none());
        assert!(matches!(
            context.failures()[0].error,
            MappingError::Coercion { index: 5, .. }
        ));
    }

    // =========================================================================
    // Nested and Status Tests
    // =========================================================================

    #[test]
    fn test_nested_statuses_are_tracked() {
        let mut record = Record::item(schema()).with_crud_status(CrudStatus::Updated);
        let mut owner = Record::item(RecordSchema::empty("person"));
        owner.set_text(0, Some("Ada".to_string()));
        record.set_item(5, owner);
        let created = Record::item(schema()).with_crud_status(CrudStatus::Created);
        let deleted = Record::item(schema()).with_crud_status(CrudStatus::Deleted);
        record.push_item(6, created);
        record.push_item(6, deleted);

        let (task, context) = hydrate(&MapperConfig::default(), &record);
        let ada = Person {
            name: "Ada".to_string(),
        };
        assert_eq!(task.owner, Some(ada));
        assert_eq!(task.subtasks.len(), 2);

        let root = FieldPath::root();
        assert_eq!(context.status_at(&root), Some(CrudStatus::Updated));
        assert_eq!(
            context.status_at(&root.element(6, 0)),
            Some(CrudStatus::Created)
        );
        assert_eq!(
            context.status_at(&root.element(6, 1)),
            Some(CrudStatus::Deleted)
        );
        assert_eq!(context.len(), 3);
    }

    #[test]
    fn test_single_relation_status_shares_context_with_owner() {
        let mut owner = Record::item(RecordSchema::empty("person"));
        owner.set_text(0, Some("Grace".to_string()));
        let mut record = Record::item(schema()).with_crud_status(CrudStatus::Updated);
        record.set_item(5, owner.with_crud_status(CrudStatus::Created));

        let (task, context) = hydrate(&MapperConfig::default(), &record);
        assert_eq!(task.owner.unwrap().name, "Grace");

        let root = FieldPath::root();
        assert_eq!(context.status_at(&root), Some(CrudStatus::Updated));
        assert_eq!(context.status_at(&root.child(5)), Some(CrudStatus::Created));
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn test_missing_relation_leaves_field_untouched() {
        let mut task = Task {
            owner: Some(Person {
                name: "Kept".to_string(),
            }),
            ..Default::default()
        };
        let record = Record::item(schema());
        let mut context = ConversionContext::new();
        Hydrator::new(&MapperConfig::default(), &mut context)
            .hydrate(&record, &mut task)
            .unwrap();
        assert_eq!(task.owner.unwrap().name, "Kept");
    }

    #[test]
    fn test_depth_limit_records_failure() {
        let config = MapperConfig::builder().max_depth(1).build();
        let mut inner = Record::item(schema());
        inner.push_item(6, Record::item(schema()));
        let mut record = Record::item(schema());
        record.push_item(6, inner);

        let (task, context) = hydrate(&config, &record);
        assert_eq!(task.subtasks.len(), 1);
        assert!(task.subtasks[0].subtasks.is_empty());
        assert_eq!(context.failures().len(), 1);
        let failed_at = &context.failures()[0].owner.path;
        assert_eq!(*failed_at, FieldPath::root().element(6, 0));
    }

    #[test]
    fn test_single_attachment_takes_first_entry() {
        let mut record = Record::item(schema());
        record.push_attachment(7, Attachment::new("https://x/a", "text/plain", "A"));
        record.push_attachment(7, Attachment::new("https://x/b", "text/plain", "B"));
        let (task, _) = hydrate(&MapperConfig::default(), &record);
        assert_eq!(task.spec.unwrap().title, "A");
    }

    #[test]
    fn test_empty_attachment_list_clears_single_attachment() {
        let mut task = Task {
            spec: Some(Attachment::new("https://x/old", "text/plain", "Old")),
            ..Default::default()
        };
        let mut record = Record::item(schema());
        record.set_attachments(7, vec![]);

        let mut context = ConversionContext::new();
        Hydrator::new(&MapperConfig::default(), &mut context)
            .hydrate(&record, &mut task)
            .unwrap();
        assert_eq!(task.spec, None);
        assert!(!context.has_failures());
    }

    #[test]
    fn test_empty_attachment_list_resets_required_attachment() {
        let required = FieldType::new(FieldShape::Attachment, false, "Attachment");
        let stored = Value::Attachments(vec![]);
        let value = coerce(&stored, AttributeKind::AttachmentSet, &required, 7).unwrap();
        assert_eq!(value, FieldValue::Attachment(Attachment::default()));

        let optional = FieldType::new(FieldShape::Attachment, true, "Option<Attachment>");
        let value = coerce(&stored, AttributeKind::AttachmentSet, &optional, 7).unwrap();
        assert_eq!(value, FieldValue::Null);
    }

    #[test]
    fn test_absent_value_follows_inferred_nullability() {
        let optional = FieldType::new(FieldShape::Integer64, true, "Option<i64>");
        let required = FieldType::new(FieldShape::Integer64, false, "i64");
        let kind = AttributeKind::Integer;
        assert_eq!(absent_value(&optional, kind), Some(FieldValue::Null));
        assert_eq!(absent_value(&required, kind), Some(FieldValue::Integer(0)));

        let list = FieldType::new(FieldShape::Attachment, true, "Vec<Attachment>").collection();
        assert_eq!(absent_value(&list, AttributeKind::AttachmentSet), None);
    }

    // =========================================================================
    // Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_instant() {
        assert!(parse_instant("2024-01-15T10:30:00Z").is_some());
        assert!(parse_instant("2024-01-15").is_some());
        assert!(parse_instant("yesterday").is_none());
    }
}
