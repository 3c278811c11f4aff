//! Record types for the object mapper
//!
//! A [`Record`] is an index-addressed value container described by a
//! [`RecordSchema`]. Items carry identity (primary key, display value, CRUD
//! status); embedded records are value-typed and double as the lightweight
//! list-row variant used for projections.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::RecordSchema;
use crate::types::{Attachment, AttributeMeta, Color, CrudStatus, Location};

/// Value stored at one record index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    #[serde(rename = "datetime")]
    DateTime(DateTime<Utc>),
    Embedded(Box<Record>),
    Item(Box<Record>),
    Items(Vec<Record>),
    Attachments(Vec<Attachment>),
    Location(Location),
    Color(Color),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Which flavour of record this is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordVariant {
    /// Full, identity-bearing schema instance
    Item,
    /// Value-typed sub-record, also used for list rows
    Embedded,
}

/// Generic, schema-described, index-addressed value container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    variant: RecordVariant,
    schema: Arc<RecordSchema>,
    #[serde(rename = "primaryKey", skip_serializing_if = "Option::is_none")]
    primary_key: Option<String>,
    #[serde(rename = "value", skip_serializing_if = "Option::is_none")]
    display_value: Option<String>,
    #[serde(rename = "parentValue", skip_serializing_if = "Option::is_none")]
    parent_value: Option<String>,
    #[serde(rename = "crudStatus", skip_serializing_if = "Option::is_none")]
    crud_status: Option<CrudStatus>,
    values: BTreeMap<u32, Value>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    deferred: BTreeSet<u32>,
}

impl Record {
    fn with_variant(variant: RecordVariant, schema: Arc<RecordSchema>) -> Self {
        Self {
            variant,
            schema,
            primary_key: None,
            display_value: None,
            parent_value: None,
            crud_status: None,
            values: BTreeMap::new(),
            deferred: BTreeSet::new(),
        }
    }

    /// Create an empty item record
    pub fn item(schema: impl Into<Arc<RecordSchema>>) -> Self {
        Self::with_variant(RecordVariant::Item, schema.into())
    }

    /// Create an empty embedded value record
    pub fn embedded(schema: impl Into<Arc<RecordSchema>>) -> Self {
        Self::with_variant(RecordVariant::Embedded, schema.into())
    }

    pub fn variant(&self) -> RecordVariant {
        self.variant
    }

    pub fn is_embedded(&self) -> bool {
        self.variant == RecordVariant::Embedded
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Explicit metadata for an index, if the schema declares it
    pub fn attribute_meta(&self, index: u32) -> Option<&AttributeMeta> {
        self.schema.attribute(index)
    }

    /// Fresh item record for a nested relation stored at `index`
    pub fn new_child_item(&self, index: u32) -> Record {
        Record::item(self.schema.child_schema(index))
    }

    /// Fresh embedded record for a value stored at `index`
    pub fn new_child_embedded(&self, index: u32) -> Record {
        Record::embedded(self.schema.child_schema(index))
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn set_primary_key(&mut self, key: impl Into<String>) {
        self.primary_key = Some(key.into());
    }

    pub fn display_value(&self) -> Option<&str> {
        self.display_value.as_deref()
    }

    pub fn set_display_value(&mut self, value: impl Into<String>) {
        self.display_value = Some(value.into());
    }

    pub fn is_display_value_set(&self) -> bool {
        self.display_value.is_some()
    }

    pub fn parent_value(&self) -> Option<&str> {
        self.parent_value.as_deref()
    }

    pub fn set_parent_value(&mut self, value: impl Into<String>) {
        self.parent_value = Some(value.into());
    }

    /// Whether this record can carry a CRUD status
    pub fn supports_crud_status(&self) -> bool {
        self.variant == RecordVariant::Item
    }

    pub fn crud_status(&self) -> Option<CrudStatus> {
        self.crud_status
    }

    /// Set the CRUD status; ignored on embedded records
    pub fn set_crud_status(&mut self, status: CrudStatus) {
        if self.supports_crud_status() {
            self.crud_status = Some(status);
        }
    }

    pub fn with_crud_status(mut self, status: CrudStatus) -> Self {
        self.set_crud_status(status);
        self
    }

    // =========================================================================
    // Raw access
    // =========================================================================

    pub fn get(&self, index: u32) -> Option<&Value> {
        self.values.get(&index)
    }

    /// Whether a non-null value is stored at `index`
    pub fn is_set(&self, index: u32) -> bool {
        self.values.get(&index).is_some_and(|v| !v.is_null())
    }

    pub fn set(&mut self, index: u32, value: Value) {
        self.values.insert(index, value);
    }

    pub fn remove(&mut self, index: u32) -> Option<Value> {
        self.values.remove(&index)
    }

    /// Stored indices in ascending order
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // =========================================================================
    // Typed access
    // =========================================================================

    pub fn get_text(&self, index: u32) -> Option<&str> {
        match self.get(index) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Store text; `None` stores an explicit null
    pub fn set_text(&mut self, index: u32, value: Option<String>) {
        self.set(index, value.map_or(Value::Null, Value::Text));
    }

    pub fn get_integer(&self, index: u32) -> Option<i64> {
        match self.get(index) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn set_integer(&mut self, index: u32, value: i64) {
        self.set(index, Value::Integer(value));
    }

    pub fn get_real(&self, index: u32) -> Option<f64> {
        match self.get(index) {
            Some(Value::Real(f)) => Some(*f),
            _ => None,
        }
    }

    pub fn set_real(&mut self, index: u32, value: f64) {
        self.set(index, Value::Real(value));
    }

    pub fn get_boolean(&self, index: u32) -> Option<bool> {
        match self.get(index) {
            Some(Value::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn set_boolean(&mut self, index: u32, value: bool) {
        self.set(index, Value::Boolean(value));
    }

    pub fn get_date(&self, index: u32) -> Option<DateTime<Utc>> {
        match self.get(index) {
            Some(Value::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn set_date(&mut self, index: u32, value: DateTime<Utc>) {
        self.set(index, Value::Date(value));
    }

    pub fn get_datetime(&self, index: u32) -> Option<DateTime<Utc>> {
        match self.get(index) {
            Some(Value::DateTime(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn set_datetime(&mut self, index: u32, value: DateTime<Utc>) {
        self.set(index, Value::DateTime(value));
    }

    pub fn get_location(&self, index: u32) -> Option<&Location> {
        match self.get(index) {
            Some(Value::Location(l)) => Some(l),
            _ => None,
        }
    }

    pub fn set_location(&mut self, index: u32, value: Location) {
        self.set(index, Value::Location(value));
    }

    pub fn get_color(&self, index: u32) -> Option<Color> {
        match self.get(index) {
            Some(Value::Color(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn set_color(&mut self, index: u32, value: Color) {
        self.set(index, Value::Color(value));
    }

    // =========================================================================
    // Nested records
    // =========================================================================

    pub fn get_embedded(&self, index: u32) -> Option<&Record> {
        match self.get(index) {
            Some(Value::Embedded(r)) => Some(r),
            _ => None,
        }
    }

    pub fn set_embedded(&mut self, index: u32, record: Record) {
        self.set(index, Value::Embedded(Box::new(record)));
    }

    pub fn get_item(&self, index: u32) -> Option<&Record> {
        match self.get(index) {
            Some(Value::Item(r)) => Some(r),
            _ => None,
        }
    }

    pub fn set_item(&mut self, index: u32, record: Record) {
        self.set(index, Value::Item(Box::new(record)));
    }

    pub fn get_items(&self, index: u32) -> Option<&[Record]> {
        match self.get(index) {
            Some(Value::Items(items)) => Some(items),
            _ => None,
        }
    }

    pub fn set_items(&mut self, index: u32, items: Vec<Record>) {
        self.set(index, Value::Items(items));
    }

    /// Append a nested item at `index`, creating the list if needed
    pub fn push_item(&mut self, index: u32, record: Record) {
        match self.values.get_mut(&index) {
            Some(Value::Items(items)) => items.push(record),
            _ => self.set_items(index, vec![record]),
        }
    }

    /// Mark a multi relation as deferred instead of materialized
    pub fn mark_deferred(&mut self, index: u32) {
        self.deferred.insert(index);
    }

    pub fn is_deferred(&self, index: u32) -> bool {
        self.deferred.contains(&index)
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    /// Attachment entries stored at `index`
    pub fn attachments(&self, index: u32) -> Option<&[Attachment]> {
        match self.get(index) {
            Some(Value::Attachments(a)) => Some(a),
            _ => None,
        }
    }

    pub fn set_attachments(&mut self, index: u32, attachments: Vec<Attachment>) {
        self.set(index, Value::Attachments(attachments));
    }

    pub fn push_attachment(&mut self, index: u32, attachment: Attachment) {
        match self.values.get_mut(&index) {
            Some(Value::Attachments(a)) => a.push(attachment),
            _ => self.set_attachments(index, vec![attachment]),
        }
    }
}

// ============================================================================
// DataSet
// ============================================================================

/// Ordered item records sharing one schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSet {
    schema: Arc<RecordSchema>,
    items: Vec<Record>,
}

impl DataSet {
    pub fn new(schema: impl Into<Arc<RecordSchema>>) -> Self {
        Self {
            schema: schema.into(),
            items: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Append a fresh item record and return it for filling
    pub fn add_item(&mut self) -> &mut Record {
        self.items.push(Record::item(self.schema.clone()));
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    pub fn push(&mut self, record: Record) {
        self.items.push(record);
    }

    pub fn items(&self) -> &[Record] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Record> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a DataSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeKind;

    fn schema() -> Arc<RecordSchema> {
        Arc::new(
            RecordSchema::empty("Organization")
                .with(0, AttributeKind::Text)
                .with_related(
                    2,
                    AttributeKind::MultiRelation,
                    RecordSchema::empty("Contact").with(0, AttributeKind::Text),
                ),
        )
    }

    // =========================================================================
    // Typed Access Tests
    // =========================================================================

    #[test]
    fn test_typed_round_trip_per_index() {
        let mut record = Record::item(schema());
        record.set_text(0, Some("Acme".to_string()));
        record.set_integer(1, 42);
        record.set_real(3, 2.5);
        record.set_boolean(4, true);

        assert_eq!(record.get_text(0), Some("Acme"));
        assert_eq!(record.get_integer(1), Some(42));
        assert_eq!(record.get_real(3), Some(2.5));
        assert_eq!(record.get_boolean(4), Some(true));
    }

    #[test]
    fn test_typed_getter_ignores_other_variants() {
        let mut record = Record::item(schema());
        record.set_integer(0, 7);
        assert_eq!(record.get_text(0), None);
        assert_eq!(record.get_integer(0), Some(7));
    }

    #[test]
    fn test_null_text_is_stored_but_not_set() {
        let mut record = Record::item(schema());
        record.set_text(0, None);
        assert_eq!(record.get(0), Some(&Value::Null));
        assert!(!record.is_set(0));
    }

    #[test]
    fn test_write_order_does_not_matter() {
        let mut a = Record::item(schema());
        a.set_integer(5, 1);
        a.set_text(0, Some("x".to_string()));

        let mut b = Record::item(schema());
        b.set_text(0, Some("x".to_string()));
        b.set_integer(5, 1);

        assert_eq!(a, b);
        assert_eq!(a.indices().collect::<Vec<_>>(), vec![0, 5]);
    }

    // =========================================================================
    // Identity Tests
    // =========================================================================

    #[test]
    fn test_crud_status_only_on_items() {
        let item = Record::item(schema()).with_crud_status(CrudStatus::Created);
        assert_eq!(item.crud_status(), Some(CrudStatus::Created));

        let embedded = Record::embedded(schema()).with_crud_status(CrudStatus::Created);
        assert_eq!(embedded.crud_status(), None);
        assert!(!embedded.supports_crud_status());
    }

    #[test]
    fn test_display_value_tracking() {
        let mut record = Record::item(schema());
        assert!(!record.is_display_value_set());
        record.set_display_value("Acme");
        assert!(record.is_display_value_set());
        assert_eq!(record.display_value(), Some("Acme"));
    }

    // =========================================================================
    // Nested Record Tests
    // =========================================================================

    #[test]
    fn test_child_item_uses_related_schema() {
        let record = Record::item(schema());
        let child = record.new_child_item(2);
        assert_eq!(child.schema().name, "Contact");
        assert_eq!(child.variant(), RecordVariant::Item);
    }

    #[test]
    fn test_push_item_preserves_order() {
        let mut record = Record::item(schema());
        for name in ["a", "b", "c"] {
            let mut child = record.new_child_item(2);
            child.set_text(0, Some(name.to_string()));
            record.push_item(2, child);
        }
        let names: Vec<_> = record
            .get_items(2)
            .unwrap()
            .iter()
            .map(|r| r.get_text(0).unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deferred_marker() {
        let mut record = Record::item(schema());
        assert!(!record.is_deferred(2));
        record.mark_deferred(2);
        assert!(record.is_deferred(2));
        assert!(record.get_items(2).is_none());
    }

    #[test]
    fn test_push_attachment() {
        let mut record = Record::item(schema());
        record.push_attachment(6, Attachment::new("u1", "text/plain", "one"));
        record.push_attachment(6, Attachment::new("u2", "text/plain", "two"));
        assert_eq!(record.attachments(6).map(|a| a.len()), Some(2));
    }

    // =========================================================================
    // DataSet Tests
    // =========================================================================

    #[test]
    fn test_dataset_add_item() {
        let mut data_set = DataSet::new(schema());
        data_set.add_item().set_text(0, Some("first".to_string()));
        data_set.add_item().set_text(0, Some("second".to_string()));

        assert_eq!(data_set.len(), 2);
        assert_eq!(data_set.items()[1].get_text(0), Some("second"));
        assert!(data_set.iter().all(|r| r.schema().name == "Organization"));
    }

    #[test]
    fn test_record_serialization() {
        let mut record = Record::item(schema());
        record.set_primary_key("org-1");
        record.set_integer(1, 42);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"primaryKey\":\"org-1\""));
        assert!(json.contains("\"type\":\"integer\""));
        assert!(!json.contains("deferred"));
    }
}
