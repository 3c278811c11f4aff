//! Binding descriptors
//!
//! A [`BindingDescriptor`] lists, for one mapped type, which field sits at
//! which record index, what it holds, how it is accessed, and which identity
//! roles it plays. Types describe themselves once by implementing
//! [`Mapped`]; descriptors are built on first use and cached per type.
//!
//! ```
//! use runtara_object_mapper::{BindingBuilder, Mapped, bind_field};
//!
//! #[derive(Default)]
//! struct Contact {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Mapped for Contact {
//!     fn bindings(builder: BindingBuilder<Self>) -> BindingBuilder<Self> {
//!         builder
//!             .attribute(0, "id", bind_field!(Contact, id))
//!             .primary_key()
//!             .attribute(1, "name", bind_field!(Contact, name))
//!             .primary_value()
//!     }
//! }
//!
//! let descriptor = Contact::descriptor().unwrap();
//! assert_eq!(descriptor.len(), 2);
//! ```

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::engine::{Hydrator, Projector};
use crate::error::{MappingError, Result};
use crate::field::{BoundValue, FieldShape, FieldType, FieldValue};
use crate::inference::supports;
use crate::record::Record;
use crate::schema::RecordSchema;
use crate::types::AttributeKind;

// ============================================================================
// Access
// ============================================================================

/// How a bound field is read and written
pub enum Access<T, V> {
    /// Direct field access; writes cannot fail
    Field {
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    },
    /// Getter/setter pair; the setter may reject a value
    Methods {
        get: fn(&T) -> V,
        set: fn(&mut T, V) -> std::result::Result<(), String>,
    },
}

/// Which [`Access`] variant a binding uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStrategy {
    Field,
    Methods,
}

impl<T, V> Access<T, V> {
    pub fn field(get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        Access::Field { get, get_mut }
    }

    pub fn methods(
        get: fn(&T) -> V,
        set: fn(&mut T, V) -> std::result::Result<(), String>,
    ) -> Self {
        Access::Methods { get, set }
    }

    pub fn strategy(&self) -> AccessStrategy {
        match self {
            Access::Field { .. } => AccessStrategy::Field,
            Access::Methods { .. } => AccessStrategy::Methods,
        }
    }

    fn with<R>(&self, source: &T, f: impl FnOnce(&V) -> R) -> R {
        match self {
            Access::Field { get, .. } => f(get(source)),
            Access::Methods { get, .. } => {
                let value = get(source);
                f(&value)
            }
        }
    }

    fn store(&self, destination: &mut T, value: V) -> std::result::Result<(), String> {
        match self {
            Access::Field { get_mut, .. } => {
                *get_mut(destination) = value;
                Ok(())
            }
            Access::Methods { set, .. } => set(destination, value),
        }
    }
}

/// Direct [`Access`] to a named struct field
///
/// `bind_field!(Contact, name)` expands to
/// `Access::field(|o: &Contact| &o.name, |o: &mut Contact| &mut o.name)`.
#[macro_export]
macro_rules! bind_field {
    ($ty:ty, $field:ident) => {
        $crate::Access::field(|o: &$ty| &o.$field, |o: &mut $ty| &mut o.$field)
    };
}

// ============================================================================
// Flags
// ============================================================================

/// Role flags of a binding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingFlags {
    /// Participates in plain value copy
    pub attribute: bool,
    /// Participates in relational copy
    pub relationship: bool,
    pub primary_key: bool,
    /// Supplies the record's display value
    pub primary_value: bool,
    /// Supplies the record's parent display value
    pub parent_value: bool,
    /// Skipped when the record is an embedded (list row) record
    pub exclude_from_projection: bool,
    /// Routed through a getter/setter pair
    pub accessor_methods: bool,
    /// Holds a collection of its shape
    pub collection: bool,
    /// Multi relation is marked deferred instead of enumerated
    pub lazy: bool,
}

// ============================================================================
// Slots
// ============================================================================

/// Failure raised inside a slot, before field context is attached
pub(crate) enum SlotError {
    Write(String),
    Mapping(MappingError),
}

impl From<MappingError> for SlotError {
    fn from(error: MappingError) -> Self {
        SlotError::Mapping(error)
    }
}

pub(crate) trait ValueSlot<T>: Send + Sync {
    fn read(&self, source: &T) -> FieldValue;

    fn write(&self, destination: &mut T, value: FieldValue) -> std::result::Result<(), String>;
}

pub(crate) trait ObjectSlot<T>: Send + Sync {
    /// Project the nested object into `child`; false when the field is empty
    fn project(&self, source: &T, projector: &Projector<'_>, child: &mut Record) -> Result<bool>;

    fn hydrate(
        &self,
        destination: &mut T,
        record: &Record,
        hydrator: &mut Hydrator<'_>,
        index: u32,
    ) -> std::result::Result<(), SlotError>;
}

pub(crate) trait ObjectsSlot<T>: Send + Sync {
    fn project(
        &self,
        source: &T,
        projector: &Projector<'_>,
        schema: &Arc<RecordSchema>,
    ) -> Result<Vec<Record>>;

    fn hydrate(
        &self,
        destination: &mut T,
        records: &[Record],
        hydrator: &mut Hydrator<'_>,
        index: u32,
    ) -> std::result::Result<(), SlotError>;
}

struct ValueField<T, V> {
    access: Access<T, V>,
}

impl<T: 'static, V: BoundValue> ValueSlot<T> for ValueField<T, V> {
    fn read(&self, source: &T) -> FieldValue {
        self.access.with(source, V::to_field)
    }

    fn write(&self, destination: &mut T, value: FieldValue) -> std::result::Result<(), String> {
        let value = V::from_field(value)?;
        self.access.store(destination, value)
    }
}

struct ObjectField<T, R> {
    access: Access<T, Option<R>>,
}

impl<T: 'static, R: Mapped> ObjectSlot<T> for ObjectField<T, R> {
    fn project(&self, source: &T, projector: &Projector<'_>, child: &mut Record) -> Result<bool> {
        self.access.with(source, |nested| -> Result<bool> {
            match nested {
                Some(nested) => {
                    projector.descend()?.project(nested, child)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn hydrate(
        &self,
        destination: &mut T,
        record: &Record,
        hydrator: &mut Hydrator<'_>,
        index: u32,
    ) -> std::result::Result<(), SlotError> {
        let mut nested = R::default();
        hydrator.child(index)?.hydrate(record, &mut nested)?;
        self.access
            .store(destination, Some(nested))
            .map_err(SlotError::Write)
    }
}

struct ObjectsField<T, R> {
    access: Access<T, Vec<R>>,
}

impl<T: 'static, R: Mapped> ObjectsSlot<T> for ObjectsField<T, R> {
    fn project(
        &self,
        source: &T,
        projector: &Projector<'_>,
        schema: &Arc<RecordSchema>,
    ) -> Result<Vec<Record>> {
        self.access.with(source, |elements| -> Result<Vec<Record>> {
            if elements.is_empty() {
                return Ok(Vec::new());
            }
            let nested = projector.descend()?;
            elements
                .iter()
                .map(|element| -> Result<Record> {
                    let mut child = Record::item(schema.clone());
                    nested.project(element, &mut child)?;
                    Ok(child)
                })
                .collect()
        })
    }

    fn hydrate(
        &self,
        destination: &mut T,
        records: &[Record],
        hydrator: &mut Hydrator<'_>,
        index: u32,
    ) -> std::result::Result<(), SlotError> {
        let mut elements = Vec::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            let mut element = R::default();
            hydrator
                .element(index, position)?
                .hydrate(record, &mut element)?;
            elements.push(element);
        }
        self.access
            .store(destination, elements)
            .map_err(SlotError::Write)
    }
}

/// What a binding points at
pub(crate) enum Target<T> {
    Value(Box<dyn ValueSlot<T>>),
    Object(Box<dyn ObjectSlot<T>>),
    Objects(Box<dyn ObjectsSlot<T>>),
}

// ============================================================================
// Bindings
// ============================================================================

/// One (index, field, roles) entry of a descriptor
pub struct Binding<T> {
    index: u32,
    name: &'static str,
    field_type: FieldType,
    kind: Option<AttributeKind>,
    flags: BindingFlags,
    target: Target<T>,
}

impl<T> Binding<T> {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// Kind declared on the binding, used when the record has no metadata
    pub fn declared_kind(&self) -> Option<AttributeKind> {
        self.kind
    }

    pub fn flags(&self) -> &BindingFlags {
        &self.flags
    }

    pub fn access_strategy(&self) -> AccessStrategy {
        if self.flags.accessor_methods {
            AccessStrategy::Methods
        } else {
            AccessStrategy::Field
        }
    }

    pub(crate) fn target(&self) -> &Target<T> {
        &self.target
    }
}

/// Per-type table of bindings, built once and cached
pub struct BindingDescriptor<T> {
    type_name: &'static str,
    bindings: Vec<Binding<T>>,
}

impl<T: 'static> BindingDescriptor<T> {
    pub fn builder() -> BindingBuilder<T> {
        BindingBuilder::new()
    }
}

impl<T> BindingDescriptor<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Bindings in declaration order
    pub fn bindings(&self) -> &[Binding<T>] {
        &self.bindings
    }

    pub fn binding(&self, index: u32) -> Option<&Binding<T>> {
        self.bindings.iter().find(|b| b.index == index)
    }

    pub fn primary_key(&self) -> Option<&Binding<T>> {
        self.bindings.iter().find(|b| b.flags.primary_key)
    }

    pub fn primary_value(&self) -> Option<&Binding<T>> {
        self.bindings.iter().find(|b| b.flags.primary_value)
    }

    pub fn parent_value(&self) -> Option<&Binding<T>> {
        self.bindings.iter().find(|b| b.flags.parent_value)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`BindingDescriptor`]
///
/// Role modifiers (`primary_key`, `lazy`, ...) apply to the binding added
/// last. Problems are collected and reported together by [`build`](Self::build).
pub struct BindingBuilder<T> {
    type_name: &'static str,
    bindings: Vec<Binding<T>>,
    problems: Vec<String>,
}

impl<T: 'static> BindingBuilder<T> {
    pub fn new() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            bindings: Vec::new(),
            problems: Vec::new(),
        }
    }

    fn push(mut self, binding: Binding<T>) -> Self {
        self.bindings.push(binding);
        self
    }

    fn modify(mut self, modifier: &str, f: impl FnOnce(&mut Binding<T>)) -> Self {
        match self.bindings.last_mut() {
            Some(binding) => f(binding),
            None => self
                .problems
                .push(format!("{}() called before any binding", modifier)),
        }
        self
    }

    /// Bind a scalar or value-type field; the kind is inferred from `V`
    pub fn attribute<V: BoundValue>(
        self,
        index: u32,
        name: &'static str,
        access: Access<T, V>,
    ) -> Self {
        let flags = BindingFlags {
            attribute: true,
            accessor_methods: access.strategy() == AccessStrategy::Methods,
            collection: V::field_type().collection,
            ..BindingFlags::default()
        };
        self.push(Binding {
            index,
            name,
            field_type: V::field_type(),
            kind: None,
            flags,
            target: Target::Value(Box::new(ValueField { access })),
        })
    }

    /// Bind a value-typed sub-object stored as an embedded record
    pub fn embedded<R: Mapped>(
        self,
        index: u32,
        name: &'static str,
        access: Access<T, Option<R>>,
    ) -> Self {
        self.object(index, name, access, AttributeKind::EmbeddedValue)
    }

    /// Bind a single nested item
    pub fn relation<R: Mapped>(
        self,
        index: u32,
        name: &'static str,
        access: Access<T, Option<R>>,
    ) -> Self {
        self.object(index, name, access, AttributeKind::SingleRelation)
    }

    fn object<R: Mapped>(
        self,
        index: u32,
        name: &'static str,
        access: Access<T, Option<R>>,
        kind: AttributeKind,
    ) -> Self {
        let flags = BindingFlags {
            relationship: true,
            accessor_methods: access.strategy() == AccessStrategy::Methods,
            ..BindingFlags::default()
        };
        self.push(Binding {
            index,
            name,
            field_type: FieldType::new(FieldShape::Object, true, std::any::type_name::<R>()),
            kind: Some(kind),
            flags,
            target: Target::Object(Box::new(ObjectField { access })),
        })
    }

    /// Bind an ordered list of nested items
    pub fn relations<R: Mapped>(
        self,
        index: u32,
        name: &'static str,
        access: Access<T, Vec<R>>,
    ) -> Self {
        let flags = BindingFlags {
            relationship: true,
            accessor_methods: access.strategy() == AccessStrategy::Methods,
            collection: true,
            ..BindingFlags::default()
        };
        self.push(Binding {
            index,
            name,
            field_type: FieldType::new(FieldShape::Object, false, std::any::type_name::<Vec<R>>())
                .collection(),
            kind: Some(AttributeKind::MultiRelation),
            flags,
            target: Target::Objects(Box::new(ObjectsField { access })),
        })
    }

    /// Declare the kind of the last binding instead of inferring it
    pub fn kind(self, kind: AttributeKind) -> Self {
        self.modify("kind", |b| b.kind = Some(kind))
    }

    pub fn primary_key(self) -> Self {
        self.modify("primary_key", |b| b.flags.primary_key = true)
    }

    /// Make the last binding the primary key without storing it as a value
    ///
    /// Projection fills only the key slots and hydration reads only the
    /// record's primary key. The binding's index stays reserved.
    pub fn key_only(self) -> Self {
        self.modify("key_only", |b| {
            b.flags.primary_key = true;
            b.flags.attribute = false;
        })
    }

    pub fn primary_value(self) -> Self {
        self.modify("primary_value", |b| b.flags.primary_value = true)
    }

    pub fn parent_value(self) -> Self {
        self.modify("parent_value", |b| b.flags.parent_value = true)
    }

    pub fn exclude_from_projection(self) -> Self {
        self.modify("exclude_from_projection", |b| {
            b.flags.exclude_from_projection = true
        })
    }

    pub fn lazy(self) -> Self {
        self.modify("lazy", |b| b.flags.lazy = true)
    }

    /// Validate and produce the descriptor
    pub fn build(self) -> Result<BindingDescriptor<T>> {
        let mut problems = self.problems;
        let mut seen = BTreeSet::new();

        for binding in &self.bindings {
            if !seen.insert(binding.index) {
                problems.push(format!(
                    "index {} is bound more than once (field '{}')",
                    binding.index, binding.name
                ));
            }
            if let Some(kind) = binding.kind {
                if !supports(&binding.field_type, kind) {
                    problems.push(format!(
                        "field '{}' of type {} cannot hold kind {}",
                        binding.name, binding.field_type.type_name, kind
                    ));
                }
            }
            if binding.flags.lazy && binding.kind != Some(AttributeKind::MultiRelation) {
                problems.push(format!(
                    "field '{}' is lazy but not a multi relation",
                    binding.name
                ));
            }
            let claims_role = binding.flags.primary_key
                || binding.flags.primary_value
                || binding.flags.parent_value;
            if claims_role && binding.flags.relationship {
                problems.push(format!(
                    "relationship field '{}' cannot claim an identity role",
                    binding.name
                ));
            }
        }

        let roles: [(&str, fn(&BindingFlags) -> bool); 3] = [
            ("primary key", |f| f.primary_key),
            ("primary value", |f| f.primary_value),
            ("parent value", |f| f.parent_value),
        ];
        for (role, claimed) in roles {
            let claimants: Vec<&str> = self
                .bindings
                .iter()
                .filter(|b| claimed(&b.flags))
                .map(|b| b.name)
                .collect();
            if claimants.len() > 1 {
                problems.push(format!(
                    "{} claimed by more than one field: {}",
                    role,
                    claimants.join(", ")
                ));
            }
        }

        if !problems.is_empty() {
            return Err(MappingError::binding(self.type_name, problems.join("; ")));
        }

        Ok(BindingDescriptor {
            type_name: self.type_name,
            bindings: self.bindings,
        })
    }
}

impl<T: 'static> Default for BindingBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Mapped types and the descriptor cache
// ============================================================================

/// A domain type that converts to and from records
///
/// `Default` supplies the fresh instances created for nested relations.
pub trait Mapped: Default + 'static {
    /// Declare the bindings of this type
    fn bindings(builder: BindingBuilder<Self>) -> BindingBuilder<Self>;

    /// Cached descriptor for this type
    fn descriptor() -> Result<Arc<BindingDescriptor<Self>>> {
        descriptor::<Self>()
    }
}

type DescriptorMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

static DESCRIPTORS: OnceLock<RwLock<DescriptorMap>> = OnceLock::new();

/// Descriptor for `T`, built on first use
///
/// A failed build is returned to the caller and never cached.
pub fn descriptor<T: Mapped>() -> Result<Arc<BindingDescriptor<T>>> {
    let cache = DESCRIPTORS.get_or_init(Default::default);
    let type_id = TypeId::of::<T>();

    let cached = cache
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
        .cloned();
    if let Some(found) = cached.and_then(|entry| entry.downcast::<BindingDescriptor<T>>().ok()) {
        return Ok(found);
    }

    let built = Arc::new(T::bindings(BindingBuilder::new()).build()?);
    tracing::debug!(
        type_name = built.type_name(),
        bindings = built.len(),
        "Built binding descriptor"
    );

    let entry = cache
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(type_id)
        .or_insert_with(|| built.clone() as Arc<dyn Any + Send + Sync>)
        .clone();
    Ok(entry.downcast::<BindingDescriptor<T>>().unwrap_or(built))
}
