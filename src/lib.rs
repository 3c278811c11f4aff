//! # runtara-object-mapper
//!
//! A bidirectional mapper between strongly-typed domain objects and
//! schema-described records.
//!
//! Domain types describe their fields once by implementing [`Mapped`]. The
//! [`ObjectMapper`] then projects objects into [`Record`]s for storage or
//! transport and hydrates records back into objects, tracking the CRUD
//! status of every destination it touches in a [`ConversionContext`].
//!
//! ## Features
//!
//! - **Declarative Bindings**: Index, access strategy and identity roles declared per field
//! - **Kind Inference**: Attribute kinds derived from field types when records carry no metadata
//! - **Nested Relations**: Embedded values, single relations and ordered multi relations
//! - **Value Types**: Geolocation and color values, with adapters for application types
//! - **Partial Failure Isolation**: A failing field is logged and skipped, never the whole object
//! - **Lifecycle Tracking**: Per-call context keyed by destination identity
//!
//! ## Quick Start
//!
//! ```rust
//! use runtara_object_mapper::{BindingBuilder, Mapped, ObjectMapper, RecordSchema, bind_field};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Contact {
//!     name: String,
//!     age: Option<i32>,
//! }
//!
//! impl Mapped for Contact {
//!     fn bindings(builder: BindingBuilder<Self>) -> BindingBuilder<Self> {
//!         builder
//!             .attribute(0, "name", bind_field!(Contact, name))
//!             .primary_value()
//!             .attribute(1, "age", bind_field!(Contact, age))
//!     }
//! }
//!
//! let mapper = ObjectMapper::default();
//! let contact = Contact { name: "Ada".to_string(), age: Some(36) };
//!
//! let record = mapper.project(&contact, RecordSchema::empty("contact")).unwrap();
//! assert_eq!(record.display_value(), Some("Ada"));
//!
//! let (copy, _context): (Contact, _) = mapper.hydrate_new(&record).unwrap();
//! assert_eq!(copy, contact);
//! ```
//!
//! ## Configuration
//!
//! The mapper is configured using `MapperConfig`:
//!
//! ```rust
//! use runtara_object_mapper::{MapperConfig, ObjectMapper};
//!
//! let config = MapperConfig::builder()
//!     .max_depth(8)   // Relation levels followed (default 32)
//!     .strict(true)   // Fail the call on the first bad field
//!     .build();
//! let mapper = ObjectMapper::new(config);
//! ```

pub mod adapter;
pub mod binding;
pub mod config;
pub mod context;
mod engine;
pub mod error;
pub mod field;
pub mod inference;
pub mod mapper;
pub mod record;
pub mod schema;
pub mod types;

// Re-export main types for convenience
pub use adapter::{CanonicalValue, ValueAdapter};
pub use binding::{
    Access, AccessStrategy, Binding, BindingBuilder, BindingDescriptor, BindingFlags, Mapped,
    descriptor,
};
pub use config::{MapperConfig, MapperConfigBuilder};
pub use context::{ConversionContext, FieldFailure, FieldPath, ObjectIdentity, PathSegment};
pub use error::{MappingError, Result};
pub use field::{BoundValue, FieldShape, FieldType, FieldValue};
pub use inference::{InferredMeta, infer, supports};
pub use mapper::{ObjectMapper, hydrate, project};
pub use record::{DataSet, Record, RecordVariant, Value};
pub use schema::{RecordSchema, SchemaProvider, SchemaRegistry};
pub use types::{Attachment, AttributeKind, AttributeMeta, Color, CrudStatus, Location};
