//! ObjectMapper - the main entry point for conversions
//!
//! Projects mapped objects into records and hydrates records back into
//! mapped objects. The mapper holds only configuration; every call builds
//! its own conversion state, so one mapper can be shared across threads.

use std::sync::Arc;

use crate::binding::{Mapped, descriptor};
use crate::config::MapperConfig;
use crate::context::ConversionContext;
use crate::engine::{Hydrator, Projector};
use crate::error::{MappingError, Result};
use crate::record::{DataSet, Record};
use crate::schema::{RecordSchema, SchemaProvider};

/// Converts between mapped objects and records
#[derive(Debug, Clone, Default)]
pub struct ObjectMapper {
    config: MapperConfig,
}

impl ObjectMapper {
    /// Create a new mapper with the given configuration
    pub fn new(config: MapperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    // ========================================================================
    // Projection
    // ========================================================================

    /// Project an object into a new item record
    pub fn project<T: Mapped>(
        &self,
        source: &T,
        schema: impl Into<Arc<RecordSchema>>,
    ) -> Result<Record> {
        let mut record = Record::item(schema);
        self.project_into(source, &mut record)?;
        Ok(record)
    }

    /// Project an object using the schema a provider holds under `name`
    pub fn project_as<T: Mapped>(
        &self,
        source: &T,
        provider: &dyn SchemaProvider,
        name: &str,
    ) -> Result<Record> {
        let schema = provider
            .schema_for(name)
            .ok_or_else(|| {
                MappingError::validation(format!("Unknown record schema '{}'", name))
            })?;
        self.project(source, schema)
    }

    /// Project an object into a new embedded (list row) record
    ///
    /// Fields excluded from projection and embedded values are left out.
    pub fn project_listing<T: Mapped>(
        &self,
        source: &T,
        schema: impl Into<Arc<RecordSchema>>,
    ) -> Result<Record> {
        let mut record = Record::embedded(schema);
        self.project_into(source, &mut record)?;
        Ok(record)
    }

    /// Project an object into an existing record
    pub fn project_into<T: Mapped>(&self, source: &T, record: &mut Record) -> Result<()> {
        tracing::debug!(
            type_name = std::any::type_name::<T>(),
            schema = %record.schema().name,
            embedded = record.is_embedded(),
            "Projecting object"
        );
        Projector::new(&self.config).project(source, record)
    }

    /// Project every object of a collection into one data set
    pub fn project_collection<'s, T, I>(
        &self,
        sources: I,
        schema: impl Into<Arc<RecordSchema>>,
    ) -> Result<DataSet>
    where
        T: Mapped,
        I: IntoIterator<Item = &'s T>,
    {
        let mut data_set = DataSet::new(schema);
        let projector = Projector::new(&self.config);
        for source in sources {
            projector.project(source, data_set.add_item())?;
        }
        tracing::debug!(
            type_name = std::any::type_name::<T>(),
            items = data_set.len(),
            "Projected collection"
        );
        Ok(data_set)
    }

    // ========================================================================
    // Hydration
    // ========================================================================

    /// Hydrate a record into an existing object
    ///
    /// Returns the context holding the CRUD status of every touched
    /// destination and the fields that were skipped.
    pub fn hydrate<T: Mapped>(
        &self,
        record: &Record,
        destination: &mut T,
    ) -> Result<ConversionContext> {
        let mut context = ConversionContext::new();
        self.hydrate_with_context(record, destination, &mut context)?;
        Ok(context)
    }

    /// Hydrate into an optional destination; `None` is rejected
    pub fn hydrate_existing<T: Mapped>(
        &self,
        record: &Record,
        destination: Option<&mut T>,
    ) -> Result<ConversionContext> {
        let destination = destination.ok_or(MappingError::DestinationInvalid)?;
        self.hydrate(record, destination)
    }

    /// Hydrate a record into a fresh `T::default()`
    pub fn hydrate_new<T: Mapped>(&self, record: &Record) -> Result<(T, ConversionContext)> {
        let mut destination = T::default();
        let context = self.hydrate(record, &mut destination)?;
        Ok((destination, context))
    }

    /// Hydrate using a caller-owned context
    pub fn hydrate_with_context<T: Mapped>(
        &self,
        record: &Record,
        destination: &mut T,
        context: &mut ConversionContext,
    ) -> Result<()> {
        // surface binding errors before touching the destination
        descriptor::<T>()?;
        tracing::debug!(
            type_name = std::any::type_name::<T>(),
            schema = %record.schema().name,
            "Hydrating object"
        );
        Hydrator::new(&self.config, context).hydrate(record, destination)?;
        if context.has_failures() {
            tracing::debug!(
                failures = context.failures().len(),
                "Hydration finished with skipped fields"
            );
        }
        Ok(())
    }
}

/// Project with a default mapper
pub fn project<T: Mapped>(source: &T, schema: impl Into<Arc<RecordSchema>>) -> Result<Record> {
    ObjectMapper::default().project(source, schema)
}

/// Hydrate with a default mapper
pub fn hydrate<T: Mapped>(record: &Record, destination: &mut T) -> Result<ConversionContext> {
    ObjectMapper::default().hydrate(record, destination)
}
