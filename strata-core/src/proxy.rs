use crate::{Entity, EntityMetadata, MapperError, Result, Row, Value};
use std::sync::Arc;

/// How much of a [`Proxy`] has been loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationState {
    Empty,
    Partial,
    Full,
}

/// Lazily populated stand in for an entity of a given type.
///
/// Every mapped property has a slot, a slot stays empty until some load or explicit write
/// populates it. Reading an empty slot is an error, never a silent default.
#[derive(Debug, Clone, PartialEq)]
pub struct Proxy {
    metadata: Arc<EntityMetadata>,
    slots: Box<[Option<Value>]>,
}

impl Proxy {
    pub fn new(metadata: Arc<EntityMetadata>) -> Self {
        let slots = vec![None; metadata.fields().len()].into_boxed_slice();
        Self { metadata, slots }
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    pub fn entity_type(&self) -> &str {
        self.metadata.entity_type()
    }

    pub fn state(&self) -> HydrationState {
        let hydrated = self.slots.iter().filter(|v| v.is_some()).count();
        match hydrated {
            0 => HydrationState::Empty,
            n if n == self.slots.len() => HydrationState::Full,
            _ => HydrationState::Partial,
        }
    }

    pub fn is_hydrated(&self, property: &str) -> bool {
        self.metadata
            .field_index(property)
            .is_some_and(|i| self.slots[i].is_some())
    }

    fn index(&self, property: &str) -> Result<usize> {
        self.metadata.field_index(property).ok_or_else(|| {
            MapperError::unknown_property(self.metadata.entity_type(), property).into()
        })
    }

    pub fn get(&self, property: &str) -> Result<&Value> {
        let index = self.index(property)?;
        self.slots[index].as_ref().ok_or_else(|| {
            MapperError::unhydrated(self.metadata.entity_type(), property).into()
        })
    }

    /// Explicit write, overwrites any previous value after checking the declared type.
    pub fn set(&mut self, property: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.index(property)?;
        let value = value.into();
        let field = &self.metadata.fields()[index];
        if !field.field_type.accepts(&value) {
            let error = MapperError::TypeMismatch {
                entity_type: self.metadata.entity_type().into(),
                property: property.into(),
                expected: field.field_type.to_string(),
                value,
            };
            log::error!("{:#}", error);
            return Err(error.into());
        }
        self.slots[index] = Some(value);
        Ok(())
    }

    /// Lazy write, only populates the property when it is still empty.
    pub fn fill(&mut self, property: &str, value: impl Into<Value>) -> Result<()> {
        if self.is_hydrated(property) {
            return Ok(());
        }
        self.set(property, value)
    }

    /// Populates the slots from a row keyed by column name, columns not mapped are ignored.
    pub fn hydrate(&mut self, row: &Row) -> Result<()> {
        for (column, value) in row.iter() {
            let Some((_, field)) = self.metadata.field_by_column(column) else {
                log::trace!(
                    "Ignoring the column `{}` not mapped on `{}`",
                    column,
                    self.metadata.entity_type()
                );
                continue;
            };
            let property = field.property.clone();
            self.set(&property, value.clone())?;
        }
        Ok(())
    }

    /// Hydrated properties keyed by property name.
    pub fn to_array(&self) -> Row {
        self.hydrated()
            .map(|(i, v)| (self.metadata.fields()[i].property.as_str(), v.clone()))
            .collect()
    }

    /// Hydrated properties keyed by column name.
    pub fn snapshot(&self) -> Row {
        self.hydrated()
            .map(|(i, v)| (self.metadata.fields()[i].column.as_str(), v.clone()))
            .collect()
    }

    fn hydrated(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (i, v)))
    }

    /// Materializes the concrete entity, its unhydrated fields stay unset.
    pub fn reveal<E: Entity>(self) -> Result<E> {
        if self.metadata.entity_type() != E::ENTITY_TYPE {
            let error = MapperError::invalid_metadata(
                E::ENTITY_TYPE,
                format!(
                    "cannot reveal a proxy of `{}`",
                    self.metadata.entity_type()
                ),
            );
            log::error!("{:#}", error);
            return Err(error.into());
        }
        let mut entity = E::default();
        for (i, value) in self.slots.into_vec().into_iter().enumerate() {
            if let Some(value) = value {
                entity.set_field(&self.metadata.fields()[i].property, value)?;
            }
        }
        Ok(entity)
    }
}

/// Creates the proxies of one entity type.
#[derive(Debug, Clone)]
pub struct ProxyFactory {
    metadata: Arc<EntityMetadata>,
}

impl ProxyFactory {
    pub fn new(metadata: Arc<EntityMetadata>) -> Self {
        Self { metadata }
    }

    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    /// Empty proxy, nothing hydrated.
    pub fn create(&self) -> Proxy {
        Proxy::new(self.metadata.clone())
    }

    pub fn from_row(&self, row: &Row) -> Result<Proxy> {
        let mut proxy = self.create();
        proxy.hydrate(row)?;
        Ok(proxy)
    }

    /// Proxy holding the hydrated fields of `entity`.
    pub fn of<E: Entity>(&self, entity: &E) -> Result<Proxy> {
        let mut proxy = self.create();
        for field in self.metadata.fields() {
            match entity.field(&field.property) {
                Ok(value) => proxy.set(&field.property, value)?,
                Err(error)
                    if matches!(
                        MapperError::of(&error),
                        Some(MapperError::UnhydratedField { .. })
                    ) => {}
                Err(error) => return Err(error),
            }
        }
        Ok(proxy)
    }
}
