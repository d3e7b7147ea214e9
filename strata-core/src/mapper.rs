use crate::{
    Connection, Driver, Entity, EntityMetadata, ErrorContext, Executor, MapperError,
    MetadataRegistry, ProxyFactory, QueryBuilder, RelationLoader, Result, Row, RowsAffected,
    SharedUnitOfWork, UnitOfWork, Value, lock_unit_of_work, transaction,
};
use std::{
    fmt,
    marker::PhantomData,
    sync::{Arc, MutexGuard},
};

/// Translates between the rows of a table and the entities of type `E`.
///
/// Entities loaded through the mapper, directly or as related entities, are tracked by its
/// [`UnitOfWork`], updates only write the columns that changed since. Mappers built with
/// [`EntityMapper::with_unit_of_work`] share one unit of work, so an entity loaded through a
/// relation can be updated by the mapper of its own type. Inserts can be queued and flushed in a
/// single transaction.
///
/// ```rust,ignore
/// let mut users = EntityMapper::<User, _>::new(PostgresDriver::new(), registry.clone())?;
/// let mut posts = EntityMapper::<Post, _>::with_unit_of_work(
///     PostgresDriver::new(),
///     registry.clone(),
///     users.shared_unit_of_work(),
/// )?;
/// let mut user = users.find(&mut connection, 1).await?.unwrap();
/// user.email.set("alice@example.com".into());
/// users.update(&mut connection, &user).await?;
/// users.load_relations(&mut connection, std::slice::from_mut(&mut user), &["posts"]).await?;
/// let mut post = user.posts.take().unwrap_or_default().remove(0);
/// post.title.set("Edited".into());
/// posts.update(&mut connection, &post).await?;
/// ```
pub struct EntityMapper<E: Entity, D: Driver> {
    driver: D,
    registry: Arc<MetadataRegistry>,
    metadata: Arc<EntityMetadata>,
    factory: ProxyFactory,
    unit_of_work: SharedUnitOfWork,
    queued: Vec<Row>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, D: Driver> EntityMapper<E, D> {
    /// Mapper for `E` with a unit of work of its own, fails when the registered metadata does
    /// not match what `E` exposes.
    pub fn new(driver: D, registry: Arc<MetadataRegistry>) -> Result<Self> {
        let unit_of_work = UnitOfWork::shared(registry.clone());
        Self::with_unit_of_work(driver, registry, unit_of_work)
    }

    /// Mapper for `E` tracking its entities in `unit_of_work`.
    pub fn with_unit_of_work(
        driver: D,
        registry: Arc<MetadataRegistry>,
        unit_of_work: SharedUnitOfWork,
    ) -> Result<Self> {
        let metadata = registry.get(E::ENTITY_TYPE)?;
        let invalid = |message: String| {
            let error = MapperError::invalid_metadata(E::ENTITY_TYPE, message);
            log::error!("{:#}", error);
            error
        };
        if let Some(field) = metadata
            .fields()
            .iter()
            .find(|v| !E::PROPERTIES.contains(&v.property.as_str()))
        {
            return Err(invalid(format!(
                "the property `{}` has no counterpart on the entity",
                field.property
            ))
            .into());
        }
        if let Some(relation) = metadata
            .relations()
            .iter()
            .find(|v| !E::RELATIONS.contains(&v.name.as_str()))
        {
            return Err(invalid(format!(
                "the relation `{}` has no counterpart on the entity",
                relation.name
            ))
            .into());
        }
        Ok(Self {
            driver,
            factory: ProxyFactory::new(metadata.clone()),
            unit_of_work,
            registry,
            metadata,
            queued: Vec::new(),
            _entity: PhantomData,
        })
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    pub fn table(&self) -> &str {
        self.metadata.table()
    }

    /// Locked unit of work, do not hold it across an `await`.
    pub fn unit_of_work(&self) -> MutexGuard<'_, UnitOfWork> {
        lock_unit_of_work(&self.unit_of_work)
    }

    pub fn shared_unit_of_work(&self) -> SharedUnitOfWork {
        self.unit_of_work.clone()
    }

    /// Fresh builder targeting the mapped table.
    pub fn query(&self, alias: Option<&str>) -> QueryBuilder<D> {
        QueryBuilder::new(self.driver.clone()).table(self.metadata.table(), alias)
    }

    /// Builds an entity from a row keyed by column, absent columns stay unhydrated.
    pub fn create_entity(&self, row: &Row) -> Result<E> {
        self.factory.from_row(row)?.reveal()
    }

    /// Hydrated properties of `entity` keyed by column.
    pub fn extract(&self, entity: &E) -> Result<Row> {
        Ok(self.factory.of(entity)?.snapshot())
    }

    /// Overwrites the fields of `entity` whose column is present in `row`.
    pub fn hydrate(&self, entity: &mut E, row: &Row) -> Result<()> {
        let proxy = self.factory.from_row(row)?;
        for (property, value) in proxy.to_array() {
            entity.set_field(&property, value)?;
        }
        Ok(())
    }

    pub fn get_field(&self, entity: &E, property: &str) -> Result<Value> {
        self.metadata.require_field(property)?;
        entity.field(property)
    }

    fn id(&self, entity: &E) -> Result<Value> {
        entity.field(self.metadata.id_property())
    }

    fn load(&self, rows: Vec<Row>) -> Result<Vec<E>> {
        let entities = rows
            .iter()
            .map(|row| self.create_entity(row))
            .collect::<Result<Vec<_>>>()?;
        let mut unit_of_work = self.unit_of_work();
        for entity in &entities {
            unit_of_work.track(entity)?;
        }
        Ok(entities)
    }

    /// Every entity of the table, all of them tracked.
    pub async fn find_all<Exec: Executor<Driver = D>>(
        &mut self,
        executor: &mut Exec,
    ) -> Result<Vec<E>> {
        let rows = self.query(None).get(executor).await?;
        self.load(rows)
    }

    /// Entity with the given id, tracked when found.
    pub async fn find<Exec: Executor<Driver = D>>(
        &mut self,
        executor: &mut Exec,
        id: impl Into<Value>,
    ) -> Result<Option<E>> {
        let row = self
            .query(None)
            .where_eq(self.metadata.id_column(), id)
            .first(executor)
            .await?;
        Ok(self.load(row.into_iter().collect())?.pop())
    }

    /// Adds `entity` to the batch written by the next [`EntityMapper::execute_insert`].
    pub fn queue_insert(&mut self, entity: &E) -> Result<()> {
        let row = self.extract(entity)?;
        self.queued.push(row);
        Ok(())
    }

    pub fn queued(&self) -> usize {
        self.queued.len()
    }

    /// Writes the queued rows in a single transaction.
    ///
    /// Any failure rolls the whole batch back and leaves the queue untouched.
    pub async fn execute_insert<C: Connection<Driver = D>>(
        &mut self,
        connection: &mut C,
    ) -> Result<RowsAffected> {
        if self.queued.is_empty() {
            let error = MapperError::EmptyBatch;
            log::error!("{:#} into `{}`", error, self.metadata.table());
            return Err(error.into());
        }
        let query = self.query(None);
        let rows = &self.queued;
        let result = transaction(connection, async |executor| query.insert(executor, rows).await)
            .await
            .with_context(|| {
                format!(
                    "While inserting {} rows into `{}`",
                    rows.len(),
                    self.metadata.table()
                )
            })?;
        self.queued.clear();
        Ok(result)
    }

    /// Inserts `entity` right away in its own transaction, the queued rows are not touched.
    ///
    /// The entity is tracked afterwards when its id is known.
    pub async fn insert<C: Connection<Driver = D>>(
        &mut self,
        connection: &mut C,
        entity: &E,
    ) -> Result<RowsAffected> {
        let row = self.extract(entity)?;
        let query = self.query(None);
        let result = transaction(connection, async |executor| {
            query.insert(executor, std::slice::from_ref(&row)).await
        })
        .await?;
        if self.id(entity).is_ok() {
            self.unit_of_work().refresh(entity)?;
        }
        Ok(result)
    }

    /// Writes the columns changed since `entity` was loaded, nothing is sent when none did.
    pub async fn update<Exec: Executor<Driver = D>>(
        &mut self,
        executor: &mut Exec,
        entity: &E,
    ) -> Result<RowsAffected> {
        let changes = self.unit_of_work().change_set(entity)?;
        if changes.is_empty() {
            log::debug!("No change to write on `{}`", E::ENTITY_TYPE);
            return Ok(RowsAffected::default());
        }
        let result = self
            .query(None)
            .where_eq(self.metadata.id_column(), self.id(entity)?)
            .update(executor, &changes)
            .await?;
        self.unit_of_work().refresh(entity)?;
        Ok(result)
    }

    /// Deletes `entity` by id and stops tracking it.
    pub async fn delete<Exec: Executor<Driver = D>>(
        &mut self,
        executor: &mut Exec,
        entity: &E,
    ) -> Result<RowsAffected> {
        let result = self
            .query(None)
            .where_eq(self.metadata.id_column(), self.id(entity)?)
            .delete(executor)
            .await?;
        self.unit_of_work().detach(entity)?;
        Ok(result)
    }

    /// Loads the named relations of `entities`, in order, one query per relation.
    ///
    /// The related entities are tracked by the unit of work of this mapper.
    pub async fn load_relations<Exec: Executor<Driver = D>>(
        &self,
        executor: &mut Exec,
        entities: &mut [E],
        relations: &[&str],
    ) -> Result<()> {
        let loader =
            RelationLoader::new(&self.registry, self.driver.clone()).tracking(&self.unit_of_work);
        for relation in relations {
            loader.load(executor, entities, relation).await?;
        }
        Ok(())
    }
}

impl<E: Entity, D: Driver> fmt::Debug for EntityMapper<E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMapper")
            .field("entity_type", &E::ENTITY_TYPE)
            .field("driver", &D::NAME)
            .field("table", &self.metadata.table())
            .field(
                "tracked",
                &self.unit_of_work.try_lock().map(|v| v.len()).ok(),
            )
            .field("queued", &self.queued.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldType, GenericDriver, Hydrated};

    #[derive(Default, Debug, PartialEq)]
    struct Book {
        id: Hydrated<i64>,
        title: Hydrated<String>,
        cover: Hydrated<Option<Vec<u8>>>,
    }

    impl Entity for Book {
        const ENTITY_TYPE: &'static str = "Book";
        const PROPERTIES: &'static [&'static str] = &["id", "title", "cover"];
        fn field(&self, property: &str) -> Result<Value> {
            match property {
                "id" => self.id.to_value(Self::ENTITY_TYPE, "id"),
                "title" => self.title.to_value(Self::ENTITY_TYPE, "title"),
                "cover" => self.cover.to_value(Self::ENTITY_TYPE, "cover"),
                _ => Err(MapperError::unknown_property(Self::ENTITY_TYPE, property).into()),
            }
        }
        fn set_field(&mut self, property: &str, value: Value) -> Result<()> {
            match property {
                "id" => self.id.set_value(value),
                "title" => self.title.set_value(value),
                "cover" => self.cover.set_value(value),
                _ => Err(MapperError::unknown_property(Self::ENTITY_TYPE, property).into()),
            }
        }
    }

    fn registry(metadata: EntityMetadata) -> Arc<MetadataRegistry> {
        MetadataRegistry::new().with(metadata).unwrap().into()
    }

    fn mapper() -> EntityMapper<Book, GenericDriver> {
        let metadata = EntityMetadata::builder("Book", "books", "id")
            .field("id", FieldType::Integer)
            .field_column("title", "book_title", FieldType::String)
            .field("cover", FieldType::Binary)
            .build()
            .unwrap();
        EntityMapper::new(GenericDriver::new(), registry(metadata)).unwrap()
    }

    #[test]
    fn round_trip() {
        let mapper = mapper();
        let row = Row::new()
            .with("id", 1)
            .with("book_title", "Dune")
            .with("cover", Value::Null);
        let book = mapper.create_entity(&row).unwrap();
        assert_eq!(book.title, Hydrated::Set("Dune".to_string()));
        assert_eq!(book.cover, Hydrated::Set(None));
        assert_eq!(mapper.extract(&book).unwrap(), row);
    }

    #[test]
    fn partial_rows() {
        let mapper = mapper();
        let book = mapper
            .create_entity(&Row::new().with("id", 1).with("unknown", 3))
            .unwrap();
        assert_eq!(mapper.get_field(&book, "id").unwrap(), Value::Int64(1));
        let error = mapper.get_field(&book, "title").unwrap_err();
        assert_eq!(
            MapperError::of(&error),
            Some(&MapperError::unhydrated("Book", "title"))
        );
        let error = mapper.get_field(&book, "isbn").unwrap_err();
        assert_eq!(
            MapperError::of(&error),
            Some(&MapperError::unknown_property("Book", "isbn"))
        );
        assert_eq!(mapper.extract(&book).unwrap(), Row::new().with("id", 1));
    }

    #[test]
    fn hydrate_in_place() {
        let mapper = mapper();
        let mut book = mapper
            .create_entity(&Row::new().with("id", 1).with("book_title", "Dune"))
            .unwrap();
        mapper
            .hydrate(&mut book, &Row::new().with("cover", vec![1u8, 2]))
            .unwrap();
        assert_eq!(book.title, Hydrated::Set("Dune".to_string()));
        assert_eq!(book.cover, Hydrated::Set(Some(vec![1, 2])));
        let error = mapper
            .hydrate(&mut book, &Row::new().with("book_title", 5))
            .unwrap_err();
        assert!(matches!(
            MapperError::of(&error),
            Some(MapperError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn metadata_must_match_entity() {
        let metadata = EntityMetadata::builder("Book", "books", "id")
            .field("id", FieldType::Integer)
            .field("isbn", FieldType::String)
            .build()
            .unwrap();
        let error = EntityMapper::<Book, _>::new(GenericDriver::new(), registry(metadata))
            .unwrap_err();
        assert!(matches!(
            MapperError::of(&error),
            Some(MapperError::InvalidMetadata { .. })
        ));
        let error = EntityMapper::<Book, _>::new(GenericDriver::new(), Default::default())
            .unwrap_err();
        assert_eq!(
            MapperError::of(&error),
            Some(&MapperError::UnknownEntityType("Book".into()))
        );
    }

    #[test]
    fn query_targets_table() {
        let statement = mapper()
            .query(Some("b"))
            .where_eq("b.id", 1)
            .compile_select()
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT *\nFROM \"books\" AS \"b\"\nWHERE \"b\".\"id\" = ?"
        );
    }
}
