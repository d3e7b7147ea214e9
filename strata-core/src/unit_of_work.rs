use crate::{
    Entity, EntityMetadata, MapperError, MetadataRegistry, Proxy, ProxyFactory, Result, Row, Value,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Unit of work shared by the mappers of every entity type of a session.
pub type SharedUnitOfWork = Arc<Mutex<UnitOfWork>>;

/// Locks `unit_of_work`, the snapshots stay usable after a panic in another holder.
pub fn lock_unit_of_work(unit_of_work: &Mutex<UnitOfWork>) -> MutexGuard<'_, UnitOfWork> {
    unit_of_work.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Identity of a tracked entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub entity_type: String,
    pub id: Value,
}

/// Tracked state table: the values of each entity as they were when first loaded.
///
/// Snapshots are keyed by column, the change set of an entity is the part of its current state
/// that differs from the snapshot.
#[derive(Debug)]
pub struct UnitOfWork {
    registry: Arc<MetadataRegistry>,
    snapshots: HashMap<EntityKey, Row>,
}

impl UnitOfWork {
    pub fn new(registry: Arc<MetadataRegistry>) -> Self {
        Self {
            registry,
            snapshots: Default::default(),
        }
    }

    pub fn shared(registry: Arc<MetadataRegistry>) -> SharedUnitOfWork {
        Arc::new(Mutex::new(Self::new(registry)))
    }

    fn state<E: Entity>(&self, entity: &E) -> Result<(EntityKey, Row)> {
        let metadata = self.registry.get(E::ENTITY_TYPE)?;
        let snapshot = ProxyFactory::new(metadata.clone()).of(entity)?.snapshot();
        let key = Self::key(&metadata, &snapshot)?;
        Ok((key, snapshot))
    }

    fn key(metadata: &EntityMetadata, snapshot: &Row) -> Result<EntityKey> {
        let Some(id) = snapshot.get(metadata.id_column()) else {
            let error = MapperError::unhydrated(metadata.entity_type(), metadata.id_property());
            log::error!("{:#}, cannot identify the entity", error);
            return Err(error.into());
        };
        Ok(EntityKey {
            entity_type: metadata.entity_type().into(),
            id: id.clone(),
        })
    }

    /// Records the current state of `entity`, an entity already tracked keeps its snapshot.
    pub fn track<E: Entity>(&mut self, entity: &E) -> Result<()> {
        let (key, snapshot) = self.state(entity)?;
        self.snapshots.entry(key).or_insert(snapshot);
        Ok(())
    }

    /// Records the state of a proxy not revealed yet, as for [`UnitOfWork::track`].
    pub fn track_proxy(&mut self, proxy: &Proxy) -> Result<()> {
        let snapshot = proxy.snapshot();
        let key = Self::key(proxy.metadata(), &snapshot)?;
        self.snapshots.entry(key).or_insert(snapshot);
        Ok(())
    }

    /// Columns whose current value differs from the snapshot.
    pub fn change_set<E: Entity>(&self, entity: &E) -> Result<Row> {
        let (key, current) = self.state(entity)?;
        let Some(snapshot) = self.snapshots.get(&key) else {
            let error = MapperError::UntrackedEntity(format!("{}#{}", key.entity_type, key.id));
            log::error!("{:#}", error);
            return Err(error.into());
        };
        Ok(current
            .into_iter()
            .filter(|(column, value)| snapshot.get(column) != Some(value))
            .collect())
    }

    /// Discards the snapshot of `entity` and captures its current state.
    pub fn refresh<E: Entity>(&mut self, entity: &E) -> Result<()> {
        let (key, snapshot) = self.state(entity)?;
        self.snapshots.insert(key, snapshot);
        Ok(())
    }

    /// Stops tracking `entity`, returns whether it was tracked.
    pub fn detach<E: Entity>(&mut self, entity: &E) -> Result<bool> {
        let (key, _) = self.state(entity)?;
        Ok(self.snapshots.remove(&key).is_some())
    }

    pub fn is_tracked<E: Entity>(&self, entity: &E) -> bool {
        self.state(entity)
            .is_ok_and(|(key, _)| self.snapshots.contains_key(&key))
    }

    pub fn snapshot(&self, key: &EntityKey) -> Option<&Row> {
        self.snapshots.get(key)
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
