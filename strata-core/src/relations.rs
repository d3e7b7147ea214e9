use crate::{
    Driver, Entity, Executor, MapperError, MetadataRegistry, Proxy, ProxyFactory, QueryBuilder,
    RelationDescriptor, RelationKind, RelationSide, Result, UnitOfWork, Value, lock_unit_of_work,
};
use std::{
    collections::{BTreeSet, HashMap},
    sync::Mutex,
};

/// Batched loader of the entities associated with a set of owners.
///
/// Loading a relation runs a single `WHERE column IN (...)` query for all the owners, then
/// partitions the rows by key and assigns each partition to its owners.
#[derive(Debug)]
pub struct RelationLoader<'r, D: Driver> {
    registry: &'r MetadataRegistry,
    driver: D,
    unit_of_work: Option<&'r Mutex<UnitOfWork>>,
}

impl<'r, D: Driver> RelationLoader<'r, D> {
    pub fn new(registry: &'r MetadataRegistry, driver: D) -> Self {
        Self {
            registry,
            driver,
            unit_of_work: None,
        }
    }

    /// Tracks every related entity loaded, so it can be updated like any other.
    pub fn tracking(mut self, unit_of_work: &'r Mutex<UnitOfWork>) -> Self {
        self.unit_of_work = Some(unit_of_work);
        self
    }

    /// Loads `relation` for every entity in `owners`.
    ///
    /// Owners without a match receive an empty collection (or nothing for a to one relation).
    /// No query runs when there is no non null key to look for.
    pub async fn load<E: Entity, Exec: Executor<Driver = D>>(
        &self,
        executor: &mut Exec,
        owners: &mut [E],
        relation: &str,
    ) -> Result<()> {
        let metadata = self.registry.get(E::ENTITY_TYPE)?;
        let descriptor = metadata.relation(relation)?.clone();
        let target = self.registry.get(&descriptor.target)?;
        let (owner_property, target_column) = match descriptor.side {
            RelationSide::Target => (
                metadata.id_property().to_string(),
                descriptor.foreign_key.clone(),
            ),
            RelationSide::Source => {
                let (_, field) = metadata
                    .field_by_column(&descriptor.foreign_key)
                    .ok_or_else(|| {
                        MapperError::invalid_metadata(
                            E::ENTITY_TYPE,
                            format!("`{}` is not a mapped column", descriptor.foreign_key),
                        )
                    })?;
                (field.property.clone(), target.id_column().to_string())
            }
        };
        let keys = owners
            .iter()
            .map(|owner| owner.field(&owner_property))
            .collect::<Result<Vec<_>>>()?;
        let distinct = keys
            .iter()
            .filter(|v| !v.is_null())
            .cloned()
            .collect::<BTreeSet<_>>();
        log::debug!(
            "Loading `{}.{}` ({} owners, {} distinct keys)",
            E::ENTITY_TYPE,
            relation,
            owners.len(),
            distinct.len()
        );
        let mut groups = HashMap::<Value, Vec<Proxy>>::new();
        if !distinct.is_empty() {
            let rows = QueryBuilder::new(self.driver.clone())
                .table(target.table(), None)
                .where_in(target_column.as_str(), distinct)
                .get(executor)
                .await?;
            log::debug!("Fetched {} `{}` rows", rows.len(), descriptor.target);
            let factory = ProxyFactory::new(target.clone());
            let mut unit_of_work = self.unit_of_work.map(lock_unit_of_work);
            for row in rows {
                let Some(key) = row.get(&target_column).cloned() else {
                    log::warn!(
                        "The row of `{}` has no `{}` column, it cannot be assigned",
                        descriptor.target,
                        target_column
                    );
                    continue;
                };
                let proxy = factory.from_row(&row)?;
                if let Some(unit_of_work) = unit_of_work.as_mut() {
                    unit_of_work.track_proxy(&proxy)?;
                }
                groups.entry(key).or_default().push(proxy);
            }
        }
        for (owner, key) in owners.iter_mut().zip(keys) {
            let related = groups.get(&key).cloned().unwrap_or_default();
            owner.set_relation(relation, Self::shape(&descriptor, related))?;
        }
        Ok(())
    }

    fn shape(descriptor: &RelationDescriptor, mut related: Vec<Proxy>) -> Vec<Proxy> {
        if descriptor.kind == RelationKind::One && related.len() > 1 {
            log::warn!(
                "The relation `{}` matched {} `{}`, keeping the first",
                descriptor.name,
                related.len(),
                descriptor.target
            );
            related.truncate(1);
        }
        related
    }
}
