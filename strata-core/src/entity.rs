use crate::{MapperError, Proxy, Result, Value};

/// Field level capability interface of a domain entity.
///
/// Every accessor is explicit: the mapper never reflects over the type. Implement it with
/// `#[derive(Entity)]` (fields declared as [`crate::Hydrated`]) or by hand.
///
/// ```rust,ignore
/// #[derive(Default, Entity)]
/// #[entity_type("User")]
/// struct User {
///     id: Hydrated<i64>,
///     name: Hydrated<String>,
///     #[relation]
///     posts: Hydrated<Vec<Post>>,
/// }
/// ```
pub trait Entity: Default + Send + Sync + 'static {
    /// Name the entity is registered with in the [`crate::MetadataRegistry`].
    const ENTITY_TYPE: &'static str;
    /// Properties reachable through [`Entity::field`] and [`Entity::set_field`].
    const PROPERTIES: &'static [&'static str];
    /// Relations accepted by [`Entity::set_relation`].
    const RELATIONS: &'static [&'static str] = &[];

    /// Current value of `property`, [`MapperError::UnhydratedField`] when it was never loaded.
    fn field(&self, property: &str) -> Result<Value>;

    fn set_field(&mut self, property: &str, value: Value) -> Result<()>;

    /// Assigns the related entities loaded for `relation`.
    fn set_relation(&mut self, relation: &str, _related: Vec<Proxy>) -> Result<()> {
        Err(MapperError::UnknownRelation {
            entity_type: Self::ENTITY_TYPE.into(),
            relation: relation.into(),
        }
        .into())
    }
}

/// Relation valued field buildable from the loaded proxies.
pub trait FromProxies: Sized {
    fn from_proxies(proxies: Vec<Proxy>) -> Result<Self>;
}

impl<E: Entity> FromProxies for Vec<E> {
    fn from_proxies(proxies: Vec<Proxy>) -> Result<Self> {
        proxies.into_iter().map(Proxy::reveal).collect()
    }
}

impl<E: Entity> FromProxies for Option<E> {
    fn from_proxies(proxies: Vec<Proxy>) -> Result<Self> {
        if proxies.len() > 1 {
            log::warn!(
                "Expected at most one `{}`, got {}, keeping the first",
                E::ENTITY_TYPE,
                proxies.len()
            );
        }
        proxies.into_iter().next().map(Proxy::reveal).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityMetadata, FieldType, Hydrated, ProxyFactory, Row};
    use std::sync::Arc;

    #[derive(Default, Debug)]
    struct Note {
        id: Hydrated<i64>,
    }

    impl Entity for Note {
        const ENTITY_TYPE: &'static str = "Note";
        const PROPERTIES: &'static [&'static str] = &["id"];
        fn field(&self, property: &str) -> Result<Value> {
            match property {
                "id" => self.id.to_value(Self::ENTITY_TYPE, "id"),
                _ => Err(MapperError::unknown_property(Self::ENTITY_TYPE, property).into()),
            }
        }
        fn set_field(&mut self, property: &str, value: Value) -> Result<()> {
            match property {
                "id" => self.id.set_value(value),
                _ => Err(MapperError::unknown_property(Self::ENTITY_TYPE, property).into()),
            }
        }
    }

    fn proxies(ids: &[i64]) -> Vec<Proxy> {
        let metadata = EntityMetadata::builder("Note", "notes", "id")
            .field("id", FieldType::Integer)
            .build()
            .unwrap();
        let factory = ProxyFactory::new(Arc::new(metadata));
        ids.iter()
            .map(|id| factory.from_row(&Row::new().with("id", *id)).unwrap())
            .collect()
    }

    #[test]
    fn no_relations_by_default() {
        let mut note = Note::default();
        let error = note.set_relation("tags", proxies(&[1])).unwrap_err();
        assert_eq!(
            MapperError::of(&error),
            Some(&MapperError::UnknownRelation {
                entity_type: "Note".into(),
                relation: "tags".into(),
            })
        );
    }

    #[test]
    fn from_proxies() {
        let notes = Vec::<Note>::from_proxies(proxies(&[1, 2])).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].id, Hydrated::Set(2));
        let first = Option::<Note>::from_proxies(proxies(&[3, 4])).unwrap();
        assert_eq!(first.map(|v| v.id), Some(Hydrated::Set(3)));
        assert!(Option::<Note>::from_proxies(Vec::new()).unwrap().is_none());
    }
}
