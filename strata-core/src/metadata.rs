use crate::{Error, ErrorContext, FieldType, MapperError, Result};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::{collections::HashMap, fmt, marker::PhantomData, sync::Arc};

/// Property to column mapping of one entity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub property: String,
    pub column: String,
    pub field_type: FieldType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    One,
    Many,
}

/// Table holding the foreign key of a relation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationSide {
    /// The target table references the owner's id (has one / has many).
    #[default]
    Target,
    /// The owning table references the target's id (belongs to).
    Source,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    pub name: String,
    pub kind: RelationKind,
    pub target: String,
    pub foreign_key: String,
    pub side: RelationSide,
}

/// Static description of an entity type: table, primary key, fields and relations.
///
/// Built once through [`EntityMetadataBuilder`] or from an [`EntityDeclaration`], validated at
/// construction and never mutated afterwards. Share it through [`MetadataRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    entity_type: String,
    table: String,
    id_property: String,
    fields: Vec<FieldMapping>,
    relations: Vec<RelationDescriptor>,
}

impl EntityMetadata {
    pub fn builder(
        entity_type: impl Into<String>,
        table: impl Into<String>,
        id_property: impl Into<String>,
    ) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            metadata: EntityMetadata {
                entity_type: entity_type.into(),
                table: table.into(),
                id_property: id_property.into(),
                fields: Vec::new(),
                relations: Vec::new(),
            },
        }
    }

    pub fn from_declaration(
        entity_type: impl Into<String>,
        declaration: EntityDeclaration,
    ) -> Result<Self> {
        let mut builder = Self::builder(entity_type, declaration.table, declaration.id);
        for (property, field) in declaration.fields.0 {
            let field_type = field.field_type.parse::<FieldType>().with_context(|| {
                format!(
                    "While reading the field `{}` of `{}`",
                    property, builder.metadata.entity_type
                )
            })?;
            let column = field.column.unwrap_or_else(|| property.clone());
            builder = builder.field_column(property, column, field_type);
        }
        for (name, relation) in declaration.relations.0 {
            builder.metadata.relations.push(RelationDescriptor {
                name,
                kind: relation.kind,
                target: relation.target,
                foreign_key: relation.foreign_key,
                side: relation.side,
            });
        }
        builder.build()
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id_property(&self) -> &str {
        &self.id_property
    }

    pub fn id_column(&self) -> &str {
        self.field(&self.id_property)
            .map(|v| v.column.as_str())
            .unwrap_or(&self.id_property)
    }

    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    pub fn relations(&self) -> &[RelationDescriptor] {
        &self.relations
    }

    pub fn field_index(&self, property: &str) -> Option<usize> {
        self.fields.iter().position(|v| v.property == property)
    }

    pub fn field(&self, property: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|v| v.property == property)
    }

    /// Like [`EntityMetadata::field`] but failing with [`MapperError::UnknownProperty`].
    pub fn require_field(&self, property: &str) -> Result<&FieldMapping> {
        self.field(property)
            .ok_or_else(|| MapperError::unknown_property(&self.entity_type, property).into())
    }

    pub fn field_by_column(&self, column: &str) -> Option<(usize, &FieldMapping)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, v)| v.column == column)
    }

    pub fn relation(&self, name: &str) -> Result<&RelationDescriptor> {
        self.relations.iter().find(|v| v.name == name).ok_or_else(|| {
            let error = MapperError::UnknownRelation {
                entity_type: self.entity_type.clone(),
                relation: name.into(),
            };
            log::error!("{:#}", error);
            error.into()
        })
    }
}

pub struct EntityMetadataBuilder {
    metadata: EntityMetadata,
}

impl EntityMetadataBuilder {
    /// Field stored in a column with the same name as the property.
    pub fn field(self, property: impl Into<String>, field_type: FieldType) -> Self {
        let property = property.into();
        let column = property.clone();
        self.field_column(property, column, field_type)
    }

    pub fn field_column(
        mut self,
        property: impl Into<String>,
        column: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        self.metadata.fields.push(FieldMapping {
            property: property.into(),
            column: column.into(),
            field_type,
        });
        self
    }

    pub fn relation(
        mut self,
        name: impl Into<String>,
        kind: RelationKind,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
        side: RelationSide,
    ) -> Self {
        self.metadata.relations.push(RelationDescriptor {
            name: name.into(),
            kind,
            target: target.into(),
            foreign_key: foreign_key.into(),
            side,
        });
        self
    }

    pub fn build(self) -> Result<EntityMetadata> {
        let metadata = self.metadata;
        let invalid = |message: String| -> Error {
            let error = MapperError::invalid_metadata(&metadata.entity_type, message);
            log::error!("{:#}", error);
            error.into()
        };
        if metadata.table.is_empty() {
            return Err(invalid("the table name is empty".into()));
        }
        if metadata.field(&metadata.id_property).is_none() {
            return Err(invalid(format!(
                "the id property `{}` is not a mapped field",
                metadata.id_property
            )));
        }
        for (i, field) in metadata.fields.iter().enumerate() {
            let previous = &metadata.fields[..i];
            if previous.iter().any(|v| v.property == field.property) {
                return Err(invalid(format!(
                    "the property `{}` is mapped twice",
                    field.property
                )));
            }
            if previous.iter().any(|v| v.column == field.column) {
                return Err(invalid(format!(
                    "the column `{}` is mapped twice",
                    field.column
                )));
            }
        }
        for (i, relation) in metadata.relations.iter().enumerate() {
            if metadata.relations[..i]
                .iter()
                .any(|v| v.name == relation.name)
                || metadata.field(&relation.name).is_some()
            {
                return Err(invalid(format!(
                    "the relation name `{}` is already used",
                    relation.name
                )));
            }
            if relation.foreign_key.is_empty() {
                return Err(invalid(format!(
                    "the relation `{}` has no foreign key",
                    relation.name
                )));
            }
            if relation.side == RelationSide::Source
                && metadata.field_by_column(&relation.foreign_key).is_none()
            {
                return Err(invalid(format!(
                    "the foreign key `{}` of the relation `{}` is not a mapped column",
                    relation.foreign_key, relation.name
                )));
            }
        }
        Ok(metadata)
    }
}

/// Shared, read only set of entity metadata keyed by entity type.
#[derive(Debug, Default, Clone)]
pub struct MetadataRegistry {
    entities: HashMap<String, Arc<EntityMetadata>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, metadata: EntityMetadata) -> Result<Arc<EntityMetadata>> {
        let entity_type = metadata.entity_type.clone();
        if self.entities.contains_key(&entity_type) {
            return Err(MapperError::invalid_metadata(&entity_type, "registered twice").into());
        }
        let metadata = Arc::new(metadata);
        self.entities.insert(entity_type, metadata.clone());
        Ok(metadata)
    }

    /// Builder style [`MetadataRegistry::register`].
    pub fn with(mut self, metadata: EntityMetadata) -> Result<Self> {
        self.register(metadata)?;
        Ok(self)
    }

    pub fn get(&self, entity_type: &str) -> Result<Arc<EntityMetadata>> {
        self.entities.get(entity_type).cloned().ok_or_else(|| {
            let error = MapperError::UnknownEntityType(entity_type.into());
            log::error!("{:#}", error);
            error.into()
        })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Checks that every relation targets a registered entity type.
    pub fn validate(&self) -> Result<()> {
        for metadata in self.entities.values() {
            for relation in &metadata.relations {
                if !self.entities.contains_key(&relation.target) {
                    return Err(MapperError::invalid_metadata(
                        &metadata.entity_type,
                        format!(
                            "the relation `{}` targets the unknown entity type `{}`",
                            relation.name, relation.target
                        ),
                    )
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Builds a validated registry from a document mapping entity types to declarations.
    pub fn from_declarations(declarations: RegistryDeclaration) -> Result<Self> {
        let mut registry = Self::new();
        for (entity_type, declaration) in declarations.0.0 {
            registry.register(EntityMetadata::from_declaration(entity_type, declaration)?)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let declarations: RegistryDeclaration = serde_json::from_str(json)
            .map_err(|e| MapperError::Config(e.to_string()))
            .context("While parsing the metadata declarations")?;
        Self::from_declarations(declarations)
    }
}

/// Declarative mapping of one entity type, as found in metadata files.
///
/// ```json
/// {
///     "table": "users",
///     "id": "id",
///     "fields": {
///         "id": { "type": "int" },
///         "name": { "type": "string", "column": "username" }
///     },
///     "relations": {
///         "posts": { "kind": "many", "target": "Post", "foreignKey": "author_id" }
///     }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct EntityDeclaration {
    pub table: String,
    pub id: String,
    pub fields: Ordered<FieldDeclaration>,
    #[serde(default)]
    pub relations: Ordered<RelationDeclaration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDeclaration {
    #[serde(rename = "type")]
    pub field_type: String,
    pub column: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDeclaration {
    pub kind: RelationKind,
    pub target: String,
    pub foreign_key: String,
    #[serde(default)]
    pub side: RelationSide,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RegistryDeclaration(pub Ordered<EntityDeclaration>);

/// Map keeping the declaration order of its entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordered<T>(pub Vec<(String, T)>);

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Ordered<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor<T>(PhantomData<T>);
        impl<'de, T: Deserialize<'de>> de::Visitor<'de> for OrderedVisitor<T> {
            type Value = Ordered<T>;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map")
            }
            fn visit_map<A: de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((k, v)) = map.next_entry::<String, T>()? {
                    if entries.iter().any(|(e, _)| *e == k) {
                        return Err(de::Error::custom(format!("duplicate key `{}`", k)));
                    }
                    entries.push((k, v));
                }
                Ok(Ordered(entries))
            }
        }
        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}
