use std::sync::{Arc, LazyLock};
use strata::{Entity, Hydrated, MetadataRegistry};

#[derive(Default, Debug, Clone, PartialEq, Entity)]
pub struct User {
    pub id: Hydrated<i64>,
    pub name: Hydrated<String>,
    pub email: Hydrated<Option<String>>,
    pub password: Hydrated<Option<String>>,
    #[relation]
    pub posts: Hydrated<Vec<Post>>,
}

#[derive(Default, Debug, Clone, PartialEq, Entity)]
pub struct Post {
    pub id: Hydrated<i64>,
    pub author_id: Hydrated<Option<i64>>,
    pub title: Hydrated<String>,
    #[relation]
    pub author: Hydrated<Option<User>>,
}

impl User {
    pub fn new(id: i64, name: &str, email: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.to_string().into(),
            email: email.map(ToString::to_string).into(),
            password: None.into(),
            ..Default::default()
        }
    }
}

impl Post {
    pub fn new(id: i64, author_id: Option<i64>, title: &str) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            title: title.to_string().into(),
            ..Default::default()
        }
    }
}

pub const METADATA: &str = r#"{
    "User": {
        "table": "users",
        "id": "id",
        "fields": {
            "id": { "type": "int" },
            "name": { "type": "string", "column": "username" },
            "email": { "type": "string" },
            "password": { "type": "string" }
        },
        "relations": {
            "posts": { "kind": "many", "target": "Post", "foreignKey": "author_id" }
        }
    },
    "Post": {
        "table": "posts",
        "id": "id",
        "fields": {
            "id": { "type": "int" },
            "authorId": { "type": "bigint", "column": "author_id" },
            "title": { "type": "text" }
        },
        "relations": {
            "author": { "kind": "one", "target": "User", "foreignKey": "author_id", "side": "source" }
        }
    }
}"#;

/// Registry mapping [`User`] and [`Post`].
pub fn registry() -> Arc<MetadataRegistry> {
    static REGISTRY: LazyLock<Arc<MetadataRegistry>> = LazyLock::new(|| {
        Arc::new(MetadataRegistry::from_json(METADATA).expect("The fixture metadata is valid"))
    });
    REGISTRY.clone()
}
