#[cfg(test)]
mod tests {
    use strata::{Entity, Hydrated, MapperError, Value};

    #[derive(Default, Debug, Entity)]
    struct Comment {
        id: Hydrated<i64>,
        author_id: Hydrated<i64>,
        body: Hydrated<Option<String>>,
    }

    #[derive(Default, Debug, Entity)]
    #[entity_type("Thread")]
    struct DiscussionThread {
        id: Hydrated<i64>,
        #[property_name("title_text")]
        title: Hydrated<String>,
        #[relation]
        comments: Hydrated<Vec<Comment>>,
        #[relation("pinned")]
        pinned_comment: Hydrated<Option<Comment>>,
        #[ignored]
        #[allow(dead_code)]
        cache: Vec<u8>,
    }

    #[test]
    fn names() {
        assert_eq!(Comment::ENTITY_TYPE, "Comment");
        assert_eq!(Comment::PROPERTIES, ["id", "authorId", "body"]);
        assert!(Comment::RELATIONS.is_empty());

        assert_eq!(DiscussionThread::ENTITY_TYPE, "Thread");
        assert_eq!(DiscussionThread::PROPERTIES, ["id", "title_text"]);
        assert_eq!(DiscussionThread::RELATIONS, ["comments", "pinned"]);
    }

    #[test]
    fn fields() {
        let mut comment = Comment::default();
        comment.set_field("authorId", Value::Int64(7)).unwrap();
        comment.set_field("body", Value::Null).unwrap();
        assert_eq!(comment.author_id, Hydrated::Set(7));
        assert_eq!(comment.field("body").unwrap(), Value::Null);

        let error = comment.field("id").unwrap_err();
        assert_eq!(
            MapperError::of(&error),
            Some(&MapperError::unhydrated("Comment", "id"))
        );
        let error = comment.set_field("author_id", Value::Int64(1)).unwrap_err();
        assert_eq!(
            MapperError::of(&error),
            Some(&MapperError::unknown_property("Comment", "author_id"))
        );
        assert!(comment.set_field("authorId", "seven".into()).is_err());
    }

    #[test]
    fn relations() {
        let mut thread = DiscussionThread::default();
        thread.set_relation("comments", Vec::new()).unwrap();
        assert!(matches!(&thread.comments, Hydrated::Set(v) if v.is_empty()));
        thread.set_relation("pinned", Vec::new()).unwrap();
        assert!(matches!(thread.pinned_comment, Hydrated::Set(None)));
        let error = thread.set_relation("cache", Vec::new()).unwrap_err();
        assert!(matches!(
            MapperError::of(&error),
            Some(MapperError::UnknownRelation { relation, .. }) if relation == "cache"
        ));
        let error = thread.field("comments").unwrap_err();
        assert!(matches!(
            MapperError::of(&error),
            Some(MapperError::UnknownProperty { .. })
        ));
    }
}
