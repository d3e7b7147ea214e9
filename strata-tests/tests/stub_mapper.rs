#[cfg(test)]
mod tests {
    use indoc::indoc;
    use strata::{EntityMapper, Hydrated, MapperError, Row, RowsAffected, Value};
    use strata_tests::{
        Post, Response, StubConnection, StubDriver, User, init_logs, registry, silent_logs,
    };

    fn users() -> EntityMapper<User, StubDriver> {
        EntityMapper::new(StubDriver::new(), registry()).unwrap()
    }

    fn posts() -> EntityMapper<Post, StubDriver> {
        EntityMapper::new(StubDriver::new(), registry()).unwrap()
    }

    fn user_row(id: i64, name: &str, email: Option<&str>) -> Row {
        Row::new()
            .with("id", id)
            .with("username", name)
            .with("email", email.map(ToString::to_string))
            .with("password", Value::Null)
    }

    fn post_row(id: i64, author_id: Option<i64>, title: &str) -> Row {
        Row::new()
            .with("id", id)
            .with("author_id", author_id)
            .with("title", title)
    }

    #[test]
    fn round_trip() {
        let users = users();
        let row = user_row(1, "alice", Some("a@x"));
        let user = users.create_entity(&row).unwrap();
        assert_eq!(user.name, Hydrated::Set("alice".to_string()));
        assert_eq!(users.extract(&user).unwrap(), row);
        assert_eq!(users.table(), "users");
    }

    #[test]
    fn partial_hydration() {
        let users = users();
        let user = users
            .create_entity(&Row::new().with("id", 1).with("email", Value::Null))
            .unwrap();
        assert_eq!(users.get_field(&user, "email").unwrap(), Value::Null);
        let error = users.get_field(&user, "password").unwrap_err();
        assert_eq!(
            MapperError::of(&error),
            Some(&MapperError::unhydrated("User", "password"))
        );
    }

    #[tokio::test]
    async fn update_writes_the_change_set() {
        init_logs();
        let mut users = users();
        let mut connection = StubConnection::new();
        connection.respond_rows([user_row(7, "alice", Some("a@x"))]);
        let mut user = users.find(&mut connection, 7).await.unwrap().unwrap();
        assert_eq!(
            connection.last_statement().unwrap().sql,
            indoc! {r#"
                SELECT *
                FROM "users"
                WHERE "id" = ?
                LIMIT 1"#}
        );

        user.email.set(Some("alice@strata.dev".into()));
        assert_eq!(
            users.unit_of_work().change_set(&user).unwrap(),
            Row::new().with("email", "alice@strata.dev")
        );
        let result = users.update(&mut connection, &user).await.unwrap();
        assert_eq!(result, RowsAffected { rows_affected: 1 });
        let statement = connection.last_statement().unwrap();
        assert_eq!(
            statement.sql,
            indoc! {r#"
                UPDATE "users" SET "email" = ?
                WHERE "id" = ?"#}
        );
        assert_eq!(
            statement.params,
            [Value::from("alice@strata.dev"), Value::Int64(7)]
        );
        assert!(users.unit_of_work().change_set(&user).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unchanged_update_sends_nothing() {
        let mut users = users();
        let mut connection = StubConnection::new();
        connection.respond_rows([user_row(7, "alice", None)]);
        let user = users.find(&mut connection, 7).await.unwrap().unwrap();
        let sent = connection.statements().len();
        let result = users.update(&mut connection, &user).await.unwrap();
        assert_eq!(result.rows_affected, 0);
        assert_eq!(connection.statements().len(), sent);
    }

    #[tokio::test]
    async fn untracked_update_fails() {
        let mut users = users();
        let mut connection = StubConnection::new();
        silent_logs! {
            let error = users
                .update(&mut connection, &User::new(1, "ghost", None))
                .await
                .unwrap_err();
            assert!(matches!(
                MapperError::of(&error),
                Some(MapperError::UntrackedEntity(..))
            ));
        }
        assert!(connection.statements().is_empty());
    }

    #[tokio::test]
    async fn relations_load_in_one_query() {
        let mut users = users();
        let mut connection = StubConnection::new();
        connection.respond_rows([
            user_row(1, "alice", None),
            user_row(2, "bob", None),
            user_row(3, "carol", None),
        ]);
        let mut all = users.find_all(&mut connection).await.unwrap();
        connection.reset();
        connection.respond_rows([
            post_row(10, Some(1), "first"),
            post_row(11, Some(3), "second"),
            post_row(12, Some(1), "third"),
        ]);
        users
            .load_relations(&mut connection, &mut all, &["posts"])
            .await
            .unwrap();
        assert_eq!(connection.statements().len(), 1);
        let statement = &connection.statements()[0];
        assert_eq!(
            statement.sql,
            indoc! {r#"
                SELECT *
                FROM "posts"
                WHERE "author_id" IN (?, ?, ?)"#}
        );
        assert_eq!(statement.params, [Value::Int64(1), Value::Int64(2), Value::Int64(3)]);
        let titles = |user: &User| -> Vec<String> {
            user.posts
                .get()
                .unwrap()
                .iter()
                .map(|v| v.title.get().unwrap().clone())
                .collect()
        };
        assert_eq!(titles(&all[0]), ["first", "third"]);
        assert!(titles(&all[1]).is_empty());
        assert_eq!(titles(&all[2]), ["second"]);
        assert_eq!(all[0].id, Hydrated::Set(1));
    }

    #[tokio::test]
    async fn related_entities_can_be_updated() {
        let mut users = users();
        let mut posts = EntityMapper::<Post, _>::with_unit_of_work(
            StubDriver::new(),
            registry(),
            users.shared_unit_of_work(),
        )
        .unwrap();
        let mut connection = StubConnection::new();
        connection.respond_rows([user_row(1, "alice", None)]);
        let mut all = users.find_all(&mut connection).await.unwrap();
        connection.respond_rows([
            post_row(10, Some(1), "first"),
            post_row(11, Some(1), "second"),
        ]);
        users
            .load_relations(&mut connection, &mut all, &["posts"])
            .await
            .unwrap();
        assert_eq!(users.unit_of_work().len(), 3);
        assert_eq!(posts.unit_of_work().len(), 3);

        let mut post = all[0].posts.take().unwrap().remove(0);
        post.title.set("edited".into());
        let result = posts.update(&mut connection, &post).await.unwrap();
        assert_eq!(result.rows_affected, 1);
        let statement = connection.last_statement().unwrap();
        assert_eq!(
            statement.sql,
            indoc! {r#"
                UPDATE "posts" SET "title" = ?
                WHERE "id" = ?"#}
        );
        assert_eq!(statement.params, [Value::from("edited"), Value::Int64(10)]);
        assert!(posts.unit_of_work().change_set(&post).unwrap().is_empty());
    }

    #[tokio::test]
    async fn belongs_to() {
        let posts = posts();
        let mut connection = StubConnection::new();
        let mut all = vec![
            Post::new(10, Some(1), "first"),
            Post::new(11, None, "orphan"),
            Post::new(12, Some(1), "third"),
        ];
        connection.respond_rows([user_row(1, "alice", None)]);
        posts
            .load_relations(&mut connection, &mut all, &["author"])
            .await
            .unwrap();
        let statement = connection.last_statement().unwrap();
        assert_eq!(
            statement.sql,
            indoc! {r#"
                SELECT *
                FROM "users"
                WHERE "id" IN (?)"#}
        );
        let author = |post: &Post| post.author.get().unwrap().as_ref().map(|v| v.name.clone());
        assert_eq!(author(&all[0]), Some(Hydrated::Set("alice".into())));
        assert_eq!(author(&all[1]), None);
        assert_eq!(author(&all[2]), Some(Hydrated::Set("alice".into())));
    }

    #[tokio::test]
    async fn no_keys_no_query() {
        let posts = posts();
        let mut connection = StubConnection::new();
        let mut orphans = vec![Post::new(1, None, "a"), Post::new(2, None, "b")];
        posts
            .load_relations(&mut connection, &mut orphans, &["author"])
            .await
            .unwrap();
        assert!(connection.statements().is_empty());
        assert!(orphans.iter().all(|v| v.author == Hydrated::Set(None)));

        let users = users();
        users
            .load_relations(&mut connection, &mut Vec::<User>::new(), &["posts"])
            .await
            .unwrap();
        assert!(connection.statements().is_empty());
    }

    #[tokio::test]
    async fn relation_errors() {
        let users = users();
        let mut connection = StubConnection::new();
        let mut all = vec![User::new(1, "alice", None)];
        silent_logs! {
            let error = users
                .load_relations(&mut connection, &mut all, &["comments"])
                .await
                .unwrap_err();
            assert!(matches!(
                MapperError::of(&error),
                Some(MapperError::UnknownRelation { relation, .. }) if relation == "comments"
            ));
            let mut unidentified = vec![User::default()];
            let error = users
                .load_relations(&mut connection, &mut unidentified, &["posts"])
                .await
                .unwrap_err();
            assert_eq!(
                MapperError::of(&error),
                Some(&MapperError::unhydrated("User", "id"))
            );
        }
        assert!(connection.statements().is_empty());
    }

    #[tokio::test]
    async fn batch_insert_is_atomic() {
        let mut users = users();
        let mut connection = StubConnection::new();
        users.queue_insert(&User::new(1, "alice", None)).unwrap();
        users.queue_insert(&User::new(2, "bob", Some("b@x"))).unwrap();
        connection.respond(Response::Fail("duplicate key".into()));
        silent_logs! {
            assert!(users.execute_insert(&mut connection).await.is_err());
        }
        assert_eq!(connection.statements().len(), 1);
        assert!(connection.committed().is_empty());
        assert_eq!(connection.rollbacks(), 1);
        assert_eq!(users.queued(), 2);

        connection.respond(Response::Affected(2));
        let result = users.execute_insert(&mut connection).await.unwrap();
        assert_eq!(result.rows_affected, 2);
        assert_eq!(connection.commits(), 1);
        assert_eq!(users.queued(), 0);
        let statement = &connection.committed()[0];
        assert_eq!(
            statement.sql,
            indoc! {r#"
                INSERT INTO "users" ("id", "username", "email", "password") VALUES
                (?, ?, ?, ?),
                (?, ?, ?, ?)"#}
        );
        assert_eq!(statement.params.len(), 8);
    }

    #[tokio::test]
    async fn insert_tracks_the_entity() {
        let mut users = users();
        let mut connection = StubConnection::new();
        users.queue_insert(&User::new(1, "alice", None)).unwrap();
        let mut bob = User::new(2, "bob", None);
        users.insert(&mut connection, &bob).await.unwrap();
        assert_eq!(connection.commits(), 1);
        assert_eq!(connection.committed().len(), 1);
        assert_eq!(users.queued(), 1);
        assert!(users.unit_of_work().is_tracked(&bob));
        bob.name.set("robert".into());
        assert_eq!(
            users.unit_of_work().change_set(&bob).unwrap(),
            Row::new().with("username", "robert")
        );
    }

    #[tokio::test]
    async fn guard_rails() {
        let mut users = users();
        let mut connection = StubConnection::new();
        silent_logs! {
            let error = users.execute_insert(&mut connection).await.unwrap_err();
            assert_eq!(MapperError::of(&error), Some(&MapperError::EmptyBatch));
            let error = users.query(None).delete(&mut connection).await.unwrap_err();
            assert_eq!(
                MapperError::of(&error),
                Some(&MapperError::NoPredicate("DELETE"))
            );
            let error = users
                .query(None)
                .update(&mut connection, &Row::new().with("email", "x"))
                .await
                .unwrap_err();
            assert_eq!(
                MapperError::of(&error),
                Some(&MapperError::NoPredicate("UPDATE"))
            );
        }
        assert!(connection.statements().is_empty());
    }

    #[tokio::test]
    async fn delete_detaches() {
        let mut users = users();
        let mut connection = StubConnection::new();
        connection.respond_rows([user_row(4, "dave", None)]);
        let user = users.find(&mut connection, 4).await.unwrap().unwrap();
        assert!(users.unit_of_work().is_tracked(&user));
        users.delete(&mut connection, &user).await.unwrap();
        assert_eq!(
            connection.last_statement().unwrap().sql,
            "DELETE FROM \"users\"\nWHERE \"id\" = ?"
        );
        assert!(!users.unit_of_work().is_tracked(&user));
    }
}
