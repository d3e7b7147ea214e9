use crate::{Post, User, registry};
use strata::{
    Connection, EntityMapper, Hydrated, MapperError, Order, Result, Row, Statement,
};

pub(crate) async fn setup<C: Connection>(connection: &mut C) -> Result<()> {
    for sql in [
        "DROP TABLE IF EXISTS posts",
        "DROP TABLE IF EXISTS users",
        "CREATE TABLE users (id BIGINT PRIMARY KEY, username VARCHAR(64) NOT NULL, email VARCHAR(128), password VARCHAR(128))",
        "CREATE TABLE posts (id BIGINT PRIMARY KEY, author_id BIGINT, title TEXT NOT NULL)",
    ] {
        connection.execute(Statement::from(sql)).await?;
    }
    Ok(())
}

pub(crate) async fn crud<C: Connection>(connection: &mut C) -> Result<()> {
    let driver = connection.driver().clone();
    let mut users = EntityMapper::<User, _>::new(driver, registry())?;
    users
        .insert(connection, &User::new(1, "alice", Some("alice@example.com")))
        .await?;
    users
        .insert(connection, &User::new(2, "bob", None))
        .await?;

    let mut alice = users
        .find(connection, 1)
        .await?
        .expect("alice was just inserted");
    assert_eq!(alice.name, Hydrated::Set("alice".to_string()));
    assert_eq!(alice.password, Hydrated::Set(None));
    assert!(users.find(connection, 99).await?.is_none());

    alice.email.set(Some("alice@strata.dev".into()));
    assert_eq!(
        users.unit_of_work().change_set(&alice)?,
        Row::new().with("email", "alice@strata.dev")
    );
    let updated = users.update(connection, &alice).await?;
    assert_eq!(updated.rows_affected, 1);
    assert_eq!(users.update(connection, &alice).await?.rows_affected, 0);

    let rows = users
        .query(None)
        .select(["username"])
        .where_eq("email", strata::Value::Null)
        .get(connection)
        .await?;
    assert_eq!(rows, [Row::new().with("username", "bob")]);

    let bob = users.find(connection, 2).await?.expect("bob exists");
    assert_eq!(users.delete(connection, &bob).await?.rows_affected, 1);
    let all = users.find_all(connection).await?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].email, Hydrated::Set(Some("alice@strata.dev".into())));
    Ok(())
}

pub(crate) async fn relations<C: Connection>(connection: &mut C) -> Result<()> {
    let driver = connection.driver().clone();
    let mut users = EntityMapper::<User, _>::new(driver.clone(), registry())?;
    let mut posts = EntityMapper::<Post, _>::new(driver, registry())?;
    users.insert(connection, &User::new(3, "carol", None)).await?;
    for post in [
        Post::new(10, Some(1), "first"),
        Post::new(11, Some(3), "second"),
        Post::new(12, Some(1), "third"),
        Post::new(13, None, "orphan"),
    ] {
        posts.queue_insert(&post)?;
    }
    posts.execute_insert(connection).await?;

    let mut authors = users.find_all(connection).await?;
    users
        .load_relations(connection, &mut authors, &["posts"])
        .await?;
    authors.sort_by_key(|v| v.id.get().copied());
    let titles = |user: &User| -> Vec<String> {
        let mut result: Vec<_> = user
            .posts
            .get()
            .map(|v| v.iter().filter_map(|p| p.title.get().cloned()).collect())
            .unwrap_or_default();
        result.sort();
        result
    };
    assert_eq!(titles(&authors[0]), ["first", "third"]);
    assert_eq!(titles(&authors[1]), ["second"]);

    let mut all = posts.find_all(connection).await?;
    posts.load_relations(connection, &mut all, &["author"]).await?;
    for post in &all {
        let author = post.author.get().expect("author relation loaded");
        match post.author_id.get() {
            Some(Some(id)) => assert_eq!(author.as_ref().and_then(|v| v.id.get()), Some(id)),
            _ => assert!(author.is_none()),
        }
    }

    let error = users
        .load_relations(connection, &mut authors, &["comments"])
        .await
        .expect_err("comments is not a relation of User");
    assert!(matches!(
        MapperError::of(&error),
        Some(MapperError::UnknownRelation { .. })
    ));
    Ok(())
}

pub(crate) async fn batch<C: Connection>(connection: &mut C) -> Result<()> {
    let driver = connection.driver().clone();
    let mut posts = EntityMapper::<Post, _>::new(driver, registry())?;
    posts.queue_insert(&Post::new(20, Some(1), "kept"))?;
    // Duplicated primary key, the whole batch must be rolled back
    posts.queue_insert(&Post::new(10, Some(1), "duplicated"))?;
    assert!(posts.execute_insert(connection).await.is_err());
    assert_eq!(posts.queued(), 2);
    assert!(posts.find(connection, 20).await?.is_none());

    let error = posts
        .query(None)
        .delete(connection)
        .await
        .expect_err("delete without predicates");
    assert_eq!(
        MapperError::of(&error),
        Some(&MapperError::NoPredicate("DELETE"))
    );
    let rows = posts
        .query(Some("p"))
        .where_in("p.id", [10, 11, 12])
        .order_by("p.id", Order::Desc)
        .limit(2)
        .get(connection)
        .await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("id"), Some(&12.into()));
    Ok(())
}
