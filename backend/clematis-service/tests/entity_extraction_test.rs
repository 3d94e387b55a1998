//! Entity extraction against an in-memory directory

mod common;

use common::InMemoryStore;

use clematis_service::models::Entity;
use clematis_service::services::entities::extract;

#[tokio::test]
async fn test_mentions_precede_tags_and_counters_move() {
    let store = InMemoryStore::new();
    store.add_user(42, "bob");

    let mut directory = store.directory();
    let first = extract(&mut directory, "hello @bob #vine and #loops").await.unwrap();

    assert_eq!(
        first,
        vec![
            Entity::mention(42, "bob", [6, 10]),
            Entity::tag("vine", [11, 16]),
            Entity::tag("loops", [21, 27]),
        ]
    );
    assert_eq!(store.tag_count("vine"), Some(1));
    assert_eq!(store.tag_count("loops"), Some(1));

    extract(&mut directory, "#vine again").await.unwrap();
    extract(&mut directory, "and #vine").await.unwrap();
    assert_eq!(store.tag_count("vine"), Some(3));
    assert_eq!(store.tag_count("loops"), Some(1));
}

#[tokio::test]
async fn test_repeated_tag_in_one_description_counts_each_occurrence() {
    let store = InMemoryStore::new();
    let mut directory = store.directory();

    let entities = extract(&mut directory, "#a #a").await.unwrap();
    assert_eq!(entities, vec![Entity::tag("a", [0, 2]), Entity::tag("a", [3, 5])]);
    assert_eq!(store.tag_count("a"), Some(2));
}

#[tokio::test]
async fn test_unknown_mentions_resolve_to_zero() {
    let store = InMemoryStore::new();
    let mut directory = store.directory();

    let entities = extract(&mut directory, "@ghost").await.unwrap();
    assert_eq!(entities, vec![Entity::mention(0, "ghost", [0, 6])]);
}

#[tokio::test]
async fn test_plain_text_has_no_entities() {
    let store = InMemoryStore::new();
    let mut directory = store.directory();

    assert!(extract(&mut directory, "").await.unwrap().is_empty());
    assert!(extract(&mut directory, "no tags # here @ all").await.unwrap().is_empty());
    assert_eq!(store.tag_count(""), None);
}

#[tokio::test]
async fn test_directory_failure_is_transient() {
    let store = InMemoryStore::new();
    store.fail_all();
    let mut directory = store.directory();

    let err = extract(&mut directory, "#vine").await.unwrap_err();
    assert!(err.is_retryable());
}
