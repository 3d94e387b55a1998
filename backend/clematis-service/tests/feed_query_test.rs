//! Integration Tests: Feed Queries
//!
//! Runs the candidate query of every feed kind against PostgreSQL through
//! `PgFeedRepository` and `FeedAssembler`.
//!
//! Coverage:
//! - Home/Popular/Promoted/Profile/Search base predicates and orderings
//! - Removed posts, blocks in either direction and banned authors
//! - Escaped, case-insensitive search
//! - Consecutive pages are disjoint and follow the unpaginated order
//!
//! Architecture:
//! - Uses testcontainers for PostgreSQL database
//! - Needs a Docker daemon, so every test is `#[ignore]`d by default

mod common;

use common::postgres::{ban, block, create_post, create_user, follow, promote, remove, setup_test_db};
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use clematis_service::db::like_repo::create_like;
use clematis_service::db::{PgFeedRepository, PgSocialGraph};
use clematis_service::models::{FeedRow, PostId, UserId};
use clematis_service::services::feed::{CandidateQuery, FeedAssembler, FeedRepository, FeedScope};
use clematis_service::services::pagination::{PageCursor, PAGE_SIZE};
use clematis_service::services::visibility::is_visible;

struct Cast {
    viewer: UserId,
    alice: UserId,
    bob: UserId,
    carol: UserId,
}

async fn cast(pool: &PgPool) -> Cast {
    Cast {
        viewer: create_user(pool, "viewer").await,
        alice: create_user(pool, "alice").await,
        bob: create_user(pool, "bob").await,
        carol: create_user(pool, "carol").await,
    }
}

async fn candidates(repo: &PgFeedRepository, scope: FeedScope, viewer: UserId, limit: i64, offset: i64) -> Vec<FeedRow> {
    let query = CandidateQuery {
        scope: &scope,
        viewer,
        limit,
        offset,
    };
    repo.candidate_rows(&query).await.unwrap()
}

async fn ids(repo: &PgFeedRepository, scope: FeedScope, viewer: UserId) -> Vec<PostId> {
    candidates(repo, scope, viewer, 100, 0)
        .await
        .into_iter()
        .map(|row| row.id)
        .collect()
}

#[tokio::test]
#[ignore] // Run manually: cargo test --test feed_query_test -- --ignored
async fn test_home_holds_only_followed_authors_newest_first() {
    let db = setup_test_db().await;
    let c = cast(&db.pool).await;
    let repo = PgFeedRepository::new(db.pool.clone());

    assert!(ids(&repo, FeedScope::Home, c.viewer).await.is_empty());

    create_post(&db.pool, 10, c.alice, "first", 1).await;
    create_post(&db.pool, 11, c.bob, "unfollowed", 2).await;
    create_post(&db.pool, 12, c.alice, "second", 3).await;
    create_post(&db.pool, 13, c.viewer, "own", 4).await;
    assert!(ids(&repo, FeedScope::Home, c.viewer).await.is_empty());

    follow(&db.pool, c.viewer, c.alice).await;
    follow(&db.pool, c.bob, c.carol).await;
    assert_eq!(ids(&repo, FeedScope::Home, c.viewer).await, vec![12, 10]);
}

#[tokio::test]
#[ignore]
async fn test_popular_orders_by_likes_with_id_tiebreak() {
    let db = setup_test_db().await;
    let c = cast(&db.pool).await;
    let repo = PgFeedRepository::new(db.pool.clone());

    create_post(&db.pool, 20, c.alice, "two likes", 1).await;
    create_post(&db.pool, 21, c.bob, "no likes", 2).await;
    create_post(&db.pool, 22, c.carol, "one like", 3).await;
    create_post(&db.pool, 23, c.alice, "no likes either", 0).await;

    create_like(&db.pool, 20, c.bob).await.unwrap();
    create_like(&db.pool, 20, c.viewer).await.unwrap();
    create_like(&db.pool, 22, c.alice).await.unwrap();

    let rows = candidates(&repo, FeedScope::Popular, c.viewer, 100, 0).await;
    let order: Vec<(PostId, i64)> = rows.iter().map(|r| (r.id, r.like_count)).collect();
    assert_eq!(order, vec![(20, 2), (22, 1), (23, 0), (21, 0)]);

    assert!(rows.windows(2).all(|w| w[0].like_count >= w[1].like_count));
    assert!(rows[0].liked, "viewer liked post 20");
    assert!(!rows[1].liked);
}

#[tokio::test]
#[ignore]
async fn test_promoted_and_profile_predicates() {
    let db = setup_test_db().await;
    let c = cast(&db.pool).await;
    let repo = PgFeedRepository::new(db.pool.clone());

    create_post(&db.pool, 30, c.alice, "plain", 1).await;
    create_post(&db.pool, 31, c.bob, "featured", 2).await;
    create_post(&db.pool, 32, c.alice, "also featured", 3).await;
    promote(&db.pool, 31).await;
    promote(&db.pool, 32).await;

    assert_eq!(ids(&repo, FeedScope::Promoted, c.viewer).await, vec![32, 31]);
    assert_eq!(
        ids(&repo, FeedScope::Profile { target: c.alice }, c.viewer).await,
        vec![32, 30]
    );
    assert!(ids(&repo, FeedScope::Profile { target: c.carol }, c.viewer)
        .await
        .is_empty());
}

#[tokio::test]
#[ignore]
async fn test_search_is_case_insensitive_and_escaped() {
    let db = setup_test_db().await;
    let c = cast(&db.pool).await;
    let repo = PgFeedRepository::new(db.pool.clone());

    create_post(&db.pool, 40, c.alice, "Cats on a skateboard", 1).await;
    create_post(&db.pool, 41, c.bob, "dogs only", 2).await;
    create_post(&db.pool, 42, c.carol, "50% off cats", 3).await;
    create_post(&db.pool, 43, c.alice, "500 off", 4).await;
    create_post(&db.pool, 44, c.bob, "snake_case", 5).await;
    create_post(&db.pool, 45, c.carol, "snakeXcase", 6).await;

    let search = |q: &str| FeedScope::Search { query: q.to_string() };

    assert_eq!(ids(&repo, search("CATS"), c.viewer).await, vec![42, 40]);
    assert_eq!(ids(&repo, search("50%"), c.viewer).await, vec![42]);
    assert_eq!(ids(&repo, search("snake_case"), c.viewer).await, vec![44]);
    assert_eq!(ids(&repo, search(""), c.viewer).await.len(), 6);
}

#[tokio::test]
#[ignore]
async fn test_exclusions_apply_to_every_kind() {
    let db = setup_test_db().await;
    let c = cast(&db.pool).await;
    let dave = create_user(&db.pool, "dave").await;
    let erin = create_user(&db.pool, "erin").await;
    let repo = PgFeedRepository::new(db.pool.clone());

    // alice: visible, bob: blocked by viewer, carol: blocked the viewer,
    // dave: banned, erin: visible author with one removed post
    for author in [c.alice, c.bob, c.carol, dave, erin] {
        follow(&db.pool, c.viewer, author).await;
    }
    for (id, author) in [(50, c.alice), (51, c.bob), (52, c.carol), (53, dave), (54, erin), (55, erin)] {
        create_post(&db.pool, id, author, "moderation check", id).await;
        promote(&db.pool, id).await;
    }
    block(&db.pool, c.viewer, c.bob).await;
    block(&db.pool, c.carol, c.viewer).await;
    ban(&db.pool, dave).await;
    remove(&db.pool, 55).await;

    let expected: HashSet<PostId> = [50, 54].into_iter().collect();
    for scope in [
        FeedScope::Home,
        FeedScope::Popular,
        FeedScope::Promoted,
        FeedScope::Search { query: "moderation".to_string() },
    ] {
        let got: HashSet<PostId> = ids(&repo, scope.clone(), c.viewer).await.into_iter().collect();
        assert_eq!(got, expected, "{:?}", scope);
    }

    for (target, visible) in [(c.alice, true), (c.bob, false), (c.carol, false), (dave, false)] {
        let got = ids(&repo, FeedScope::Profile { target }, c.viewer).await;
        assert_eq!(!got.is_empty(), visible, "profile of {}", target);
    }
    assert_eq!(ids(&repo, FeedScope::Profile { target: erin }, c.viewer).await, vec![54]);

    // A third party with no blocks still sees bob and carol.
    let outsider = ids(&repo, FeedScope::Popular, erin).await;
    assert!(outsider.contains(&51) && outsider.contains(&52));
    assert!(!outsider.contains(&53) && !outsider.contains(&55));

    // The single-post check reads the same tables.
    let graph = PgSocialGraph::new(db.pool.clone());
    assert!(is_visible(&graph, c.viewer, c.alice, false).await.unwrap());
    assert!(!is_visible(&graph, c.viewer, c.bob, false).await.unwrap());
    assert!(!is_visible(&graph, c.viewer, c.carol, false).await.unwrap());
    assert!(!is_visible(&graph, c.viewer, dave, false).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_consecutive_pages_are_disjoint() {
    let db = setup_test_db().await;
    let c = cast(&db.pool).await;
    let repo = Arc::new(PgFeedRepository::new(db.pool.clone()));

    // Shared timestamps force the id tiebreak to decide the order.
    for id in 100..140 {
        let author = if id % 2 == 0 { c.alice } else { c.bob };
        create_post(&db.pool, id, author, "page fill", id / 4).await;
    }
    for id in (100..140).step_by(3) {
        create_like(&db.pool, id, c.carol).await.unwrap();
    }

    for scope in [
        FeedScope::Popular,
        FeedScope::Profile { target: c.alice },
        FeedScope::Search { query: "page".into() },
    ] {
        let all: Vec<PostId> = candidates(&repo, scope.clone(), c.viewer, 100, 0)
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();

        let mut paged = Vec::new();
        for page in 1..=3 {
            let cursor = PageCursor::new(Some(page));
            let rows = candidates(&repo, scope.clone(), c.viewer, cursor.limit(), cursor.offset()).await;
            assert!(rows.len() as i64 <= PAGE_SIZE);
            paged.extend(rows.into_iter().map(|r| r.id));
        }

        let unique: HashSet<PostId> = paged.iter().copied().collect();
        assert_eq!(unique.len(), paged.len(), "pages overlap for {:?}", scope);
        assert_eq!(paged, all, "{:?}", scope);
    }

    let assembler = FeedAssembler::new(repo, "https://vine.co/v/", Duration::from_secs(5));
    let first = assembler
        .assemble(c.viewer, &FeedScope::Popular, PageCursor::new(Some(1)))
        .await
        .unwrap();
    let second = assembler
        .assemble(c.viewer, &FeedScope::Popular, PageCursor::new(Some(2)))
        .await
        .unwrap();
    assert_eq!(first.records.len() as i64, PAGE_SIZE);
    assert_eq!(second.records.len() as i64, PAGE_SIZE);
    let first_ids: HashSet<PostId> = first.records.iter().map(|r| r.post_id).collect();
    assert!(second.records.iter().all(|r| !first_ids.contains(&r.post_id)));
    // Most liked first, highest id among equals
    assert_eq!(first.records[0].post_id, 139);
    assert_eq!(first.records[0].author.username, "bob");
}
