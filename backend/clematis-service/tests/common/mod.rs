//! In-memory storage for integration tests
//!
//! Implements the feed, social graph, session and entity-directory seams over
//! plain collections so the assembler, the visibility rules and the session
//! guard can be exercised without PostgreSQL. Candidate selection mirrors the
//! SQL in `db::feed_repo`: base predicate, visibility exclusions, ordering
//! with an id tiebreak, then the page window. The SQL itself is covered
//! against a real database through [`postgres`].

#![allow(dead_code)]

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use clematis_service::error::Result as AppResult;
use clematis_service::models::{AuthorRow, FeedRow, PostId, Session, TagUsage, UserId};
use clematis_service::services::entities::EntityDirectory;
use clematis_service::services::feed::{CandidateQuery, FeedRepository, FeedScope};
use clematis_service::services::session::SessionStore;
use clematis_service::services::visibility::SocialGraph;

#[derive(Debug, Clone)]
pub struct StoredPost {
    pub id: PostId,
    pub author: UserId,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub promoted: bool,
    pub removed: bool,
}

#[derive(Default)]
struct State {
    users: HashMap<UserId, String>,
    follows: HashSet<(UserId, UserId)>,
    blocks: HashSet<(UserId, UserId)>,
    bans: HashSet<UserId>,
    posts: Vec<StoredPost>,
    likes: HashSet<(PostId, UserId)>,
    sessions: HashMap<String, Session>,
    tags: HashMap<String, TagUsage>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    failing: AtomicBool,
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: UserId, username: &str) {
        self.state.lock().unwrap().users.insert(id, username.to_string());
    }

    pub fn follow(&self, from: UserId, to: UserId) {
        self.state.lock().unwrap().follows.insert((from, to));
    }

    pub fn block(&self, source: UserId, target: UserId) {
        self.state.lock().unwrap().blocks.insert((source, target));
    }

    pub fn ban(&self, user: UserId) {
        self.state.lock().unwrap().bans.insert(user);
    }

    /// Add a post created `minutes` after a fixed epoch.
    pub fn add_post(&self, id: PostId, author: UserId, minutes: i64) -> StoredPost {
        let post = StoredPost {
            id,
            author,
            description: format!("post {}", id),
            created_at: epoch() + Duration::minutes(minutes),
            promoted: false,
            removed: false,
        };
        self.state.lock().unwrap().posts.push(post.clone());
        post
    }

    pub fn update_post(&self, id: PostId, f: impl FnOnce(&mut StoredPost)) {
        let mut state = self.state.lock().unwrap();
        if let Some(post) = state.posts.iter_mut().find(|p| p.id == id) {
            f(post);
        }
    }

    pub fn like(&self, post: PostId, user: UserId) {
        self.state.lock().unwrap().likes.insert((post, user));
    }

    pub fn add_session(&self, token: &str, user_id: UserId, client: &str) {
        self.state.lock().unwrap().sessions.insert(
            token.to_string(),
            Session {
                token: token.to_string(),
                user_id,
                client_id: client.to_string(),
                created_at: epoch(),
            },
        );
    }

    pub fn tag_count(&self, tag: &str) -> Option<i64> {
        self.state.lock().unwrap().tags.get(tag).map(|t| t.post_count)
    }

    /// Make every subsequent storage call fail as a pool timeout.
    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.failing.load(Ordering::SeqCst) {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }

    pub fn directory(&self) -> InMemoryDirectory<'_> {
        InMemoryDirectory { store: self }
    }
}

impl State {
    fn like_count(&self, post: PostId) -> i64 {
        self.likes.iter().filter(|(p, _)| *p == post).count() as i64
    }

    fn admits(&self, viewer: UserId, post: &StoredPost) -> bool {
        !post.removed
            && !self.blocks.contains(&(viewer, post.author))
            && !self.blocks.contains(&(post.author, viewer))
            && !self.bans.contains(&post.author)
    }

    fn in_scope(&self, scope: &FeedScope, viewer: UserId, post: &StoredPost) -> bool {
        match scope {
            FeedScope::Home => self.follows.contains(&(viewer, post.author)),
            FeedScope::Popular => true,
            FeedScope::Promoted => post.promoted,
            FeedScope::Profile { target } => post.author == *target,
            FeedScope::Search { query } => post
                .description
                .to_lowercase()
                .contains(&query.to_lowercase()),
        }
    }
}

#[async_trait]
impl FeedRepository for InMemoryStore {
    async fn candidate_rows(&self, query: &CandidateQuery<'_>) -> Result<Vec<FeedRow>, sqlx::Error> {
        self.check()?;
        let state = self.state.lock().unwrap();

        let mut rows: Vec<(i64, &StoredPost)> = state
            .posts
            .iter()
            .filter(|p| state.in_scope(query.scope, query.viewer, p))
            .filter(|p| state.admits(query.viewer, p))
            .map(|p| (state.like_count(p.id), p))
            .collect();

        if query.scope.orders_by_likes() {
            rows.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.id.cmp(&a.1.id)));
        } else {
            rows.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at).then(b.1.id.cmp(&a.1.id)));
        }

        Ok(rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .map(|(like_count, p)| FeedRow {
                id: p.id,
                user_id: p.author,
                video_url: format!("https://cdn.test/videos/{}.mp4", p.id),
                thumbnail_url: format!("https://cdn.test/thumbnails/{}.png", p.id),
                description: p.description.clone(),
                entities: serde_json::json!([]),
                loops: 0,
                created_at: p.created_at,
                promoted: p.promoted,
                venue_id: None,
                liked: state.likes.contains(&(p.id, query.viewer)),
                like_count,
                comment_count: 0,
                repost_count: 0,
                repost_id: None,
            })
            .collect())
    }

    async fn author_profiles(&self, viewer: UserId, authors: &[UserId]) -> Result<Vec<AuthorRow>, sqlx::Error> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(authors
            .iter()
            .filter_map(|id| {
                state.users.get(id).map(|username| AuthorRow {
                    id: *id,
                    username: username.clone(),
                    avatar_url: None,
                    verified: false,
                    bio: None,
                    is_explicit: false,
                    location: None,
                    profile_color: None,
                    following: state.follows.contains(&(viewer, *id)),
                })
            })
            .collect())
    }
}

#[async_trait]
impl SocialGraph for InMemoryStore {
    async fn is_following(&self, follower: UserId, followee: UserId) -> Result<bool, sqlx::Error> {
        self.check()?;
        Ok(self.state.lock().unwrap().follows.contains(&(follower, followee)))
    }

    async fn has_blocked(&self, source: UserId, target: UserId) -> Result<bool, sqlx::Error> {
        self.check()?;
        Ok(self.state.lock().unwrap().blocks.contains(&(source, target)))
    }

    async fn is_banned(&self, user: UserId) -> Result<bool, sqlx::Error> {
        self.check()?;
        Ok(self.state.lock().unwrap().bans.contains(&user))
    }

    async fn follower_count(&self, user: UserId) -> Result<i64, sqlx::Error> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state.follows.iter().filter(|(_, to)| *to == user).count() as i64)
    }

    async fn following_count(&self, user: UserId) -> Result<i64, sqlx::Error> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state.follows.iter().filter(|(from, _)| *from == user).count() as i64)
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn lookup(&self, token: &str) -> Result<Option<Session>, sqlx::Error> {
        self.check()?;
        Ok(self.state.lock().unwrap().sessions.get(token).cloned())
    }
}

pub struct InMemoryDirectory<'s> {
    store: &'s InMemoryStore,
}

#[async_trait]
impl EntityDirectory for InMemoryDirectory<'_> {
    async fn resolve_username(&mut self, username: &str) -> AppResult<Option<UserId>> {
        self.store.check()?;
        let state = self.store.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|(_, name)| name.as_str() == username)
            .map(|(id, _)| *id))
    }

    async fn record_tag_use(&mut self, tag: &str) -> AppResult<TagUsage> {
        self.store.check()?;
        let mut state = self.store.state.lock().unwrap();
        let next_id = state.tags.len() as i64 + 1;
        let usage = state
            .tags
            .entry(tag.to_string())
            .and_modify(|usage| usage.post_count += 1)
            .or_insert(TagUsage {
                id: next_id,
                post_count: 1,
            });
        Ok(*usage)
    }
}
