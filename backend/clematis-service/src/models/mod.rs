/// Data models for clematis-service
///
/// - Storage rows (`FeedRow`, `AuthorRow`, `Session`, ...)
/// - `Entity`: tag and mention annotations over a post description
/// - `envelope`: the `{code, data, success, error}` response shapes
/// - `projection`: the annotated post record rendered in every feed
pub mod envelope;
pub mod projection;

pub use envelope::{ApiResponse, ListData, ListResponse, ResponseCode};
pub use projection::{AuthorProjection, PostRecord};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type UserId = i64;
pub type PostId = i64;

/// Link scheme clients use to open a tag timeline
pub const TAG_LINK_PREFIX: &str = "vine://tag/";

/// Half-open `[start, end)` offsets into a description, in UTF-16 code units.
pub type EntityRange = [usize; 2];

/// A structured annotation over part of a post description.
///
/// Persisted as an ordered JSON list of
/// `{type, range, id, text|title, link?}` records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
    Mention {
        /// Resolved user id, `0` when the username is unknown
        id: UserId,
        text: String,
        range: EntityRange,
    },
    Tag {
        range: EntityRange,
        link: String,
        id: i64,
        title: String,
    },
}

impl Entity {
    pub fn mention(id: UserId, text: impl Into<String>, range: EntityRange) -> Self {
        Entity::Mention {
            id,
            text: text.into(),
            range,
        }
    }

    pub fn tag(title: impl Into<String>, range: EntityRange) -> Self {
        let title = title.into();
        Entity::Tag {
            range,
            link: format!("{}{}", TAG_LINK_PREFIX, title),
            id: 0,
            title,
        }
    }

    /// Parse a stored or client-supplied entity list.
    ///
    /// Anything that is not a well-formed list degrades to an empty list.
    pub fn parse_list(value: &serde_json::Value) -> Vec<Entity> {
        match serde_json::from_value::<Vec<Entity>>(value.clone()) {
            Ok(entities) => entities,
            Err(err) => {
                tracing::warn!(error = %err, "discarding malformed entity list");
                Vec::new()
            }
        }
    }

    /// Same as [`Entity::parse_list`] for a raw JSON string.
    pub fn parse_list_str(raw: &str) -> Vec<Entity> {
        serde_json::from_str::<serde_json::Value>(raw)
            .map(|value| Entity::parse_list(&value))
            .unwrap_or_default()
    }
}

/// One candidate post with the viewer-specific counters attached.
#[derive(Debug, Clone, FromRow)]
pub struct FeedRow {
    pub id: PostId,
    pub user_id: UserId,
    pub video_url: String,
    pub thumbnail_url: String,
    pub description: String,
    pub entities: serde_json::Value,
    pub loops: i64,
    pub created_at: DateTime<Utc>,
    pub promoted: bool,
    pub venue_id: Option<String>,
    pub liked: bool,
    pub like_count: i64,
    pub comment_count: i64,
    pub repost_count: i64,
    pub repost_id: Option<i64>,
}

/// Public profile fragment of a post author, as seen by one viewer.
#[derive(Debug, Clone, FromRow)]
pub struct AuthorRow {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub verified: bool,
    pub bio: Option<String>,
    pub is_explicit: bool,
    pub location: Option<String>,
    pub profile_color: Option<String>,
    pub following: bool,
}

/// Stored account row
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub profile_color: Option<String>,
    pub verified: bool,
    pub is_explicit: bool,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
}

/// Opaque session token bound to a user and, optionally, to one client.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    /// Empty when the session is not bound to a client
    #[sqlx(rename = "vine_client")]
    pub client_id: String,
    pub created_at: DateTime<Utc>,
}

/// Tag row after an insert-or-increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct TagUsage {
    pub id: i64,
    pub post_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct TagRow {
    pub id: i64,
    pub tag: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChannelRow {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub icon_retina: Option<String>,
    pub bgcolor: Option<String>,
}

/// Row inserted for a newly published post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: PostId,
    pub share_id: String,
    pub user_id: UserId,
    pub video_url: String,
    pub thumbnail_url: String,
    pub description: String,
    pub entities: Vec<Entity>,
    pub venue_id: Option<String>,
    pub venue_name: String,
    pub channel_id: i64,
}

/// Short user card used by liker lists and user search
#[derive(Debug, Clone, FromRow)]
pub struct UserCardRow {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub verified: bool,
    pub location: Option<String>,
    pub is_private: bool,
    pub following: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCard {
    pub username: String,
    pub verified: u8,
    pub vanity_urls: Vec<String>,
    pub avatar_url: Option<String>,
    pub user_id: UserId,
    pub following: u8,
    pub user: UserCardPrivacy,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserCardPrivacy {
    pub private: u8,
}

impl From<UserCardRow> for UserCard {
    fn from(row: UserCardRow) -> Self {
        Self {
            username: row.username,
            verified: u8::from(row.verified),
            vanity_urls: Vec::new(),
            avatar_url: row.avatar_url,
            user_id: row.id,
            following: u8::from(row.following),
            user: UserCardPrivacy {
                private: u8::from(row.is_private),
            },
            location: row.location,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    pub tag_id: i64,
    pub tag: String,
}

impl From<TagRow> for TagRecord {
    fn from(row: TagRow) -> Self {
        Self {
            tag_id: row.id,
            tag: row.tag,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRecord {
    pub channel_id: i64,
    pub channel: String,
    pub background_color: Option<String>,
    pub icon_url: Option<String>,
    pub retina_icon_url: Option<String>,
    pub full_icon_url: Option<String>,
    pub retina_icon_full_url: Option<String>,
}

impl From<ChannelRow> for ChannelRecord {
    fn from(row: ChannelRow) -> Self {
        Self {
            channel_id: row.id,
            channel: row.name,
            background_color: row.bgcolor,
            icon_url: row.icon.clone(),
            retina_icon_url: row.icon_retina.clone(),
            full_icon_url: row.icon,
            retina_icon_full_url: row.icon_retina,
        }
    }
}

/// Render a timestamp the way every client expects it: `2024-05-01T12:00:00.000Z`
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
