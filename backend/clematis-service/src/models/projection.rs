//! The annotated post record rendered by every feed.
//!
//! Older clients read author fields at the top level of a post, newer ones
//! read them from the nested `user` object. Both views are generated from the
//! single [`AuthorProjection`] held by a [`PostRecord`], so they cannot diverge.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::{format_timestamp, AuthorRow, Entity, FeedRow, PostId, UserId};

/// Frame rate advertised for every delivery variant
const VIDEO_RATE: u32 = 30;
const LOOP_VELOCITY: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorProjection {
    pub user_id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub verified: bool,
    pub bio: Option<String>,
    pub explicit: bool,
    pub location: Option<String>,
    pub profile_background: Option<String>,
    /// Whether the viewer follows this author
    pub following: bool,
}

impl From<AuthorRow> for AuthorProjection {
    fn from(row: AuthorRow) -> Self {
        Self {
            user_id: row.id,
            username: row.username,
            avatar_url: row.avatar_url,
            verified: row.verified,
            bio: row.bio,
            explicit: row.is_explicit,
            location: row.location,
            profile_background: row.profile_color,
            following: row.following,
        }
    }
}

/// Top-level author fields of a post record
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary<'a> {
    pub username: &'a str,
    pub verified: u8,
    pub avatar_url: Option<&'a str>,
    pub user_id: UserId,
    pub following: u8,
    pub explicit_content: u8,
}

/// Nested `user` object of a post record
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDetail<'a> {
    pub user_id: UserId,
    pub avatar_url: Option<&'a str>,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub username: &'a str,
    pub verified: u8,
    pub profile_background: Option<&'a str>,
    pub following: u8,
    pub explicit_content: u8,
}

impl AuthorProjection {
    pub fn summary(&self) -> AuthorSummary<'_> {
        AuthorSummary {
            username: &self.username,
            verified: u8::from(self.verified),
            avatar_url: self.avatar_url.as_deref(),
            user_id: self.user_id,
            following: u8::from(self.following),
            explicit_content: u8::from(self.explicit),
        }
    }

    pub fn detail(&self) -> AuthorDetail<'_> {
        AuthorDetail {
            user_id: self.user_id,
            avatar_url: self.avatar_url.as_deref(),
            description: self.bio.as_deref(),
            location: self.location.as_deref(),
            username: &self.username,
            verified: u8::from(self.verified),
            profile_background: self.profile_background.as_deref(),
            following: u8::from(self.following),
            explicit_content: u8::from(self.explicit),
        }
    }
}

/// One post as rendered in a feed page.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub post_id: PostId,
    pub author: AuthorProjection,
    pub description: String,
    pub entities: Vec<Entity>,
    pub video_url: String,
    pub thumbnail_url: String,
    pub venue_id: Option<String>,
    pub loops: i64,
    pub created_at: DateTime<Utc>,
    pub promoted: bool,
    pub liked: bool,
    pub like_count: i64,
    pub comment_count: i64,
    pub repost_count: i64,
    pub my_repost_id: Option<i64>,
    pub share_url: String,
}

impl PostRecord {
    /// Assemble a record from a candidate row and its author's fragment.
    pub fn new(row: FeedRow, author: AuthorProjection, share_url_prefix: &str) -> Self {
        let entities = Entity::parse_list(&row.entities);
        Self {
            post_id: row.id,
            share_url: format!("{}{}", share_url_prefix, row.id),
            author,
            description: row.description,
            entities,
            video_url: row.video_url,
            thumbnail_url: row.thumbnail_url,
            venue_id: row.venue_id,
            loops: row.loops,
            created_at: row.created_at,
            promoted: row.promoted,
            liked: row.liked,
            like_count: row.like_count,
            comment_count: row.comment_count,
            repost_count: row.repost_count,
            my_repost_id: row.repost_id,
        }
    }

    fn wire(&self) -> PostRecordWire<'_> {
        let created = format_timestamp(self.created_at);
        PostRecordWire {
            liked: u8::from(self.liked),
            foursquare_venue_id: self.venue_id.as_deref(),
            author: self.author.summary(),
            private: 0,
            likes: Counted::new(self.like_count),
            loops: LoopStats {
                count: self.loops,
                created: created.clone(),
                velocity: LOOP_VELOCITY,
                on_fire: 0,
            },
            thumbnail_url: &self.thumbnail_url,
            my_repost_id: self.my_repost_id,
            vanity_urls: &[],
            video_urls: [
                VideoVariant {
                    format: "h264",
                    rate: VIDEO_RATE,
                    video_url: &self.video_url,
                },
                VideoVariant {
                    format: "webm",
                    rate: VIDEO_RATE,
                    video_url: &self.video_url,
                },
            ],
            comments: Counted::new(self.comment_count),
            entities: &self.entities,
            video_low_url: &self.video_url,
            video_preview: &self.video_url,
            permalink_url: &self.share_url,
            description: &self.description,
            post_id: self.post_id.to_string(),
            video_url: &self.video_url,
            created,
            share_url: &self.share_url,
            user: self.author.detail(),
            tags: &[],
            promoted: u8::from(self.promoted),
            reposts: Counted::new(self.repost_count),
        }
    }
}

impl Serialize for PostRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.wire().serialize(serializer)
    }
}

#[derive(Serialize)]
struct Counted {
    count: i64,
    records: [(); 0],
}

impl Counted {
    fn new(count: i64) -> Self {
        Self { count, records: [] }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoopStats {
    count: i64,
    created: String,
    velocity: f64,
    on_fire: u8,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoVariant<'a> {
    format: &'static str,
    rate: u32,
    video_url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostRecordWire<'a> {
    liked: u8,
    foursquare_venue_id: Option<&'a str>,
    #[serde(flatten)]
    author: AuthorSummary<'a>,
    private: u8,
    likes: Counted,
    loops: LoopStats,
    thumbnail_url: &'a str,
    my_repost_id: Option<i64>,
    vanity_urls: &'a [String],
    video_urls: [VideoVariant<'a>; 2],
    comments: Counted,
    entities: &'a [Entity],
    #[serde(rename = "videoLowURL")]
    video_low_url: &'a str,
    video_preview: &'a str,
    permalink_url: &'a str,
    description: &'a str,
    /// Rendered as a string so 64-bit ids survive float-backed JSON parsers
    post_id: String,
    video_url: &'a str,
    created: String,
    share_url: &'a str,
    user: AuthorDetail<'a>,
    tags: &'a [String],
    promoted: u8,
    reposts: Counted,
}
