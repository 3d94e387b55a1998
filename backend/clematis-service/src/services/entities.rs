//! Hashtag and mention extraction for post descriptions.
//!
//! Runs once, at publish time. Every hashtag occurrence counts as one use of
//! its tag; every mention is kept even when the username does not resolve.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::Result;
use crate::metrics::feed::TAG_UPSERT_TOTAL;
use crate::models::{Entity, EntityRange, TagUsage, UserId};

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("Invalid hashtag regex"));

static MENTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\w+)").expect("Invalid mention regex"));

/// A `#token` or `@token` occurrence in a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Token without its delimiter
    pub token: String,
    /// Covers the delimiter and the token, in UTF-16 code units
    pub range: EntityRange,
}

/// Lookups and counters the extractor needs from storage.
#[async_trait]
pub trait EntityDirectory: Send {
    /// Resolve an exact username to its user id
    async fn resolve_username(&mut self, username: &str) -> Result<Option<UserId>>;

    /// Atomically create the tag (counter 1) or increment its counter and last-used time
    async fn record_tag_use(&mut self, tag: &str) -> Result<TagUsage>;
}

fn utf16_offset(text: &str, byte_idx: usize) -> usize {
    text[..byte_idx].encode_utf16().count()
}

fn scan(pattern: &Regex, description: &str) -> Vec<Span> {
    pattern
        .captures_iter(description)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let token = caps.get(1)?;
            Some(Span {
                token: token.as_str().to_string(),
                range: [
                    utf16_offset(description, whole.start()),
                    utf16_offset(description, whole.end()),
                ],
            })
        })
        .collect()
}

/// `#word` spans, leftmost-first, non-overlapping
pub fn scan_tags(description: &str) -> Vec<Span> {
    scan(&TAG_PATTERN, description)
}

/// `@word` spans, leftmost-first, non-overlapping
pub fn scan_mentions(description: &str) -> Vec<Span> {
    scan(&MENTION_PATTERN, description)
}

/// Derive the entity list for a new post: mentions first, then tags, each in
/// order of appearance. Records one tag use per hashtag occurrence.
pub async fn extract<D>(directory: &mut D, description: &str) -> Result<Vec<Entity>>
where
    D: EntityDirectory + ?Sized,
{
    if description.is_empty() {
        return Ok(Vec::new());
    }

    let mut tags = Vec::new();
    for span in scan_tags(description) {
        let usage = directory.record_tag_use(&span.token).await?;
        TAG_UPSERT_TOTAL
            .with_label_values(&[if usage.post_count <= 1 { "created" } else { "incremented" }])
            .inc();
        tracing::debug!(tag = %span.token, post_count = usage.post_count, "recorded tag use");
        tags.push(Entity::tag(span.token, span.range));
    }

    let mut entities = Vec::new();
    for span in scan_mentions(description) {
        let user_id = directory
            .resolve_username(&span.token)
            .await?
            .unwrap_or(0);
        entities.push(Entity::mention(user_id, span.token, span.range));
    }

    entities.extend(tags);
    Ok(entities)
}
