use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::{channel_repo, tag_repo, user_repo};
use crate::error::{AppError, Result};
use crate::models::{ChannelRecord, PostRecord, ResponseCode, TagRecord, UserCard};
use crate::services::feed::{FeedAssembler, FeedScope};
use crate::services::pagination::PageCursor;
use crate::services::session::AuthenticatedRequest;

/// Records per section of a sectioned search
const SECTION_LIMIT: i64 = 20;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/posts", web::get().to(search_posts))
        .route("/sectioned", web::get().to(sectioned));
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
}

impl SearchQuery {
    fn needle(&self) -> Result<String> {
        self.q
            .as_ref()
            .map(|q| q.trim().to_string())
            .ok_or_else(|| AppError::InvalidInput("q is required".to_string()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section<T: Serialize> {
    pub records: Vec<T>,
    pub display_count: usize,
}

impl<T: Serialize> From<Vec<T>> for Section<T> {
    fn from(records: Vec<T>) -> Self {
        Self {
            display_count: records.len(),
            records,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSection {
    Users(Section<UserCard>),
    Tags(Section<TagRecord>),
    Channels(Section<ChannelRecord>),
    Posts(Section<PostRecord>),
}

#[derive(Debug, Serialize)]
pub struct SectionedData {
    pub results: Vec<SearchSection>,
}

/// Sectioned results carry `size: 0`; each section reports its own `displayCount`.
#[derive(Debug, Serialize)]
pub struct SectionedResponse {
    pub code: ResponseCode,
    pub data: SectionedData,
    pub size: usize,
    pub success: bool,
    pub error: String,
}

pub async fn search_posts(
    auth: AuthenticatedRequest,
    query: web::Query<SearchQuery>,
    assembler: web::Data<FeedAssembler>,
) -> Result<HttpResponse> {
    let scope = FeedScope::Search {
        query: query.needle()?,
    };
    let page = assembler
        .assemble(auth.viewer, &scope, PageCursor::new(query.page))
        .await?;
    Ok(HttpResponse::Ok().json(page.into_response()))
}

pub async fn sectioned(
    auth: AuthenticatedRequest,
    query: web::Query<SearchQuery>,
    pool: web::Data<PgPool>,
    assembler: web::Data<FeedAssembler>,
) -> Result<HttpResponse> {
    let needle = query.needle()?;
    let scope = FeedScope::Search {
        query: needle.clone(),
    };

    let (users, tags, channels) = futures::try_join!(
        user_repo::search_user_cards(&pool, auth.viewer, &needle, SECTION_LIMIT),
        tag_repo::search_tags(&pool, &needle, SECTION_LIMIT, 0),
        channel_repo::search_channels(&pool, &needle, SECTION_LIMIT),
    )?;
    let posts = assembler.preview(auth.viewer, &scope, SECTION_LIMIT).await?;

    let response = SectionedResponse {
        code: ResponseCode::Ok(""),
        data: SectionedData {
            results: vec![
                SearchSection::Users(users.into_iter().map(UserCard::from).collect::<Vec<_>>().into()),
                SearchSection::Tags(tags.into_iter().map(TagRecord::from).collect::<Vec<_>>().into()),
                SearchSection::Channels(
                    channels
                        .into_iter()
                        .map(ChannelRecord::from)
                        .collect::<Vec<_>>()
                        .into(),
                ),
                SearchSection::Posts(posts.into()),
            ],
        },
        size: 0,
        success: true,
        error: String::new(),
    };

    Ok(HttpResponse::Ok().json(response))
}
