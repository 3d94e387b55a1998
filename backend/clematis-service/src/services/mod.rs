/// Business logic layer for clematis-service
///
/// - Feed assembly over five feed kinds with visibility filtering
/// - Entity extraction and tag accounting at publish time
/// - Session validation, accounts, publishing and likes
/// - Pagination and Snowflake id helpers shared by the above
pub mod accounts;
pub mod entities;
pub mod feed;
pub mod pagination;
pub mod posts;
pub mod retry;
pub mod session;
pub mod snowflake;
pub mod visibility;

pub use accounts::AccountService;
pub use feed::{FeedAssembler, FeedPage, FeedRepository, FeedScope};
pub use pagination::{PageCursor, PageQuery, PAGE_SIZE};
pub use posts::PostService;
pub use session::{authenticate, AuthenticatedRequest, SessionStore};
pub use snowflake::SnowflakeGenerator;
pub use visibility::{SocialGraph, VisibilityFacts};
