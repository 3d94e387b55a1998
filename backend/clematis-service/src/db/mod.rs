/// Database access layer
///
/// Free functions per table group take a pool or connection, following one
/// query per function. The `Pg*` structs adapt them to the storage traits the
/// services depend on.
pub mod channel_repo;
pub mod feed_repo;
pub mod graph_repo;
pub mod like_repo;
pub mod post_repo;
pub mod session_repo;
pub mod tag_repo;
pub mod user_repo;

pub use feed_repo::PgFeedRepository;
pub use graph_repo::PgSocialGraph;
pub use session_repo::PgSessionStore;
pub use tag_repo::PgEntityDirectory;

/// Escape `LIKE`/`ILIKE` wildcards so `needle` matches literally under `ESCAPE '\'`.
pub fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// SQLSTATE for a unique constraint violation
pub const UNIQUE_VIOLATION: &str = "23505";

/// Name of the violated constraint when `err` is a unique violation.
pub fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}
