use thiserror::Error;

/// Failures surfaced by leaderboard operations.
///
/// Absent members are not errors: lookups return `None` and page queries
/// return empty results.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport or protocol failure talking to Redis/Valkey.
    #[error("score store error: {0}")]
    Store(#[from] redis::RedisError),

    /// Any other store backend that could not service the request.
    #[error("score store unavailable: {0}")]
    StoreUnavailable(String),

    /// NaN has no position in a sorted set and is rejected before any write.
    #[error("invalid score {0}")]
    InvalidScore(f64),

    /// A batch reply did not have the shape of the operation that produced it.
    #[error("unexpected reply for {0}")]
    UnexpectedReply(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn check_score(score: f64) -> Result<f64> {
    if score.is_nan() {
        Err(Error::InvalidScore(score))
    } else {
        Ok(score)
    }
}
