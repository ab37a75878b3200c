//! The ordered score store the ranking engine runs against.
//!
//! [`ScoreStore`] is the capability surface of a Redis sorted set plus the
//! handful of key-level commands a leaderboard needs. [`RedisStore`] speaks it
//! to a live server; [`MemoryStore`] keeps everything in process.

use std::ops::Bound;
use std::time::Duration;

use crate::error::{Error, Result};

pub mod memory;
pub mod remote;

pub use self::memory::MemoryStore;
pub use self::remote::RedisStore;

/// Traversal order of a sorted set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Lowest score first (`ZRANK`, `ZRANGE`).
    Ascending,
    /// Highest score first (`ZREVRANK`, `ZREVRANGE`).
    Descending,
}

/// How scores combine when several sets are merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Aggregate {
    #[default]
    Sum,
    Min,
    Max,
}

impl Aggregate {
    pub fn combine(self, a: f64, b: f64) -> f64 {
        match self {
            Aggregate::Sum => a + b,
            Aggregate::Min => a.min(b),
            Aggregate::Max => a.max(b),
        }
    }

    pub(crate) fn as_arg(self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOp {
    Union,
    Intersect,
}

/// Time-to-live applied to a whole key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expiry {
    /// Relative, like `EXPIRE`.
    In(Duration),
    /// Absolute UNIX timestamp in seconds, like `EXPIREAT`.
    At(u64),
}

/// One command inside an atomic [`ScoreStore::batch`].
#[derive(Clone, Debug, PartialEq)]
pub enum StoreOp {
    Upsert { key: String, member: String, score: f64 },
    Remove { key: String, member: String },
    Score { key: String, member: String },
    Rank { key: String, member: String, direction: Direction },
    Count { key: String },
    CountInScoreRange { key: String, min: Bound<f64>, max: Bound<f64> },
    RemoveByScoreRange { key: String, min: Bound<f64>, max: Bound<f64> },
    RemoveByRankRange { key: String, start: usize, stop: usize },
    SetField { key: String, field: String, value: String },
    GetField { key: String, field: String },
    RemoveField { key: String, field: String },
    Expire { key: String, expiry: Expiry },
    Delete { key: String },
}

impl StoreOp {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            StoreOp::Upsert { .. } => "upsert",
            StoreOp::Remove { .. } => "remove",
            StoreOp::Score { .. } => "score",
            StoreOp::Rank { .. } => "rank",
            StoreOp::Count { .. } => "count",
            StoreOp::CountInScoreRange { .. } => "count in score range",
            StoreOp::RemoveByScoreRange { .. } => "remove by score range",
            StoreOp::RemoveByRankRange { .. } => "remove by rank range",
            StoreOp::SetField { .. } => "set field",
            StoreOp::GetField { .. } => "get field",
            StoreOp::RemoveField { .. } => "remove field",
            StoreOp::Expire { .. } => "expire",
            StoreOp::Delete { .. } => "delete",
        }
    }
}

/// Result of one [`StoreOp`], in submission order.
///
/// Mutations and counts answer `Count` (rows affected, or 0/1 for flags),
/// `Score` answers `Score`, `Rank` answers `Rank`, `GetField` answers `Field`.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Count(usize),
    Score(Option<f64>),
    Rank(Option<usize>),
    Field(Option<String>),
}

impl Reply {
    pub fn into_count(self) -> Result<usize> {
        match self {
            Reply::Count(n) => Ok(n),
            _ => Err(Error::UnexpectedReply("count")),
        }
    }

    pub fn into_score(self) -> Result<Option<f64>> {
        match self {
            Reply::Score(s) => Ok(s),
            _ => Err(Error::UnexpectedReply("score")),
        }
    }

    pub fn into_rank(self) -> Result<Option<usize>> {
        match self {
            Reply::Rank(r) => Ok(r),
            _ => Err(Error::UnexpectedReply("rank")),
        }
    }

    pub fn into_field(self) -> Result<Option<String>> {
        match self {
            Reply::Field(f) => Ok(f),
            _ => Err(Error::UnexpectedReply("field")),
        }
    }
}

/// Ordered associative store keyed by collection name.
///
/// Every call is a synchronous round trip. [`batch`](ScoreStore::batch) must
/// apply its operations as one atomic unit; the ranking engine relies on it to
/// keep a leaderboard and its tie index in step.
pub trait ScoreStore {
    /// Creates or rescores `member`. Returns `true` when the member is new.
    fn upsert(&mut self, key: &str, member: &str, score: f64) -> Result<bool>;

    /// Deletes `member`. Returns `false` when it was absent.
    fn remove(&mut self, key: &str, member: &str) -> Result<bool>;

    fn score_of(&mut self, key: &str, member: &str) -> Result<Option<f64>>;

    /// 0-based position of `member` in the given direction.
    fn rank_of(&mut self, key: &str, member: &str, direction: Direction) -> Result<Option<usize>>;

    fn count(&mut self, key: &str) -> Result<usize>;

    fn count_in_score_range(&mut self, key: &str, min: Bound<f64>, max: Bound<f64>) -> Result<usize>;

    /// Members at positions `start..=stop` in the given direction, with scores.
    /// Positions past the end are clamped.
    fn range_by_position(
        &mut self,
        key: &str,
        start: usize,
        stop: usize,
        direction: Direction,
    ) -> Result<Vec<(String, f64)>>;

    /// Members whose score lies within the bounds, in the given direction.
    fn range_by_score(
        &mut self,
        key: &str,
        min: Bound<f64>,
        max: Bound<f64>,
        direction: Direction,
    ) -> Result<Vec<(String, f64)>>;

    fn remove_by_score_range(&mut self, key: &str, min: Bound<f64>, max: Bound<f64>) -> Result<usize>;

    /// Removes ascending positions `start..=stop`.
    fn remove_by_rank_range(&mut self, key: &str, start: usize, stop: usize) -> Result<usize>;

    /// Stores the union or intersection of `sources` at `dest`, replacing it.
    /// Returns the size of the result.
    fn combine_into(
        &mut self,
        dest: &str,
        sources: &[&str],
        op: SetOp,
        aggregate: Aggregate,
    ) -> Result<usize>;

    /// Applies `ops` atomically and returns one reply per op, in order.
    fn batch(&mut self, ops: &[StoreOp]) -> Result<Vec<Reply>>;

    fn expire(&mut self, key: &str, expiry: Expiry) -> Result<bool> {
        let op = StoreOp::Expire { key: key.to_owned(), expiry };
        Ok(self.single(op)?.into_count()? > 0)
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let op = StoreOp::Delete { key: key.to_owned() };
        Ok(self.single(op)?.into_count()? > 0)
    }

    fn get_field(&mut self, key: &str, field: &str) -> Result<Option<String>> {
        let op = StoreOp::GetField { key: key.to_owned(), field: field.to_owned() };
        self.single(op)?.into_field()
    }

    #[doc(hidden)]
    fn single(&mut self, op: StoreOp) -> Result<Reply> {
        let name = op.name();
        self.batch(std::slice::from_ref(&op))?
            .pop()
            .ok_or(Error::UnexpectedReply(name))
    }
}

impl<S: ScoreStore + ?Sized> ScoreStore for &mut S {
    fn upsert(&mut self, key: &str, member: &str, score: f64) -> Result<bool> {
        (**self).upsert(key, member, score)
    }

    fn remove(&mut self, key: &str, member: &str) -> Result<bool> {
        (**self).remove(key, member)
    }

    fn score_of(&mut self, key: &str, member: &str) -> Result<Option<f64>> {
        (**self).score_of(key, member)
    }

    fn rank_of(&mut self, key: &str, member: &str, direction: Direction) -> Result<Option<usize>> {
        (**self).rank_of(key, member, direction)
    }

    fn count(&mut self, key: &str) -> Result<usize> {
        (**self).count(key)
    }

    fn count_in_score_range(&mut self, key: &str, min: Bound<f64>, max: Bound<f64>) -> Result<usize> {
        (**self).count_in_score_range(key, min, max)
    }

    fn range_by_position(
        &mut self,
        key: &str,
        start: usize,
        stop: usize,
        direction: Direction,
    ) -> Result<Vec<(String, f64)>> {
        (**self).range_by_position(key, start, stop, direction)
    }

    fn range_by_score(
        &mut self,
        key: &str,
        min: Bound<f64>,
        max: Bound<f64>,
        direction: Direction,
    ) -> Result<Vec<(String, f64)>> {
        (**self).range_by_score(key, min, max, direction)
    }

    fn remove_by_score_range(&mut self, key: &str, min: Bound<f64>, max: Bound<f64>) -> Result<usize> {
        (**self).remove_by_score_range(key, min, max)
    }

    fn remove_by_rank_range(&mut self, key: &str, start: usize, stop: usize) -> Result<usize> {
        (**self).remove_by_rank_range(key, start, stop)
    }

    fn combine_into(
        &mut self,
        dest: &str,
        sources: &[&str],
        op: SetOp,
        aggregate: Aggregate,
    ) -> Result<usize> {
        (**self).combine_into(dest, sources, op, aggregate)
    }

    fn batch(&mut self, ops: &[StoreOp]) -> Result<Vec<Reply>> {
        (**self).batch(ops)
    }

    fn expire(&mut self, key: &str, expiry: Expiry) -> Result<bool> {
        (**self).expire(key, expiry)
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }

    fn get_field(&mut self, key: &str, field: &str) -> Result<Option<String>> {
        (**self).get_field(key, field)
    }
}
