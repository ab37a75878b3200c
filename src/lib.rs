#![deny(clippy::uninlined_format_args)]
#![deny(clippy::to_string_in_format_args)]
//! Leaderboards over an ordered score store.
//!
//! A [`Leaderboard`] ranks members by score and answers rank, page,
//! "around me", percentile and member-list queries against any
//! [`ScoreStore`]: a live Redis/Valkey server through [`RedisStore`], or the
//! in-process [`MemoryStore`].
//!
//! Ranks follow one of three [`RankPolicy`] variants. The tie-aware ones keep
//! a secondary index of distinct scores next to the leaderboard so a shared
//! rank costs a single store lookup.
//!
//! ```
//! use leaderboard::{Leaderboard, LeaderboardOptions, MemoryStore, RankPolicy, RequestOptions};
//!
//! let options = LeaderboardOptions::default().with_policy(RankPolicy::TieAware);
//! let mut board = Leaderboard::with_options("highscores", MemoryStore::new(), options);
//! for (member, score) in [("ann", 50.0), ("bob", 50.0), ("cy", 30.0)] {
//!     board.rank_member(member, score, None)?;
//! }
//! let page = board.leaders(1, &RequestOptions::default())?;
//! let ranks: Vec<_> = page.iter().map(|e| e.rank).collect();
//! assert_eq!(ranks, [Some(1), Some(1), Some(3)]);
//! # Ok::<(), leaderboard::Error>(())
//! ```

mod assemble;
pub mod config;
pub mod error;
pub mod format;
mod leaderboard;
pub mod percentile;
pub mod policy;
pub mod score_set;
pub mod store;
mod tie_index;
pub mod window;

pub use crate::assemble::RankedEntry;
pub use crate::config::{
    FieldNames, LeaderboardOptions, Order, RequestOptions, SortBy, DEFAULT_PAGE_SIZE,
};
pub use crate::error::{Error, Result};
pub use crate::leaderboard::Leaderboard;
pub use crate::policy::RankPolicy;
pub use crate::score_set::ScoreSet;
pub use crate::store::{Aggregate, Direction, Expiry, MemoryStore, RedisStore, ScoreStore};
pub use crate::tie_index::TieIndexReport;
pub use crate::window::Window;
