//! How a member's position in the store becomes the rank a caller sees.

use std::ops::Bound;

use crate::error::Result;
use crate::format::score_key;
use crate::store::{Direction, ScoreStore};

/// Rank reporting strategy, chosen once per leaderboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RankPolicy {
    /// Position in the store's ordering: 1, 2, 3, 4, 5.
    #[default]
    Standard,
    /// Competition ranking. Equal scores share a rank and the next score
    /// skips past the tied group: 1, 1, 3, 3, 5.
    TieAware,
    /// Equal scores share a rank and the next score follows on: 1, 1, 2, 2, 3.
    Dense,
}

impl RankPolicy {
    /// Whether the distinct-score index must be maintained alongside writes.
    pub fn tracks_ties(self) -> bool {
        !matches!(self, RankPolicy::Standard)
    }
}

/// Keys and traversal a rank lookup runs against.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RankContext<'a> {
    pub key: &'a str,
    pub ties_key: &'a str,
    pub direction: Direction,
}

/// Bounds selecting every score strictly ahead of `score`.
pub(crate) fn ahead_of(score: f64, direction: Direction) -> (Bound<f64>, Bound<f64>) {
    match direction {
        Direction::Descending => (Bound::Excluded(score), Bound::Unbounded),
        Direction::Ascending => (Bound::Unbounded, Bound::Excluded(score)),
    }
}

impl RankPolicy {
    /// 1-based rank of `member`, `None` when it holds no score.
    pub(crate) fn rank_of<S: ScoreStore + ?Sized>(
        self,
        store: &mut S,
        cx: &RankContext<'_>,
        member: &str,
    ) -> Result<Option<usize>> {
        match self {
            RankPolicy::Standard => Ok(store.rank_of(cx.key, member, cx.direction)?.map(|p| p + 1)),
            RankPolicy::TieAware | RankPolicy::Dense => match store.score_of(cx.key, member)? {
                Some(score) => self.rank_of_score(store, cx, score),
                None => Ok(None),
            },
        }
    }

    /// 1-based rank shared by every holder of `score` under a tie-aware policy.
    pub(crate) fn rank_of_score<S: ScoreStore + ?Sized>(
        self,
        store: &mut S,
        cx: &RankContext<'_>,
        score: f64,
    ) -> Result<Option<usize>> {
        match self {
            RankPolicy::Standard => Ok(None),
            RankPolicy::TieAware => {
                let (min, max) = ahead_of(score, cx.direction);
                Ok(Some(store.count_in_score_range(cx.key, min, max)? + 1))
            }
            RankPolicy::Dense => {
                let pos = store.rank_of(cx.ties_key, &score_key(score), cx.direction)?;
                Ok(pos.map(|p| p + 1))
            }
        }
    }

    /// Ranks for a contiguous run of scores that starts at 0-based offset
    /// `start` of the leaderboard ordering.
    ///
    /// Only the first entry needs a store lookup; the rest follow from the
    /// run itself.
    pub(crate) fn window_ranks<S: ScoreStore + ?Sized>(
        self,
        store: &mut S,
        cx: &RankContext<'_>,
        start: usize,
        scores: &[f64],
    ) -> Result<Vec<Option<usize>>> {
        let Some(&first_score) = scores.first() else {
            return Ok(Vec::new());
        };
        let first = match self {
            RankPolicy::Standard => Some(start + 1),
            _ => self.rank_of_score(store, cx, first_score)?,
        };
        Ok(match first {
            Some(first) => self.follow_on(first, start, scores).into_iter().map(Some).collect(),
            None => vec![None; scores.len()],
        })
    }

    /// Extends the rank of `scores[0]` across the rest of a contiguous run.
    pub fn follow_on(self, first: usize, start: usize, scores: &[f64]) -> Vec<usize> {
        let mut ranks = Vec::with_capacity(scores.len());
        let mut prev: Option<(f64, usize)> = None;
        for (i, &score) in scores.iter().enumerate() {
            let rank = match (self, prev) {
                (_, None) => first,
                (RankPolicy::Standard, Some(_)) => start + i + 1,
                (_, Some((p, r))) if p == score => r,
                (RankPolicy::TieAware, Some(_)) => start + i + 1,
                (RankPolicy::Dense, Some((_, r))) => r + 1,
            };
            ranks.push(rank);
            prev = Some((score, rank));
        }
        ranks
    }
}
