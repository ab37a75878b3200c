//! Secondary index of distinct score values.
//!
//! The tie index is a sorted set stored next to the leaderboard whose members
//! are canonical score strings ([`score_key`]) scored by the value they spell.
//! A value is present exactly while at least one leaderboard member holds it.
//! Every mutation that can change a value's holder count is planned here as a
//! list of [`StoreOp`]s and submitted by the caller as one atomic batch.
//!
//! The sole-holder check reads the store before the batch is sent. Two callers
//! moving the last two holders of one score at the same moment can therefore
//! leave a stale entry behind; [`TieIndex::check`] reports it and
//! [`TieIndex::rebuild`] repairs it.

use log::{debug, warn};
use ordered_float::OrderedFloat;
use std::collections::BTreeSet;
use std::ops::Bound;

use crate::error::Result;
use crate::format::score_key;
use crate::store::{Direction, ScoreStore, StoreOp};

/// Outcome of comparing the tie index with the scores actually held.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TieIndexReport {
    /// Scores held by some member but absent from the index.
    pub missing: Vec<f64>,
    /// Index entries no member holds, or whose text is not canonical.
    pub stale: Vec<f64>,
}

impl TieIndexReport {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct TieIndex<'a> {
    pub key: &'a str,
    pub ties_key: &'a str,
}

impl<'a> TieIndex<'a> {
    pub fn new(key: &'a str, ties_key: &'a str) -> Self {
        Self { key, ties_key }
    }

    fn add_score(&self, score: f64) -> StoreOp {
        StoreOp::Upsert {
            key: self.ties_key.to_owned(),
            member: score_key(score),
            score,
        }
    }

    fn drop_score(&self, score: f64) -> StoreOp {
        StoreOp::Remove {
            key: self.ties_key.to_owned(),
            member: score_key(score),
        }
    }

    fn sole_holder<S: ScoreStore + ?Sized>(&self, store: &mut S, score: f64) -> Result<bool> {
        let holders =
            store.count_in_score_range(self.key, Bound::Included(score), Bound::Included(score))?;
        Ok(holders == 1)
    }

    /// Ops that write `member` at `score` and keep the index in step.
    pub fn plan_upsert<S: ScoreStore + ?Sized>(
        &self,
        store: &mut S,
        member: &str,
        score: f64,
    ) -> Result<Vec<StoreOp>> {
        let mut ops = Vec::with_capacity(3);
        if let Some(old) = store.score_of(self.key, member)? {
            if old != score && self.sole_holder(store, old)? {
                debug!("{}: score {old} loses its last holder {member}", self.ties_key);
                ops.push(self.drop_score(old));
            }
        }
        ops.push(StoreOp::Upsert {
            key: self.key.to_owned(),
            member: member.to_owned(),
            score,
        });
        ops.push(self.add_score(score));
        Ok(ops)
    }

    /// Ops that delete `member` and, if it held its score alone, the score.
    pub fn plan_remove<S: ScoreStore + ?Sized>(
        &self,
        store: &mut S,
        member: &str,
    ) -> Result<Vec<StoreOp>> {
        let mut ops = Vec::with_capacity(2);
        if let Some(score) = store.score_of(self.key, member)? {
            if self.sole_holder(store, score)? {
                debug!("{}: score {score} loses its last holder {member}", self.ties_key);
                ops.push(self.drop_score(score));
            }
        }
        ops.push(StoreOp::Remove {
            key: self.key.to_owned(),
            member: member.to_owned(),
        });
        Ok(ops)
    }

    /// Index entries range over score values, so the same bounds apply to both keys.
    pub fn plan_remove_score_range(&self, min: Bound<f64>, max: Bound<f64>) -> Vec<StoreOp> {
        vec![
            StoreOp::RemoveByScoreRange { key: self.key.to_owned(), min, max },
            StoreOp::RemoveByScoreRange { key: self.ties_key.to_owned(), min, max },
        ]
    }

    /// Drops every index entry behind `last_kept` in the leaderboard's order.
    pub fn plan_trim_behind(&self, last_kept: f64, direction: Direction) -> StoreOp {
        let (min, max) = match direction {
            Direction::Descending => (Bound::Unbounded, Bound::Excluded(last_kept)),
            Direction::Ascending => (Bound::Excluded(last_kept), Bound::Unbounded),
        };
        StoreOp::RemoveByScoreRange { key: self.ties_key.to_owned(), min, max }
    }

    /// Compares the index with the distinct scores currently held.
    pub fn check<S: ScoreStore + ?Sized>(&self, store: &mut S) -> Result<TieIndexReport> {
        let held = distinct_scores(store, self.key)?;
        let mut indexed = BTreeSet::new();
        let mut report = TieIndexReport::default();
        for (text, score) in all_entries(store, self.ties_key)? {
            if text == score_key(score) && held.contains(&OrderedFloat(score)) {
                indexed.insert(OrderedFloat(score));
            } else {
                report.stale.push(score);
            }
        }
        report.missing = held.difference(&indexed).map(|s| s.0).collect();
        if !report.is_consistent() {
            warn!(
                "{}: tie index diverged, {} missing, {} stale",
                self.ties_key,
                report.missing.len(),
                report.stale.len()
            );
        }
        Ok(report)
    }

    /// Rewrites the index from the scores currently held, in one batch.
    /// Returns the number of distinct scores written.
    pub fn rebuild<S: ScoreStore + ?Sized>(&self, store: &mut S) -> Result<usize> {
        let held = distinct_scores(store, self.key)?;
        let mut ops = Vec::with_capacity(held.len() + 1);
        ops.push(StoreOp::Delete { key: self.ties_key.to_owned() });
        ops.extend(held.iter().map(|s| self.add_score(s.0)));
        store.batch(&ops)?;
        debug!("{}: rebuilt with {} scores", self.ties_key, held.len());
        Ok(held.len())
    }
}

fn all_entries<S: ScoreStore + ?Sized>(store: &mut S, key: &str) -> Result<Vec<(String, f64)>> {
    match store.count(key)? {
        0 => Ok(Vec::new()),
        n => store.range_by_position(key, 0, n - 1, Direction::Ascending),
    }
}

fn distinct_scores<S: ScoreStore + ?Sized>(
    store: &mut S,
    key: &str,
) -> Result<BTreeSet<OrderedFloat<f64>>> {
    Ok(all_entries(store, key)?
        .into_iter()
        .map(|(_, s)| OrderedFloat(s))
        .collect())
}
