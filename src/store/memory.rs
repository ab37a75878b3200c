use rustc_hash::FxHashMap;
use std::ops::Bound;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{Aggregate, Direction, Expiry, Reply, ScoreStore, SetOp, StoreOp};
use crate::error::{check_score, Result};
use crate::score_set::ScoreSet;

/// In-process keyspace implementing the full [`ScoreStore`] contract.
///
/// Sorted sets and field maps live under independent key names, the way a
/// Redis database holds zsets and hashes. Empty collections disappear, and
/// expired keys are dropped lazily on the next access. A batch runs under a
/// single `&mut` borrow, which makes it atomic.
#[derive(Default, Debug)]
pub struct MemoryStore {
    sets: FxHashMap<String, ScoreSet>,
    hashes: FxHashMap<String, FxHashMap<String, String>>,
    deadlines: FxHashMap<String, SystemTime>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn purge_if_expired(&mut self, key: &str) {
        let expired = self
            .deadlines
            .get(key)
            .is_some_and(|deadline| *deadline <= SystemTime::now());
        if expired {
            self.drop_key(key);
        }
    }

    fn drop_key(&mut self, key: &str) -> bool {
        self.deadlines.remove(key);
        let set = self.sets.remove(key).is_some();
        let hash = self.hashes.remove(key).is_some();
        set || hash
    }

    fn exists(&mut self, key: &str) -> bool {
        self.purge_if_expired(key);
        self.sets.contains_key(key) || self.hashes.contains_key(key)
    }

    fn with_write<F, R>(&mut self, key: &str, f: F) -> R
    where
        F: FnOnce(&mut ScoreSet) -> R,
    {
        self.purge_if_expired(key);
        let set = self.sets.entry(key.to_owned()).or_default();
        let result = f(set);
        if set.is_empty() {
            self.sets.remove(key);
            if !self.hashes.contains_key(key) {
                self.deadlines.remove(key);
            }
        }
        result
    }

    fn with_read<F, R>(&mut self, key: &str, f: F) -> R
    where
        F: FnOnce(&ScoreSet) -> R,
    {
        self.purge_if_expired(key);
        f(self.sets.get(key).unwrap_or(&ScoreSet::default()))
    }

    fn with_hash<F, R>(&mut self, key: &str, f: F) -> R
    where
        F: FnOnce(&mut FxHashMap<String, String>) -> R,
    {
        self.purge_if_expired(key);
        let hash = self.hashes.entry(key.to_owned()).or_default();
        let result = f(hash);
        if hash.is_empty() {
            self.hashes.remove(key);
            if !self.sets.contains_key(key) {
                self.deadlines.remove(key);
            }
        }
        result
    }

    /// Remaining time to live of `key`, if one is set.
    pub fn ttl(&mut self, key: &str) -> Option<Duration> {
        self.purge_if_expired(key);
        self.deadlines
            .get(key)
            .map(|d| d.duration_since(SystemTime::now()).unwrap_or_default())
    }

    /// Whether `key` currently holds a sorted set or a field map.
    pub fn contains_key(&mut self, key: &str) -> bool {
        self.exists(key)
    }

    fn apply(&mut self, op: &StoreOp) -> Result<Reply> {
        let reply = match op {
            StoreOp::Upsert { key, member, score } => {
                Reply::Count(self.upsert(key, member, *score)? as usize)
            }
            StoreOp::Remove { key, member } => Reply::Count(self.remove(key, member)? as usize),
            StoreOp::Score { key, member } => Reply::Score(self.score_of(key, member)?),
            StoreOp::Rank { key, member, direction } => {
                Reply::Rank(self.rank_of(key, member, *direction)?)
            }
            StoreOp::Count { key } => Reply::Count(self.count(key)?),
            StoreOp::CountInScoreRange { key, min, max } => {
                Reply::Count(self.count_in_score_range(key, *min, *max)?)
            }
            StoreOp::RemoveByScoreRange { key, min, max } => {
                Reply::Count(self.remove_by_score_range(key, *min, *max)?)
            }
            StoreOp::RemoveByRankRange { key, start, stop } => {
                Reply::Count(self.remove_by_rank_range(key, *start, *stop)?)
            }
            StoreOp::SetField { key, field, value } => Reply::Count(self.with_hash(key, |h| {
                h.insert(field.clone(), value.clone()).is_none() as usize
            })),
            StoreOp::GetField { key, field } => {
                self.purge_if_expired(key);
                Reply::Field(self.hashes.get(key).and_then(|h| h.get(field)).cloned())
            }
            StoreOp::RemoveField { key, field } => {
                Reply::Count(self.with_hash(key, |h| h.remove(field).is_some() as usize))
            }
            StoreOp::Expire { key, expiry } => {
                if !self.exists(key) {
                    Reply::Count(0)
                } else {
                    let deadline = match expiry {
                        Expiry::In(ttl) => SystemTime::now().checked_add(*ttl),
                        Expiry::At(ts) => UNIX_EPOCH.checked_add(Duration::from_secs(*ts)),
                    };
                    // Deadlines past what the clock can represent never arrive.
                    match deadline {
                        Some(deadline) => {
                            self.deadlines.insert(key.clone(), deadline);
                            self.purge_if_expired(key);
                        }
                        None => {
                            self.deadlines.remove(key);
                        }
                    }
                    Reply::Count(1)
                }
            }
            StoreOp::Delete { key } => {
                self.purge_if_expired(key);
                Reply::Count(self.drop_key(key) as usize)
            }
        };
        Ok(reply)
    }
}

impl ScoreStore for MemoryStore {
    fn upsert(&mut self, key: &str, member: &str, score: f64) -> Result<bool> {
        let score = check_score(score)?;
        Ok(self.with_write(key, |s| s.insert(score, member)))
    }

    fn remove(&mut self, key: &str, member: &str) -> Result<bool> {
        Ok(self.with_write(key, |s| s.remove(member)))
    }

    fn score_of(&mut self, key: &str, member: &str) -> Result<Option<f64>> {
        Ok(self.with_read(key, |s| s.score(member)))
    }

    fn rank_of(&mut self, key: &str, member: &str, direction: Direction) -> Result<Option<usize>> {
        Ok(self.with_read(key, |s| match direction {
            Direction::Ascending => s.rank(member),
            Direction::Descending => s.rev_rank(member),
        }))
    }

    fn count(&mut self, key: &str) -> Result<usize> {
        Ok(self.with_read(key, |s| s.len()))
    }

    fn count_in_score_range(&mut self, key: &str, min: Bound<f64>, max: Bound<f64>) -> Result<usize> {
        Ok(self.with_read(key, |s| s.count_in_range(min, max)))
    }

    fn range_by_position(
        &mut self,
        key: &str,
        start: usize,
        stop: usize,
        direction: Direction,
    ) -> Result<Vec<(String, f64)>> {
        Ok(self.with_read(key, |s| {
            s.range(start, stop, direction)
                .into_iter()
                .map(|(m, sc)| (m.to_owned(), sc))
                .collect()
        }))
    }

    fn range_by_score(
        &mut self,
        key: &str,
        min: Bound<f64>,
        max: Bound<f64>,
        direction: Direction,
    ) -> Result<Vec<(String, f64)>> {
        Ok(self.with_read(key, |s| {
            let owned = |(m, sc): (&str, f64)| (m.to_owned(), sc);
            let it = s.iter_score_range(min, max);
            match direction {
                Direction::Ascending => it.map(owned).collect(),
                Direction::Descending => it.rev().map(owned).collect(),
            }
        }))
    }

    fn remove_by_score_range(&mut self, key: &str, min: Bound<f64>, max: Bound<f64>) -> Result<usize> {
        Ok(self.with_write(key, |s| s.remove_score_range(min, max)))
    }

    fn remove_by_rank_range(&mut self, key: &str, start: usize, stop: usize) -> Result<usize> {
        Ok(self.with_write(key, |s| s.remove_rank_range(start, stop)))
    }

    fn combine_into(
        &mut self,
        dest: &str,
        sources: &[&str],
        op: SetOp,
        aggregate: Aggregate,
    ) -> Result<usize> {
        let mut acc: FxHashMap<String, (f64, usize)> = FxHashMap::default();
        for key in sources {
            self.with_read(key, |set| {
                for (member, score) in set.iter_all() {
                    acc.entry(member.to_owned())
                        .and_modify(|(s, seen)| {
                            *s = aggregate.combine(*s, score);
                            *seen += 1;
                        })
                        .or_insert((score, 1));
                }
            });
        }
        let mut combined = ScoreSet::default();
        for (member, (score, seen)) in acc {
            if op == SetOp::Union || seen == sources.len() {
                combined.insert(score, &member);
            }
        }
        let len = combined.len();
        self.drop_key(dest);
        if len > 0 {
            self.sets.insert(dest.to_owned(), combined);
        }
        Ok(len)
    }

    fn batch(&mut self, ops: &[StoreOp]) -> Result<Vec<Reply>> {
        // Reject bad input up front so a failing batch leaves nothing half-applied.
        for op in ops {
            if let StoreOp::Upsert { score, .. } = op {
                check_score(*score)?;
            }
        }
        ops.iter().map(|op| self.apply(op)).collect()
    }
}
