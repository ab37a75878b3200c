use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::store::Direction;

type Bucket = SmallVec<[String; 4]>;

/// Members ordered by `(score, member)`, the same order Redis keeps a zset in.
///
/// Members sharing a score live in one bucket sorted lexicographically, so
/// the ascending order breaks ties by member name and the descending order
/// by reverse member name.
#[derive(Default, Debug, Clone)]
pub struct ScoreSet {
    by_score: BTreeMap<OrderedFloat<f64>, Bucket>,
    members: FxHashMap<String, OrderedFloat<f64>>,
}

/// `Bound<f64>` pair as a `BTreeMap` range, or `None` when it selects nothing.
/// `BTreeMap::range` panics on inverted or empty-exclusive ranges.
fn score_range(
    min: Bound<f64>,
    max: Bound<f64>,
) -> Option<(Bound<OrderedFloat<f64>>, Bound<OrderedFloat<f64>>)> {
    let value = |b: &Bound<f64>| match b {
        Bound::Included(s) | Bound::Excluded(s) => Some(*s),
        Bound::Unbounded => None,
    };
    if let (Some(lo), Some(hi)) = (value(&min), value(&max)) {
        if lo.is_nan() || hi.is_nan() || lo > hi {
            return None;
        }
        let both_inclusive = matches!((min, max), (Bound::Included(_), Bound::Included(_)));
        if lo == hi && !both_inclusive {
            return None;
        }
    }
    Some((min.map(OrderedFloat), max.map(OrderedFloat)))
}

/// Appends positions `start..=stop` of a bucket walk to `out`, skipping
/// whole buckets that end before `start`.
fn collect_positions<'a, I>(buckets: I, start: usize, stop: usize, rev: bool, out: &mut Vec<(&'a str, f64)>)
where
    I: Iterator<Item = (&'a OrderedFloat<f64>, &'a Bucket)>,
{
    let mut offset = 0;
    for (score, bucket) in buckets {
        if offset > stop {
            break;
        }
        let lo = offset;
        offset += bucket.len();
        if offset <= start {
            continue;
        }
        let from = start.saturating_sub(lo);
        let to = (stop + 1 - lo).min(bucket.len());
        let tagged = |m: &'a String| (m.as_str(), score.0);
        if rev {
            out.extend(bucket.iter().rev().skip(from).take(to - from).map(tagged));
        } else {
            out.extend(bucket[from..to].iter().map(tagged));
        }
    }
}

impl ScoreSet {
    /// Inserts or rescores `member`. Returns `true` when the member is new.
    pub fn insert(&mut self, score: f64, member: &str) -> bool {
        let key = OrderedFloat(score);
        let added = match self.members.insert(member.to_owned(), key) {
            Some(old) if old == key => return false,
            Some(old) => {
                self.detach(old, member);
                false
            }
            None => true,
        };
        let bucket = self.by_score.entry(key).or_default();
        if let Err(pos) = bucket.binary_search_by(|m| m.as_str().cmp(member)) {
            bucket.insert(pos, member.to_owned());
        }
        added
    }

    fn detach(&mut self, score: OrderedFloat<f64>, member: &str) {
        if let Some(bucket) = self.by_score.get_mut(&score) {
            if let Ok(pos) = bucket.binary_search_by(|m| m.as_str().cmp(member)) {
                bucket.remove(pos);
            }
            if bucket.is_empty() {
                self.by_score.remove(&score);
            }
        }
    }

    pub fn remove(&mut self, member: &str) -> bool {
        match self.members.remove(member) {
            Some(score) => {
                self.detach(score, member);
                true
            }
            None => false,
        }
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.members.get(member).map(|s| s.0)
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.contains_key(member)
    }

    /// 0-based position in ascending order.
    pub fn rank(&self, member: &str) -> Option<usize> {
        let score = *self.members.get(member)?;
        let bucket = self.by_score.get(&score)?;
        let pos = bucket.binary_search_by(|m| m.as_str().cmp(member)).ok()?;
        let before: usize = self.by_score.range(..score).map(|(_, b)| b.len()).sum();
        Some(before + pos)
    }

    /// 0-based position in descending order.
    pub fn rev_rank(&self, member: &str) -> Option<usize> {
        self.rank(member).map(|r| self.len() - 1 - r)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn count_in_range(&self, min: Bound<f64>, max: Bound<f64>) -> usize {
        match score_range(min, max) {
            Some(range) => self.by_score.range(range).map(|(_, b)| b.len()).sum(),
            None => 0,
        }
    }

    /// Members at positions `start..=stop` of the walk in `direction`.
    /// Positions past the end are dropped.
    pub fn range(&self, start: usize, stop: usize, direction: Direction) -> Vec<(&str, f64)> {
        let mut out = Vec::new();
        if start > stop || start >= self.len() {
            return out;
        }
        let stop = stop.min(self.len() - 1);
        out.reserve(stop - start + 1);
        match direction {
            Direction::Ascending => collect_positions(self.by_score.iter(), start, stop, false, &mut out),
            Direction::Descending => {
                collect_positions(self.by_score.iter().rev(), start, stop, true, &mut out)
            }
        }
        out
    }

    /// Members with a score inside the bounds, ascending.
    pub fn iter_score_range(
        &self,
        min: Bound<f64>,
        max: Bound<f64>,
    ) -> impl DoubleEndedIterator<Item = (&str, f64)> + '_ {
        score_range(min, max)
            .map(|r| self.by_score.range(r))
            .into_iter()
            .flatten()
            .flat_map(|(score, bucket)| bucket.iter().map(move |m| (m.as_str(), score.0)))
    }

    pub fn iter_all(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.by_score
            .iter()
            .flat_map(|(score, bucket)| bucket.iter().map(move |m| (m.as_str(), score.0)))
    }

    fn remove_all(&mut self, doomed: Vec<String>) -> usize {
        for member in &doomed {
            self.remove(member);
        }
        doomed.len()
    }

    pub fn remove_score_range(&mut self, min: Bound<f64>, max: Bound<f64>) -> usize {
        let doomed = self
            .iter_score_range(min, max)
            .map(|(m, _)| m.to_owned())
            .collect();
        self.remove_all(doomed)
    }

    /// Removes ascending positions `start..=stop`.
    pub fn remove_rank_range(&mut self, start: usize, stop: usize) -> usize {
        let doomed = self
            .range(start, stop, Direction::Ascending)
            .into_iter()
            .map(|(m, _)| m.to_owned())
            .collect();
        self.remove_all(doomed)
    }

    /// Number of distinct score values held by at least one member.
    pub fn distinct_scores(&self) -> usize {
        self.by_score.len()
    }
}
