use log::{debug, info};
use std::ops::Bound;
use std::time::Duration;

use crate::assemble::{Assembler, RankedEntry};
use crate::config::{effective_page_size, LeaderboardOptions, RequestOptions};
use crate::error::{check_score, Error, Result};
use crate::percentile::{interpolate, percentile_from_rank, percentile_index};
use crate::policy::{RankContext, RankPolicy};
use crate::store::{Aggregate, Direction, Expiry, Reply, ScoreStore, SetOp, StoreOp};
use crate::tie_index::{TieIndex, TieIndexReport};
use crate::window::{self, Window};

/// Affected-row count of the first op in a batch.
fn first_count(replies: Vec<Reply>) -> Result<usize> {
    replies
        .into_iter()
        .next()
        .ok_or(Error::UnexpectedReply("batch"))?
        .into_count()
}

/// Key names a leaderboard occupies in the store.
#[derive(Clone, Debug)]
struct Keys {
    name: String,
    ties: String,
    data: String,
}

impl Keys {
    fn new(name: String, options: &LeaderboardOptions) -> Self {
        Self {
            ties: format!("{name}:{}", options.ties_namespace),
            data: format!("{name}:{}", options.member_data_namespace),
            name,
        }
    }

    fn rank_context(&self, direction: Direction) -> RankContext<'_> {
        RankContext {
            key: &self.name,
            ties_key: &self.ties,
            direction,
        }
    }

    fn tie_index(&self) -> TieIndex<'_> {
        TieIndex::new(&self.name, &self.ties)
    }
}

/// A named leaderboard over a [`ScoreStore`].
///
/// The leaderboard owns its store handle; pass `&mut store` to share one store
/// between several boards. Members are ranked by score in the configured
/// [`Order`](crate::Order) and ranks are reported per the configured
/// [`RankPolicy`].
pub struct Leaderboard<S: ScoreStore> {
    keys: Keys,
    options: LeaderboardOptions,
    store: S,
}

impl<S: ScoreStore> Leaderboard<S> {
    pub fn new(name: impl Into<String>, store: S) -> Self {
        Self::with_options(name, store, LeaderboardOptions::default())
    }

    pub fn with_options(name: impl Into<String>, store: S, options: LeaderboardOptions) -> Self {
        let options = options.validated();
        Self {
            keys: Keys::new(name.into(), &options),
            options,
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.keys.name
    }

    /// Key of the distinct-score index.
    pub fn ties_key(&self) -> &str {
        &self.keys.ties
    }

    /// Key of the member data field map.
    pub fn member_data_key(&self) -> &str {
        &self.keys.data
    }

    pub fn options(&self) -> &LeaderboardOptions {
        &self.options
    }

    pub fn page_size(&self) -> usize {
        self.options.page_size
    }

    /// Zero restores the default.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.options.page_size = effective_page_size(page_size);
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Another leaderboard with the same options over this one's store.
    pub fn sibling(&mut self, name: impl Into<String>) -> Leaderboard<&mut S> {
        Leaderboard::with_options(name, &mut self.store, self.options.clone())
    }

    fn direction(&self) -> Direction {
        self.options.order.direction()
    }

    fn page_size_for(&self, request: &RequestOptions) -> usize {
        request
            .page_size
            .map_or(self.options.page_size, effective_page_size)
    }

    fn upsert_ops(&mut self, member: &str, score: f64, data: Option<&str>) -> Result<Vec<StoreOp>> {
        let mut ops = if self.options.policy.tracks_ties() {
            self.keys.tie_index().plan_upsert(&mut self.store, member, score)?
        } else {
            vec![StoreOp::Upsert {
                key: self.keys.name.clone(),
                member: member.to_owned(),
                score,
            }]
        };
        if let Some(data) = data {
            ops.push(StoreOp::SetField {
                key: self.keys.data.clone(),
                field: member.to_owned(),
                value: data.to_owned(),
            });
        }
        Ok(ops)
    }

    // ---- writes ----

    /// Sets `member`'s score, and its data when given, in one atomic batch.
    pub fn rank_member(&mut self, member: &str, score: f64, data: Option<&str>) -> Result<()> {
        let score = check_score(score)?;
        let ops = self.upsert_ops(member, score, data)?;
        self.store.batch(&ops)?;
        Ok(())
    }

    /// Bulk [`rank_member`](Self::rank_member) without member data.
    ///
    /// Under [`RankPolicy::Standard`] all writes go out as one batch. Tie-tracking
    /// policies need each member's previous score, so they write one member at a
    /// time.
    pub fn rank_members<M: AsRef<str>>(&mut self, members: &[(M, f64)]) -> Result<()> {
        for (_, score) in members {
            check_score(*score)?;
        }
        if self.options.policy.tracks_ties() {
            for (member, score) in members {
                self.rank_member(member.as_ref(), *score, None)?;
            }
            return Ok(());
        }
        let ops: Vec<StoreOp> = members
            .iter()
            .map(|(member, score)| StoreOp::Upsert {
                key: self.keys.name.clone(),
                member: member.as_ref().to_owned(),
                score: *score,
            })
            .collect();
        self.store.batch(&ops)?;
        Ok(())
    }

    /// Ranks `member` only when `predicate` accepts its current score.
    /// Returns whether the write happened.
    pub fn rank_member_if<F>(
        &mut self,
        member: &str,
        score: f64,
        data: Option<&str>,
        predicate: F,
    ) -> Result<bool>
    where
        F: FnOnce(Option<f64>) -> bool,
    {
        let current = self.store.score_of(&self.keys.name, member)?;
        if !predicate(current) {
            return Ok(false);
        }
        self.rank_member(member, score, data)?;
        Ok(true)
    }

    /// Writes `member` into each named leaderboard sharing this one's store and options.
    pub fn rank_member_across<N: AsRef<str>>(
        &mut self,
        names: &[N],
        member: &str,
        score: f64,
        data: Option<&str>,
    ) -> Result<()> {
        for name in names {
            self.sibling(name.as_ref()).rank_member(member, score, data)?;
        }
        Ok(())
    }

    /// Adds `delta` to `member`'s score, treating an absent member as 0.
    /// Returns the new score.
    pub fn change_score_for(&mut self, member: &str, delta: f64, data: Option<&str>) -> Result<f64> {
        let current = self.store.score_of(&self.keys.name, member)?.unwrap_or(0.0);
        let score = check_score(current + delta)?;
        self.rank_member(member, score, data)?;
        Ok(score)
    }

    /// Removes `member` and its data. Returns `false` when it was not ranked.
    pub fn remove_member(&mut self, member: &str) -> Result<bool> {
        let mut ops = if self.options.policy.tracks_ties() {
            self.keys.tie_index().plan_remove(&mut self.store, member)?
        } else {
            vec![StoreOp::Remove {
                key: self.keys.name.clone(),
                member: member.to_owned(),
            }]
        };
        let removal = ops.len() - 1;
        ops.push(StoreOp::RemoveField {
            key: self.keys.data.clone(),
            field: member.to_owned(),
        });
        let removed = self
            .store
            .batch(&ops)?
            .into_iter()
            .nth(removal)
            .ok_or(Error::UnexpectedReply("remove"))?
            .into_count()?;
        Ok(removed > 0)
    }

    pub fn update_member_data(&mut self, member: &str, data: &str) -> Result<()> {
        let op = StoreOp::SetField {
            key: self.keys.data.clone(),
            field: member.to_owned(),
            value: data.to_owned(),
        };
        self.store.batch(&[op])?;
        Ok(())
    }

    /// Returns `false` when there was no data to remove.
    pub fn remove_member_data(&mut self, member: &str) -> Result<bool> {
        let op = StoreOp::RemoveField {
            key: self.keys.data.clone(),
            field: member.to_owned(),
        };
        Ok(self.store.single(op)?.into_count()? > 0)
    }

    pub fn member_data_for(&mut self, member: &str) -> Result<Option<String>> {
        self.store.get_field(&self.keys.data, member)
    }

    pub fn members_data_for<M: AsRef<str>>(&mut self, members: &[M]) -> Result<Vec<Option<String>>> {
        let ops: Vec<StoreOp> = members
            .iter()
            .map(|m| StoreOp::GetField {
                key: self.keys.data.clone(),
                field: m.as_ref().to_owned(),
            })
            .collect();
        self.store
            .batch(&ops)?
            .into_iter()
            .map(|r| r.into_field())
            .collect()
    }

    /// Removes every member scored within `min..=max`. Member data is kept.
    /// A NaN bound selects nothing.
    pub fn remove_members_in_score_range(&mut self, min: f64, max: f64) -> Result<usize> {
        if min.is_nan() || max.is_nan() {
            return Ok(0);
        }
        let (min, max) = (Bound::Included(min), Bound::Included(max));
        let ops = if self.options.policy.tracks_ties() {
            self.keys.tie_index().plan_remove_score_range(min, max)
        } else {
            vec![StoreOp::RemoveByScoreRange { key: self.keys.name.clone(), min, max }]
        };
        let removed = first_count(self.store.batch(&ops)?)?;
        info!("{}: removed {removed} members in score range", self.keys.name);
        Ok(removed)
    }

    /// Keeps the best `rank` members and removes the rest. Returns the number removed.
    pub fn remove_members_outside_rank(&mut self, rank: usize) -> Result<usize> {
        let total = self.store.count(&self.keys.name)?;
        if rank >= total {
            return Ok(0);
        }
        // Positions here are ascending; high-to-low boards keep the top end.
        let (start, stop) = match self.direction() {
            Direction::Descending => (0, total - rank - 1),
            Direction::Ascending => (rank, total - 1),
        };
        let mut ops = vec![StoreOp::RemoveByRankRange {
            key: self.keys.name.clone(),
            start,
            stop,
        }];
        if self.options.policy.tracks_ties() {
            if rank == 0 {
                ops.push(StoreOp::Delete { key: self.keys.ties.clone() });
            } else {
                let last_kept = self
                    .store
                    .range_by_position(&self.keys.name, rank - 1, rank - 1, self.direction())?
                    .first()
                    .map(|(_, score)| *score)
                    .ok_or(Error::UnexpectedReply("range"))?;
                ops.push(self.keys.tie_index().plan_trim_behind(last_kept, self.direction()));
            }
        }
        let removed = first_count(self.store.batch(&ops)?)?;
        info!("{}: removed {removed} members outside rank {rank}", self.keys.name);
        Ok(removed)
    }

    fn expire_all(&mut self, expiry: Expiry) -> Result<bool> {
        let ops: Vec<StoreOp> = [&self.keys.name, &self.keys.ties, &self.keys.data]
            .into_iter()
            .map(|key| StoreOp::Expire { key: key.clone(), expiry })
            .collect();
        let set = first_count(self.store.batch(&ops)?)? > 0;
        info!("{}: expiry set to {expiry:?}", self.keys.name);
        Ok(set)
    }

    /// Expires the leaderboard and its companion keys after `seconds`.
    pub fn expire_leaderboard(&mut self, seconds: u64) -> Result<bool> {
        self.expire_all(Expiry::In(Duration::from_secs(seconds)))
    }

    /// Expires the leaderboard and its companion keys at a UNIX timestamp.
    pub fn expire_leaderboard_at(&mut self, timestamp: u64) -> Result<bool> {
        self.expire_all(Expiry::At(timestamp))
    }

    /// Deletes the leaderboard, its tie index and its member data.
    pub fn delete_leaderboard(&mut self) -> Result<bool> {
        let ops: Vec<StoreOp> = [&self.keys.name, &self.keys.ties, &self.keys.data]
            .into_iter()
            .map(|key| StoreOp::Delete { key: key.clone() })
            .collect();
        let deleted = first_count(self.store.batch(&ops)?)? > 0;
        info!("{}: deleted", self.keys.name);
        Ok(deleted)
    }

    fn combine<N: AsRef<str>>(
        &mut self,
        dest: &str,
        others: &[N],
        op: SetOp,
        aggregate: Aggregate,
    ) -> Result<usize> {
        let mut sources = Vec::with_capacity(others.len() + 1);
        sources.push(self.keys.name.as_str());
        sources.extend(others.iter().map(|o| o.as_ref()));
        let len = self.store.combine_into(dest, &sources, op, aggregate)?;
        info!("{}: {op:?} of {} boards into {dest}, {len} members", self.keys.name, sources.len());
        if self.options.policy.tracks_ties() {
            let dest_keys = Keys::new(dest.to_owned(), &self.options);
            dest_keys.tie_index().rebuild(&mut self.store)?;
        }
        Ok(len)
    }

    /// Stores the union of this leaderboard and `others` at `dest`.
    pub fn merge_leaderboards<N: AsRef<str>>(
        &mut self,
        dest: &str,
        others: &[N],
        aggregate: Aggregate,
    ) -> Result<usize> {
        self.combine(dest, others, SetOp::Union, aggregate)
    }

    /// Stores the members common to this leaderboard and `others` at `dest`.
    pub fn intersect_leaderboards<N: AsRef<str>>(
        &mut self,
        dest: &str,
        others: &[N],
        aggregate: Aggregate,
    ) -> Result<usize> {
        self.combine(dest, others, SetOp::Intersect, aggregate)
    }

    // ---- reads ----

    pub fn total_members(&mut self) -> Result<usize> {
        self.store.count(&self.keys.name)
    }

    /// Number of pages at `page_size`, or the leaderboard's own size when `None`.
    pub fn total_pages(&mut self, page_size: Option<usize>) -> Result<usize> {
        let page_size = page_size.map_or(self.options.page_size, effective_page_size);
        Ok(window::total_pages(self.total_members()?, page_size))
    }

    pub fn total_members_in_score_range(&mut self, min: f64, max: f64) -> Result<usize> {
        if min.is_nan() || max.is_nan() {
            return Ok(0);
        }
        self.store
            .count_in_score_range(&self.keys.name, Bound::Included(min), Bound::Included(max))
    }

    pub fn check_member(&mut self, member: &str) -> Result<bool> {
        Ok(self.score_for(member)?.is_some())
    }

    pub fn score_for(&mut self, member: &str) -> Result<Option<f64>> {
        self.store.score_of(&self.keys.name, member)
    }

    /// 1-based rank under the leaderboard's policy.
    pub fn rank_for(&mut self, member: &str) -> Result<Option<usize>> {
        let cx = self.keys.rank_context(self.options.order.direction());
        self.options.policy.rank_of(&mut self.store, &cx, member)
    }

    pub fn score_and_rank_for(&mut self, member: &str) -> Result<RankedEntry> {
        let mut entry = RankedEntry::new(member);
        entry.score = self.score_for(member)?;
        if let Some(score) = entry.score {
            let cx = self.keys.rank_context(self.options.order.direction());
            entry.rank = match self.options.policy {
                RankPolicy::Standard => self.options.policy.rank_of(&mut self.store, &cx, member)?,
                policy => policy.rank_of_score(&mut self.store, &cx, score)?,
            };
        }
        Ok(entry)
    }

    /// Share of the field `member` outranks, 0 to 100.
    pub fn percentile_for(&mut self, member: &str) -> Result<Option<u32>> {
        // Count and rank come from one snapshot so the rank stays inside the count.
        let ops = [
            StoreOp::Count { key: self.keys.name.clone() },
            StoreOp::Rank {
                key: self.keys.name.clone(),
                member: member.to_owned(),
                direction: Direction::Descending,
            },
        ];
        let mut replies = self.store.batch(&ops)?.into_iter();
        let (Some(total), Some(rev_rank)) = (replies.next(), replies.next()) else {
            return Err(Error::UnexpectedReply("batch"));
        };
        let (total, rev_rank) = (total.into_count()?, rev_rank.into_rank()?);
        Ok(rev_rank.and_then(|r| percentile_from_rank(total, r, self.options.order)))
    }

    /// Score at `percentile`, interpolated between neighbouring members.
    pub fn score_for_percentile(&mut self, percentile: f64) -> Result<Option<f64>> {
        let total = self.total_members()?;
        let Some(index) = percentile_index(total, percentile, self.options.order) else {
            return Ok(None);
        };
        let (lo, hi) = (index.floor() as usize, index.ceil() as usize);
        let pair = self
            .store
            .range_by_position(&self.keys.name, lo, hi, Direction::Ascending)?;
        Ok(match (pair.first(), pair.last()) {
            (Some(lower), Some(upper)) => Some(interpolate(lower.1, upper.1, index)),
            _ => None,
        })
    }

    /// 1-based page holding `member`, 0 when it is not ranked.
    pub fn page_for(&mut self, member: &str, page_size: Option<usize>) -> Result<usize> {
        let page_size = page_size.map_or(self.options.page_size, effective_page_size);
        let position = self.store.rank_of(&self.keys.name, member, self.direction())?;
        Ok(position.map_or(0, |p| window::page_of_position(p, page_size)))
    }

    fn fetch_window(
        &mut self,
        window: Option<Window>,
        request: &RequestOptions,
    ) -> Result<Vec<RankedEntry>> {
        let Some(window) = window else {
            return Ok(Vec::new());
        };
        let direction = self.direction();
        let slice = self
            .store
            .range_by_position(&self.keys.name, window.start, window.end, direction)?;
        debug!("{}: window {}..={} -> {} entries", self.keys.name, window.start, window.end, slice.len());
        let assembler = Assembler {
            policy: self.options.policy,
            cx: self.keys.rank_context(direction),
            data_key: &self.keys.data,
            request,
        };
        assembler.window(&mut self.store, window.start, slice)
    }

    /// 1-based `page` of the leaderboard. Out-of-range pages clamp to the first or last.
    pub fn leaders(&mut self, page: i64, request: &RequestOptions) -> Result<Vec<RankedEntry>> {
        let page_size = self.page_size_for(request);
        let total = self.total_members()?;
        self.fetch_window(window::page_window(page, page_size, total), request)
    }

    pub fn all_leaders(&mut self, request: &RequestOptions) -> Result<Vec<RankedEntry>> {
        let total = self.total_members()?;
        let window = total.checked_sub(1).map(|end| Window { start: 0, end });
        self.fetch_window(window, request)
    }

    /// The best `n` members.
    pub fn top(&mut self, n: usize, request: &RequestOptions) -> Result<Vec<RankedEntry>> {
        self.members_from_rank_range(1, i64::try_from(n).unwrap_or(i64::MAX), request)
    }

    /// Member at 1-based `position` of the ordering.
    pub fn leader_at(
        &mut self,
        position: usize,
        request: &RequestOptions,
    ) -> Result<Option<RankedEntry>> {
        if position == 0 {
            return Ok(None);
        }
        let Ok(position) = i64::try_from(position) else {
            return Ok(None);
        };
        Ok(self
            .members_from_rank_range(position, position, request)?
            .into_iter()
            .next())
    }

    /// Members scored within `min..=max`, in leaderboard order. A NaN bound selects nothing.
    pub fn members_from_score_range(
        &mut self,
        min: f64,
        max: f64,
        request: &RequestOptions,
    ) -> Result<Vec<RankedEntry>> {
        if min.is_nan() || max.is_nan() {
            return Ok(Vec::new());
        }
        let direction = self.direction();
        let slice = self.store.range_by_score(
            &self.keys.name,
            Bound::Included(min),
            Bound::Included(max),
            direction,
        )?;
        let Some((first, _)) = slice.first() else {
            return Ok(Vec::new());
        };
        let start = self.store.rank_of(&self.keys.name, first, direction)?;
        let assembler = Assembler {
            policy: self.options.policy,
            cx: self.keys.rank_context(direction),
            data_key: &self.keys.data,
            request,
        };
        match start {
            Some(start) => assembler.window(&mut self.store, start, slice),
            // The first member left between the two reads; rank each one on its own.
            None => {
                let members: Vec<String> = slice.into_iter().map(|(m, _)| m).collect();
                assembler.list(&mut self.store, &members)
            }
        }
    }

    /// Members holding 1-based ranks `start..=end` of the ordering.
    pub fn members_from_rank_range(
        &mut self,
        start: i64,
        end: i64,
        request: &RequestOptions,
    ) -> Result<Vec<RankedEntry>> {
        let total = self.total_members()?;
        self.fetch_window(window::rank_range_window(start, end, total), request)
    }

    /// A page-sized window centred on `member`; empty when it is not ranked.
    pub fn around_me(&mut self, member: &str, request: &RequestOptions) -> Result<Vec<RankedEntry>> {
        let Some(position) = self.store.rank_of(&self.keys.name, member, self.direction())? else {
            return Ok(Vec::new());
        };
        let page_size = self.page_size_for(request);
        let total = self.total_members()?;
        self.fetch_window(window::around_member_window(position, page_size, total), request)
    }

    /// Entries for `members` in the order given, ranked or not.
    pub fn ranked_in_list<M: AsRef<str>>(
        &mut self,
        members: &[M],
        request: &RequestOptions,
    ) -> Result<Vec<RankedEntry>> {
        let assembler = Assembler {
            policy: self.options.policy,
            cx: self.keys.rank_context(self.options.order.direction()),
            data_key: &self.keys.data,
            request,
        };
        assembler.list(&mut self.store, members)
    }

    // ---- diagnostics ----

    /// Compares the tie index with the scores held. Always consistent under
    /// [`RankPolicy::Standard`], which keeps no index.
    pub fn check_tie_index(&mut self) -> Result<TieIndexReport> {
        if !self.options.policy.tracks_ties() {
            return Ok(TieIndexReport::default());
        }
        self.keys.tie_index().check(&mut self.store)
    }

    /// Rewrites the tie index from the scores held. Returns the number of
    /// distinct scores written.
    pub fn rebuild_tie_index(&mut self) -> Result<usize> {
        if !self.options.policy.tracks_ties() {
            return Ok(0);
        }
        let written = self.keys.tie_index().rebuild(&mut self.store)?;
        info!("{}: tie index rebuilt, {written} scores", self.keys.name);
        Ok(written)
    }
}
