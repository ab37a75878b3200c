//! Joins raw store entries with ranks and member data, shaped per request.

use std::cmp::Ordering;

use crate::config::{FieldNames, RequestOptions, SortBy};
use crate::error::{Error, Result};
use crate::format::{score_key, score_text};
use crate::policy::{ahead_of, RankContext, RankPolicy};
use crate::store::{Reply, ScoreStore, StoreOp};

/// One line of a leaderboard query.
///
/// `score` and `rank` are `None` when they were not requested or when the
/// member holds no score.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedEntry {
    pub member: String,
    pub score: Option<f64>,
    pub rank: Option<usize>,
    pub member_data: Option<String>,
}

impl RankedEntry {
    pub fn new(member: impl Into<String>) -> Self {
        Self {
            member: member.into(),
            ..Self::default()
        }
    }

    /// Name/value pairs under caller-chosen field names. Absent fields are skipped.
    pub fn fields(&self, names: &FieldNames) -> Vec<(String, String)> {
        let mut out = vec![(names.member.clone(), self.member.clone())];
        if let Some(score) = self.score {
            out.push((names.score.clone(), score_text(score)));
        }
        if let Some(rank) = self.rank {
            out.push((names.rank.clone(), rank.to_string()));
        }
        if let Some(data) = &self.member_data {
            out.push((names.member_data.clone(), data.clone()));
        }
        out
    }
}

pub(crate) struct Assembler<'a> {
    pub policy: RankPolicy,
    pub cx: RankContext<'a>,
    pub data_key: &'a str,
    pub request: &'a RequestOptions,
}

impl Assembler<'_> {
    /// Entries for a contiguous slice of the ordering beginning at offset `start`.
    pub fn window<S: ScoreStore + ?Sized>(
        &self,
        store: &mut S,
        start: usize,
        slice: Vec<(String, f64)>,
    ) -> Result<Vec<RankedEntry>> {
        let ranks = if self.request.wants_rank() {
            let scores: Vec<f64> = slice.iter().map(|(_, s)| *s).collect();
            self.policy.window_ranks(store, &self.cx, start, &scores)?
        } else {
            vec![None; slice.len()]
        };
        let entries = slice
            .into_iter()
            .zip(ranks)
            .map(|((member, score), rank)| RankedEntry {
                member,
                score: Some(score),
                rank,
                member_data: None,
            })
            .collect();
        self.finish(store, entries)
    }

    /// Entries for an arbitrary member list, in the order given.
    pub fn list<S: ScoreStore + ?Sized, M: AsRef<str>>(
        &self,
        store: &mut S,
        members: &[M],
    ) -> Result<Vec<RankedEntry>> {
        if self.request.members_only {
            let entries = members.iter().map(|m| RankedEntry::new(m.as_ref())).collect();
            return self.finish(store, entries);
        }
        let standard = self.policy == RankPolicy::Standard;
        let mut ops = Vec::with_capacity(members.len() * 2);
        for member in members {
            let member = member.as_ref();
            ops.push(StoreOp::Score { key: self.cx.key.to_owned(), member: member.to_owned() });
            if standard {
                ops.push(StoreOp::Rank {
                    key: self.cx.key.to_owned(),
                    member: member.to_owned(),
                    direction: self.cx.direction,
                });
            }
        }
        let mut replies = store.batch(&ops)?.into_iter();

        let mut entries = Vec::with_capacity(members.len());
        for member in members {
            let mut entry = RankedEntry::new(member.as_ref());
            entry.score = next(&mut replies)?.into_score()?;
            if standard {
                entry.rank = next(&mut replies)?.into_rank()?.map(|p| p + 1);
            }
            entries.push(entry);
        }
        if !standard && self.request.wants_rank() {
            self.tied_ranks(store, &mut entries)?;
        }
        if !self.request.include_missing {
            entries.retain(|e| e.score.is_some());
        }
        self.finish(store, entries)
    }

    /// One batched lookup resolving every present entry's rank from its score.
    fn tied_ranks<S: ScoreStore + ?Sized>(
        &self,
        store: &mut S,
        entries: &mut [RankedEntry],
    ) -> Result<()> {
        let ops: Vec<StoreOp> = entries
            .iter()
            .filter_map(|e| e.score)
            .map(|score| match self.policy {
                RankPolicy::Dense => StoreOp::Rank {
                    key: self.cx.ties_key.to_owned(),
                    member: score_key(score),
                    direction: self.cx.direction,
                },
                _ => {
                    let (min, max) = ahead_of(score, self.cx.direction);
                    StoreOp::CountInScoreRange { key: self.cx.key.to_owned(), min, max }
                }
            })
            .collect();
        let mut replies = store.batch(&ops)?.into_iter();
        for entry in entries.iter_mut().filter(|e| e.score.is_some()) {
            entry.rank = match next(&mut replies)? {
                Reply::Count(ahead) => Some(ahead + 1),
                reply => reply.into_rank()?.map(|p| p + 1),
            };
        }
        Ok(())
    }

    fn finish<S: ScoreStore + ?Sized>(
        &self,
        store: &mut S,
        mut entries: Vec<RankedEntry>,
    ) -> Result<Vec<RankedEntry>> {
        let request = self.request;
        if request.wants_member_data() && !entries.is_empty() {
            let ops: Vec<StoreOp> = entries
                .iter()
                .map(|e| StoreOp::GetField {
                    key: self.data_key.to_owned(),
                    field: e.member.clone(),
                })
                .collect();
            for (entry, reply) in entries.iter_mut().zip(store.batch(&ops)?) {
                entry.member_data = reply.into_field()?;
            }
        }
        for entry in &mut entries {
            if request.zero_index_rank {
                entry.rank = entry.rank.map(|r| r - 1);
            }
            if !request.wants_score() {
                entry.score = None;
            }
            if !request.wants_rank() {
                entry.rank = None;
            }
        }
        sort_entries(&mut entries, request.sort_by);
        Ok(entries)
    }
}

fn next(replies: &mut impl Iterator<Item = Reply>) -> Result<Reply> {
    replies.next().ok_or(Error::UnexpectedReply("batch"))
}

/// Stable ascending sort; entries missing the key go last.
pub(crate) fn sort_entries(entries: &mut [RankedEntry], sort_by: SortBy) {
    match sort_by {
        SortBy::None => {}
        SortBy::Rank => entries.sort_by_key(|e| (e.rank.is_none(), e.rank)),
        SortBy::Score => entries.sort_by(|a, b| match (a.score, b.score) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
    }
}
