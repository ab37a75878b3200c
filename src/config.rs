use crate::policy::RankPolicy;
use crate::store::Direction;

/// Page size used when none is configured or a zero size is requested.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Which end of the score range counts as first place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Order {
    /// Highest score is rank 1.
    #[default]
    HighToLow,
    /// Lowest score is rank 1.
    LowToHigh,
}

impl Order {
    /// Store traversal that lists first place first.
    pub fn direction(self) -> Direction {
        match self {
            Order::HighToLow => Direction::Descending,
            Order::LowToHigh => Direction::Ascending,
        }
    }
}

/// Per-leaderboard settings, fixed at construction except for the page size.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LeaderboardOptions {
    pub page_size: usize,
    pub order: Order,
    pub policy: RankPolicy,
    /// Suffix of the field-map key holding per-member data.
    pub member_data_namespace: String,
    /// Suffix of the key holding the distinct-score index.
    pub ties_namespace: String,
}

impl Default for LeaderboardOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            order: Order::HighToLow,
            policy: RankPolicy::Standard,
            member_data_namespace: "member_data".to_owned(),
            ties_namespace: "ties".to_owned(),
        }
    }
}

impl LeaderboardOptions {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn with_policy(mut self, policy: RankPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_member_data_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.member_data_namespace = namespace.into();
        self
    }

    pub fn with_ties_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.ties_namespace = namespace.into();
        self
    }

    /// Replaces a zero page size with the default.
    pub(crate) fn validated(mut self) -> Self {
        self.page_size = effective_page_size(self.page_size);
        self
    }
}

pub(crate) fn effective_page_size(page_size: usize) -> usize {
    if page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    }
}

/// Secondary ordering applied to an assembled result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortBy {
    #[default]
    None,
    /// Ascending rank; unranked entries go last.
    Rank,
    /// Ascending score; entries without a score go last.
    Score,
}

/// Shape of the entries a query returns.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RequestOptions {
    pub with_scores: bool,
    pub with_rank: bool,
    /// Report rank 0 for first place instead of 1.
    pub zero_index_rank: bool,
    pub with_member_data: bool,
    /// Only member names; overrides every other field flag.
    pub members_only: bool,
    /// Keep entries for members that are not on the leaderboard when ranking
    /// an explicit member list.
    pub include_missing: bool,
    pub sort_by: SortBy,
    /// Overrides the leaderboard's page size for this call.
    pub page_size: Option<usize>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            with_scores: true,
            with_rank: true,
            zero_index_rank: false,
            with_member_data: false,
            members_only: false,
            include_missing: true,
            sort_by: SortBy::None,
            page_size: None,
        }
    }
}

impl RequestOptions {
    pub fn members_only() -> Self {
        Self {
            members_only: true,
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn sorted_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub(crate) fn wants_score(&self) -> bool {
        self.with_scores && !self.members_only
    }

    pub(crate) fn wants_rank(&self) -> bool {
        self.with_rank && !self.members_only
    }

    pub(crate) fn wants_member_data(&self) -> bool {
        self.with_member_data && !self.members_only
    }
}

/// Field names used when an entry is rendered as name/value pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FieldNames {
    pub member: String,
    pub score: String,
    pub rank: String,
    pub member_data: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            member: "member".to_owned(),
            score: "score".to_owned(),
            rank: "rank".to_owned(),
            member_data: "member_data".to_owned(),
        }
    }
}
