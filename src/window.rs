//! Page, "around me" and rank-range requests turned into store offsets.
//!
//! Every window is inclusive on both ends and clamped to `[0, total - 1]`;
//! `None` stands for an empty result.

/// Inclusive, 0-based offsets into the leaderboard's own ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    fn clamped(start: usize, end: usize, total: usize) -> Option<Self> {
        if total == 0 || start >= total {
            return None;
        }
        Some(Self {
            start,
            end: end.min(total - 1),
        })
    }
}

pub fn total_pages(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1))
}

/// Window for 1-based `page`. Out-of-range pages clamp to the first or last page.
pub fn page_window(page: i64, page_size: usize, total: usize) -> Option<Window> {
    let page_size = page_size.max(1);
    let last = total_pages(total, page_size).max(1) as i64;
    let page = page.clamp(1, last) as usize;
    let start = (page - 1) * page_size;
    Window::clamped(start, start.saturating_add(page_size - 1), total)
}

/// Window of `page_size` entries centred on the member at `position`.
pub fn around_member_window(position: usize, page_size: usize, total: usize) -> Option<Window> {
    let page_size = page_size.max(1);
    let start = position.saturating_sub(page_size / 2);
    Window::clamped(start, start.saturating_add(page_size - 1), total)
}

/// Window for the 1-based inclusive ranks `start_rank..=end_rank`.
pub fn rank_range_window(start_rank: i64, end_rank: i64, total: usize) -> Option<Window> {
    if end_rank < 1 || end_rank < start_rank {
        return None;
    }
    let start = (start_rank - 1).max(0) as usize;
    let end = (end_rank - 1) as usize;
    Window::clamped(start, end, total)
}

/// 1-based page holding the member at `position`.
pub fn page_of_position(position: usize, page_size: usize) -> usize {
    position / page_size.max(1) + 1
}
