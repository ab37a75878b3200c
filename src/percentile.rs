use crate::config::Order;

/// Share of the field a member outranks, as a whole percentage.
///
/// `total` is the member count and `rev_rank` the member's 0-based position
/// with the highest score first. The result is flipped for `LowToHigh`
/// boards so a larger percentile always means a better standing.
///
/// Returns `None` when `rev_rank` does not fall inside a board of `total`.
pub fn percentile_from_rank(total: usize, rev_rank: usize, order: Order) -> Option<u32> {
    let outranked = total.checked_sub(rev_rank)?.checked_sub(1)? as f64;
    let percentile = ((outranked / total as f64 * 100.0).ceil() as u32).min(100);
    Some(match order {
        Order::HighToLow => percentile,
        Order::LowToHigh => 100 - percentile,
    })
}

/// Fractional index into the ascending score order for `percentile`.
///
/// Returns `None` for an empty board or a percentile outside `[0, 100]`.
pub fn percentile_index(total: usize, percentile: f64, order: Order) -> Option<f64> {
    if total == 0 || !(0.0..=100.0).contains(&percentile) {
        return None;
    }
    let percentile = match order {
        Order::HighToLow => percentile,
        Order::LowToHigh => 100.0 - percentile,
    };
    Some((total - 1) as f64 * percentile / 100.0)
}

/// Linear interpolation between the scores at `floor(index)` and `ceil(index)`.
pub fn interpolate(lower: f64, upper: f64, index: f64) -> f64 {
    let fraction = index - index.floor();
    if fraction == 0.0 {
        lower
    } else {
        lower + fraction * (upper - lower)
    }
}
