use ryu::Buffer;
use std::cell::RefCell;
use std::ops::Bound;

/// Shortest round-trip text for a score, without the trailing `.0` on
/// integral values. Infinities use the spelling Redis accepts as a bound.
#[inline]
pub fn fmt_f64(buf: &mut Buffer, score: f64) -> &str {
    if score == f64::INFINITY {
        return "+inf";
    }
    if score == f64::NEG_INFINITY {
        return "-inf";
    }
    debug_assert!(score.is_finite());
    let formatted = buf.format_finite(score);
    formatted.strip_suffix(".0").unwrap_or(formatted)
}

thread_local! {
    static FMT_BUF: RefCell<Buffer> = RefCell::new(Buffer::new());
}

#[inline]
pub fn with_fmt_buf<F, R>(f: F) -> R
where
    F: FnOnce(&mut Buffer) -> R,
{
    FMT_BUF.with(|b| f(&mut b.borrow_mut()))
}

/// Owned form of [`fmt_f64`].
pub fn score_text(score: f64) -> String {
    with_fmt_buf(|b| fmt_f64(b, score).to_owned())
}

/// Canonical tie-index member for a score value.
///
/// Every score that compares equal maps to the same key, so `-0.0` folds
/// into `0` and `50.0` is always written `50`.
pub fn score_key(score: f64) -> String {
    let score = if score == 0.0 { 0.0 } else { score };
    score_text(score)
}

/// Lower bound argument in `ZCOUNT`/`ZRANGEBYSCORE` syntax.
pub fn min_arg(bound: Bound<f64>) -> String {
    bound_arg(bound, "-inf")
}

/// Upper bound argument in `ZCOUNT`/`ZRANGEBYSCORE` syntax.
pub fn max_arg(bound: Bound<f64>) -> String {
    bound_arg(bound, "+inf")
}

fn bound_arg(bound: Bound<f64>, open: &str) -> String {
    match bound {
        Bound::Included(s) => score_text(s),
        Bound::Excluded(s) => format!("({}", score_text(s)),
        Bound::Unbounded => open.to_owned(),
    }
}
