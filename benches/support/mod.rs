#![allow(dead_code)]

use std::{sync::Mutex, time::Duration};

use leaderboard::{Leaderboard, LeaderboardOptions, MemoryStore, RankPolicy};
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

static BASE_SEED: Lazy<u64> = Lazy::new(|| {
    std::env::var("LEADERBOARD_BENCH_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x7d11_5eed_f065_cafe)
});

static RNG_COUNTER: Lazy<Mutex<u64>> = Lazy::new(|| Mutex::new(0));

pub fn usize_env(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

pub fn duration_env(name: &str, default_secs: f64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(default_secs);
    Duration::from_secs_f64(secs)
}

#[inline]
pub fn seeded_rng() -> StdRng {
    let mut guard = RNG_COUNTER.lock().unwrap();
    let seed = BASE_SEED.wrapping_add(*guard);
    *guard = guard.wrapping_add(1);
    StdRng::seed_from_u64(seed)
}

/// Every member on its own score.
pub fn unique_scores(n: usize) -> Vec<(String, f64)> {
    (0..n).map(|i| (format!("member:{i}"), i as f64)).collect()
}

/// Members spread over `distinct` score values, so groups of ties are large.
pub fn tied_scores(n: usize, distinct: usize) -> Vec<(String, f64)> {
    let mut rng = seeded_rng();
    (0..n)
        .map(|i| (format!("tied:{i}"), rng.gen_range(0..distinct.max(1)) as f64))
        .collect()
}

pub fn build_board(entries: &[(String, f64)], policy: RankPolicy) -> Leaderboard<MemoryStore> {
    let options = LeaderboardOptions::default().with_policy(policy);
    let mut board = Leaderboard::with_options("bench", MemoryStore::new(), options);
    board.rank_members(entries).unwrap();
    board
}

pub fn pick_members(entries: &[(String, f64)], k: usize) -> Vec<String> {
    let mut rng = seeded_rng();
    let mut names: Vec<String> = entries.iter().map(|(m, _)| m.clone()).collect();
    names.shuffle(&mut rng);
    names.truncate(k);
    names
}

pub const POLICIES: [(&str, RankPolicy); 3] = [
    ("standard", RankPolicy::Standard),
    ("tie_aware", RankPolicy::TieAware),
    ("dense", RankPolicy::Dense),
];
