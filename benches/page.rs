use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use leaderboard::RequestOptions;

mod support;

fn bench_pages(c: &mut Criterion) {
    let n = support::usize_env("LEADERBOARD_BENCH_MEMBERS", 100_000);
    let entries = support::tied_scores(n, 1_000);
    let request = RequestOptions::default();

    let mut group = c.benchmark_group("leaders");
    group.measurement_time(support::duration_env("LEADERBOARD_BENCH_MEASUREMENT_SECS", 5.0));

    for (policy_name, policy) in support::POLICIES {
        let mut board = support::build_board(&entries, policy);
        let last = board.total_pages(None).unwrap() as i64;
        for (label, page) in [("first", 1), ("middle", last / 2), ("last", last)] {
            group.bench_function(BenchmarkId::new(policy_name, label), |b| {
                b.iter(|| black_box(board.leaders(page, &request).unwrap()));
            });
        }
    }
    group.finish();
}

fn bench_around_and_list(c: &mut Criterion) {
    let n = support::usize_env("LEADERBOARD_BENCH_MEMBERS", 100_000);
    let entries = support::tied_scores(n, 1_000);
    let probes = support::pick_members(&entries, 100);
    let request = RequestOptions::default();

    let mut group = c.benchmark_group("member_queries");
    for (policy_name, policy) in support::POLICIES {
        let mut board = support::build_board(&entries, policy);
        group.bench_function(BenchmarkId::new("around_me", policy_name), |b| {
            b.iter(|| {
                for member in &probes {
                    black_box(board.around_me(member, &request).unwrap());
                }
            });
        });
        group.bench_function(BenchmarkId::new("ranked_in_list", policy_name), |b| {
            b.iter(|| black_box(board.ranked_in_list(&probes, &request).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pages, bench_around_and_list);
criterion_main!(benches);
