use leaderboard::{
    Aggregate, Error, Leaderboard, LeaderboardOptions, MemoryStore, Order, RankedEntry,
    RequestOptions, SortBy, DEFAULT_PAGE_SIZE,
};

fn board_with(members: usize, options: LeaderboardOptions) -> Leaderboard<MemoryStore> {
    let mut board = Leaderboard::with_options("highscores", MemoryStore::new(), options);
    for i in 1..=members {
        let data = format!("data_{i}");
        board
            .rank_member(&format!("member_{i}"), i as f64, Some(&data))
            .unwrap();
    }
    board
}

fn board(members: usize) -> Leaderboard<MemoryStore> {
    board_with(members, LeaderboardOptions::default())
}

fn names(entries: &[RankedEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.member.as_str()).collect()
}

fn ranks(entries: &[RankedEntry]) -> Vec<Option<usize>> {
    entries.iter().map(|e| e.rank).collect()
}

#[test]
fn leaders_list_best_first() {
    let mut board = Leaderboard::new("lb", MemoryStore::new());
    for (i, score) in [1.0, 2.0, 3.0, 4.0, 5.0].into_iter().enumerate() {
        board.rank_member(&format!("m{}", i + 1), score, None).unwrap();
    }
    let page = board.leaders(1, &RequestOptions::default()).unwrap();
    assert_eq!(names(&page), ["m5", "m4", "m3", "m2", "m1"]);
    let scores: Vec<_> = page.iter().map(|e| e.score).collect();
    assert_eq!(scores, [Some(5.0), Some(4.0), Some(3.0), Some(2.0), Some(1.0)]);
    assert_eq!(ranks(&page), [Some(1), Some(2), Some(3), Some(4), Some(5)]);
}

#[test]
fn pages_clamp_and_truncate() {
    let mut board = board(DEFAULT_PAGE_SIZE + 1);
    let request = RequestOptions::default();
    assert_eq!(board.total_pages(None).unwrap(), 2);
    assert_eq!(board.total_pages(Some(10)).unwrap(), 3);

    let last = board.leaders(2, &request).unwrap();
    assert_eq!(names(&last), ["member_1"]);
    assert_eq!(last[0].rank, Some(26));

    assert_eq!(board.leaders(0, &request).unwrap()[0].member, "member_26");
    assert_eq!(names(&board.leaders(99, &request).unwrap()), ["member_1"]);

    let small = board.leaders(1, &request.clone().with_page_size(10)).unwrap();
    assert_eq!(small.len(), 10);
}

#[test]
fn empty_board_reads() {
    let mut board = board(0);
    let request = RequestOptions::default();
    assert!(board.leaders(1, &request).unwrap().is_empty());
    assert!(board.all_leaders(&request).unwrap().is_empty());
    assert!(board.around_me("nobody", &request).unwrap().is_empty());
    assert_eq!(board.total_pages(None).unwrap(), 0);
    assert_eq!(board.score_for_percentile(50.0).unwrap(), None);
}

#[test]
fn member_lookups() {
    let mut board = board(5);
    assert!(board.check_member("member_1").unwrap());
    assert!(!board.check_member("jones").unwrap());
    assert_eq!(board.score_for("member_4").unwrap(), Some(4.0));
    assert_eq!(board.rank_for("member_4").unwrap(), Some(2));
    assert_eq!(board.rank_for("jones").unwrap(), None);

    let entry = board.score_and_rank_for("member_3").unwrap();
    assert_eq!((entry.score, entry.rank), (Some(3.0), Some(3)));
    let missing = board.score_and_rank_for("jones").unwrap();
    assert_eq!((missing.score, missing.rank), (None, None));
}

#[test]
fn around_me_centres_on_member() {
    let mut board = board(DEFAULT_PAGE_SIZE * 3 + 1);
    let request = RequestOptions::default();
    let around = board.around_me("member_30", &request).unwrap();
    assert_eq!(around.len(), DEFAULT_PAGE_SIZE);
    assert_eq!(around[0].member, "member_42");
    assert_eq!(around[DEFAULT_PAGE_SIZE - 1].member, "member_18");
    assert_eq!(around[12].member, "member_30");

    let top = board.around_me("member_76", &request).unwrap();
    assert_eq!(top[0].member, "member_76");
    assert_eq!(top.len(), DEFAULT_PAGE_SIZE);
}

#[test]
fn around_the_last_member_is_short() {
    let mut board = board(50);
    let request = RequestOptions::default().with_page_size(10);
    let tail = board.around_me("member_1", &request).unwrap();
    assert!(tail.len() <= 6);
    assert_eq!(tail.last().unwrap().member, "member_1");
}

#[test]
fn percentiles_of_twelve() {
    let mut board = board(12);
    assert_eq!(board.percentile_for("member_1").unwrap(), Some(0));
    assert_eq!(board.percentile_for("member_2").unwrap(), Some(9));
    assert_eq!(board.percentile_for("member_3").unwrap(), Some(17));
    assert_eq!(board.percentile_for("member_4").unwrap(), Some(25));
    assert_eq!(board.percentile_for("member_12").unwrap(), Some(92));
    assert_eq!(board.percentile_for("jones").unwrap(), None);

    let mut reversed = board_with(12, LeaderboardOptions::default().with_order(Order::LowToHigh));
    assert_eq!(reversed.percentile_for("member_1").unwrap(), Some(100));
    assert_eq!(reversed.percentile_for("member_12").unwrap(), Some(8));
}

#[test]
fn score_at_percentile_interpolates() {
    let mut board = board(5);
    assert_eq!(board.score_for_percentile(0.0).unwrap(), Some(1.0));
    assert_eq!(board.score_for_percentile(100.0).unwrap(), Some(5.0));
    assert_eq!(board.score_for_percentile(87.5).unwrap(), Some(4.5));
    assert_eq!(board.score_for_percentile(50.0).unwrap(), Some(3.0));
    assert_eq!(board.score_for_percentile(-1.0).unwrap(), None);
    assert_eq!(board.score_for_percentile(101.0).unwrap(), None);

    let mut reversed = board_with(5, LeaderboardOptions::default().with_order(Order::LowToHigh));
    assert_eq!(reversed.score_for_percentile(0.0).unwrap(), Some(5.0));
    assert_eq!(reversed.score_for_percentile(100.0).unwrap(), Some(1.0));
    assert_eq!(reversed.score_for_percentile(12.5).unwrap(), Some(4.5));
}

#[test]
fn page_for_member() {
    let mut board = board(DEFAULT_PAGE_SIZE * 2 + 10);
    assert_eq!(board.page_for("member_60", None).unwrap(), 1);
    assert_eq!(board.page_for("member_1", None).unwrap(), 3);
    assert_eq!(board.page_for("member_1", Some(10)).unwrap(), 6);
    assert_eq!(board.page_for("jones", None).unwrap(), 0);
}

#[test]
fn score_and_rank_ranges() {
    let mut board = board(25);
    let request = RequestOptions::default();

    let by_score = board.members_from_score_range(10.0, 15.0, &request).unwrap();
    assert_eq!(by_score.len(), 6);
    assert_eq!(by_score[0].member, "member_15");
    assert_eq!(ranks(&by_score)[..2], [Some(11), Some(12)]);
    assert!(board.members_from_score_range(15.0, 10.0, &request).unwrap().is_empty());

    let by_rank = board.members_from_rank_range(5, 9, &request).unwrap();
    assert_eq!(names(&by_rank), ["member_21", "member_20", "member_19", "member_18", "member_17"]);
    assert_eq!(by_rank[0].rank, Some(5));
    assert_eq!(board.members_from_rank_range(1, 100, &request).unwrap().len(), 25);
    assert_eq!(board.total_members_in_score_range(10.0, 15.0).unwrap(), 6);
}

#[test]
fn top_and_leader_at() {
    let mut board = board(25);
    let request = RequestOptions::default();
    assert_eq!(names(&board.top(3, &request).unwrap()), ["member_25", "member_24", "member_23"]);
    assert_eq!(board.leader_at(1, &request).unwrap().unwrap().member, "member_25");
    assert_eq!(board.leader_at(25, &request).unwrap().unwrap().rank, Some(25));
    assert!(board.leader_at(26, &request).unwrap().is_none());
    assert!(board.leader_at(0, &request).unwrap().is_none());
    assert!(board.leader_at(usize::MAX, &request).unwrap().is_none());
    assert_eq!(board.top(usize::MAX, &request).unwrap().len(), 25);
    assert_eq!(board.all_leaders(&request).unwrap().len(), 25);
}

#[test]
fn ranked_in_list_keeps_input_order() {
    let mut board = board(25);
    let list = ["member_1", "member_15", "jones", "member_25"];

    let entries = board.ranked_in_list(&list, &RequestOptions::default()).unwrap();
    assert_eq!(names(&entries), list);
    assert_eq!(ranks(&entries), [Some(25), Some(11), None, Some(1)]);
    assert_eq!(entries[2].score, None);

    let present = RequestOptions {
        include_missing: false,
        ..RequestOptions::default()
    };
    assert_eq!(board.ranked_in_list(&list, &present).unwrap().len(), 3);

    let bare = RequestOptions {
        include_missing: false,
        ..RequestOptions::members_only()
    };
    let entries = board.ranked_in_list(&list, &bare).unwrap();
    assert_eq!(names(&entries), list);
    assert!(entries.iter().all(|e| e.score.is_none() && e.rank.is_none()));

    let by_rank = RequestOptions::default().sorted_by(SortBy::Rank);
    let sorted = board.ranked_in_list(&list, &by_rank).unwrap();
    assert_eq!(names(&sorted), ["member_25", "member_15", "member_1", "jones"]);

    let by_score = RequestOptions::default().sorted_by(SortBy::Score);
    let sorted = board.ranked_in_list(&list, &by_score).unwrap();
    assert_eq!(names(&sorted), ["member_1", "member_15", "member_25", "jones"]);
}

#[test]
fn request_shaping() {
    let mut board = board(5);
    let zero = RequestOptions {
        zero_index_rank: true,
        ..RequestOptions::default()
    };
    assert_eq!(board.leaders(1, &zero).unwrap()[0].rank, Some(0));

    let bare = board.leaders(1, &RequestOptions::members_only()).unwrap();
    assert_eq!(bare[0], RankedEntry::new("member_5"));

    let no_scores = RequestOptions {
        with_scores: false,
        with_member_data: true,
        ..RequestOptions::default()
    };
    let entry = &board.leaders(1, &no_scores).unwrap()[0];
    assert_eq!(entry.score, None);
    assert_eq!(entry.rank, Some(1));
    assert_eq!(entry.member_data.as_deref(), Some("data_5"));
}

#[test]
fn member_data_lifecycle() {
    let mut board = board(3);
    assert_eq!(board.member_data_for("member_1").unwrap().as_deref(), Some("data_1"));
    board.update_member_data("member_1", "updated").unwrap();
    assert_eq!(
        board.members_data_for(&["member_1", "member_2", "jones"]).unwrap(),
        [Some("updated".to_string()), Some("data_2".to_string()), None]
    );
    assert!(board.remove_member_data("member_2").unwrap());
    assert!(!board.remove_member_data("member_2").unwrap());

    assert!(board.remove_member("member_1").unwrap());
    assert!(!board.remove_member("member_1").unwrap());
    assert_eq!(board.member_data_for("member_1").unwrap(), None);
    assert_eq!(board.total_members().unwrap(), 2);
}

#[test]
fn conditional_and_relative_writes() {
    let mut board = board(0);
    let higher = |score: f64| move |current: Option<f64>| current.map_or(true, |c| score > c);

    assert!(board.rank_member_if("david", 1337.0, None, higher(1337.0)).unwrap());
    assert!(!board.rank_member_if("david", 1.0, None, higher(1.0)).unwrap());
    assert_eq!(board.score_for("david").unwrap(), Some(1337.0));

    assert_eq!(board.change_score_for("newcomer", 5.0, None).unwrap(), 5.0);
    assert_eq!(board.change_score_for("newcomer", -7.5, Some("d")).unwrap(), -2.5);
    assert_eq!(board.member_data_for("newcomer").unwrap().as_deref(), Some("d"));
}

#[test]
fn bulk_writes_and_nan() {
    let mut board = board(0);
    board
        .rank_members(&[("a", 1.0), ("b", 2.0), ("c", 3.0)])
        .unwrap();
    assert_eq!(board.total_members().unwrap(), 3);
    assert!(matches!(
        board.rank_member("d", f64::NAN, None),
        Err(Error::InvalidScore(_))
    ));
    assert!(board.rank_members(&[("e", 1.0), ("f", f64::NAN)]).is_err());
    assert_eq!(board.total_members().unwrap(), 3);
}

#[test]
fn range_removals() {
    let mut board = board(25);
    assert_eq!(board.remove_members_in_score_range(10.0, 15.0).unwrap(), 6);
    assert_eq!(board.total_members().unwrap(), 19);

    let mut board = board_with(25, LeaderboardOptions::default());
    assert_eq!(board.remove_members_outside_rank(10).unwrap(), 15);
    let left = board.all_leaders(&RequestOptions::default()).unwrap();
    assert_eq!(left.first().unwrap().member, "member_25");
    assert_eq!(left.last().unwrap().member, "member_16");
    assert_eq!(board.remove_members_outside_rank(10).unwrap(), 0);

    let mut reversed = board_with(25, LeaderboardOptions::default().with_order(Order::LowToHigh));
    assert_eq!(reversed.remove_members_outside_rank(10).unwrap(), 15);
    let left = reversed.all_leaders(&RequestOptions::default()).unwrap();
    assert_eq!(left.first().unwrap().member, "member_1");
    assert_eq!(left.last().unwrap().member, "member_10");
}

#[test]
fn low_to_high_ordering() {
    let mut board = board_with(25, LeaderboardOptions::default().with_order(Order::LowToHigh));
    let page = board.leaders(1, &RequestOptions::default()).unwrap();
    assert_eq!(page[0].member, "member_1");
    assert_eq!(page[0].rank, Some(1));
    assert_eq!(board.rank_for("member_25").unwrap(), Some(25));
    let range = board
        .members_from_score_range(10.0, 12.0, &RequestOptions::default())
        .unwrap();
    assert_eq!(names(&range), ["member_10", "member_11", "member_12"]);
    assert_eq!(range[0].rank, Some(10));
}

#[test]
fn expiry_and_deletion() {
    let mut board = board(5);
    let name = board.name().to_owned();
    let data_key = board.member_data_key().to_owned();
    assert!(board.expire_leaderboard(60).unwrap());
    assert!(board.store_mut().ttl(&name).is_some());
    assert!(board.store_mut().ttl(&data_key).is_some());

    assert!(board.expire_leaderboard_at(1).unwrap());
    assert_eq!(board.total_members().unwrap(), 0);
    assert_eq!(board.member_data_for("member_1").unwrap(), None);

    let mut board = self::board(5);
    assert!(board.expire_leaderboard(u64::MAX).unwrap());
    assert!(board.expire_leaderboard_at(u64::MAX).unwrap());
    assert_eq!(board.total_members().unwrap(), 5);
    assert!(board.store_mut().ttl(&name).is_none());

    assert!(board.delete_leaderboard().unwrap());
    assert_eq!(board.total_members().unwrap(), 0);
    assert!(!board.store_mut().contains_key(&data_key));
}

#[test]
fn merge_and_intersect_share_a_store() {
    let mut store = MemoryStore::new();
    let mut foo = Leaderboard::new("foo", &mut store);
    foo.rank_members(&[("a", 1.0), ("b", 2.0)]).unwrap();
    {
        let mut bar = foo.sibling("bar");
        bar.rank_members(&[("b", 5.0), ("c", 3.0), ("d", 4.0)]).unwrap();
    }

    assert_eq!(foo.merge_leaderboards("merged", &["bar"], Aggregate::Sum).unwrap(), 4);
    let mut merged = foo.sibling("merged");
    assert_eq!(merged.score_for("b").unwrap(), Some(7.0));
    assert_eq!(merged.rank_for("b").unwrap(), Some(1));

    assert_eq!(
        foo.intersect_leaderboards("common", &["bar"], Aggregate::Max)
            .unwrap(),
        1
    );
    assert_eq!(foo.sibling("common").score_for("b").unwrap(), Some(5.0));
}

#[test]
fn rank_member_across_boards() {
    let mut store = MemoryStore::new();
    let mut board = Leaderboard::new("weekly", &mut store);
    board
        .rank_member_across(&["weekly", "monthly"], "david", 50.0, Some("d"))
        .unwrap();
    assert_eq!(board.score_for("david").unwrap(), Some(50.0));
    let mut monthly = board.sibling("monthly");
    assert_eq!(monthly.score_for("david").unwrap(), Some(50.0));
    assert_eq!(monthly.member_data_for("david").unwrap().as_deref(), Some("d"));
}

#[test]
fn namespaces_and_page_size() {
    let options = LeaderboardOptions::default()
        .with_member_data_namespace("md")
        .with_ties_namespace("tx")
        .with_page_size(0);
    let mut board = Leaderboard::with_options("lb", MemoryStore::new(), options);
    assert_eq!(board.member_data_key(), "lb:md");
    assert_eq!(board.ties_key(), "lb:tx");
    assert_eq!(board.page_size(), DEFAULT_PAGE_SIZE);
    board.set_page_size(10);
    assert_eq!(board.page_size(), 10);
    board.set_page_size(0);
    assert_eq!(board.page_size(), DEFAULT_PAGE_SIZE);
}
