use chrono::{TimeZone, Utc};
use page_stats::{
    merge_all, Alphabet, BoundedCounter, ExactCounter, Page, PageStatistics, StatsConfig,
    WordCounter,
};
use proptest::prelude::*;

const VOCABULARY: [&str; 12] = [
    "кот", "пёс", "дом", "лес", "река", "гора", "поле", "море", "небо", "луна", "звезда", "ветер",
];

fn config() -> StatsConfig {
    StatsConfig::default().with_years(2000, 2024)
}

fn page_strategy() -> impl Strategy<Value = Page> {
    (
        0..VOCABULARY.len(),
        prop::collection::vec(0..VOCABULARY.len(), 0..12),
        0u64..10_000_000,
        2000i32..=2024,
    )
        .prop_map(|(title, body, size, year)| {
            let body: Vec<&str> = body.into_iter().map(|i| VOCABULARY[i]).collect();
            let ts = Utc.with_ymd_and_hms(year, 7, 1, 0, 0, 0).unwrap();
            Page::new(VOCABULARY[title], ts, body.join(" "), size)
        })
}

fn assert_same(left: &PageStatistics, right: &PageStatistics) {
    assert_eq!(left.pages(), right.pages());
    assert_eq!(left.titles().counts(), right.titles().counts());
    assert_eq!(left.bodies().counts(), right.bodies().counts());
    assert_eq!(left.sizes(), right.sizes());
    assert_eq!(left.years(), right.years());
}

proptest! {
    #[test]
    fn merge_is_order_independent(
        pages in prop::collection::vec(page_strategy(), 0..40),
        assignment in prop::collection::vec(0usize..5, 40),
    ) {
        let config = config();
        let mut whole = PageStatistics::new(&config);
        let mut shards: Vec<PageStatistics> = (0..5).map(|_| PageStatistics::new(&config)).collect();
        for (page, &shard) in pages.iter().zip(assignment.iter()) {
            whole.consume(page).unwrap();
            shards[shard].consume(page).unwrap();
        }

        let mut forward = PageStatistics::new(&config);
        for shard in &shards {
            forward.merge(shard);
        }
        let mut backward = PageStatistics::new(&config);
        for shard in shards.iter().rev() {
            backward.merge(shard);
        }
        let tree = merge_all(shards).unwrap();

        assert_same(&forward, &whole);
        assert_same(&backward, &whole);
        assert_same(&tree, &whole);
    }

    #[test]
    fn histogram_totals_match_pages(pages in prop::collection::vec(page_strategy(), 0..60)) {
        let mut stats = PageStatistics::new(&config());
        for page in &pages {
            stats.consume(page).unwrap();
        }
        prop_assert_eq!(stats.sizes().total(), pages.len() as u64);
        prop_assert_eq!(stats.years().total(), pages.len() as u64);
        prop_assert_eq!(stats.pages(), pages.len() as u64);
    }

    #[test]
    fn top_k_is_prefix_of_full_sort(
        counts in prop::collection::hash_map("[а-я]{3,6}", 1u64..50, 0..80),
        k in 0usize..100,
        seed in any::<u64>(),
    ) {
        let mut counter = ExactCounter::new(Alphabet::Cyrillic, seed);
        for (token, &count) in &counts {
            counter.add(token, count);
        }

        let mut expected: Vec<(String, u64)> = counts.into_iter().collect();
        expected.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        expected.truncate(k);

        prop_assert_eq!(counter.top_k(k), expected);
    }

    #[test]
    fn bounded_never_overcounts(
        stream in prop::collection::vec(0..VOCABULARY.len(), 0..400),
        reduce_every in 1usize..40,
        capacity in 2usize..8,
        seed in any::<u64>(),
    ) {
        let mut exact = ExactCounter::new(Alphabet::Cyrillic, seed);
        let mut bounded = BoundedCounter::new(Alphabet::Cyrillic, seed, reduce_every, capacity);
        for &i in &stream {
            exact.add(VOCABULARY[i], 1);
            bounded.add(VOCABULARY[i], 1);
        }
        for (token, &count) in bounded.counts() {
            prop_assert!(count <= exact.count(token));
        }

        let mut merged = BoundedCounter::new(Alphabet::Cyrillic, seed, reduce_every, capacity);
        merged.merge(&bounded);
        merged.merge(&bounded);
        for (token, &count) in merged.counts() {
            prop_assert!(count <= 2 * exact.count(token));
        }
    }
}
