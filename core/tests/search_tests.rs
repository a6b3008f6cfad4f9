use search_core::{DocId, DocMeta, EngineConfig, IndexBuilder, IndexPaths, Normalizer, SearchEngine, SledStore, Store};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

struct Fixture {
    _dir: TempDir,
    store: Arc<SledStore>,
    builder: IndexBuilder<SledStore>,
    engine: SearchEngine<SledStore>,
}

fn fixture_with(config: EngineConfig) -> Fixture {
    let dir = tempdir().unwrap();
    let store = Arc::new(SledStore::open(&IndexPaths::new(dir.path())).unwrap());
    let stopwords: HashSet<String> = ["a", "the", "of"].iter().map(|s| s.to_string()).collect();
    let normalizer = Normalizer::new(stopwords);
    let builder = IndexBuilder::new(Arc::clone(&store), normalizer.clone());
    let engine = SearchEngine::new(Arc::clone(&store), normalizer, config);
    Fixture { _dir: dir, store, builder, engine }
}

fn fixture() -> Fixture {
    fixture_with(EngineConfig::default())
}

impl Fixture {
    fn page(&self, id: DocId, title: &str, body: &str, links: Vec<DocId>) {
        self.store
            .put_document(&DocMeta {
                id,
                url: format!("http://example.com/{id}"),
                title: title.to_string(),
                body: body.to_string(),
                size: body.len() as u64,
                last_modified: None,
                links,
            })
            .unwrap();
        self.builder.index_document(id, title, body).unwrap();
    }

    fn ids(&self, query: &str) -> Vec<DocId> {
        self.engine.search(query).unwrap().into_iter().map(|h| h.doc_id).collect()
    }
}

#[test]
fn matching_document_ranks_and_others_are_excluded() {
    let f = fixture();
    f.page(1, "The Cat", "a cat sat", vec![]);
    f.page(2, "Dog", "dog ran", vec![]);

    let hits = f.engine.search("cat").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc_id, 1);
    assert!(hits[0].score > 0.0);
}

#[test]
fn single_match_without_links_is_the_only_result() {
    let f = fixture();
    f.page(1, "Apples", "orchard fruit", vec![]);
    f.page(2, "Pears", "orchard fruit", vec![]);
    f.page(3, "Plums", "orchard fruit", vec![]);

    assert_eq!(f.ids("pears"), vec![2]);
}

#[test]
fn title_matches_outweigh_body_matches() {
    let f = fixture();
    f.page(1, "Gardening tips", "rust on tools", vec![]);
    f.page(2, "Rust guide", "systems language", vec![]);
    f.page(3, "Cooking", "recipes", vec![]);

    assert_eq!(f.ids("rust"), vec![2, 1]);
}

#[test]
fn term_weight_is_normalized_by_the_most_frequent_summary_term() {
    let f = fixture();
    // combined frequencies: cat 2, dog 4; both occur in the title
    f.page(1, "cat cat dog", "dog dog dog", vec![]);
    f.page(2, "Bird", "bird", vec![]);

    let hits = f.engine.search("cat").unwrap();
    assert_eq!(hits.len(), 1);
    let relevance = 10.0 * (2.0 / 4.0) * 2f64.log10();
    let expected = 0.7 * relevance + 0.3 * 0.5;
    assert!((hits[0].score - expected).abs() < 1e-9, "score {} != {}", hits[0].score, expected);
}

#[test]
fn reindexed_page_stops_matching_lost_words() {
    let f = fixture();
    f.page(1, "Cat", "cat", vec![]);
    f.page(2, "Bird", "bird", vec![]);
    f.page(1, "Dog", "dog", vec![]);

    assert!(f.ids("cat").is_empty());
    assert_eq!(f.ids("dog"), vec![1]);
}

#[test]
fn phrase_requires_adjacent_words() {
    let f = fixture();
    f.page(1, "Universities", "the hong kong university of science", vec![]);
    f.page(2, "Travel", "kong hong island and the university", vec![]);
    f.page(3, "Other", "nothing relevant", vec![]);

    assert_eq!(f.ids("\"hong kong\""), vec![1]);
    let mut both = f.ids("hong kong");
    both.sort();
    assert_eq!(both, vec![1, 2]);
    // stopwords inside the phrase are dropped on both sides
    assert_eq!(f.ids("\"kong university of science\""), vec![1]);
}

#[test]
fn phrase_with_unknown_word_is_skipped() {
    let f = fixture();
    f.page(1, "Hong Kong", "hong kong", vec![]);
    assert!(f.ids("\"hong zebra\"").is_empty());
    assert_eq!(f.ids("\"hong zebra\" kong"), vec![1]);
}

#[test]
fn authority_breaks_relevance_ties() {
    let f = fixture();
    f.page(1, "Fruit", "apple", vec![]);
    f.page(2, "Fruit", "apple", vec![]);
    f.page(3, "Links", "banana", vec![2]);
    f.page(4, "Links", "cherry", vec![2]);

    assert_eq!(f.ids("apple"), vec![2, 1]);
}

#[test]
fn authority_of_a_two_cycle_is_equal() {
    let f = fixture();
    f.page(1, "A", "alpha", vec![2]);
    f.page(2, "B", "beta", vec![1]);

    let scores = f.engine.authority_scores().unwrap();
    assert_eq!(scores.len(), 2);
    assert!((scores[&1] - scores[&2]).abs() < 1e-9);
    assert!((scores[&1] + scores[&2] - 1.0).abs() < 1e-9);
}

#[test]
fn degenerate_queries_return_nothing() {
    let f = fixture();
    f.page(1, "Cat", "cat", vec![]);
    assert!(f.ids("").is_empty());
    assert!(f.ids("   ").is_empty());
    assert!(f.ids("the").is_empty());
    assert!(f.ids("unicorn").is_empty());
    assert!(f.ids("\"\"").is_empty());
}

#[test]
fn results_are_truncated_and_paged() {
    let config = EngineConfig { max_results: 3, ..EngineConfig::default() };
    let f = fixture_with(config);
    for id in 1..=5 {
        f.page(id, "Page", &"word ".repeat(id as usize), vec![]);
    }
    f.page(6, "Filler", "nothing", vec![]);

    let all = f.engine.search("word").unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
    let page = f.engine.search_page("word", 1, 5).unwrap();
    assert_eq!(page, all[1..].to_vec());
}

#[test]
fn cached_results_persist_until_cleared() {
    let f = fixture();
    f.page(1, "Cat", "cat", vec![]);
    f.page(2, "Dog", "dog", vec![]);
    assert_eq!(f.ids("cat"), vec![1]);

    f.page(3, "Cat", "cat", vec![]);
    assert_eq!(f.ids("cat"), vec![1]);

    f.engine.clear_caches();
    let mut fresh = f.ids("cat");
    fresh.sort();
    assert_eq!(fresh, vec![1, 3]);
}

#[test]
fn indexing_and_searching_run_concurrently() {
    let f = fixture();
    f.page(0, "Seed", "shared words", vec![]);
    std::thread::scope(|s| {
        for id in 1..5u32 {
            let f = &f;
            s.spawn(move || f.page(id, "Shared", "shared words here", vec![0]));
        }
        for _ in 0..4 {
            let engine = &f.engine;
            s.spawn(move || {
                let hits = engine.search("shared").unwrap();
                assert!(!hits.is_empty());
            });
        }
    });
    f.engine.clear_caches();
    assert_eq!(f.engine.search("shared").unwrap().len(), 5);
}
