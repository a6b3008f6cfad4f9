use search_core::stemmer::stem;
use search_core::Normalizer;
use std::collections::HashSet;

#[test]
fn it_normalizes_and_stems() {
    let n = Normalizer::default();
    let freq = n.normalize(Some("Running Runners RUN! The café's menu."));
    assert!(freq.contains_key("run"));
    // accents survive cleaning; the possessive collapses into the stem
    assert!(freq.contains_key("café"));
    assert!(freq.contains_key("menu"));
}

#[test]
fn it_filters_stopwords() {
    let n = Normalizer::default();
    let freq = n.normalize(Some("The quick brown fox and the lazy dog"));
    assert!(!freq.contains_key("the"));
    assert!(!freq.contains_key("and"));
    assert_eq!(freq.get("fox"), Some(&1));
}

#[test]
fn keys_are_stems_of_cleaned_tokens() {
    let stopwords: HashSet<String> = ["a", "the"].iter().map(|s| s.to_string()).collect();
    let n = Normalizer::new(stopwords.clone());
    let text = "The relational databases, a generalization of flat-files; running (fast) queries!";
    let expected: HashSet<String> = text
        .split_whitespace()
        .map(|t| t.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase())
        .filter(|t| !t.is_empty() && !stopwords.contains(t))
        .map(|t| stem(&t))
        .collect();
    let keys: HashSet<String> = n.normalize(Some(text)).into_keys().collect();
    assert_eq!(keys, expected);
    assert!(keys.iter().all(|k| !stopwords.contains(k)));
}

#[test]
fn stemmer_reference_outputs() {
    assert_eq!(stem("running"), "run");
    assert_eq!(stem("flies"), "fli");
    assert_eq!(stem("agreed"), "agre");
}
