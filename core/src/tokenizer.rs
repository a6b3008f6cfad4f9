use crate::stemmer::Stemmer;
use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\p{L}\p{Nd}]").expect("valid regex");
    static ref DEFAULT_STOPWORDS: HashSet<String> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().map(|w| clean_token(w)).collect()
    };
}

/// Lowercase and drop everything that is not a letter or a decimal digit.
pub fn clean_token(token: &str) -> String {
    NON_WORD.replace_all(&token.to_lowercase(), "").into_owned()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermStats {
    pub frequency: u32,
    pub positions: Vec<u32>,
}

/// Stemmed terms of one text, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    order: Vec<String>,
    stats: HashMap<String, TermStats>,
}

impl Analysis {
    fn record(&mut self, term: String, position: u32) {
        if !self.stats.contains_key(&term) {
            self.order.push(term.clone());
        }
        let entry = self.stats.entry(term).or_default();
        entry.frequency += 1;
        entry.positions.push(position);
    }

    pub fn get(&self, term: &str) -> Option<&TermStats> {
        self.stats.get(term)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TermStats)> + '_ {
        self.order.iter().map(move |t| (t.as_str(), &self.stats[t]))
    }

    pub fn frequencies(&self) -> HashMap<String, u32> {
        self.stats.iter().map(|(t, s)| (t.clone(), s.frequency)).collect()
    }
}

/// Tokenizes, filters stopwords and stems. Owned by the indexer and the query
/// engine; the stopword set is fixed at construction.
#[derive(Debug, Clone)]
pub struct Normalizer {
    stopwords: HashSet<String>,
    stemmer: Stemmer,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_STOPWORDS.clone())
    }
}

impl Normalizer {
    pub fn new(stopwords: HashSet<String>) -> Self {
        Self { stopwords, stemmer: Stemmer::new() }
    }

    /// One stopword per line; blank lines are ignored.
    pub fn from_stopword_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let stopwords: HashSet<String> = raw.lines().map(clean_token).filter(|w| !w.is_empty()).collect();
        tracing::info!(count = stopwords.len(), path = %path.as_ref().display(), "loaded stopwords");
        Ok(Self::new(stopwords))
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Reduce a single raw word to its term, or `None` when it cleans to
    /// nothing or is a stopword. NFKC runs first, so ligatures and
    /// full-width letters fold to their plain forms.
    pub fn term(&self, word: &str) -> Option<String> {
        let token = clean_token(&word.nfkc().collect::<String>());
        if token.is_empty() || self.is_stopword(&token) {
            return None;
        }
        let stem = self.stemmer.stem(&token);
        (!stem.is_empty()).then_some(stem)
    }

    /// Terms of `text` with frequencies and positions. Positions count kept
    /// tokens only, so stopwords do not break phrase adjacency.
    pub fn analyze(&self, text: Option<&str>) -> Analysis {
        let mut analysis = Analysis::default();
        let Some(text) = text else {
            return analysis;
        };
        let mut position = 0u32;
        for raw in text.split_whitespace() {
            if let Some(term) = self.term(raw) {
                analysis.record(term, position);
                position += 1;
            }
        }
        tracing::trace!(terms = analysis.len(), kept = position, "analyzed text");
        analysis
    }

    pub fn normalize(&self, text: Option<&str>) -> HashMap<String, u32> {
        self.analyze(text).frequencies()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_normalize() {
        let n = Normalizer::default();
        let freq = n.normalize(Some("Running, runner's run!"));
        assert_eq!(freq.get("run"), Some(&2));
    }

    #[test]
    fn absent_text_is_empty() {
        let n = Normalizer::default();
        assert!(n.normalize(None).is_empty());
        assert!(n.normalize(Some("  \t\n")).is_empty());
    }

    #[test]
    fn apostrophe_stopwords_are_cleaned() {
        let n = Normalizer::default();
        assert!(n.is_stopword("dont"));
        assert_eq!(n.term("Don't"), None);
    }

    #[test]
    fn compatibility_forms_fold_before_cleaning() {
        let n = Normalizer::default();
        assert_eq!(n.term("\u{FB01}le"), n.term("file"));
        assert_eq!(n.term("ＣＡＴ"), Some("cat".to_string()));
    }

    #[test]
    fn positions_skip_stopwords() {
        let n = Normalizer::new(["the", "of"].iter().map(|s| s.to_string()).collect());
        let a = n.analyze(Some("university of the hong kong hong"));
        let order: Vec<&str> = a.iter().map(|(t, _)| t).collect();
        assert_eq!(order, vec!["univers", "hong", "kong"]);
        assert_eq!(a.get("hong").unwrap().positions, vec![1, 3]);
        assert_eq!(a.get("kong").unwrap().positions, vec![2]);
    }
}
