use crate::authority::{self, AuthorityParams, LinkGraph};
use crate::cache::SyncLruCache;
use crate::config::EngineConfig;
use crate::persist::Store;
use crate::query::{parse_query, QueryComponent};
use crate::tokenizer::Normalizer;
use crate::{DocId, Field, Posting, Result, TermId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
}

type PostingList = Arc<Vec<Posting>>;

/// Resolves queries against the store and ranks documents by term/phrase
/// relevance blended with link authority. All caches are bounded LRUs and
/// are only ever filled from the store.
pub struct SearchEngine<S> {
    store: Arc<S>,
    normalizer: Normalizer,
    config: EngineConfig,
    word_ids: SyncLruCache<String, TermId>,
    title_postings: SyncLruCache<TermId, PostingList>,
    body_postings: SyncLruCache<TermId, PostingList>,
    max_tf_title: SyncLruCache<DocId, u32>,
    max_tf_body: SyncLruCache<DocId, u32>,
    authority: SyncLruCache<DocId, f64>,
    results: SyncLruCache<String, Vec<SearchHit>>,
}

impl<S: Store> SearchEngine<S> {
    pub fn new(store: Arc<S>, normalizer: Normalizer, config: EngineConfig) -> Self {
        let caches = &config.cache;
        Self {
            word_ids: SyncLruCache::new(caches.word_ids),
            title_postings: SyncLruCache::new(caches.postings),
            body_postings: SyncLruCache::new(caches.postings),
            max_tf_title: SyncLruCache::new(caches.max_tf),
            max_tf_body: SyncLruCache::new(caches.max_tf),
            authority: SyncLruCache::new(caches.authority),
            results: SyncLruCache::new(caches.results),
            store,
            normalizer,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ranked hits for `query`, at most `max_results`, highest score first.
    /// Documents need a term or phrase match to appear at all.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        if let Some(hits) = self.results.get(&query.to_string()) {
            tracing::debug!(query, "results cache hit");
            return Ok(hits);
        }

        let total_docs = self.store.document_count()?;
        let components = parse_query(query);
        if components.is_empty() {
            tracing::warn!(query, "query has nothing to search for");
        }
        let mut scores: HashMap<DocId, f64> = HashMap::new();
        for component in components {
            match component {
                QueryComponent::Term(word) => {
                    if let Some(term) = self.normalizer.term(&word) {
                        self.score_term(&term, total_docs, &mut scores)?;
                    }
                }
                QueryComponent::Phrase(words) => {
                    let terms: Vec<String> = words.iter().filter_map(|w| self.normalizer.term(w)).collect();
                    match terms.len() {
                        0 => {}
                        1 => self.score_term(&terms[0], total_docs, &mut scores)?,
                        _ => self.score_phrase(&terms, total_docs, &mut scores)?,
                    }
                }
            }
        }

        let hits = if scores.is_empty() { Vec::new() } else { self.rank(scores)? };
        tracing::debug!(query, hits = hits.len(), "search complete");
        self.results.put(query.to_string(), hits.clone());
        Ok(hits)
    }

    /// A window of the ranked list for `query`.
    pub fn search_page(&self, query: &str, offset: usize, limit: usize) -> Result<Vec<SearchHit>> {
        Ok(self.search(query)?.into_iter().skip(offset).take(limit).collect())
    }

    /// Drop every cached value. Callers use this after indexing new pages.
    pub fn clear_caches(&self) {
        self.word_ids.clear();
        self.title_postings.clear();
        self.body_postings.clear();
        self.max_tf_title.clear();
        self.max_tf_body.clear();
        self.authority.clear();
        self.results.clear();
    }

    fn rank(&self, scores: HashMap<DocId, f64>) -> Result<Vec<SearchHit>> {
        let authority = self.authority_scores()?;
        let alpha = self.config.alpha;
        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .map(|(doc_id, relevance)| {
                let score = alpha * relevance + (1.0 - alpha) * authority.get(&doc_id).copied().unwrap_or(0.0);
                SearchHit { doc_id, score }
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
        hits.truncate(self.config.max_results);
        Ok(hits)
    }

    fn term_id(&self, term: &str) -> Result<Option<TermId>> {
        let key = term.to_string();
        if let Some(id) = self.word_ids.get(&key) {
            return Ok(Some(id));
        }
        let id = self.store.get_term_id(term)?;
        if let Some(id) = id {
            self.word_ids.put(key, id);
        }
        Ok(id)
    }

    fn postings(&self, term_id: TermId, field: Field) -> Result<PostingList> {
        let cache = match field {
            Field::Title => &self.title_postings,
            Field::Body => &self.body_postings,
        };
        cache.get_or_try_insert_with(term_id, || Ok(Arc::new(self.store.get_postings(term_id, field)?)))
    }

    /// Largest combined frequency among the document's summary terms that
    /// occur in `field`. Defaults to 1.
    fn max_tf(&self, doc_id: DocId, field: Field) -> Result<u32> {
        let cache = match field {
            Field::Title => &self.max_tf_title,
            Field::Body => &self.max_tf_body,
        };
        cache.get_or_try_insert_with(doc_id, || {
            let Some(summary) = self.store.get_forward_summary(doc_id)? else {
                return Ok(1);
            };
            let mut max: u32 = 0;
            for keyword in summary {
                if find_posting(&self.postings(keyword.term_id, field)?, doc_id).is_some() {
                    max = max.max(keyword.frequency);
                }
            }
            Ok(if max == 0 { 1 } else { max })
        })
    }

    fn field_weight(&self, doc_id: DocId, tf_title: u32, tf_body: u32, idf: f64) -> Result<f64> {
        let mut weight = 0.0;
        if tf_title > 0 {
            weight += self.config.title_weight * (tf_title as f64 / self.max_tf(doc_id, Field::Title)? as f64) * idf;
        }
        if tf_body > 0 {
            weight += self.config.body_weight * (tf_body as f64 / self.max_tf(doc_id, Field::Body)? as f64) * idf;
        }
        Ok(weight)
    }

    fn score_term(&self, term: &str, total_docs: usize, scores: &mut HashMap<DocId, f64>) -> Result<()> {
        let Some(term_id) = self.term_id(term)? else {
            tracing::debug!(term, "term not in index");
            return Ok(());
        };
        let title = self.postings(term_id, Field::Title)?;
        let body = self.postings(term_id, Field::Body)?;
        let docs = doc_union(&title, &body);
        if docs.is_empty() {
            return Ok(());
        }
        let idf = inverse_document_frequency(total_docs, docs.len());
        for doc_id in docs {
            let tf_title = find_posting(&title, doc_id).map_or(0, |p| p.frequency);
            let tf_body = find_posting(&body, doc_id).map_or(0, |p| p.frequency);
            *scores.entry(doc_id).or_insert(0.0) += self.field_weight(doc_id, tf_title, tf_body, idf)?;
        }
        Ok(())
    }

    fn score_phrase(&self, terms: &[String], total_docs: usize, scores: &mut HashMap<DocId, f64>) -> Result<()> {
        let mut term_ids = Vec::with_capacity(terms.len());
        for term in terms {
            match self.term_id(term)? {
                Some(id) => term_ids.push(id),
                None => {
                    tracing::debug!(?terms, term = term.as_str(), "phrase term not in index");
                    return Ok(());
                }
            }
        }

        let mut title_lists = Vec::with_capacity(term_ids.len());
        let mut body_lists = Vec::with_capacity(term_ids.len());
        let mut candidates: Option<BTreeSet<DocId>> = None;
        for &term_id in &term_ids {
            let title = self.postings(term_id, Field::Title)?;
            let body = self.postings(term_id, Field::Body)?;
            let docs = doc_union(&title, &body);
            candidates = Some(match candidates {
                Some(acc) => acc.intersection(&docs).copied().collect(),
                None => docs,
            });
            title_lists.push(title);
            body_lists.push(body);
        }

        let mut phrase_tf: Vec<(DocId, u32, u32)> = Vec::new();
        for doc_id in candidates.unwrap_or_default() {
            let tf_title = compute_phrase_frequency(&positions_in(&title_lists, doc_id));
            let tf_body = compute_phrase_frequency(&positions_in(&body_lists, doc_id));
            if tf_title > 0 || tf_body > 0 {
                phrase_tf.push((doc_id, tf_title, tf_body));
            }
        }
        if phrase_tf.is_empty() {
            return Ok(());
        }

        let idf = inverse_document_frequency(total_docs, phrase_tf.len());
        for (doc_id, tf_title, tf_body) in phrase_tf {
            *scores.entry(doc_id).or_insert(0.0) += self.field_weight(doc_id, tf_title, tf_body, idf)?;
        }
        Ok(())
    }

    /// Authority for every known document. Cached values are used only when
    /// they cover the whole current document set; otherwise everything is
    /// recomputed from a fresh snapshot of the link graph.
    pub fn authority_scores(&self) -> Result<HashMap<DocId, f64>> {
        let docs = self.store.get_all_document_ids()?;
        let cached: HashMap<DocId, f64> =
            docs.iter().filter_map(|&doc| self.authority.get(&doc).map(|score| (doc, score))).collect();
        if cached.len() == docs.len() {
            return Ok(cached);
        }

        let graph = LinkGraph::snapshot(self.store.as_ref(), &docs)?;
        let params = AuthorityParams {
            damping: self.config.damping,
            max_iterations: self.config.authority_iterations,
            tolerance: self.config.authority_tolerance,
        };
        let scores = authority::compute(&graph, params);
        for (&doc, &score) in &scores {
            self.authority.put(doc, score);
        }
        tracing::info!(documents = scores.len(), "recomputed authority scores");
        Ok(scores)
    }
}

/// `log10(N / df)`, with `N` never below `df`.
fn inverse_document_frequency(total_docs: usize, df: usize) -> f64 {
    let n = total_docs.max(df) as f64;
    (n / df as f64).log10()
}

fn find_posting(postings: &[Posting], doc_id: DocId) -> Option<&Posting> {
    postings.binary_search_by_key(&doc_id, |p| p.doc_id).ok().map(|i| &postings[i])
}

/// Each word's positions in `doc_id`, empty where the word is absent.
fn positions_in(lists: &[PostingList], doc_id: DocId) -> Vec<Vec<u32>> {
    lists
        .iter()
        .map(|postings| find_posting(postings, doc_id).map(|p| p.positions.clone()).unwrap_or_default())
        .collect()
}

fn doc_union(title: &[Posting], body: &[Posting]) -> BTreeSet<DocId> {
    title.iter().chain(body.iter()).map(|p| p.doc_id).collect()
}

/// Count non-overlapping occurrences of a phrase given, for each phrase word
/// in order, that word's positions within one field.
///
/// Lists are sorted, then scanned together: when the current positions are
/// consecutive a match is counted and every list advances; otherwise the
/// list lagging furthest behind (smallest position relative to its offset in
/// the phrase) advances. The scan stops once any list is exhausted.
///
/// A match never reuses a position of the previous match, so a repeated word
/// such as `"hong hong"` over four consecutive positions counts twice.
pub fn compute_phrase_frequency(position_lists: &[Vec<u32>]) -> u32 {
    if position_lists.is_empty() || position_lists.iter().any(Vec::is_empty) {
        return 0;
    }
    let lists: Vec<Vec<u32>> = position_lists
        .iter()
        .map(|l| {
            let mut l = l.clone();
            l.sort_unstable();
            l
        })
        .collect();
    let k = lists.len();
    let mut idx = vec![0usize; k];
    let mut count = 0;
    let mut last_end: Option<u32> = None;

    while idx.iter().zip(&lists).all(|(&i, l)| i < l.len()) {
        let current: Vec<u32> = idx.iter().zip(&lists).map(|(&i, l)| l[i]).collect();
        if last_end.is_some_and(|end| current[0] <= end) {
            idx[0] += 1;
            continue;
        }
        if current.windows(2).all(|w| w[1] == w[0] + 1) {
            count += 1;
            last_end = Some(current[k - 1]);
            idx.iter_mut().for_each(|i| *i += 1);
        } else {
            let lagging = (0..k).min_by_key(|&j| current[j] as i64 - j as i64).unwrap_or(0);
            idx[lagging] += 1;
        }
    }
    count
}
