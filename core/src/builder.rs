use crate::persist::Store;
use crate::tokenizer::{Analysis, Normalizer};
use crate::{DocId, Field, FieldTerms, Keyword, Posting, Result, TermId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const DEFAULT_SUMMARY_SIZE: usize = 10;

/// Turns a page's title and body into per-field postings and a forward summary.
///
/// Holds no mutable state of its own; concurrent `index_document` calls only
/// meet in the store.
pub struct IndexBuilder<S> {
    store: Arc<S>,
    normalizer: Normalizer,
    summary_size: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub title_terms: usize,
    pub body_terms: usize,
    /// Postings dropped because a re-indexed page no longer has the term.
    pub stale_postings: usize,
}

impl<S: Store> IndexBuilder<S> {
    pub fn new(store: Arc<S>, normalizer: Normalizer) -> Self {
        Self { store, normalizer, summary_size: DEFAULT_SUMMARY_SIZE }
    }

    pub fn with_summary_size(mut self, summary_size: usize) -> Self {
        self.summary_size = summary_size;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Index one page. Re-indexing the same document replaces its postings:
    /// terms it still contains are overwritten, terms it lost are removed.
    pub fn index_document(&self, doc_id: DocId, title: &str, body: &str) -> Result<IndexStats> {
        let title_terms = self.normalizer.analyze(Some(title));
        let body_terms = self.normalizer.analyze(Some(body));
        let previous = self.store.get_field_terms(doc_id)?.unwrap_or_default();

        let mut term_ids: HashMap<&str, TermId> = HashMap::new();
        let mut current = FieldTerms::default();
        for (field, analysis) in [(Field::Title, &title_terms), (Field::Body, &body_terms)] {
            for (term, stats) in analysis.iter() {
                let term_id = match term_ids.get(term) {
                    Some(&id) => id,
                    None => {
                        let id = self.store.resolve_or_create_term_id(term)?;
                        term_ids.insert(term, id);
                        id
                    }
                };
                let posting = Posting { doc_id, frequency: stats.frequency, positions: stats.positions.clone() };
                self.store.add_posting(term_id, field, &posting)?;
                current.get_mut(field).push(term_id);
            }
        }

        let mut stale_postings = 0;
        for field in Field::ALL {
            let kept: HashSet<TermId> = current.get(field).iter().copied().collect();
            for &stale in previous.get(field).iter().filter(|id| !kept.contains(*id)) {
                self.store.remove_posting(stale, field, doc_id)?;
                stale_postings += 1;
            }
        }
        self.store.put_field_terms(doc_id, &current)?;

        let summary: Vec<Keyword> = top_terms(&title_terms, &body_terms, self.summary_size)
            .into_iter()
            .map(|(term, frequency)| Keyword { term_id: term_ids[term], frequency })
            .collect();
        self.store.put_forward_summary(doc_id, &summary)?;

        let stats = IndexStats { title_terms: title_terms.len(), body_terms: body_terms.len(), stale_postings };
        tracing::debug!(
            doc_id,
            title_terms = stats.title_terms,
            body_terms = stats.body_terms,
            stale_postings,
            "indexed document"
        );
        Ok(stats)
    }
}

/// Terms by combined frequency, highest first. Ties keep first-seen order,
/// title before body.
fn top_terms<'a>(title: &'a Analysis, body: &'a Analysis, k: usize) -> Vec<(&'a str, u32)> {
    let mut combined: Vec<(&str, u32)> = Vec::with_capacity(title.len() + body.len());
    let mut slot: HashMap<&str, usize> = HashMap::new();
    for (term, stats) in title.iter().chain(body.iter()) {
        match slot.get(term) {
            Some(&i) => combined[i].1 += stats.frequency,
            None => {
                slot.insert(term, combined.len());
                combined.push((term, stats.frequency));
            }
        }
    }
    combined.sort_by(|a, b| b.1.cmp(&a.1));
    combined.truncate(k);
    combined
}
