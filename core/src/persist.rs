use crate::{DocId, DocMeta, Error, Field, FieldTerms, ForwardSummary, Posting, Result, TermId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Durable storage behind the indexer and the query engine. Implementations
/// must be safe to share between threads.
pub trait Store: Send + Sync {
    /// Store-or-fetch: the first call for a word assigns an id, every later
    /// call returns the same one.
    fn resolve_or_create_term_id(&self, word: &str) -> Result<TermId>;
    fn get_term_id(&self, word: &str) -> Result<Option<TermId>>;
    fn get_word_for_id(&self, id: TermId) -> Result<Option<String>>;

    /// Replaces any earlier posting of the same document for this term and field.
    fn add_posting(&self, term_id: TermId, field: Field, posting: &Posting) -> Result<()>;
    fn remove_posting(&self, term_id: TermId, field: Field, doc_id: DocId) -> Result<()>;
    /// Postings ordered by document id.
    fn get_postings(&self, term_id: TermId, field: Field) -> Result<Vec<Posting>>;

    fn put_field_terms(&self, doc_id: DocId, terms: &FieldTerms) -> Result<()>;
    fn get_field_terms(&self, doc_id: DocId) -> Result<Option<FieldTerms>>;

    fn put_forward_summary(&self, doc_id: DocId, summary: &ForwardSummary) -> Result<()>;
    fn get_forward_summary(&self, doc_id: DocId) -> Result<Option<ForwardSummary>>;

    fn resolve_or_create_doc_id(&self, url: &str) -> Result<DocId>;
    fn get_doc_id(&self, url: &str) -> Result<Option<DocId>>;
    /// Also records `doc.id` as a parent of each of its links.
    fn put_document(&self, doc: &DocMeta) -> Result<()>;
    fn get_document(&self, doc_id: DocId) -> Result<Option<DocMeta>>;

    fn get_all_document_ids(&self) -> Result<BTreeSet<DocId>>;
    fn get_incoming_links(&self, doc_id: DocId) -> Result<BTreeSet<DocId>>;
    fn get_outgoing_links(&self, doc_id: DocId) -> Result<BTreeSet<DocId>>;

    fn document_count(&self) -> Result<usize> {
        Ok(self.get_all_document_ids()?.len())
    }

    fn flush(&self) -> Result<()>;
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn db(&self) -> PathBuf { self.root.join("store.sled") }
}

/// `Store` over sled trees with bincode values. Multi-part keys are
/// big-endian ids so prefix scans return them in id order.
pub struct SledStore {
    db: Db,
    word_to_id: Tree,
    id_to_word: Tree,
    inverted_title: Tree,
    inverted_body: Tree,
    forward: Tree,
    doc_terms: Tree,
    url_to_doc: Tree,
    documents: Tree,
    parents: Tree,
}

impl SledStore {
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        std::fs::create_dir_all(&paths.root)?;
        let db = sled::open(paths.db())?;
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self> {
        Ok(Self {
            word_to_id: db.open_tree("word_to_id")?,
            id_to_word: db.open_tree("id_to_word")?,
            inverted_title: db.open_tree("inverted_title")?,
            inverted_body: db.open_tree("inverted_body")?,
            forward: db.open_tree("forward_index")?,
            doc_terms: db.open_tree("doc_terms")?,
            url_to_doc: db.open_tree("url_to_doc_id")?,
            documents: db.open_tree("documents")?,
            parents: db.open_tree("parent_links")?,
            db,
        })
    }

    fn inverted(&self, field: Field) -> &Tree {
        match field {
            Field::Title => &self.inverted_title,
            Field::Body => &self.inverted_body,
        }
    }

    /// Insert `key -> fresh id` unless the key already maps to an id.
    fn store_or_fetch_id(&self, tree: &Tree, key: &[u8]) -> Result<(u32, bool)> {
        loop {
            if let Some(existing) = tree.get(key)? {
                return Ok((decode::<u32>(&existing)?, false));
            }
            let candidate = narrow_id(self.db.generate_id()?)?;
            let encoded = encode(&candidate)?;
            match tree.compare_and_swap(key, None as Option<&[u8]>, Some(encoded))? {
                Ok(()) => return Ok((candidate, true)),
                Err(cas) => {
                    if let Some(current) = cas.current {
                        return Ok((decode::<u32>(&current)?, false));
                    }
                }
            }
        }
    }
}

impl Store for SledStore {
    fn resolve_or_create_term_id(&self, word: &str) -> Result<TermId> {
        let (id, created) = self.store_or_fetch_id(&self.word_to_id, word.as_bytes())?;
        if created {
            self.id_to_word.insert(id.to_be_bytes(), word.as_bytes())?;
            tracing::debug!(word, id, "assigned term id");
        }
        Ok(id)
    }

    fn get_term_id(&self, word: &str) -> Result<Option<TermId>> {
        self.word_to_id.get(word.as_bytes())?.map(|v| decode(&v)).transpose()
    }

    fn get_word_for_id(&self, id: TermId) -> Result<Option<String>> {
        Ok(self.id_to_word.get(id.to_be_bytes())?.map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    fn add_posting(&self, term_id: TermId, field: Field, posting: &Posting) -> Result<()> {
        self.inverted(field).insert(pair_key(term_id, posting.doc_id), encode(posting)?)?;
        Ok(())
    }

    fn remove_posting(&self, term_id: TermId, field: Field, doc_id: DocId) -> Result<()> {
        self.inverted(field).remove(pair_key(term_id, doc_id))?;
        Ok(())
    }

    fn get_postings(&self, term_id: TermId, field: Field) -> Result<Vec<Posting>> {
        self.inverted(field)
            .scan_prefix(term_id.to_be_bytes())
            .values()
            .map(|v| decode(&v?))
            .collect()
    }

    fn put_field_terms(&self, doc_id: DocId, terms: &FieldTerms) -> Result<()> {
        self.doc_terms.insert(doc_id.to_be_bytes(), encode(terms)?)?;
        Ok(())
    }

    fn get_field_terms(&self, doc_id: DocId) -> Result<Option<FieldTerms>> {
        self.doc_terms.get(doc_id.to_be_bytes())?.map(|v| decode(&v)).transpose()
    }

    fn put_forward_summary(&self, doc_id: DocId, summary: &ForwardSummary) -> Result<()> {
        self.forward.insert(doc_id.to_be_bytes(), encode(summary)?)?;
        Ok(())
    }

    fn get_forward_summary(&self, doc_id: DocId) -> Result<Option<ForwardSummary>> {
        self.forward.get(doc_id.to_be_bytes())?.map(|v| decode(&v)).transpose()
    }

    fn resolve_or_create_doc_id(&self, url: &str) -> Result<DocId> {
        let (id, created) = self.store_or_fetch_id(&self.url_to_doc, url.as_bytes())?;
        if created {
            tracing::debug!(url, id, "assigned document id");
        }
        Ok(id)
    }

    fn get_doc_id(&self, url: &str) -> Result<Option<DocId>> {
        self.url_to_doc.get(url.as_bytes())?.map(|v| decode(&v)).transpose()
    }

    fn put_document(&self, doc: &DocMeta) -> Result<()> {
        if let Some(previous) = self.get_document(doc.id)? {
            for child in previous.links {
                self.parents.remove(pair_key(child, doc.id))?;
            }
        }
        for &child in &doc.links {
            self.parents.insert(pair_key(child, doc.id), Vec::<u8>::new())?;
        }
        self.documents.insert(doc.id.to_be_bytes(), encode(doc)?)?;
        Ok(())
    }

    fn get_document(&self, doc_id: DocId) -> Result<Option<DocMeta>> {
        self.documents.get(doc_id.to_be_bytes())?.map(|v| decode(&v)).transpose()
    }

    fn get_all_document_ids(&self) -> Result<BTreeSet<DocId>> {
        let mut ids = BTreeSet::new();
        for key in self.documents.iter().keys().chain(self.forward.iter().keys()) {
            ids.insert(id_from_key(&key?, 0));
        }
        Ok(ids)
    }

    fn get_incoming_links(&self, doc_id: DocId) -> Result<BTreeSet<DocId>> {
        self.parents
            .scan_prefix(doc_id.to_be_bytes())
            .keys()
            .map(|k| Ok(id_from_key(&k?, 4)))
            .collect()
    }

    fn get_outgoing_links(&self, doc_id: DocId) -> Result<BTreeSet<DocId>> {
        Ok(self.get_document(doc_id)?.map(|d| d.links.into_iter().collect()).unwrap_or_default())
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

/// Term and document ids are `u32`; sled's counter is not.
fn narrow_id(raw: u64) -> Result<u32> {
    u32::try_from(raw).map_err(|_| Error::IdOverflow(raw))
}

fn pair_key(first: u32, second: u32) -> [u8; 8] {
    let mut key = [0u8; 8];
    key[..4].copy_from_slice(&first.to_be_bytes());
    key[4..].copy_from_slice(&second.to_be_bytes());
    key
}

fn id_from_key(key: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&key[offset..offset + 4]);
    u32::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn doc(id: DocId, links: Vec<DocId>) -> DocMeta {
        DocMeta {
            id,
            url: format!("http://example.com/{id}"),
            title: String::new(),
            body: String::new(),
            size: 0,
            last_modified: None,
            links,
        }
    }

    #[test]
    fn term_ids_are_stable() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(&IndexPaths::new(dir.path())).unwrap();
        let a = store.resolve_or_create_term_id("cat").unwrap();
        let b = store.resolve_or_create_term_id("dog").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.resolve_or_create_term_id("cat").unwrap(), a);
        assert_eq!(store.get_term_id("cat").unwrap(), Some(a));
        assert_eq!(store.get_term_id("bird").unwrap(), None);
        assert_eq!(store.get_word_for_id(b).unwrap().as_deref(), Some("dog"));
    }

    #[test]
    fn postings_replace_per_document() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(&IndexPaths::new(dir.path())).unwrap();
        let t = store.resolve_or_create_term_id("cat").unwrap();
        store.add_posting(t, Field::Body, &Posting { doc_id: 7, frequency: 1, positions: vec![0] }).unwrap();
        store.add_posting(t, Field::Body, &Posting { doc_id: 2, frequency: 1, positions: vec![3] }).unwrap();
        store.add_posting(t, Field::Body, &Posting { doc_id: 7, frequency: 2, positions: vec![0, 4] }).unwrap();
        let postings = store.get_postings(t, Field::Body).unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].doc_id, 2);
        assert_eq!(postings[1].frequency, 2);
        assert!(store.get_postings(t, Field::Title).unwrap().is_empty());
    }

    #[test]
    fn removed_posting_leaves_other_documents() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(&IndexPaths::new(dir.path())).unwrap();
        let t = store.resolve_or_create_term_id("cat").unwrap();
        store.add_posting(t, Field::Title, &Posting { doc_id: 1, frequency: 1, positions: vec![0] }).unwrap();
        store.add_posting(t, Field::Title, &Posting { doc_id: 2, frequency: 1, positions: vec![0] }).unwrap();
        store.remove_posting(t, Field::Title, 1).unwrap();
        store.remove_posting(t, Field::Body, 2).unwrap();
        let postings = store.get_postings(t, Field::Title).unwrap();
        assert_eq!(postings.iter().map(|p| p.doc_id).collect::<Vec<_>>(), vec![2]);

        let terms = FieldTerms { title: vec![t], body: vec![] };
        store.put_field_terms(2, &terms).unwrap();
        assert_eq!(store.get_field_terms(2).unwrap(), Some(terms));
        assert_eq!(store.get_field_terms(1).unwrap(), None);
    }

    #[test]
    fn ids_beyond_u32_are_rejected() {
        assert_eq!(narrow_id(7).unwrap(), 7);
        assert_eq!(narrow_id(u32::MAX as u64).unwrap(), u32::MAX);
        assert!(matches!(narrow_id(u32::MAX as u64 + 1), Err(Error::IdOverflow(_))));
    }

    #[test]
    fn link_graph_follows_documents() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(&IndexPaths::new(dir.path())).unwrap();
        store.put_document(&doc(1, vec![2, 3])).unwrap();
        store.put_document(&doc(2, vec![3])).unwrap();
        assert_eq!(store.get_incoming_links(3).unwrap(), BTreeSet::from([1, 2]));
        assert_eq!(store.get_outgoing_links(1).unwrap(), BTreeSet::from([2, 3]));

        store.put_document(&doc(1, vec![2])).unwrap();
        assert_eq!(store.get_incoming_links(3).unwrap(), BTreeSet::from([2]));
        assert_eq!(store.get_all_document_ids().unwrap(), BTreeSet::from([1, 2]));
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let id = {
            let store = SledStore::open(&paths).unwrap();
            let id = store.resolve_or_create_doc_id("http://example.com/").unwrap();
            store.put_forward_summary(id, &vec![]).unwrap();
            store.flush().unwrap();
            id
        };
        let store = SledStore::open(&paths).unwrap();
        assert_eq!(store.get_doc_id("http://example.com/").unwrap(), Some(id));
        assert_eq!(store.get_forward_summary(id).unwrap(), Some(vec![]));
    }
}
