use crate::builder::IndexBuilder;
use crate::persist::Store;
use crate::{DocId, DocMeta, Result};
use serde::{Deserialize, Serialize};

/// A fetched page as handed over by the crawler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    /// Outgoing link URLs.
    #[serde(default)]
    pub links: Vec<String>,
}

/// Register the page and its links in the store, then index its text.
/// Link targets get document ids even before they are fetched themselves.
pub fn ingest_page<S: Store>(builder: &IndexBuilder<S>, page: &Page) -> Result<DocId> {
    let store = builder.store();
    let doc_id = store.resolve_or_create_doc_id(&page.url)?;
    let mut links: Vec<DocId> = Vec::with_capacity(page.links.len());
    for link in &page.links {
        let child = store.resolve_or_create_doc_id(link)?;
        if child != doc_id && !links.contains(&child) {
            links.push(child);
        }
    }
    let meta = DocMeta {
        id: doc_id,
        url: page.url.clone(),
        title: page.title.clone(),
        body: page.body.clone(),
        size: page.size.unwrap_or(page.body.len() as u64),
        last_modified: page.last_modified.clone(),
        links,
    };
    store.put_document(&meta)?;
    builder.index_document(doc_id, &page.title, &page.body)?;
    Ok(doc_id)
}
