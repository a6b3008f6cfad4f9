use serde::{Deserialize, Serialize};
use std::fmt;

pub type TermId = u32;
pub type DocId = u32;

/// The two indexed fields of a page. Postings and weights are tracked per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Title,
    Body,
}

impl Field {
    pub const ALL: [Field; 2] = [Field::Title, Field::Body];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Body => "body",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub frequency: u32,
    /// Zero-based token offsets within the field, ascending.
    pub positions: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub term_id: TermId,
    pub frequency: u32, // title + body
}

/// Top terms of a document by combined frequency, most frequent first.
pub type ForwardSummary = Vec<Keyword>;

/// Every term a document was last indexed with, per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTerms {
    pub title: Vec<TermId>,
    pub body: Vec<TermId>,
}

impl FieldTerms {
    pub fn get(&self, field: Field) -> &[TermId] {
        match field {
            Field::Title => &self.title,
            Field::Body => &self.body,
        }
    }

    pub fn get_mut(&mut self, field: Field) -> &mut Vec<TermId> {
        match field {
            Field::Title => &mut self.title,
            Field::Body => &mut self.body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    pub id: DocId,
    pub url: String,
    pub title: String,
    pub body: String,
    pub size: u64,
    pub last_modified: Option<String>,
    /// Outgoing links, as document ids.
    pub links: Vec<DocId>,
}
