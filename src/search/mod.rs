//! Search over the document stream.
//!
//! Two kinds share one surface: a literal search is a substring match over
//! the rendered form of each document (in the caller's current render mode),
//! a structured search is a query document matched against the parsed
//! document. User input starting with `{` is structured, anything else is
//! literal.

use bson::RawDocument;

use crate::cache::DocumentCache;
use crate::query::Filter;
use crate::render::{self, JsonFlavor, RenderMode};

#[derive(Debug, Clone)]
pub enum SearchKind {
    Literal,
    /// `None` when the query document failed to parse; the search is kept so
    /// the user sees `Invalid search pattern` rather than silently nothing.
    Structured(Option<Filter>),
}

/// The retained search: the raw query text plus its parsed form.
#[derive(Debug, Clone)]
pub struct Search {
    text: String,
    kind: SearchKind,
}

impl Search {
    /// Dispatch on the first character: `{` builds a structured search.
    pub fn parse(text: &str) -> Self {
        let kind = if text.starts_with('{') {
            let filter = match Filter::parse(text) {
                Ok(filter) => Some(filter),
                Err(err) => {
                    tracing::debug!(query = text, %err, "structured search failed to parse");
                    None
                }
            };
            SearchKind::Structured(filter)
        } else {
            SearchKind::Literal
        };
        Self {
            text: text.to_string(),
            kind,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_valid(&self) -> bool {
        match &self.kind {
            SearchKind::Literal => !self.text.is_empty(),
            SearchKind::Structured(filter) => filter.is_some(),
        }
    }

    /// Whether `doc` matches. Invalid searches match nothing.
    pub fn matches(&self, doc: &RawDocument, mode: RenderMode, flavor: JsonFlavor) -> bool {
        match &self.kind {
            SearchKind::Literal => {
                !self.text.is_empty() && render::render(doc, mode, flavor).contains(&self.text)
            }
            SearchKind::Structured(Some(filter)) => {
                render::document_json(doc).is_some_and(|value| filter.matches(&value))
            }
            SearchKind::Structured(None) => false,
        }
    }
}

/// Scan loaded documents strictly after `after`, returning the first match.
/// No wrap-around.
pub fn search_forward(
    cache: &DocumentCache,
    after: usize,
    search: &Search,
    mode: RenderMode,
    flavor: JsonFlavor,
) -> Option<usize> {
    (after + 1..cache.num_docs()).find(|&index| {
        cache
            .get(index)
            .is_some_and(|doc| search.matches(doc, mode, flavor))
    })
}
