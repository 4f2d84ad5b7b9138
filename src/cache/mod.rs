//! Lazy incremental document cache.
//!
//! The [`DocumentCache`] owns the input bytes (an mmap in production, a
//! plain buffer in tests) and walks them strictly forward, record by record,
//! driven by each record's little-endian length prefix. Parsed documents are
//! retained as `{offset, len}` spans into the owned bytes, never as copies,
//! and handed out as lifetime-bound [`RawDocument`] borrows.

use bson::RawDocument;
use thiserror::Error;

/// Number of records parsed per idle-loop turn.
pub const LOAD_BATCH: usize = 100;

/// Records between progress callbacks in [`DocumentCache::load_all`].
const PROGRESS_EVERY: usize = 1000;

/// Smallest well-formed BSON document: length prefix plus terminator.
const MIN_DOC_LEN: usize = 5;

#[derive(Debug, Error)]
pub enum CacheError {
    /// A record in the stream could not be decoded. Fatal: the walk cannot
    /// resynchronize past an undecodable length prefix.
    #[error("malformed document at byte offset {offset}: {reason}")]
    Parse { offset: usize, reason: String },

    #[error("document index {index} out of range ({len} documents in file)")]
    OutOfRange { index: usize, len: usize },
}

/// One parsed record: a window into the cache's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DocSpan {
    offset: usize,
    len: usize,
}

/// Append-only ordered sequence of parsed documents over `[0, len)` of the
/// owned bytes.
///
/// Invariants:
/// - the first document starts at offset 0;
/// - each document starts where the previous one ended (no gaps, no
///   alignment, no trailer);
/// - `complete` becomes true exactly when the walk has consumed every byte,
///   after which the document count is frozen.
pub struct DocumentCache {
    bytes: Box<dyn AsRef<[u8]>>,
    docs: Vec<DocSpan>,
    complete: bool,
}

impl std::fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCache")
            .field("num_docs", &self.docs.len())
            .field("complete", &self.complete)
            .field("size_of_file", &self.size_of_file())
            .finish()
    }
}

impl Default for DocumentCache {
    /// An empty, complete cache. Only useful as a placeholder value.
    fn default() -> Self {
        Self {
            bytes: Box::new(Vec::new()),
            docs: Vec::new(),
            complete: true,
        }
    }
}

impl DocumentCache {
    /// Build a cache over `bytes` and parse the first record.
    ///
    /// Fails if the first record cannot be decoded, including the empty
    /// file, which has no first record at all.
    pub fn new(bytes: impl AsRef<[u8]> + 'static) -> Result<Self, CacheError> {
        let mut cache = Self {
            bytes: Box::new(bytes),
            docs: Vec::new(),
            complete: false,
        };
        cache.parse_next()?;
        Ok(cache)
    }

    fn data(&self) -> &[u8] {
        (*self.bytes).as_ref()
    }

    /// Offset just past the last parsed record; the start of the next one.
    fn next_offset(&self) -> usize {
        self.docs.last().map_or(0, |span| span.offset + span.len)
    }

    /// Parse one more record, or mark the cache complete.
    fn parse_next(&mut self) -> Result<(), CacheError> {
        if self.complete {
            return Ok(());
        }

        let offset = self.next_offset();
        let total = self.data().len();

        let parse_err = |reason: String| CacheError::Parse { offset, reason };

        let Some(header) = self.data().get(offset..offset + 4) else {
            return Err(parse_err(format!(
                "{} trailing bytes, too short for a length prefix",
                total - offset
            )));
        };
        let declared = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let len = usize::try_from(declared)
            .ok()
            .filter(|&len| len >= MIN_DOC_LEN)
            .ok_or_else(|| parse_err(format!("invalid length prefix {declared}")))?;
        if offset + len > total {
            return Err(parse_err(format!(
                "length prefix {len} overruns end of file ({} bytes remain)",
                total - offset
            )));
        }

        // Shallow structural validation; elements are decoded on demand.
        let slice = &self.data()[offset..offset + len];
        RawDocument::from_bytes(slice).map_err(|err| CacheError::Parse {
            offset,
            reason: err.to_string(),
        })?;

        self.docs.push(DocSpan { offset, len });
        if self.next_offset() >= total {
            self.complete = true;
        }
        Ok(())
    }

    /// Force-load until document `index` exists, then borrow it.
    pub fn index(&mut self, index: usize) -> Result<&RawDocument, CacheError> {
        while !self.complete && self.docs.len() <= index {
            self.parse_next()?;
        }
        let len = self.docs.len();
        let span = *self
            .docs
            .get(index)
            .ok_or(CacheError::OutOfRange { index, len })?;
        RawDocument::from_bytes(&self.data()[span.offset..span.offset + span.len]).map_err(|err| {
            CacheError::Parse {
                offset: span.offset,
                reason: err.to_string(),
            }
        })
    }

    /// Borrow an already-parsed document without forcing loads.
    pub fn get(&self, index: usize) -> Option<&RawDocument> {
        let span = self.docs.get(index)?;
        RawDocument::from_bytes(&self.data()[span.offset..span.offset + span.len]).ok()
    }

    /// Parse up to `budget` further records without blocking the caller.
    pub fn load_some(&mut self, budget: usize) -> Result<(), CacheError> {
        for _ in 0..budget {
            if self.complete {
                break;
            }
            self.parse_next()?;
        }
        Ok(())
    }

    /// Parse to completion, reporting the document count every
    /// `PROGRESS_EVERY` records.
    pub fn load_all(&mut self, mut progress: impl FnMut(usize)) -> Result<(), CacheError> {
        let mut parsed = 0usize;
        while !self.complete {
            self.parse_next()?;
            parsed += 1;
            if parsed % PROGRESS_EVERY == 0 {
                progress(self.docs.len());
            }
        }
        progress(self.docs.len());
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn num_docs(&self) -> usize {
        self.docs.len()
    }

    pub fn size_of_file(&self) -> usize {
        self.data().len()
    }

    /// Bytes from the start of the file to the end of the last parsed record.
    pub fn size_of_file_seen(&self) -> usize {
        self.next_offset()
    }

    pub fn perc_of_file_seen(&self) -> f64 {
        if self.size_of_file() == 0 {
            return 100.0;
        }
        self.size_of_file_seen() as f64 / self.size_of_file() as f64 * 100.0
    }
}

/// Concatenate `docs` into one record stream. Test corpora helper.
#[cfg(test)]
pub(crate) fn stream(docs: &[bson::Document]) -> Vec<u8> {
    let mut out = Vec::new();
    for doc in docs {
        out.extend(bson::to_vec(doc).expect("test document serializes"));
    }
    out
}
