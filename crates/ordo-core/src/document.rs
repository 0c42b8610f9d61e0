//! The document store: text buffers, versions, and derived analysis state.
//!
//! Each open document owns its text (a rope), its token cache, and its symbol
//! table; all three are kept consistent on every accepted edit. Documents are
//! fully independent values — there is no shared mutable state between two
//! open documents — so a host may process different documents from different
//! workers without contention.

use crate::lexer::{self, EditSpan};
use crate::symbols::SymbolTable;
use crate::token::{Token, TokenSplice, TokenStream};
use ropey::Rope;
use std::collections::HashMap;

/// Whether change events carry full document text or incremental ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Change events replace the whole document text.
    Full,
    /// Change events carry half-open range edits.
    #[default]
    Incremental,
}

/// A single incremental text edit: replace the half-open character range
/// `start..end` with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEdit {
    /// Start offset (inclusive) of the replaced range.
    pub start: usize,
    /// End offset (exclusive) of the replaced range.
    pub end: usize,
    /// Replacement text (may be empty).
    pub text: String,
}

/// The payload of a change event, shaped by the configured [`SyncMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentChange {
    /// Full replacement text (`SyncMode::Full`).
    Full(String),
    /// Ordered range edits against the current text (`SyncMode::Incremental`).
    Incremental(Vec<RangeEdit>),
}

/// The region of a document invalidated by an accepted change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyRegion {
    /// Nothing changed; no rescan is needed.
    Clean,
    /// The whole document must be rescanned.
    Full,
    /// Only the spliced token range is dirty.
    Splice(TokenSplice),
}

/// The result of an accepted change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// The document version after the change.
    pub version: u64,
    /// The invalidated region, for incremental rescanning.
    pub dirty: DirtyRegion,
}

/// Document store failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An edit arrived with a version that does not follow the stored one.
    /// Recovered by the session via a full resync, never fatal.
    StaleVersion {
        /// Document URI.
        uri: String,
        /// Version currently stored.
        current: u64,
        /// Version carried by the rejected change.
        received: u64,
    },
    /// A change referenced a document that is not open.
    UnknownDocument(String),
    /// The change payload does not match the configured sync mode.
    SyncModeMismatch {
        /// Document URI.
        uri: String,
    },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::StaleVersion {
                uri,
                current,
                received,
            } => write!(
                f,
                "stale version {} for {} (current version is {})",
                received, uri, current
            ),
            StoreError::UnknownDocument(uri) => write!(f, "document not open: {}", uri),
            StoreError::SyncModeMismatch { uri } => {
                write!(f, "change payload does not match the sync mode for {}", uri)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// An open document: text, version, and derived analysis state.
#[derive(Debug, Clone)]
pub struct Document {
    uri: String,
    version: u64,
    text: Rope,
    tokens: TokenStream,
    symbols: SymbolTable,
}

impl Document {
    fn new(uri: &str, text: &str, version: u64) -> Self {
        let rope = Rope::from_str(text);
        let tokens = lexer::lex_rope(&rope);
        let symbols = SymbolTable::from_tokens(tokens.tokens());
        Self {
            uri: uri.to_string(),
            version,
            text: rope,
            tokens,
            symbols,
        }
    }

    /// Document URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Current version. Strictly increases across accepted changes.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The current text buffer.
    pub fn text(&self) -> &Rope {
        &self.text
    }

    /// Document length in characters.
    pub fn char_len(&self) -> usize {
        self.text.len_chars()
    }

    /// The token cache, consistent with the text at the current version.
    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    /// The symbol table, consistent with the token cache.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Apply one range edit: clamp, mutate the rope, relex the dirty span, and
    /// update the symbol table from the resulting splice.
    fn apply_range_edit(&mut self, edit: &RangeEdit) -> TokenSplice {
        let len = self.text.len_chars();
        let start = edit.start.min(len);
        let end = edit.end.min(len).max(start);
        if start != edit.start || end != edit.end {
            log::warn!(
                "clamped malformed edit range {}..{} to {}..{} for {}",
                edit.start,
                edit.end,
                start,
                end,
                self.uri
            );
        }

        if end > start {
            self.text.remove(start..end);
        }
        if !edit.text.is_empty() {
            self.text.insert(start, &edit.text);
        }

        let span = EditSpan {
            start,
            removed_len: end - start,
            inserted_len: edit.text.chars().count(),
        };
        let splice = lexer::relex(&self.text, &mut self.tokens, span);

        let (old_window, old_changed, new_window, new_changed) =
            splice_windows(&self.tokens, &splice);
        self.symbols
            .apply_splice(&old_window, old_changed, &new_window, new_changed);

        splice
    }

    fn replace_text(&mut self, text: &str) {
        self.text = Rope::from_str(text);
        self.tokens = lexer::lex_rope(&self.text);
        self.symbols = SymbolTable::from_tokens(self.tokens.tokens());
    }
}

/// Build the symbol-update windows around a token splice: up to two non-trivia
/// tokens of unchanged prefix and suffix around the removed/inserted tokens.
fn splice_windows(
    stream: &TokenStream,
    splice: &TokenSplice,
) -> (Vec<Token>, usize, Vec<Token>, usize) {
    let tokens = stream.tokens();
    let start = splice.start_index;
    let inserted_end = start + splice.inserted_len;

    let mut prefix_start = start;
    let mut non_trivia = 0;
    while prefix_start > 0 && non_trivia < 2 {
        prefix_start -= 1;
        if !tokens[prefix_start].is_trivia() {
            non_trivia += 1;
        }
    }
    let prefix = &tokens[prefix_start..start];

    let mut suffix_end = inserted_end;
    non_trivia = 0;
    while suffix_end < tokens.len() && non_trivia < 2 {
        if !tokens[suffix_end].is_trivia() {
            non_trivia += 1;
        }
        suffix_end += 1;
    }
    let suffix = &tokens[inserted_end..suffix_end];

    let mut old_window = Vec::with_capacity(prefix.len() + splice.removed.len() + suffix.len());
    old_window.extend_from_slice(prefix);
    old_window.extend_from_slice(&splice.removed);
    old_window.extend_from_slice(suffix);
    let old_changed = prefix.len() + splice.removed.len();

    let mut new_window =
        Vec::with_capacity(prefix.len() + splice.inserted_len + suffix.len());
    new_window.extend_from_slice(prefix);
    new_window.extend_from_slice(&tokens[start..inserted_end]);
    new_window.extend_from_slice(suffix);
    let new_changed = prefix.len() + splice.inserted_len;

    (old_window, old_changed, new_window, new_changed)
}

/// The store of all open documents, keyed by URI.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    sync_mode: SyncMode,
    documents: HashMap<String, Document>,
}

impl DocumentStore {
    /// Create a store for the given sync mode.
    pub fn new(sync_mode: SyncMode) -> Self {
        Self {
            sync_mode,
            documents: HashMap::new(),
        }
    }

    /// The configured sync mode.
    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    /// Open (or reopen) a document, replacing any previous state for the URI.
    /// Reopening is also the recovery path after a version conflict.
    pub fn open(&mut self, uri: &str, text: &str, version: u64) {
        self.documents
            .insert(uri.to_string(), Document::new(uri, text, version));
    }

    /// Apply a change to an open document.
    ///
    /// In incremental mode the change version must be exactly the stored
    /// version plus one; anything else is rejected with
    /// [`StoreError::StaleVersion`] and the document is left untouched. In
    /// full mode any version greater than the stored one replaces the text.
    pub fn apply_edit(
        &mut self,
        uri: &str,
        version: u64,
        change: &DocumentChange,
    ) -> Result<EditOutcome, StoreError> {
        let sync_mode = self.sync_mode;
        let document = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| StoreError::UnknownDocument(uri.to_string()))?;

        let dirty = match (sync_mode, change) {
            (SyncMode::Incremental, DocumentChange::Incremental(edits)) => {
                if version != document.version + 1 {
                    return Err(StoreError::StaleVersion {
                        uri: uri.to_string(),
                        current: document.version,
                        received: version,
                    });
                }
                match edits.as_slice() {
                    [] => DirtyRegion::Clean,
                    [edit] => DirtyRegion::Splice(document.apply_range_edit(edit)),
                    edits => {
                        // Batched edits invalidate overlapping spans; treat the
                        // whole document as dirty rather than merging splices.
                        for edit in edits {
                            document.apply_range_edit(edit);
                        }
                        DirtyRegion::Full
                    }
                }
            }
            (SyncMode::Full, DocumentChange::Full(text)) => {
                if version <= document.version {
                    return Err(StoreError::StaleVersion {
                        uri: uri.to_string(),
                        current: document.version,
                        received: version,
                    });
                }
                document.replace_text(text);
                DirtyRegion::Full
            }
            _ => {
                return Err(StoreError::SyncModeMismatch {
                    uri: uri.to_string(),
                });
            }
        };

        document.version = version;
        Ok(EditOutcome { version, dirty })
    }

    /// Close a document, dropping all its state. Returns `true` if it was open.
    pub fn close(&mut self, uri: &str) -> bool {
        self.documents.remove(uri).is_some()
    }

    /// The document for `uri`, if open.
    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.documents.get(uri)
    }

    /// Number of open documents.
    pub fn open_count(&self) -> usize {
        self.documents.len()
    }
}
