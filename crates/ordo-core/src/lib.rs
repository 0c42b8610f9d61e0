//! Headless analysis kernel for the Ordo pipeline language.
//!
//! `ordo-core` keeps a set of open documents consistent with an editor through
//! versioned text edits, and derives lexical analysis from them incrementally:
//! a token cache relexed around each edit, an occurrence-counted symbol table,
//! rule-based diagnostics, and context-aware completion. It performs no I/O and
//! speaks no wire protocol; a transport layer (such as `ordo-session`) drives
//! it with plain calls.
//!
//! All offsets are character offsets (Unicode scalar values) and all ranges
//! are half-open.
//!
//! ```
//! use ordo_core::document::{DocumentStore, SyncMode};
//!
//! let mut store = DocumentStore::new(SyncMode::Incremental);
//! store.open("file:///pipeline.ordo", "let u = data_loader.getData(universe)", 1);
//!
//! let doc = store.get("file:///pipeline.ordo").unwrap();
//! assert!(doc.tokens().is_contiguous(doc.char_len()));
//! assert!(doc.symbols().is_declared("u"));
//! ```

#![warn(missing_docs)]

pub mod completion;
pub mod diagnostics;
pub mod document;
pub mod lexer;
pub mod symbols;
pub mod token;

pub use completion::{CompletionCandidate, CompletionEngine, CompletionKind};
pub use diagnostics::{
    Diagnostic, DiagnosticEngine, DiagnosticRange, DiagnosticRule, DiagnosticSeverity, RuleContext,
    RuleError, RuleScope,
};
pub use document::{
    Document, DocumentChange, DocumentStore, DirtyRegion, EditOutcome, RangeEdit, StoreError,
    SyncMode,
};
pub use symbols::SymbolTable;
pub use token::{Token, TokenKind, TokenSplice, TokenStream};
