//! Context-aware completion over the token stream and symbol table.
//!
//! Candidates are computed fresh per request in bounded time: the engine only
//! inspects the token enclosing or preceding the cursor plus the document's
//! symbol table, never the whole stream. The candidate list is empty — never
//! an error — when no context matches.

use crate::document::Document;
use crate::symbols::SymbolTable;
use crate::token::{Token, TokenKind};

/// Candidate categories, mirroring the editor-facing completion item kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    /// A language keyword.
    Keyword,
    /// A member method of an object.
    Method,
    /// A declared or built-in value.
    Variable,
}

/// A single completion candidate. Ephemeral: computed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    /// Display label, also the default insertion text.
    pub label: String,
    /// Candidate kind.
    pub kind: CompletionKind,
    /// Optional detail text shown next to the label.
    pub detail: Option<String>,
    /// Optional insertion text overriding the label.
    pub insert_text: Option<String>,
}

impl CompletionCandidate {
    fn new(label: impl Into<String>, kind: CompletionKind, detail: Option<String>) -> Self {
        Self {
            label: label.into(),
            kind,
            detail,
            insert_text: None,
        }
    }
}

/// Keyword candidates offered in statement position.
const KEYWORD_CANDIDATES: &[(&str, &str)] = &[
    ("import", "Imports a module"),
    ("let", "Binds a value to a name"),
    ("main", "Marks the entry task"),
    ("phase", "Defines a new phase"),
    ("task", "Defines a task"),
];

/// Operators that end a statement; the position after one is statement position.
const STATEMENT_DELIMITERS: &[&str] = &[";", "{", "}"];

/// The completion engine. Stateless; all inputs come from the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionEngine;

impl CompletionEngine {
    /// Create a completion engine.
    pub fn new() -> Self {
        Self
    }

    /// Compute candidates for the cursor at `offset` (character offset).
    ///
    /// Context is decided by the token immediately enclosing or preceding the
    /// cursor: after a `.` on an identifier, members of that identifier; in
    /// statement position, keywords; otherwise identifiers from the symbol
    /// table. A partially typed word narrows and orders the candidates.
    pub fn complete(&self, document: &Document, offset: usize) -> Vec<CompletionCandidate> {
        let tokens = document.tokens().tokens();
        if tokens.is_empty() {
            return Vec::new();
        }
        let offset = offset.min(document.char_len());

        let enclosing = if offset == 0 {
            None
        } else {
            document.tokens().token_index_at(offset - 1)
        };

        // Split off a partially typed word at the cursor; the context anchor is
        // then the non-trivia token before it.
        let (partial, anchor) = match enclosing {
            Some(i)
                if matches!(tokens[i].kind, TokenKind::Identifier | TokenKind::Keyword)
                    && tokens[i].end() >= offset =>
            {
                let typed = offset - tokens[i].start;
                let partial: String = tokens[i].text.chars().take(typed).collect();
                (partial, previous_non_trivia(tokens, i))
            }
            Some(i) if tokens[i].kind == TokenKind::Comment => {
                // Still on the comment line; nothing to offer there.
                return Vec::new();
            }
            Some(i) if tokens[i].is_trivia() => {
                (String::new(), previous_non_trivia(tokens, i + 1))
            }
            Some(i) if tokens[i].end() > offset => {
                // Inside a literal, comment-free operator, or error token:
                // nothing sensible to offer.
                return Vec::new();
            }
            Some(i) => (String::new(), Some(i)),
            None => (String::new(), None),
        };

        let candidates = match anchor {
            Some(a) if tokens[a].kind == TokenKind::Operator && tokens[a].text == "." => {
                self.member_candidates(tokens, document.symbols(), a)
            }
            Some(a)
                if tokens[a].kind == TokenKind::Operator
                    && STATEMENT_DELIMITERS.contains(&tokens[a].text.as_str()) =>
            {
                self.keyword_candidates()
            }
            None => self.keyword_candidates(),
            Some(_) => self.identifier_candidates(document.symbols()),
        };

        order_candidates(candidates, &partial)
    }

    fn keyword_candidates(&self) -> Vec<CompletionCandidate> {
        KEYWORD_CANDIDATES
            .iter()
            .map(|(label, detail)| {
                CompletionCandidate::new(
                    *label,
                    CompletionKind::Keyword,
                    Some((*detail).to_string()),
                )
            })
            .collect()
    }

    fn member_candidates(
        &self,
        tokens: &[Token],
        symbols: &SymbolTable,
        dot: usize,
    ) -> Vec<CompletionCandidate> {
        let Some(base_idx) = previous_non_trivia(tokens, dot) else {
            return Vec::new();
        };
        let base = &tokens[base_idx];
        if base.kind != TokenKind::Identifier {
            return Vec::new();
        }
        symbols
            .members_of(&base.text)
            .into_iter()
            .map(|member| {
                CompletionCandidate::new(
                    member,
                    CompletionKind::Method,
                    Some(format!("member of `{}`", base.text)),
                )
            })
            .collect()
    }

    fn identifier_candidates(&self, symbols: &SymbolTable) -> Vec<CompletionCandidate> {
        let mut out: Vec<CompletionCandidate> = symbols
            .declared()
            .map(|name| CompletionCandidate::new(name, CompletionKind::Variable, None))
            .collect();
        for object in SymbolTable::prelude_objects() {
            if !symbols.is_declared(object) {
                out.push(CompletionCandidate::new(
                    object,
                    CompletionKind::Variable,
                    Some("Ordo prelude object".to_string()),
                ));
            }
        }
        out
    }
}

/// Last non-trivia token strictly before index `before`.
fn previous_non_trivia(tokens: &[Token], before: usize) -> Option<usize> {
    tokens[..before].iter().rposition(|t| !t.is_trivia())
}

/// Returns `true` if `needle` is a case-insensitive subsequence of `haystack`.
fn is_fuzzy_match(needle: &str, haystack: &str) -> bool {
    let mut hay = haystack.chars().map(|c| c.to_ascii_lowercase());
    needle
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .all(|n| hay.any(|h| h == n))
}

/// Filter and order candidates: exact-prefix matches before fuzzy matches,
/// alphabetical within each group. With no partial word, alphabetical only.
fn order_candidates(
    mut candidates: Vec<CompletionCandidate>,
    partial: &str,
) -> Vec<CompletionCandidate> {
    if partial.is_empty() {
        candidates.sort_by(|a, b| a.label.cmp(&b.label));
        return candidates;
    }

    let mut ranked: Vec<(u8, CompletionCandidate)> = candidates
        .drain(..)
        .filter_map(|c| {
            if c.label.starts_with(partial) {
                Some((0, c))
            } else if is_fuzzy_match(partial, &c.label) {
                Some((1, c))
            } else {
                None
            }
        })
        .collect();
    ranked.sort_by(|a, b| (a.0, &a.1.label).cmp(&(b.0, &b.1.label)));
    ranked.into_iter().map(|(_, c)| c).collect()
}
