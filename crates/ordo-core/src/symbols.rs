//! Occurrence-counted symbol index over a document's token stream.
//!
//! The table tracks two pattern families over non-trivia tokens:
//!
//! - declarations: `let|task|phase <identifier>`
//! - member accesses: `<identifier> . <identifier>`
//!
//! Counts are maintained incrementally from token-cache splices: a pattern is
//! attributed to its first token, and only patterns starting within two
//! non-trivia tokens of a splice can be affected by it, so each update touches
//! a bounded window. [`SymbolTable::apply_splice`] must always agree with a
//! from-scratch [`SymbolTable::from_tokens`] rebuild.
//!
//! A fixed prelude (the Ordo runtime objects) supplements document-observed
//! members so member completion works in fresh documents.

use crate::token::{Token, TokenKind};
use std::collections::HashMap;

/// Keywords that introduce a named declaration.
const DECLARING_KEYWORDS: &[&str] = &["let", "phase", "task"];

/// Built-in Ordo runtime objects and their members.
pub const PRELUDE: &[(&str, &[&str])] = &[
    ("backtestResults", &[]),
    ("compute_engine", &["calculatePerformance", "getEqualWeightAllocation"]),
    ("data_loader", &["getData", "getUniverseFromTickers"]),
    ("observationDate", &["offset"]),
    ("orchestrator", &["getSchedule"]),
    ("pipelineLibrary", &["compute"]),
    ("rebalancingDate", &["offset"]),
    ("universe", &["getData"]),
];

/// A symbol pattern extracted from the token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Declaration(String),
    Member { base: String, member: String },
}

/// Occurrence-counted declarations and member accesses for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    declarations: HashMap<String, usize>,
    members: HashMap<String, HashMap<String, usize>>,
}

impl SymbolTable {
    /// Build a table from a full token stream.
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let mut table = Self::default();
        for pattern in patterns(tokens, tokens.len()) {
            table.add(&pattern);
        }
        table
    }

    /// Update the table for a token-cache splice.
    ///
    /// `old_window` and `new_window` are the pre- and post-splice token
    /// windows: up to two non-trivia tokens of unchanged prefix, the
    /// removed/inserted tokens, and up to two non-trivia tokens of unchanged
    /// suffix. `old_changed_end` / `new_changed_end` are the raw window
    /// indices where the unchanged suffix begins; patterns starting in the
    /// suffix are untouched in both windows and therefore skipped.
    pub fn apply_splice(
        &mut self,
        old_window: &[Token],
        old_changed_end: usize,
        new_window: &[Token],
        new_changed_end: usize,
    ) {
        for pattern in patterns(old_window, old_changed_end) {
            self.remove(&pattern);
        }
        for pattern in patterns(new_window, new_changed_end) {
            self.add(&pattern);
        }
    }

    fn add(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Declaration(name) => {
                *self.declarations.entry(name.clone()).or_insert(0) += 1;
            }
            Pattern::Member { base, member } => {
                *self
                    .members
                    .entry(base.clone())
                    .or_default()
                    .entry(member.clone())
                    .or_insert(0) += 1;
            }
        }
    }

    fn remove(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Declaration(name) => {
                if let Some(count) = self.declarations.get_mut(name) {
                    *count -= 1;
                    if *count == 0 {
                        self.declarations.remove(name);
                    }
                }
            }
            Pattern::Member { base, member } => {
                if let Some(by_member) = self.members.get_mut(base) {
                    if let Some(count) = by_member.get_mut(member) {
                        *count -= 1;
                        if *count == 0 {
                            by_member.remove(member);
                        }
                    }
                    if by_member.is_empty() {
                        self.members.remove(base);
                    }
                }
            }
        }
    }

    /// Returns `true` if `name` is declared in the document.
    pub fn is_declared(&self, name: &str) -> bool {
        self.declarations.contains_key(name)
    }

    /// Names declared in the document, unordered.
    pub fn declared(&self) -> impl Iterator<Item = &str> {
        self.declarations.keys().map(String::as_str)
    }

    /// Returns `true` if `name` is a prelude object.
    pub fn is_prelude_object(name: &str) -> bool {
        PRELUDE.iter().any(|(object, _)| *object == name)
    }

    /// Prelude object names.
    pub fn prelude_objects() -> impl Iterator<Item = &'static str> {
        PRELUDE.iter().map(|(object, _)| *object)
    }

    /// Known members of `base`: document-observed accesses plus prelude
    /// members, deduplicated and sorted.
    pub fn members_of(&self, base: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .members
            .get(base)
            .map(|by_member| by_member.keys().cloned().collect())
            .unwrap_or_default();
        if let Some((_, members)) = PRELUDE.iter().find(|(object, _)| *object == base) {
            for member in *members {
                out.push((*member).to_string());
            }
        }
        out.sort();
        out.dedup();
        out
    }
}

fn next_non_trivia(tokens: &[Token], from: usize) -> Option<usize> {
    tokens
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, t)| !t.is_trivia())
        .map(|(i, _)| i)
}

/// Extract every pattern whose first token lies in `tokens[..changed_end]`.
fn patterns(tokens: &[Token], changed_end: usize) -> Vec<Pattern> {
    let mut out = Vec::new();
    for (i, token) in tokens.iter().enumerate().take(changed_end) {
        match token.kind {
            TokenKind::Keyword if DECLARING_KEYWORDS.contains(&token.text.as_str()) => {
                if let Some(j) = next_non_trivia(tokens, i + 1) {
                    if tokens[j].kind == TokenKind::Identifier {
                        out.push(Pattern::Declaration(tokens[j].text.clone()));
                    }
                }
            }
            TokenKind::Identifier => {
                let Some(j) = next_non_trivia(tokens, i + 1) else {
                    continue;
                };
                if tokens[j].kind != TokenKind::Operator || tokens[j].text != "." {
                    continue;
                }
                let Some(k) = next_non_trivia(tokens, j + 1) else {
                    continue;
                };
                if tokens[k].kind == TokenKind::Identifier {
                    out.push(Pattern::Member {
                        base: token.text.clone(),
                        member: tokens[k].text.clone(),
                    });
                }
            }
            _ => {}
        }
    }
    out
}
