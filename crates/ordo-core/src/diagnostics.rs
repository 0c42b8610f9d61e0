//! Diagnostic data model, rule interface, and the per-document scan engine.
//!
//! Rules are an open set behind the [`DiagnosticRule`] trait; the engine's
//! dispatch never changes when a rule is added. A rule is either local — its
//! verdict depends only on a bounded token window, so an edit only requires
//! rescanning the dirty window — or global, in which case every scan re-runs
//! it over the whole stream.
//!
//! For local rules the engine retains prior diagnostics outside the dirty
//! window, shifting offsets past the edit, which keeps a scan after a small
//! edit proportional to the edit, not the document.

use crate::document::{DirtyRegion, Document};
use crate::token::{Token, TokenKind};
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;

/// A half-open character-offset range (`start..end`) in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticRange {
    /// Range start offset (inclusive), in Unicode scalar values.
    pub start: usize,
    /// Range end offset (exclusive), in Unicode scalar values.
    pub end: usize,
}

impl DiagnosticRange {
    /// Create a new diagnostic range.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Diagnostic severity levels, ordered most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    /// Error diagnostics.
    Error,
    /// Warning diagnostics.
    Warning,
    /// Informational diagnostics.
    Information,
    /// Hint diagnostics.
    Hint,
}

/// A single diagnostic item for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Diagnostic range in character offsets.
    pub range: DiagnosticRange,
    /// Diagnostic severity.
    pub severity: DiagnosticSeverity,
    /// Diagnostic message.
    pub message: String,
    /// Identifier of the rule that produced this diagnostic.
    pub rule: String,
}

/// Whether a rule needs the dirty window or the whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    /// Verdict depends only on tokens within a bounded window.
    Local,
    /// Verdict requires whole-document context.
    Global,
}

/// Scan input handed to a rule.
#[derive(Debug)]
pub struct RuleContext<'a> {
    /// The full token stream of the document.
    pub tokens: &'a [Token],
    /// Token index range the rule should scan. For local rules this is the
    /// dirty window; for global rules it is the whole stream.
    pub window: Range<usize>,
}

impl<'a> RuleContext<'a> {
    /// The tokens inside the scan window.
    pub fn window_tokens(&self) -> &'a [Token] {
        &self.tokens[self.window.clone()]
    }
}

/// A rule failure. Failures are isolated per document by the caller; they
/// never abort the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleError {
    /// Identifier of the failing rule.
    pub rule: String,
    /// Failure description.
    pub message: String,
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule `{}` failed: {}", self.rule, self.message)
    }
}

impl std::error::Error for RuleError {}

/// A pure diagnostic rule over a token window.
pub trait DiagnosticRule {
    /// Stable rule identifier, used as the `rule` field of its diagnostics.
    fn id(&self) -> &str;

    /// Local or global scan scope.
    fn scope(&self) -> RuleScope;

    /// Produce diagnostics for the context window.
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Diagnostic>, RuleError>;
}

/// How many tokens beyond the spliced range local rules get to see.
///
/// A local rule's window must not exceed this margin; the built-in local rules
/// inspect single tokens.
pub const LOCAL_RULE_MARGIN: usize = 2;

#[derive(Debug, Clone, Default)]
struct DocumentDiagnostics {
    local: Vec<Diagnostic>,
    global: Vec<Diagnostic>,
    merged: Vec<Diagnostic>,
}

/// The per-document diagnostic scan engine.
///
/// Owns the published diagnostic set for every open document; each scan
/// replaces the affected part of that set wholesale.
pub struct DiagnosticEngine {
    rules: Vec<Box<dyn DiagnosticRule>>,
    documents: HashMap<String, DocumentDiagnostics>,
}

impl DiagnosticEngine {
    /// Create an engine with no rules.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            documents: HashMap::new(),
        }
    }

    /// Create an engine with the built-in Ordo rules.
    pub fn with_default_rules() -> Self {
        let mut engine = Self::new();
        engine.add_rule(Box::new(
            PatternRule::unrecognized_terms().expect("built-in pattern compiles"),
        ));
        engine.add_rule(Box::new(InvalidCharacterRule));
        engine.add_rule(Box::new(DuplicateDeclarationRule));
        engine
    }

    /// Register a rule. The dispatch core never changes for new rules.
    pub fn add_rule(&mut self, rule: Box<dyn DiagnosticRule>) {
        self.rules.push(rule);
    }

    /// The current diagnostics for `uri`, sorted by start offset then severity.
    pub fn diagnostics(&self, uri: &str) -> &[Diagnostic] {
        self.documents
            .get(uri)
            .map(|d| d.merged.as_slice())
            .unwrap_or(&[])
    }

    /// Drop all state for `uri`.
    pub fn forget(&mut self, uri: &str) {
        self.documents.remove(uri);
    }

    /// Replace the diagnostics for `uri` with an externally built set
    /// (used for the internal-error diagnostic after a failed scan).
    pub fn set_diagnostics(&mut self, uri: &str, diagnostics: Vec<Diagnostic>) {
        let entry = self.documents.entry(uri.to_string()).or_default();
        entry.local.clear();
        entry.global = diagnostics.clone();
        entry.merged = diagnostics;
    }

    /// Scan `document` after the given dirty region and return the full,
    /// sorted diagnostic set for it.
    ///
    /// Local rules rescan only the dirty token window (their out-of-window
    /// diagnostics are retained with shifted offsets); global rules rescan the
    /// whole stream. A [`DirtyRegion::Clean`] region runs no rules and returns
    /// the current set unchanged. On a rule failure nothing is committed.
    pub fn scan(
        &mut self,
        document: &Document,
        dirty: &DirtyRegion,
    ) -> Result<Vec<Diagnostic>, RuleError> {
        let tokens = document.tokens().tokens();

        let (window, retained) = match dirty {
            DirtyRegion::Clean => {
                return Ok(self
                    .documents
                    .get(document.uri())
                    .map(|d| d.merged.clone())
                    .unwrap_or_default());
            }
            DirtyRegion::Full => (0..tokens.len(), Vec::new()),
            DirtyRegion::Splice(splice) => {
                let start = splice.start_index.saturating_sub(LOCAL_RULE_MARGIN);
                let end = (splice.start_index + splice.inserted_len + LOCAL_RULE_MARGIN)
                    .min(tokens.len());
                let window = start..end;

                // Character bounds of the window in post-edit offsets, and the
                // matching pre-edit bound for the retained tail.
                let new_lo = tokens
                    .get(window.start)
                    .map(|t| t.start)
                    .unwrap_or_else(|| document.char_len());
                let new_hi = if window.end > window.start {
                    tokens[window.end - 1].end()
                } else {
                    new_lo
                };
                let old_hi = (new_hi as isize - splice.shift).max(new_lo as isize) as usize;

                let prior = self
                    .documents
                    .get(document.uri())
                    .map(|d| d.local.as_slice())
                    .unwrap_or(&[]);
                let mut retained = Vec::new();
                for diag in prior {
                    if diag.range.end <= new_lo {
                        retained.push(diag.clone());
                    } else if diag.range.start >= old_hi {
                        let mut shifted = diag.clone();
                        shifted.range.start =
                            (shifted.range.start as isize + splice.shift) as usize;
                        shifted.range.end = (shifted.range.end as isize + splice.shift) as usize;
                        retained.push(shifted);
                    }
                }
                (window, retained)
            }
        };

        let mut local = retained;
        let mut global = Vec::new();
        for rule in &self.rules {
            match rule.scope() {
                RuleScope::Local => {
                    let ctx = RuleContext {
                        tokens,
                        window: window.clone(),
                    };
                    local.extend(rule.check(&ctx)?);
                }
                RuleScope::Global => {
                    let ctx = RuleContext {
                        tokens,
                        window: 0..tokens.len(),
                    };
                    global.extend(rule.check(&ctx)?);
                }
            }
        }

        let mut merged: Vec<Diagnostic> = local.iter().chain(global.iter()).cloned().collect();
        merged.sort_by(|a, b| {
            (a.range.start, a.severity, a.range.end, a.rule.as_str()).cmp(&(
                b.range.start,
                b.severity,
                b.range.end,
                b.rule.as_str(),
            ))
        });

        let entry = self
            .documents
            .entry(document.uri().to_string())
            .or_default();
        entry.local = local;
        entry.global = global;
        entry.merged = merged.clone();
        Ok(merged)
    }
}

impl Default for DiagnosticEngine {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

/// A local rule flagging identifier tokens whose text matches a pattern,
/// e.g. unresolved placeholder terms like `undefined`.
#[derive(Debug, Clone)]
pub struct PatternRule {
    id: String,
    pattern: Regex,
    severity: DiagnosticSeverity,
}

impl PatternRule {
    /// Create a pattern rule. The pattern is matched against the full text of
    /// each identifier token in the window.
    pub fn new(
        id: impl Into<String>,
        pattern: &str,
        severity: DiagnosticSeverity,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            id: id.into(),
            pattern: Regex::new(pattern)?,
            severity,
        })
    }

    /// The built-in `unrecognized-term` rule: flags the placeholder term
    /// `undefined`, which names nothing in any Ordo scope.
    pub fn unrecognized_terms() -> Result<Self, regex::Error> {
        Self::new("unrecognized-term", r"\Aundefined\z", DiagnosticSeverity::Error)
    }
}

impl DiagnosticRule for PatternRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Local
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Diagnostic>, RuleError> {
        let mut out = Vec::new();
        for token in ctx.window_tokens() {
            if token.kind == TokenKind::Identifier && self.pattern.is_match(&token.text) {
                out.push(Diagnostic {
                    range: DiagnosticRange::new(token.start, token.end()),
                    severity: self.severity,
                    message: format!("`{}` is not a recognized term", token.text),
                    rule: self.id.clone(),
                });
            }
        }
        Ok(out)
    }
}

/// A local rule reporting every lexer error token.
#[derive(Debug, Clone, Copy)]
pub struct InvalidCharacterRule;

impl DiagnosticRule for InvalidCharacterRule {
    fn id(&self) -> &str {
        "invalid-character"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Local
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Diagnostic>, RuleError> {
        let mut out = Vec::new();
        for token in ctx.window_tokens() {
            if token.kind == TokenKind::Error {
                out.push(Diagnostic {
                    range: DiagnosticRange::new(token.start, token.end()),
                    severity: DiagnosticSeverity::Error,
                    message: format!("unrecognized character `{}`", token.text),
                    rule: "invalid-character".to_string(),
                });
            }
        }
        Ok(out)
    }
}

/// A global rule warning when the same name is declared more than once.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateDeclarationRule;

impl DiagnosticRule for DuplicateDeclarationRule {
    fn id(&self) -> &str {
        "duplicate-declaration"
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Global
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Diagnostic>, RuleError> {
        const DECLARING: &[&str] = &["let", "phase", "task"];
        let tokens = ctx.tokens;
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut out = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            if token.kind != TokenKind::Keyword || !DECLARING.contains(&token.text.as_str()) {
                continue;
            }
            let Some(name) = tokens[i + 1..]
                .iter()
                .find(|t| !t.is_trivia())
                .filter(|t| t.kind == TokenKind::Identifier)
            else {
                continue;
            };
            let count = seen.entry(name.text.as_str()).or_insert(0);
            *count += 1;
            if *count > 1 {
                out.push(Diagnostic {
                    range: DiagnosticRange::new(name.start, name.end()),
                    severity: DiagnosticSeverity::Warning,
                    message: format!("`{}` is declared more than once", name.text),
                    rule: "duplicate-declaration".to_string(),
                });
            }
        }
        Ok(out)
    }
}
