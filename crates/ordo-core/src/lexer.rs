//! The Ordo lexer: full lexing plus incremental relexing of edited spans.
//!
//! Lexing is pure and deterministic: the same text always yields the same
//! token stream, and the stream always covers 100% of the text. Unrecognized
//! characters become length-1 [`TokenKind::Error`] tokens and lexing continues,
//! so the lexer terminates on arbitrary input.
//!
//! [`relex`] re-scans only from the token boundary at or before the dirty
//! range (minus one token of lookback) until the scan resynchronizes with a
//! retained token boundary, then splices the fresh tokens into the cache.
//! Everything after the splice is only offset-shifted, never re-lexed.

use crate::token::{Token, TokenKind, TokenSplice, TokenStream};
use ropey::Rope;

/// Reserved words of the Ordo language, sorted for binary search.
pub const KEYWORDS: &[&str] = &["import", "let", "main", "phase", "task"];

/// Punctuation characters lexed as single-character operator tokens.
pub const OPERATOR_CHARS: &str = ".,;:=+-*/(){}[]<>";

/// A text change expressed against the pre-edit document, in character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSpan {
    /// Start offset of the replaced range.
    pub start: usize,
    /// Number of characters removed at `start`.
    pub removed_len: usize,
    /// Number of characters inserted at `start`.
    pub inserted_len: usize,
}

impl EditSpan {
    /// Character delta this edit applies to all following offsets.
    pub fn shift(&self) -> isize {
        self.inserted_len as isize - self.removed_len as isize
    }

    /// Exclusive end of the inserted text in post-edit offsets.
    pub fn new_end(&self) -> usize {
        self.start + self.inserted_len
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Returns `true` if `word` is an Ordo keyword.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.binary_search(&word).is_ok()
}

/// A token scanner over a character source, with two characters of lookahead.
struct Scanner<I: Iterator<Item = char>> {
    chars: I,
    la0: Option<char>,
    la1: Option<char>,
    /// Character offset of `la0` in the document.
    pos: usize,
}

impl<I: Iterator<Item = char>> Scanner<I> {
    fn new(mut chars: I, pos: usize) -> Self {
        let la0 = chars.next();
        let la1 = chars.next();
        Self {
            chars,
            la0,
            la1,
            pos,
        }
    }

    fn peek(&self) -> Option<char> {
        self.la0
    }

    fn peek2(&self) -> Option<char> {
        self.la1
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.la0;
        self.la0 = self.la1;
        self.la1 = self.chars.next();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn take_while(&mut self, text: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        let start = self.pos;
        let first = self.peek()?;
        let mut text = String::new();

        let kind = if first.is_whitespace() {
            self.take_while(&mut text, char::is_whitespace);
            TokenKind::Whitespace
        } else if first == '#' {
            self.take_while(&mut text, |c| c != '\n');
            TokenKind::Comment
        } else if is_ident_start(first) {
            self.take_while(&mut text, is_ident_continue);
            if is_keyword(&text) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            }
        } else if first.is_ascii_digit() {
            self.take_while(&mut text, |c| c.is_ascii_digit());
            if self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
                text.push('.');
                self.bump();
                self.take_while(&mut text, |c| c.is_ascii_digit());
            }
            TokenKind::Literal
        } else if first == '"' || first == '\'' {
            self.scan_string(&mut text, first);
            TokenKind::Literal
        } else if OPERATOR_CHARS.contains(first) {
            text.push(first);
            self.bump();
            TokenKind::Operator
        } else {
            text.push(first);
            self.bump();
            TokenKind::Error
        };

        Some(Token::new(kind, start, text))
    }

    /// Scan a single-line string literal. An unterminated string ends at the
    /// newline (exclusive) or at end of input.
    fn scan_string(&mut self, text: &mut String, quote: char) {
        text.push(quote);
        self.bump();
        while let Some(c) = self.peek() {
            match c {
                '\n' => break,
                '\\' => {
                    text.push(c);
                    self.bump();
                    if let Some(escaped) = self.peek() {
                        if escaped == '\n' {
                            break;
                        }
                        text.push(escaped);
                        self.bump();
                    }
                }
                _ => {
                    text.push(c);
                    self.bump();
                    if c == quote {
                        break;
                    }
                }
            }
        }
    }
}

fn lex_chars<I: Iterator<Item = char>>(chars: I) -> TokenStream {
    let mut scanner = Scanner::new(chars, 0);
    let mut tokens = Vec::new();
    while let Some(token) = scanner.next_token() {
        tokens.push(token);
    }
    TokenStream::new(tokens)
}

/// Lex a full document from scratch.
pub fn lex(text: &str) -> TokenStream {
    lex_chars(text.chars())
}

/// Lex a full rope-backed document from scratch.
pub fn lex_rope(text: &Rope) -> TokenStream {
    lex_chars(text.chars())
}

/// Incrementally re-lex `text` (the post-edit document) around `edit`,
/// splicing fresh tokens into `cache`.
///
/// The scan starts at the token boundary at or before `edit.start`, backed up
/// by one extra token so that insertions extending the previous token are
/// re-checked. It continues past the dirty range until a produced token ends
/// exactly at the shifted start of a retained token; from there on, old tokens
/// are reused with shifted offsets. If the edit falls inside a
/// multi-character token, that whole token is within the re-scanned span.
pub fn relex(text: &Rope, cache: &mut TokenStream, edit: EditSpan) -> TokenSplice {
    if cache.is_empty() {
        let fresh = lex_rope(text);
        let inserted_len = fresh.len();
        let shift = edit.shift();
        cache.splice(0..0, fresh.tokens().to_vec(), shift);
        return TokenSplice {
            start_index: 0,
            removed: Vec::new(),
            inserted_len,
            shift,
        };
    }

    let old_len = cache.text_len();
    let last = cache.len() - 1;

    // First affected token: the one containing the edit start, minus one token
    // of lookback for left-adjacency (typing at the end of an identifier).
    let lo_raw = cache.token_index_at(edit.start).unwrap_or(last);
    let lo = lo_raw.saturating_sub(1);

    // Last affected token: the one containing the pre-edit end of the removed
    // range, plus one token of lookahead for right-adjacency.
    let old_end = (edit.start + edit.removed_len).min(old_len);
    let hi_raw = cache.token_index_at(old_end).unwrap_or(last);
    let hi = (hi_raw + 1).min(last);

    let shift = edit.shift();
    let lex_start = cache.tokens()[lo].start;

    let mut scanner = Scanner::new(text.chars_at(lex_start), lex_start);
    let mut fresh: Vec<Token> = Vec::new();
    let mut resync = cache.len();
    let mut j = hi + 1;

    while let Some(token) = scanner.next_token() {
        fresh.push(token);
        let pos = scanner.pos as isize;
        while j < cache.len() && (cache.tokens()[j].start as isize + shift) < pos {
            j += 1;
        }
        if j < cache.len() && (cache.tokens()[j].start as isize + shift) == pos {
            resync = j;
            break;
        }
    }

    let inserted_len = fresh.len();
    let removed = cache.splice(lo..resync, fresh, shift);
    TokenSplice {
        start_index: lo,
        removed,
        inserted_len,
        shift,
    }
}
