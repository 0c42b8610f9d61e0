//! Token data model and the per-document token cache.
//!
//! Tokens are expressed in **character offsets** (Unicode scalar values) and
//! partition the document text exactly: no gaps, no overlaps. The cached
//! [`TokenStream`] is derived state owned by a document and kept consistent
//! with the text on every accepted edit.

use std::ops::Range;

/// Lexical token categories of the Ordo language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A reserved word (`phase`, `task`, `let`, ...).
    Keyword,
    /// An identifier (`data_loader`, `weights`, ...).
    Identifier,
    /// A single punctuation character (`.`, `;`, `=`, ...).
    Operator,
    /// A number or string literal.
    Literal,
    /// A `#` line comment.
    Comment,
    /// A maximal run of whitespace.
    Whitespace,
    /// A single unrecognized character; lexing continues after it.
    Error,
}

/// A single lexed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Start offset (inclusive), in Unicode scalar values from the start of the document.
    pub start: usize,
    /// The exact source text covered by this token.
    pub text: String,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, start: usize, text: impl Into<String>) -> Self {
        Self {
            kind,
            start,
            text: text.into(),
        }
    }

    /// Token length in characters. Always at least 1.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Exclusive end offset in characters.
    pub fn end(&self) -> usize {
        self.start + self.char_len()
    }

    /// The half-open character range `start..end` covered by this token.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Returns `true` for tokens that carry no language meaning (whitespace, comments).
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }
}

/// Description of a token-cache splice performed by an incremental relex.
///
/// `removed` holds the replaced tokens with their **pre-edit** offsets; the
/// inserted tokens live in the stream at
/// `start_index..start_index + inserted_len` with post-edit offsets. All
/// retained tokens after the splice were shifted by `shift` characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSplice {
    /// Index of the first replaced token.
    pub start_index: usize,
    /// The tokens that were removed from the cache (pre-edit offsets).
    pub removed: Vec<Token>,
    /// Number of freshly lexed tokens spliced in at `start_index`.
    pub inserted_len: usize,
    /// Character delta applied to every token after the spliced range.
    pub shift: isize,
}

impl TokenSplice {
    /// Index range of the inserted tokens in the post-splice stream.
    pub fn inserted_range(&self) -> Range<usize> {
        self.start_index..self.start_index + self.inserted_len
    }
}

/// The cached token stream for a document.
///
/// Invariant: tokens are sorted by `start` and contiguous — each token starts
/// exactly where the previous one ends, the first starts at 0, and the last
/// ends at the document length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create a stream from already-contiguous tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        let stream = Self { tokens };
        debug_assert!(stream.is_contiguous(stream.text_len()));
        stream
    }

    /// All tokens, in document order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Token count.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if the stream holds no tokens (empty document).
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Exclusive end offset of the last token (0 for an empty stream).
    pub fn text_len(&self) -> usize {
        self.tokens.last().map(Token::end).unwrap_or(0)
    }

    /// Index of the token whose range contains `offset`, if any.
    pub fn token_index_at(&self, offset: usize) -> Option<usize> {
        if offset >= self.text_len() {
            return None;
        }
        let idx = self.tokens.partition_point(|t| t.start <= offset);
        // partition_point returns the first token starting after `offset`;
        // the token containing it is the one before.
        idx.checked_sub(1)
    }

    /// Replace the token index range `range` with `replacement`, shifting every
    /// retained token after the range by `shift` characters. Returns the
    /// removed tokens with their original offsets.
    pub fn splice(
        &mut self,
        range: Range<usize>,
        replacement: Vec<Token>,
        shift: isize,
    ) -> Vec<Token> {
        for token in &mut self.tokens[range.end..] {
            token.start = (token.start as isize + shift) as usize;
        }
        self.tokens.splice(range, replacement).collect()
    }

    /// Verify the partition invariant against a document of `text_len` characters.
    pub fn is_contiguous(&self, text_len: usize) -> bool {
        let mut expected = 0usize;
        for token in &self.tokens {
            if token.start != expected || token.text.is_empty() {
                return false;
            }
            expected = token.end();
        }
        expected == text_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(parts: &[(TokenKind, &str)]) -> TokenStream {
        let mut tokens = Vec::new();
        let mut start = 0;
        for (kind, text) in parts {
            let token = Token::new(*kind, start, *text);
            start = token.end();
            tokens.push(token);
        }
        TokenStream::new(tokens)
    }

    #[test]
    fn test_token_ranges() {
        let token = Token::new(TokenKind::Identifier, 4, "data_loader");
        assert_eq!(token.char_len(), 11);
        assert_eq!(token.end(), 15);
        assert_eq!(token.range(), 4..15);
    }

    #[test]
    fn test_token_index_at() {
        let s = stream(&[
            (TokenKind::Keyword, "let"),
            (TokenKind::Whitespace, " "),
            (TokenKind::Identifier, "x"),
        ]);
        assert_eq!(s.token_index_at(0), Some(0));
        assert_eq!(s.token_index_at(2), Some(0));
        assert_eq!(s.token_index_at(3), Some(1));
        assert_eq!(s.token_index_at(4), Some(2));
        assert_eq!(s.token_index_at(5), None);
    }

    #[test]
    fn test_splice_shifts_tail() {
        let mut s = stream(&[
            (TokenKind::Identifier, "aa"),
            (TokenKind::Operator, ";"),
            (TokenKind::Identifier, "bb"),
        ]);
        let removed = s.splice(
            0..1,
            vec![Token::new(TokenKind::Identifier, 0, "aaaa")],
            2,
        );
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].text, "aa");
        assert!(s.is_contiguous(7));
        assert_eq!(s.tokens()[1].start, 4);
        assert_eq!(s.tokens()[2].start, 5);
    }

    #[test]
    fn test_coverage_rejects_gaps() {
        let tokens = vec![
            Token::new(TokenKind::Identifier, 0, "a"),
            Token::new(TokenKind::Identifier, 2, "b"),
        ];
        let s = TokenStream { tokens };
        assert!(!s.is_contiguous(3));
    }
}
