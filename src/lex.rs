//! Splits a raw expression string into raw string tokens.
//!
//! #Notes
//! The tokenizer knows nothing about what a token *means*: it only splits
//! on the delimiter substrings the grammar hands it (operator symbols,
//! bracket symbols, the argument separator), keeping quoted spans and
//! numeric spans whole. Classification happens afterwards, one token at a
//! time, in [crate::token::classify].

/// Lexical failures. Anything else the tokenizer can't place becomes a
/// word token and is judged downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A `'` or `"` span that never closes; payload is the byte offset of
    /// the opening quote.
    UnterminatedQuote(usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnterminatedQuote(start) => {
                write!(f, "Unterminated quote starting at {start}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// This type holds a reference to the source and a byte index, so it's
/// cheap to clone and a clone costs nothing to discard: two clones walk
/// the same source independently.
#[derive(Clone)]
pub struct Tokenizer<'g, 'input> {
    source: &'input str,
    current: usize,
    /// Must be sorted longest first so `>=` wins over `>`.
    /// [crate::grammar::Grammar::delimiters] provides exactly that.
    delimiters: &'g [String],
    decimal_point: u8,
}

impl<'g, 'input> Tokenizer<'g, 'input> {
    pub fn new(source: &'input str, delimiters: &'g [String], decimal_point: u8) -> Self {
        Self {
            source,
            current: 0,
            delimiters,
            decimal_point,
        }
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.current >= self.source.len()
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.current).copied()
    }

    #[inline]
    fn peek_at(&self, at: usize) -> Option<u8> {
        self.source.as_bytes().get(self.current + at).copied()
    }

    #[inline]
    fn remaining(&self) -> &[u8] {
        &self.source.as_bytes()[self.current..]
    }

    #[inline]
    fn consume_while(&mut self, predicate: impl Fn(u8) -> bool) {
        while let Some(c) = self.peek()
            && predicate(c)
        {
            self.current += 1;
        }
    }

    /// Length of the delimiter at the cursor, if any. Delimiters are
    /// tried in order, so the longest match wins.
    fn delimiter_len(&self) -> Option<usize> {
        let rest = self.remaining();
        self.delimiters
            .iter()
            .map(String::as_bytes)
            .find(|d| !d.is_empty() && rest.starts_with(d))
            .map(<[u8]>::len)
    }

    /// Digits, at most one decimal point, more digits. The leading digit
    /// (or point) has already been checked by the caller.
    fn consume_number(&mut self) {
        self.consume_while(|b| b.is_ascii_digit());
        if self.peek() == Some(self.decimal_point) {
            self.current += 1;
            self.consume_while(|b| b.is_ascii_digit());
        }
    }

    /// Produces the next raw token, or `None` once the source is
    /// exhausted. Whitespace separates tokens and is never emitted.
    pub fn next_token(&mut self) -> Result<Option<&'input str>, Error> {
        self.consume_while(|b| b.is_ascii_whitespace());

        if self.is_empty() {
            return Ok(None);
        }
        let start = self.current;

        let head = self.source.as_bytes()[start];
        if head == b'\'' || head == b'"' {
            // Quoted spans stay whole, quotes included; the classifier
            //  strips them. No escape sequences.
            self.current += 1;
            self.consume_while(|b| b != head);
            if self.is_empty() {
                return Err(Error::UnterminatedQuote(start));
            }
            self.current += 1;
        } else if let Some(len) = self.delimiter_len() {
            self.current += len;
        } else if head.is_ascii_digit()
            || (head == self.decimal_point && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()))
        {
            self.consume_number();
        } else {
            // A word: everything up to the next whitespace, quote, or
            //  delimiter. Bare literals and `$NULL$` land here.
            self.current += 1;
            while let Some(c) = self.peek() {
                if c.is_ascii_whitespace() || c == b'\'' || c == b'"' {
                    break;
                }
                if self.delimiter_len().is_some() {
                    break;
                }
                self.current += 1;
            }
        }

        Ok(Some(&self.source[start..self.current]))
    }
}
