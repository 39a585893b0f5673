//! Typed tokens and the classifier that produces them.
//!
//! A raw string token from the tokenizer means nothing on its own: `-`
//! could be a negation or a subtraction, `(` could open a group or a
//! function call, a bare word could be a literal or the NULL constant.
//! [classify] settles all of that using exactly one token of lookback.

use crate::grammar::{BracketPair, Function, Grammar, Operator};
use crate::value::Field;

/// A classified token. Borrows from the grammar (`'g`), the field list
/// (`'f`) and the source expression (`'input`); never mutated once built.
#[derive(Clone, Copy)]
pub enum Token<'g, 'f, 'input> {
    OpenBracket(&'g BracketPair),
    CloseBracket(&'g BracketPair),
    ArgumentSeparator,
    Function(&'g Function),
    Operator(&'g Operator),
    Field(&'f dyn Field),
    /// Raw literal text: a bare number, a bare word, or the contents of a
    /// double-quoted string (quotes already stripped).
    Literal(&'input str),
}

impl Token<'_, '_, '_> {
    pub fn is_literal(&self) -> bool {
        matches!(self, Token::Literal(_))
    }

    pub fn is_close_bracket(&self) -> bool {
        matches!(self, Token::CloseBracket(_))
    }
}

impl std::fmt::Debug for Token<'_, '_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenBracket(pair) => write!(f, "OpenBracket({})", pair.open()),
            Self::CloseBracket(pair) => write!(f, "CloseBracket({})", pair.close()),
            Self::ArgumentSeparator => write!(f, "ArgumentSeparator"),
            Self::Function(func) => write!(f, "Function({})", func.name()),
            Self::Operator(op) => {
                write!(f, "Operator({}/{})", op.symbol(), op.operand_count())
            }
            Self::Field(field) => write!(f, "Field({})", field.id()),
            Self::Literal(text) => write!(f, "Literal({text})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A `'...'` reference naming no field in the supplied list.
    FieldNotFound(String),
    /// An operator symbol whose homonyms all have the wrong arity for
    /// this position.
    NoOperatorForContext(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldNotFound(name) => write!(f, "Field not found: {name}"),
            Self::NoOperatorForContext(sym) => {
                write!(f, "Operator '{sym}' cannot be used here")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Maps a raw string token to a typed [Token], a pure function of the
/// grammar, the previous token and the known fields.
///
/// Resolution order: argument separator, function name, operator symbol
/// (homonyms resolved by [guess_operator]), bracket symbol, `'field'`
/// reference, `"string"` literal, then bare literal.
pub fn classify<'g, 'f, 'input>(
    grammar: &'g Grammar,
    previous: Option<&Token>,
    raw: &'input str,
    fields: &'f [&'f dyn Field],
) -> Result<Token<'g, 'f, 'input>, Error> {
    if raw == grammar.argument_separator() {
        return Ok(Token::ArgumentSeparator);
    }
    if let Some(function) = grammar.function(raw) {
        return Ok(Token::Function(function));
    }
    if let Some(candidates) = grammar.operators(raw) {
        let op = if let [only] = candidates {
            only
        } else {
            guess_operator(previous, candidates)
                .ok_or_else(|| Error::NoOperatorForContext(raw.to_string()))?
        };
        return Ok(Token::Operator(op));
    }
    if let Some(pair) = grammar.bracket_pair(raw) {
        return Ok(if pair.open() == raw {
            Token::OpenBracket(pair)
        } else {
            Token::CloseBracket(pair)
        });
    }
    if let Some(name) = quoted(raw, b'\'') {
        return fields
            .iter()
            .find(|f| f.id() == name)
            .map(|f| Token::Field(*f))
            .ok_or_else(|| Error::FieldNotFound(name.to_string()));
    }
    if let Some(text) = quoted(raw, b'"') {
        return Ok(Token::Literal(text));
    }
    Ok(Token::Literal(raw))
}

/// Strips the quotes from a `q...q` span, if that's what this is.
fn quoted(raw: &str, q: u8) -> Option<&str> {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 && bytes[0] == q && bytes[bytes.len() - 1] == q {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

/// Picks between homonym operators by arity: after a close bracket or a
/// literal an operand just ended, so the operator must be binary; in any
/// other position it can only be unary.
///
/// One token of lookback is all the grammar is allowed; anything needing
/// more context is rejected at registration by the homonym validation.
fn guess_operator<'g>(
    previous: Option<&Token>,
    candidates: &'g [Operator],
) -> Option<&'g Operator> {
    let operand_count = match previous {
        Some(t) if t.is_close_bracket() || t.is_literal() => 2,
        _ => 1,
    };
    candidates
        .iter()
        .find(|op| op.operand_count() == operand_count)
}
