use std::borrow::Cow;
use std::fmt;

use crate::error::{ParseError, Result};

/// A single node of the IMAP data model.
///
/// Commands and responses are flat or parenthesized sequences of these
/// values; the [`Reader`](crate::read::Reader) produces them and the
/// [`Writer`](crate::write::Writer) serializes them. The wire grammar only
/// distinguishes atoms, strings, literals and lists: the reader decodes
/// `NIL` eagerly and leaves everything else textual, while `Number` carries
/// the numeric fields formatters emit. Numeric interpretation on the read
/// side is a caller-invoked step through [`Value::as_number`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// A bare word. Protocol keywords compare ASCII-case-insensitively.
    Atom(String),
    /// An unsigned 32-bit number, as formatted for counts, UIDs and sizes.
    Number(u32),
    /// A double-quoted string with `\"` and `\\` escapes.
    Quoted(String),
    /// A length-prefixed blob of opaque 8-bit data.
    Literal(Vec<u8>),
    /// A parenthesized sequence of values.
    List(Vec<Value>),
    /// The special atom `NIL`.
    Nil,
}

/// The discriminant of a [`Value`], used in "unexpected kind" parse errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// [`Value::Atom`]
    Atom,
    /// [`Value::Number`]
    Number,
    /// [`Value::Quoted`]
    Quoted,
    /// [`Value::Literal`]
    Literal,
    /// [`Value::List`]
    List,
    /// [`Value::Nil`]
    Nil,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Atom => "an atom",
            ValueKind::Number => "a number",
            ValueKind::Quoted => "a quoted string",
            ValueKind::Literal => "a literal",
            ValueKind::List => "a list",
            ValueKind::Nil => "NIL",
        })
    }
}

impl Value {
    /// Build the value that best represents `s` on the wire: an atom when
    /// the content permits, a quoted string otherwise. The writer further
    /// upgrades to a literal when even quoting cannot carry the bytes.
    pub fn string(s: impl Into<String>) -> Value {
        let s = s.into();
        if is_safe_atom(&s) {
            Value::Atom(s)
        } else {
            Value::Quoted(s)
        }
    }

    /// The discriminant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Atom(_) => ValueKind::Atom,
            Value::Number(_) => ValueKind::Number,
            Value::Quoted(_) => ValueKind::Quoted,
            Value::Literal(_) => ValueKind::Literal,
            Value::List(_) => ValueKind::List,
            Value::Nil => ValueKind::Nil,
        }
    }

    /// Is this the `NIL` value?
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The atom contents, if this is an atom.
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Value::Atom(s) => Some(s),
            _ => None,
        }
    }

    /// Does this value equal the given protocol keyword,
    /// ASCII-case-insensitively? Only atoms and quoted strings are
    /// considered.
    pub fn eq_keyword(&self, keyword: &str) -> bool {
        match self {
            Value::Atom(s) | Value::Quoted(s) => s.eq_ignore_ascii_case(keyword),
            _ => false,
        }
    }

    /// The textual content of this value: atoms, quoted strings, numbers
    /// and UTF-8 literals all qualify.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Atom(s) | Value::Quoted(s) => Some(Cow::Borrowed(s)),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Literal(b) => std::str::from_utf8(b).ok().map(Cow::Borrowed),
            _ => None,
        }
    }

    /// The raw bytes of this value, for content where 8-bit data is
    /// acceptable.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Atom(s) | Value::Quoted(s) => Some(s.as_bytes()),
            Value::Literal(b) => Some(b),
            _ => None,
        }
    }

    /// The numeric content of this value; digit-only atoms and quoted
    /// strings qualify too.
    pub fn as_number(&self) -> Option<u32> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Atom(s) | Value::Quoted(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// The fields of this value, if it is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(fields) => Some(fields),
            _ => None,
        }
    }

    /// Like [`Value::as_text`], but reports a typed parse error naming
    /// `expected` on mismatch.
    pub fn expect_text(&self, expected: &'static str) -> Result<Cow<'_, str>> {
        self.as_text().ok_or_else(|| {
            ParseError::UnexpectedValue {
                expected,
                found: self.kind(),
            }
            .into()
        })
    }

    /// Like [`Value::as_number`], but reports a typed parse error naming
    /// `expected` on mismatch.
    pub fn expect_number(&self, expected: &'static str) -> Result<u32> {
        self.as_number().ok_or_else(|| {
            ParseError::UnexpectedValue {
                expected,
                found: self.kind(),
            }
            .into()
        })
    }

    /// Consume this value as a list, reporting a typed parse error naming
    /// `expected` on mismatch.
    pub fn expect_list(self, expected: &'static str) -> Result<Vec<Value>> {
        match self {
            Value::List(fields) => Ok(fields),
            other => Err(ParseError::UnexpectedValue {
                expected,
                found: other.kind(),
            }
            .into()),
        }
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Value {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::string(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Value {
        Value::Literal(b)
    }
}

/// Can `s` be written as a bare atom without changing its meaning?
pub(crate) fn is_safe_atom(s: &str) -> bool {
    if s.is_empty() || s.eq_ignore_ascii_case("NIL") {
        return false;
    }
    s.bytes().all(|b| {
        b.is_ascii_graphic() && !matches!(b, b' ' | b'(' | b')' | b'{' | b'"' | b'\\' | b'%' | b'*')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_picks_representation() {
        assert_eq!(Value::string("INBOX"), Value::Atom("INBOX".into()));
        assert_eq!(Value::string("BODY[]"), Value::Atom("BODY[]".into()));
        assert_eq!(
            Value::string("hello gopher"),
            Value::Quoted("hello gopher".into())
        );
        assert_eq!(Value::string(""), Value::Quoted("".into()));
        assert_eq!(Value::string("NIL"), Value::Quoted("NIL".into()));
        assert_eq!(Value::string("42"), Value::Atom("42".into()));
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::Number(42).as_number(), Some(42));
        assert_eq!(Value::Atom("42".into()).as_number(), Some(42));
        assert_eq!(Value::Atom("x".into()).as_number(), None);
        assert_eq!(
            Value::Literal(b"hi".to_vec()).as_text().as_deref(),
            Some("hi")
        );
        assert!(Value::Atom("ok".into()).eq_keyword("OK"));
        assert!(!Value::Nil.eq_keyword("NIL"));
    }

    #[test]
    fn expect_reports_kind() {
        let err = Value::Nil.expect_number("a message count").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected a message count, got NIL".to_string()
        );
    }
}
