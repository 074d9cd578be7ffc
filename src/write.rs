//! Serializing value trees to the wire.

use std::io::Write;

use crate::error::Result;
use crate::value::Value;

/// Strings longer than this are sent as literals even when their content
/// could be quoted.
const LITERAL_THRESHOLD: usize = 1024;

/// An IMAP stream serializer.
///
/// Values are written with the RFC 3501 quoting rules: atoms go out raw
/// when their content permits, strings that cannot be represented inside
/// quotes (CR, LF, NUL, 8-bit bytes, or very long content) are upgraded to
/// literals, and lists are parenthesized with single-space separators.
///
/// Literal emission is side-dependent. A server writes `{N}CRLF` and the
/// bytes back to back; a client must wait for the server's `+` continuation
/// in between, which it does through the `wait` callback of the `_with`
/// methods.
pub struct Writer<W: Write> {
    w: W,
}

impl<W: Write> Writer<W> {
    /// Wrap a byte sink.
    pub fn new(w: W) -> Writer<W> {
        Writer { w }
    }

    /// Write a value, never waiting on literal continuations (the server
    /// side of the literal flow).
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        self.write_value_with(value, &mut |_| Ok(()))
    }

    /// Write a value; `wait` is invoked after each literal header has been
    /// flushed and before the literal bytes are sent.
    pub fn write_value_with<F>(&mut self, value: &Value, wait: &mut F) -> Result<()>
    where
        F: FnMut(&mut W) -> Result<()>,
    {
        match value {
            Value::Atom(s) => self.write_string(s, true, wait),
            Value::Quoted(s) => self.write_string(s, false, wait),
            Value::Number(n) => {
                write!(self.w, "{}", n)?;
                Ok(())
            }
            Value::Nil => {
                self.w.write_all(b"NIL")?;
                Ok(())
            }
            Value::Literal(b) => self.write_literal(b, wait),
            Value::List(fields) => {
                self.w.write_all(b"(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        self.w.write_all(b" ")?;
                    }
                    self.write_value_with(field, wait)?;
                }
                self.w.write_all(b")")?;
                Ok(())
            }
        }
    }

    /// Write a space-separated run of fields.
    pub fn write_fields(&mut self, fields: &[Value]) -> Result<()> {
        self.write_fields_with(fields, &mut |_| Ok(()))
    }

    /// Write a space-separated run of fields with a literal-continuation
    /// callback.
    pub fn write_fields_with<F>(&mut self, fields: &[Value], wait: &mut F) -> Result<()>
    where
        F: FnMut(&mut W) -> Result<()>,
    {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.w.write_all(b" ")?;
            }
            self.write_value_with(field, wait)?;
        }
        Ok(())
    }

    /// Write pre-formatted protocol syntax (tags, brackets, response type
    /// keywords) without any quoting.
    pub fn write_raw(&mut self, s: &str) -> Result<()> {
        self.w.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Terminate the current response or command: CRLF, then flush.
    pub fn end_line(&mut self) -> Result<()> {
        self.w.write_all(b"\r\n")?;
        self.w.flush()?;
        Ok(())
    }

    fn write_string<F>(&mut self, s: &str, prefer_atom: bool, wait: &mut F) -> Result<()>
    where
        F: FnMut(&mut W) -> Result<()>,
    {
        if needs_literal(s.as_bytes()) {
            return self.write_literal(s.as_bytes(), wait);
        }
        if prefer_atom && is_wire_atom(s) {
            self.w.write_all(s.as_bytes())?;
            return Ok(());
        }
        self.w.write_all(b"\"")?;
        for &b in s.as_bytes() {
            if b == b'"' || b == b'\\' {
                self.w.write_all(b"\\")?;
            }
            self.w.write_all(&[b])?;
        }
        self.w.write_all(b"\"")?;
        Ok(())
    }

    fn write_literal<F>(&mut self, bytes: &[u8], wait: &mut F) -> Result<()>
    where
        F: FnMut(&mut W) -> Result<()>,
    {
        write!(self.w, "{{{}}}\r\n", bytes.len())?;
        self.w.flush()?;
        wait(&mut self.w)?;
        self.w.write_all(bytes)?;
        Ok(())
    }
}

fn needs_literal(bytes: &[u8]) -> bool {
    bytes.len() > LITERAL_THRESHOLD
        || bytes
            .iter()
            .any(|&b| b == b'\r' || b == b'\n' || b == 0 || b >= 0x80)
}

/// Can `s` go out as a bare atom and read back unchanged?
///
/// This is wider than the constructor-side check in [`Value::string`]: the
/// reader produces atoms containing `\` (flags), `*` and `:` (sequence
/// sets), `%` (wildcards) and bracketed body-section spans, and all of
/// those must round-trip raw. Spaces and parentheses are only permitted
/// inside a `[...]` span.
fn is_wire_atom(s: &str) -> bool {
    if s.is_empty() || s.eq_ignore_ascii_case("NIL") {
        return false;
    }
    let mut in_section = false;
    for b in s.bytes() {
        if !b.is_ascii() || b.is_ascii_control() {
            return false;
        }
        if in_section {
            if b == b']' {
                in_section = false;
            }
            continue;
        }
        match b {
            b'[' => in_section = true,
            b' ' | b'(' | b')' | b'{' | b'"' => return false,
            _ => {}
        }
    }
    !in_section
}
