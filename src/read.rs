//! The IMAP tokenizer.
//!
//! [`Reader`] is a pull-based recursive-descent tokenizer over a buffered
//! byte stream. It produces [`Value`] trees and drives the synchronizing
//! literal flow: a server-mode reader must get a `+` continuation onto the
//! wire after it has seen a `{N}` literal header and before it consumes the
//! N bytes, and it does so through a rendezvous channel because it is in the
//! middle of a line when the need arises.

use std::io::BufRead;
use std::sync::mpsc;

use crate::error::{Error, ParseError, Result};
use crate::value::Value;

const SP: u8 = b' ';
const CR: u8 = b'\r';
const LF: u8 = b'\n';
const DQUOTE: u8 = b'"';
const LITERAL_START: u8 = b'{';
const LITERAL_END: u8 = b'}';
const LIST_START: u8 = b'(';
const LIST_END: u8 = b')';
const RESP_CODE_START: u8 = b'[';
const RESP_CODE_END: u8 = b']';

/// The acknowledgement half of one literal rendezvous: the continuation
/// writer signals on it once the `+` is on the wire.
pub type ContinuationAck = mpsc::SyncSender<()>;

/// Sender half of the literal-continuation rendezvous. The reader posts one
/// [`ContinuationAck`] per literal header it sees and then waits for the
/// acknowledgement before reading the literal bytes.
pub type ContinuationSender = mpsc::SyncSender<ContinuationAck>;

/// Receiver half of the literal-continuation rendezvous, serviced by the
/// connection's continuation writer.
pub type ContinuationReceiver = mpsc::Receiver<ContinuationAck>;

/// Create the rendezvous pair connecting a server-mode [`Reader`] with the
/// connection's continuation writer. The queue holds a single request: at
/// most one literal can be pending per connection.
pub fn continuation_channel() -> (ContinuationSender, ContinuationReceiver) {
    mpsc::sync_channel(1)
}

/// An IMAP stream tokenizer.
pub struct Reader<R: BufRead> {
    r: R,
    continues: Option<ContinuationSender>,
    in_resp_code: bool,
}

impl<R: BufRead> Reader<R> {
    /// A client-mode reader: literals are consumed without any continuation
    /// exchange.
    pub fn new(r: R) -> Reader<R> {
        Reader {
            r,
            continues: None,
            in_resp_code: false,
        }
    }

    /// A server-mode reader: every literal header posts to `continues` and
    /// waits for the acknowledgement before the literal bytes are read.
    pub fn new_server(r: R, continues: ContinuationSender) -> Reader<R> {
        Reader {
            r,
            continues: Some(continues),
            in_resp_code: false,
        }
    }

    fn peek(&mut self) -> Result<u8> {
        let buf = self.r.fill_buf()?;
        if buf.is_empty() {
            return Err(Error::ConnectionLost);
        }
        Ok(buf[0])
    }

    /// Look at the next byte without consuming it.
    pub fn peek_byte(&mut self) -> Result<u8> {
        self.peek()
    }

    fn advance(&mut self) {
        self.r.consume(1);
    }

    fn next_byte(&mut self) -> Result<u8> {
        let b = self.peek()?;
        self.advance();
        Ok(b)
    }

    /// Consume a single space.
    pub fn read_sp(&mut self) -> Result<()> {
        if self.next_byte()? != SP {
            return Err(ParseError::Syntax("not a space").into());
        }
        Ok(())
    }

    /// Consume a CRLF pair.
    pub fn read_crlf(&mut self) -> Result<()> {
        if self.next_byte()? != CR {
            return Err(ParseError::Syntax("line doesn't end with a CR").into());
        }
        if self.next_byte()? != LF {
            return Err(ParseError::Syntax("line doesn't end with a LF").into());
        }
        Ok(())
    }

    /// Read an atom, leaving its terminator (space, `)`, CR, or `]` inside
    /// a response code) unread.
    ///
    /// The atom `NIL` decodes to [`Value::Nil`]; every other atom stays
    /// textual, and numeric interpretation is left to the caller (see
    /// [`Value::as_number`]). A `[` opens a bracketed span that is consumed
    /// verbatim through the matching `]`, so body section names such as
    /// `BODY[HEADER.FIELDS (From To)]` travel as a single atom even though
    /// they embed spaces and parentheses.
    pub fn read_atom(&mut self) -> Result<Value> {
        let mut atom = Vec::new();
        let mut in_section = false;
        loop {
            let b = self.peek()?;
            if in_section {
                match b {
                    CR | LF => {
                        return Err(
                            ParseError::Syntax("atom contains an unterminated bracket").into()
                        )
                    }
                    RESP_CODE_END => in_section = false,
                    _ => {}
                }
                atom.push(b);
                self.advance();
                continue;
            }
            match b {
                LIST_START | LITERAL_START | DQUOTE => {
                    return Err(ParseError::Syntax("atom contains a forbidden character").into())
                }
                SP | LIST_END | CR => break,
                RESP_CODE_END if self.in_resp_code => break,
                RESP_CODE_START => {
                    in_section = true;
                    atom.push(b);
                    self.advance();
                }
                _ => {
                    atom.push(b);
                    self.advance();
                }
            }
        }

        let atom =
            String::from_utf8(atom).map_err(|e| ParseError::DataNotUtf8(e.utf8_error()))?;
        if atom == "NIL" {
            return Ok(Value::Nil);
        }
        Ok(Value::Atom(atom))
    }

    /// Read a `{N}CRLF`-prefixed literal. On a server-mode reader this
    /// first posts to the continuation rendezvous and waits until the `+`
    /// has been written.
    pub fn read_literal(&mut self) -> Result<Value> {
        if self.next_byte()? != LITERAL_START {
            return Err(ParseError::Syntax("literal doesn't start with an open brace").into());
        }

        let mut digits = String::new();
        loop {
            let b = self.next_byte()?;
            if b == LITERAL_END {
                break;
            }
            digits.push(b as char);
        }
        let len: u32 = digits
            .parse()
            .map_err(|_| ParseError::BadNumber(digits.clone()))?;

        self.read_crlf()?;

        if let Some(continues) = &self.continues {
            let (ack_tx, ack_rx) = mpsc::sync_channel(0);
            continues.send(ack_tx).map_err(|_| Error::ConnectionLost)?;
            ack_rx.recv().map_err(|_| Error::ConnectionLost)?;
        }

        let mut buf = vec![0; len as usize];
        self.r.read_exact(&mut buf)?;
        Ok(Value::Literal(buf))
    }

    /// Read a double-quoted string, honoring `\"` and `\\` escapes.
    pub fn read_quoted_string(&mut self) -> Result<Value> {
        if self.next_byte()? != DQUOTE {
            return Err(
                ParseError::Syntax("quoted string doesn't start with a double quote").into(),
            );
        }

        let mut s = Vec::new();
        loop {
            match self.next_byte()? {
                b'\\' => match self.next_byte()? {
                    e @ (DQUOTE | b'\\') => s.push(e),
                    _ => {
                        return Err(
                            ParseError::Syntax("unknown escape in quoted string").into()
                        )
                    }
                },
                DQUOTE => break,
                CR | LF => {
                    return Err(ParseError::Syntax("quoted string contains a line break").into())
                }
                b => s.push(b),
            }
        }

        let s = String::from_utf8(s).map_err(|e| ParseError::DataNotUtf8(e.utf8_error()))?;
        Ok(Value::Quoted(s))
    }

    /// Read a flat run of fields until CR, `)`, or (inside a response code)
    /// `]`. The terminator is left unread for the caller.
    pub fn read_fields(&mut self) -> Result<Vec<Value>> {
        let mut fields = Vec::new();
        loop {
            if self.at_field_terminator()? {
                return Ok(fields);
            }

            let field = match self.peek()? {
                LITERAL_START => self.read_literal()?,
                DQUOTE => self.read_quoted_string()?,
                LIST_START => Value::List(self.read_list()?),
                _ => self.read_atom()?,
            };
            fields.push(field);

            if self.at_field_terminator()? {
                return Ok(fields);
            }
            match self.peek()? {
                // an adjacent `(` begins a nested list with no separator
                LIST_START => continue,
                SP => self.advance(),
                _ => {
                    return Err(ParseError::Syntax("fields are not separated by a space").into())
                }
            }
        }
    }

    fn at_field_terminator(&mut self) -> Result<bool> {
        let b = self.peek()?;
        Ok(b == CR || b == LIST_END || (b == RESP_CODE_END && self.in_resp_code))
    }

    /// Read a parenthesized list.
    pub fn read_list(&mut self) -> Result<Vec<Value>> {
        if self.next_byte()? != LIST_START {
            return Err(ParseError::Syntax("list doesn't start with an open parenthesis").into());
        }
        let fields = self.read_fields()?;
        if self.next_byte()? != LIST_END {
            return Err(ParseError::Syntax("list doesn't end with a close parenthesis").into());
        }
        Ok(fields)
    }

    /// Read a full line of fields, consuming the trailing CRLF.
    pub fn read_line(&mut self) -> Result<Vec<Value>> {
        let fields = self.read_fields()?;
        self.read_crlf()?;
        Ok(fields)
    }

    /// Read a bracketed response code: the code name plus its argument
    /// fields. The closing `]` is consumed.
    pub fn read_resp_code(&mut self) -> Result<(String, Vec<Value>)> {
        if self.next_byte()? != RESP_CODE_START {
            return Err(
                ParseError::Syntax("response code doesn't start with an open bracket").into(),
            );
        }

        self.in_resp_code = true;
        let res = self.read_fields();
        self.in_resp_code = false;
        let mut fields = res?;

        if fields.is_empty() {
            return Err(ParseError::Syntax("response code doesn't contain any field").into());
        }
        let code = fields.remove(0).expect_text("a response code")?.into_owned();

        if self.next_byte()? != RESP_CODE_END {
            return Err(
                ParseError::Syntax("response code doesn't end with a close bracket").into(),
            );
        }
        Ok((code, fields))
    }

    /// Read human-readable text up to and including the CRLF, trimming
    /// leading spaces.
    pub fn read_info(&mut self) -> Result<String> {
        let mut info = Vec::new();
        loop {
            let b = self.next_byte()?;
            if b == CR {
                break;
            }
            info.push(b);
        }
        if self.next_byte()? != LF {
            return Err(ParseError::Syntax("line doesn't end with a LF").into());
        }

        let info = String::from_utf8(info).map_err(|e| ParseError::DataNotUtf8(e.utf8_error()))?;
        Ok(info.trim_start_matches(' ').to_string())
    }

    /// Discard input through the next LF. Used by the server to resynchronize
    /// after a recoverable parse error mid-line.
    pub fn skip_line(&mut self) -> Result<()> {
        loop {
            if self.next_byte()? == LF {
                return Ok(());
            }
        }
    }
}
