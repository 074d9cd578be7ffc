use std::fmt;
use std::io::{BufRead, Write};

use crate::error::{Error, ParseError, Result};
use crate::read::Reader;
use crate::value::Value;
use crate::write::Writer;

/// An untagged data response: `* <fields…>`.
///
/// See [RFC 3501 section 2.2.2](https://tools.ietf.org/html/rfc3501#section-2.2.2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resp {
    /// The response fields, starting with the data name or a number.
    pub fields: Vec<Value>,
}

impl Resp {
    /// An untagged data response with the given fields.
    pub fn new(fields: Vec<Value>) -> Resp {
        Resp { fields }
    }

    /// Serialize this response, including the trailing CRLF and a flush.
    pub fn write_to<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_raw("* ")?;
        w.write_fields(&self.fields)?;
        w.end_line()
    }
}

/// A continuation request: `+ <info>`.
///
/// Sent by a server that is ready to receive literal bytes or the next SASL
/// payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContinuationResp {
    /// Free-form text, or a base64 SASL challenge.
    pub info: String,
}

impl ContinuationResp {
    /// A continuation request carrying `info`.
    pub fn new(info: &str) -> ContinuationResp {
        ContinuationResp {
            info: info.to_string(),
        }
    }

    /// Serialize this response, including the trailing CRLF and a flush.
    pub fn write_to<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_raw("+")?;
        if !self.info.is_empty() {
            w.write_raw(" ")?;
            w.write_raw(&self.info)?;
        }
        w.end_line()
    }
}

/// A status response type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusRespType {
    /// Success.
    Ok,
    /// Operational error.
    No,
    /// Protocol-level error.
    Bad,
    /// Greeting of an already-authenticated connection.
    PreAuth,
    /// The server is about to close the connection.
    Bye,
}

impl StatusRespType {
    fn parse(s: &str) -> Option<StatusRespType> {
        Some(match s.to_ascii_uppercase().as_str() {
            "OK" => StatusRespType::Ok,
            "NO" => StatusRespType::No,
            "BAD" => StatusRespType::Bad,
            "PREAUTH" => StatusRespType::PreAuth,
            "BYE" => StatusRespType::Bye,
            _ => return None,
        })
    }
}

impl fmt::Display for StatusRespType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusRespType::Ok => "OK",
            StatusRespType::No => "NO",
            StatusRespType::Bad => "BAD",
            StatusRespType::PreAuth => "PREAUTH",
            StatusRespType::Bye => "BYE",
        })
    }
}

/// A status response code, the bracketed annotation of a status response.
///
/// See [RFC 3501 section 7.1](https://tools.ietf.org/html/rfc3501#section-7.1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusRespCode {
    /// ALERT: the info text must be shown to the user.
    Alert,
    /// BADCHARSET: the requested SEARCH charset is not supported.
    BadCharset,
    /// CAPABILITY: the capability list, saving a CAPABILITY round trip.
    Capability,
    /// PARSE: an error occurred parsing a message's headers.
    Parse,
    /// PERMANENTFLAGS: which flags can be changed permanently.
    PermanentFlags,
    /// READ-ONLY: the mailbox is selected read-only.
    ReadOnly,
    /// READ-WRITE: the mailbox is selected read-write.
    ReadWrite,
    /// TRYCREATE: the operation can succeed after creating the target
    /// mailbox.
    TryCreate,
    /// UIDNEXT: the next UID that will be assigned.
    UidNext,
    /// UIDVALIDITY: the UID validity value.
    UidValidity,
    /// UNSEEN: the sequence number of the first unseen message.
    Unseen,
    /// Any other code, passed through verbatim.
    Other(String),
}

impl From<&str> for StatusRespCode {
    fn from(s: &str) -> StatusRespCode {
        match s.to_ascii_uppercase().as_str() {
            "ALERT" => StatusRespCode::Alert,
            "BADCHARSET" => StatusRespCode::BadCharset,
            "CAPABILITY" => StatusRespCode::Capability,
            "PARSE" => StatusRespCode::Parse,
            "PERMANENTFLAGS" => StatusRespCode::PermanentFlags,
            "READ-ONLY" => StatusRespCode::ReadOnly,
            "READ-WRITE" => StatusRespCode::ReadWrite,
            "TRYCREATE" => StatusRespCode::TryCreate,
            "UIDNEXT" => StatusRespCode::UidNext,
            "UIDVALIDITY" => StatusRespCode::UidValidity,
            "UNSEEN" => StatusRespCode::Unseen,
            _ => StatusRespCode::Other(s.to_ascii_uppercase()),
        }
    }
}

impl fmt::Display for StatusRespCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusRespCode::Alert => f.write_str("ALERT"),
            StatusRespCode::BadCharset => f.write_str("BADCHARSET"),
            StatusRespCode::Capability => f.write_str("CAPABILITY"),
            StatusRespCode::Parse => f.write_str("PARSE"),
            StatusRespCode::PermanentFlags => f.write_str("PERMANENTFLAGS"),
            StatusRespCode::ReadOnly => f.write_str("READ-ONLY"),
            StatusRespCode::ReadWrite => f.write_str("READ-WRITE"),
            StatusRespCode::TryCreate => f.write_str("TRYCREATE"),
            StatusRespCode::UidNext => f.write_str("UIDNEXT"),
            StatusRespCode::UidValidity => f.write_str("UIDVALIDITY"),
            StatusRespCode::Unseen => f.write_str("UNSEEN"),
            StatusRespCode::Other(s) => f.write_str(s),
        }
    }
}

/// A status response: `<tag|*> <TYPE> [CODE <args…>] <info>`.
///
/// See [RFC 3501 section 7.1](https://tools.ietf.org/html/rfc3501#section-7.1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusResp {
    /// The echoed command tag, or `*` for an untagged status.
    pub tag: String,
    /// The response type.
    pub typ: StatusRespType,
    /// The optional bracketed response code.
    pub code: Option<StatusRespCode>,
    /// The response code arguments.
    pub arguments: Vec<Value>,
    /// Human-readable text.
    pub info: String,
}

impl StatusResp {
    /// An untagged OK with the given info text.
    pub fn ok(info: &str) -> StatusResp {
        StatusResp {
            tag: "*".to_string(),
            typ: StatusRespType::Ok,
            code: None,
            arguments: Vec::new(),
            info: info.to_string(),
        }
    }

    /// The canonical completion status for a handled command:
    /// `<tag> OK <NAME> completed`.
    pub fn completed(tag: &str, name: &str) -> StatusResp {
        StatusResp {
            tag: tag.to_string(),
            typ: StatusRespType::Ok,
            code: None,
            arguments: Vec::new(),
            info: format!("{} completed", name),
        }
    }

    /// Attach a response code.
    pub fn with_code(mut self, code: StatusRespCode, arguments: Vec<Value>) -> StatusResp {
        self.code = Some(code);
        self.arguments = arguments;
        self
    }

    /// Convert NO and BAD statuses into the matching [`Error`], and let
    /// everything else pass.
    pub fn err(&self) -> Result<()> {
        match self.typ {
            StatusRespType::No => Err(Error::No(self.info.clone())),
            StatusRespType::Bad => Err(Error::Bad(self.info.clone())),
            StatusRespType::Bye => Err(Error::Bye(self.info.clone())),
            _ => Ok(()),
        }
    }

    /// Serialize this response, including the trailing CRLF and a flush.
    pub fn write_to<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_raw(&self.tag)?;
        w.write_raw(" ")?;
        w.write_raw(&self.typ.to_string())?;
        if let Some(code) = &self.code {
            w.write_raw(" [")?;
            w.write_raw(&code.to_string())?;
            for arg in &self.arguments {
                w.write_raw(" ")?;
                w.write_value(arg)?;
            }
            w.write_raw("]")?;
        }
        if !self.info.is_empty() {
            w.write_raw(" ")?;
            w.write_raw(&self.info)?;
        }
        w.end_line()
    }
}

/// Any single server-to-client transmission unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// A `+` continuation request.
    Continuation(ContinuationResp),
    /// An untagged data response.
    Data(Resp),
    /// A tagged or untagged status response.
    Status(StatusResp),
}

impl Response {
    /// Read and classify one complete response from the stream, literals
    /// included.
    pub fn read_from<R: BufRead>(r: &mut Reader<R>) -> Result<Response> {
        let tag = r
            .read_atom()?
            .expect_text("a response tag")?
            .into_owned();

        if tag == "+" {
            return Ok(Response::Continuation(ContinuationResp {
                info: r.read_info()?,
            }));
        }

        r.read_sp()?;

        if tag == "*" && !starts_with_atom(r)? {
            // data responses like `* LIST (\Noselect) "/" foo` whose second
            // field is not an atom
            let fields = r.read_line()?;
            return Ok(Response::Data(Resp { fields }));
        }

        let second = r.read_atom()?;
        if let Some(typ) = second.as_atom().and_then(StatusRespType::parse) {
            return Ok(Response::Status(read_status_body(r, tag, typ)?));
        }

        if tag != "*" {
            return Err(ParseError::Unexpected(format!(
                "tagged response {} is not a status response",
                tag
            ))
            .into());
        }

        let mut fields = vec![second];
        if !at_crlf(r)? {
            r.read_sp()?;
            fields.extend(r.read_fields()?);
        }
        r.read_crlf()?;
        Ok(Response::Data(Resp { fields }))
    }

    /// Serialize this response, including the trailing CRLF and a flush.
    pub fn write_to<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        match self {
            Response::Continuation(c) => c.write_to(w),
            Response::Data(d) => d.write_to(w),
            Response::Status(s) => s.write_to(w),
        }
    }
}

fn starts_with_atom<R: BufRead>(r: &mut Reader<R>) -> Result<bool> {
    Ok(!matches!(r.peek_byte()?, b'(' | b'"' | b'{'))
}

fn at_crlf<R: BufRead>(r: &mut Reader<R>) -> Result<bool> {
    Ok(r.peek_byte()? == b'\r')
}

fn read_status_body<R: BufRead>(
    r: &mut Reader<R>,
    tag: String,
    typ: StatusRespType,
) -> Result<StatusResp> {
    let mut code = None;
    let mut arguments = Vec::new();

    if r.peek_byte()? == b' ' {
        r.read_sp()?;
        if r.peek_byte()? == b'[' {
            let (name, fields) = r.read_resp_code()?;
            code = Some(StatusRespCode::from(name.as_str()));
            arguments = fields;
        }
    }
    let info = r.read_info()?;

    Ok(StatusResp {
        tag,
        typ,
        code,
        arguments,
        info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(line: &str) -> Response {
        let mut r = Reader::new(line.as_bytes());
        Response::read_from(&mut r).unwrap()
    }

    fn write(resp: &Response) -> String {
        let mut out = Vec::new();
        resp.write_to(&mut Writer::new(&mut out)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn greeting_round_trip() {
        let line = "* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] IMAP4rev1 Service Ready\r\n";
        let resp = read(line);
        match &resp {
            Response::Status(s) => {
                assert_eq!(s.tag, "*");
                assert_eq!(s.typ, StatusRespType::Ok);
                assert_eq!(s.code, Some(StatusRespCode::Capability));
                assert_eq!(
                    s.arguments,
                    vec![
                        Value::Atom("IMAP4rev1".into()),
                        Value::Atom("AUTH=PLAIN".into())
                    ]
                );
                assert_eq!(s.info, "IMAP4rev1 Service Ready");
            }
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(write(&resp), line);
    }

    #[test]
    fn tagged_status_round_trip() {
        let line = "a1 NO [TRYCREATE] No such mailbox\r\n";
        let resp = read(line);
        match &resp {
            Response::Status(s) => {
                assert_eq!(s.tag, "a1");
                assert_eq!(s.typ, StatusRespType::No);
                assert_eq!(s.code, Some(StatusRespCode::TryCreate));
                assert!(s.err().is_err());
            }
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(write(&resp), line);
    }

    #[test]
    fn continuation() {
        let resp = read("+ send literal\r\n");
        assert_eq!(
            resp,
            Response::Continuation(ContinuationResp::new("send literal"))
        );
        assert_eq!(write(&resp), "+ send literal\r\n");
    }

    #[test]
    fn data_responses() {
        match read("* 3 EXPUNGE\r\n") {
            Response::Data(d) => assert_eq!(
                d.fields,
                vec![Value::Atom("3".into()), Value::Atom("EXPUNGE".into())]
            ),
            other => panic!("unexpected response: {:?}", other),
        }

        match read("* SEARCH 2 84 882\r\n") {
            Response::Data(d) => assert_eq!(
                d.fields,
                vec![
                    Value::Atom("SEARCH".into()),
                    Value::Atom("2".into()),
                    Value::Atom("84".into()),
                    Value::Atom("882".into()),
                ]
            ),
            other => panic!("unexpected response: {:?}", other),
        }

        match read("* SEARCH\r\n") {
            Response::Data(d) => assert_eq!(d.fields, vec![Value::Atom("SEARCH".into())]),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn fetch_with_literal() {
        match read("* 2 FETCH (UID 42 BODY[] {16}\r\nI love potatoes.)\r\n") {
            Response::Data(d) => {
                assert_eq!(d.fields[0], Value::Atom("2".into()));
                assert_eq!(d.fields[1], Value::Atom("FETCH".into()));
                let items = d.fields[2].as_list().unwrap();
                assert_eq!(items[0], Value::Atom("UID".into()));
                assert_eq!(items[1], Value::Atom("42".into()));
                assert_eq!(items[2], Value::Atom("BODY[]".into()));
                assert_eq!(items[3], Value::Literal(b"I love potatoes.".to_vec()));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn status_without_info() {
        let resp = read("a2 OK [READ-WRITE]\r\n");
        match &resp {
            Response::Status(s) => {
                assert_eq!(s.code, Some(StatusRespCode::ReadWrite));
                assert_eq!(s.info, "");
            }
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(write(&resp), "a2 OK [READ-WRITE]\r\n");
    }
}
