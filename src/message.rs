use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use regex::Regex;

use crate::error::{ParseError, Result};
use crate::flag::Flag;
use crate::value::Value;

lazy_static! {
    // Layouts for RFC 5322 section 3.3 dates, generated the same way
    // net/mail builds its own table: optional day-of-week, 2- or 4-digit
    // year, optional seconds. Zones are normalized to a numeric offset
    // before parsing.
    static ref DATE_LAYOUTS: Vec<String> = {
        let dows = ["", "%a, "]; // day-of-week
        let years = ["%Y", "%y"]; // year = 4*DIGIT / 2*DIGIT
        let seconds = [":%S", ""]; // second
        let mut layouts = Vec::new();
        for dow in &dows {
            for year in &years {
                for second in &seconds {
                    layouts.push(format!("{}%d %b {} %H:%M{} %z", dow, year, second));
                }
            }
        }
        layouts
    };

    // "-0700 (MST)" is not in RFC 5322, but is common.
    static ref ZONE_COMMENT: Regex = Regex::new(r"\s*\([A-Za-z ]+\)\s*$").unwrap();
    static ref NAMED_ZONE: Regex =
        Regex::new(r"(?i)\b(UT|GMT|EST|EDT|CST|CDT|MST|MDT|PST|PDT)$").unwrap();
}

fn zone_offset(name: &str) -> &'static str {
    match name.to_ascii_uppercase().as_str() {
        "UT" | "GMT" => "+0000",
        "EST" => "-0500",
        "EDT" => "-0400",
        "CST" => "-0600",
        "CDT" => "-0500",
        "MST" => "-0700",
        "MDT" => "-0600",
        "PST" => "-0800",
        "PDT" => "-0700",
        _ => "+0000",
    }
}

/// Parse an RFC 5322 message date, as found in `Date` headers and message
/// envelopes.
pub fn parse_message_date(date: &str) -> Result<DateTime<FixedOffset>> {
    let date = ZONE_COMMENT.replace(date.trim(), "");
    let date = match NAMED_ZONE.find(&date) {
        Some(m) => {
            let offset = zone_offset(m.as_str());
            format!("{}{}", &date[..m.start()], offset)
        }
        None => date.into_owned(),
    };

    for layout in DATE_LAYOUTS.iter() {
        if let Ok(parsed) = DateTime::parse_from_str(&date, layout) {
            return Ok(parsed);
        }
    }
    Err(ParseError::BadDate(date).into())
}

/// Parse an IMAP internal date (`d-MMM-yyyy HH:mm:ss ±ZZZZ`), as carried by
/// INTERNALDATE items and APPEND.
pub fn parse_internal_date(date: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(date.trim(), "%d-%b-%Y %H:%M:%S %z")
        .map_err(|_| ParseError::BadDate(date.to_string()).into())
}

/// Format an IMAP internal date.
pub fn format_internal_date(date: &DateTime<FixedOffset>) -> String {
    date.format("%d-%b-%Y %H:%M:%S %z").to_string()
}

/// Parse a SEARCH date (`d-MMM-yyyy`).
pub fn parse_search_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%d-%b-%Y")
        .map_err(|_| ParseError::BadDate(date.to_string()).into())
}

/// Format a SEARCH date.
pub fn format_search_date(date: &NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}

/// A message, as assembled from (or for) a FETCH response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    /// The message identifier: a sequence number, or a UID when the message
    /// was retrieved by a UID command.
    pub id: u32,
    /// The message envelope.
    pub envelope: Option<Envelope>,
    /// The message body sections, keyed by their canonical section
    /// descriptor (`BODY[]`, `BODY[HEADER]`, ...).
    pub body: BTreeMap<String, Vec<u8>>,
    /// The message body structure.
    pub body_structure: Option<BodyStructure>,
    /// The message flags.
    pub flags: Option<Vec<Flag>>,
    /// The date the message was received by the server.
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// The message size in bytes.
    pub size: Option<u32>,
    /// The message UID.
    pub uid: Option<u32>,
}

impl Message {
    /// A message with the given identifier and nothing else.
    pub fn new(id: u32) -> Message {
        Message {
            id,
            ..Message::default()
        }
    }

    /// The bytes of a body section previously fetched under `section`.
    pub fn body_section(&self, section: &str) -> Option<&[u8]> {
        self.body.get(section).map(|b| &b[..])
    }

    /// Decode the item list of a FETCH response into this message.
    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        let mut fields = fields.into_iter();
        loop {
            let key = match fields.next() {
                Some(key) => key.expect_text("a FETCH item name")?.into_owned(),
                None => return Ok(()),
            };
            let value = fields
                .next()
                .ok_or(ParseError::MissingArguments("FETCH item"))?;

            match key.to_ascii_uppercase().as_str() {
                "ENVELOPE" => {
                    self.envelope = Some(Envelope::parse(
                        value.expect_list("an ENVELOPE list")?,
                    )?);
                }
                "BODYSTRUCTURE" | "BODY" => {
                    self.body_structure = Some(BodyStructure::parse(
                        value.expect_list("a BODYSTRUCTURE list")?,
                    )?);
                }
                "FLAGS" => {
                    self.flags = Some(Flag::list_from_value(&value)?);
                }
                "INTERNALDATE" => {
                    let raw = value.expect_text("an internal date")?;
                    self.internal_date = parse_internal_date(&raw).ok();
                }
                "RFC822.SIZE" => {
                    self.size = Some(value.expect_number("a message size")?);
                }
                "UID" => {
                    self.uid = Some(value.expect_number("a UID")?);
                }
                upper if upper.contains('[') => {
                    let bytes = value
                        .as_bytes()
                        .ok_or(ParseError::UnexpectedValue {
                            expected: "body section content",
                            found: value.kind(),
                        })?
                        .to_vec();
                    self.body.insert(key, bytes);
                }
                _ => {}
            }
        }
    }

    /// Encode the populated items of this message as a FETCH item list.
    pub fn fields(&self) -> Vec<Value> {
        let mut fields = Vec::new();
        if let Some(flags) = &self.flags {
            fields.push(Value::Atom("FLAGS".into()));
            fields.push(Flag::list_to_value(flags));
        }
        if let Some(date) = &self.internal_date {
            fields.push(Value::Atom("INTERNALDATE".into()));
            fields.push(Value::Quoted(format_internal_date(date)));
        }
        if let Some(size) = self.size {
            fields.push(Value::Atom("RFC822.SIZE".into()));
            fields.push(Value::Number(size));
        }
        if let Some(envelope) = &self.envelope {
            fields.push(Value::Atom("ENVELOPE".into()));
            fields.push(Value::List(envelope.format()));
        }
        if let Some(bs) = &self.body_structure {
            fields.push(Value::Atom("BODYSTRUCTURE".into()));
            fields.push(Value::List(bs.format()));
        }
        if let Some(uid) = self.uid {
            fields.push(Value::Atom("UID".into()));
            fields.push(Value::Number(uid));
        }
        for (section, bytes) in &self.body {
            fields.push(Value::Atom(section.clone()));
            fields.push(Value::Literal(bytes.clone()));
        }
        fields
    }
}

/// A message envelope: message metadata extracted from its headers.
///
/// See [RFC 3501 section 7.4.2](https://tools.ietf.org/html/rfc3501#section-7.4.2).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Envelope {
    /// The message date.
    pub date: Option<DateTime<FixedOffset>>,
    /// The message subject.
    pub subject: Option<String>,
    /// The From header addresses.
    pub from: Vec<Address>,
    /// The message senders.
    pub sender: Vec<Address>,
    /// The Reply-To header addresses.
    pub reply_to: Vec<Address>,
    /// The To header addresses.
    pub to: Vec<Address>,
    /// The Cc header addresses.
    pub cc: Vec<Address>,
    /// The Bcc header addresses.
    pub bcc: Vec<Address>,
    /// The In-Reply-To header. Contains the parent Message-Id.
    pub in_reply_to: Option<String>,
    /// The Message-Id header.
    pub message_id: Option<String>,
}

impl Envelope {
    /// Decode an envelope from its wire fields.
    pub fn parse(fields: Vec<Value>) -> Result<Envelope> {
        if fields.len() < 10 {
            return Err(ParseError::MissingArguments("ENVELOPE").into());
        }

        let mut envelope = Envelope::default();
        let mut fields = fields.into_iter();
        if let Some(date) = fields.next().unwrap().as_text() {
            envelope.date = parse_message_date(&date).ok();
        }
        envelope.subject = fields.next().unwrap().as_text().map(|s| s.into_owned());
        envelope.from = parse_address_list(fields.next().unwrap());
        envelope.sender = parse_address_list(fields.next().unwrap());
        envelope.reply_to = parse_address_list(fields.next().unwrap());
        envelope.to = parse_address_list(fields.next().unwrap());
        envelope.cc = parse_address_list(fields.next().unwrap());
        envelope.bcc = parse_address_list(fields.next().unwrap());
        envelope.in_reply_to = fields.next().unwrap().as_text().map(|s| s.into_owned());
        envelope.message_id = fields.next().unwrap().as_text().map(|s| s.into_owned());
        Ok(envelope)
    }

    /// Encode this envelope as its wire fields.
    pub fn format(&self) -> Vec<Value> {
        vec![
            match &self.date {
                Some(date) => {
                    Value::Quoted(date.format("%a, %d %b %Y %H:%M:%S %z").to_string())
                }
                None => Value::Nil,
            },
            opt_string(&self.subject),
            format_address_list(&self.from),
            format_address_list(&self.sender),
            format_address_list(&self.reply_to),
            format_address_list(&self.to),
            format_address_list(&self.cc),
            format_address_list(&self.bcc),
            opt_string(&self.in_reply_to),
            opt_string(&self.message_id),
        ]
    }
}

fn opt_string(s: &Option<String>) -> Value {
    match s {
        Some(s) => Value::string(s.clone()),
        None => Value::Nil,
    }
}

/// An electronic mail address, as the four-field wire form used inside
/// envelopes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Address {
    /// The personal name.
    pub personal_name: Option<String>,
    /// The SMTP at-domain-list (source route).
    pub at_domain_list: Option<String>,
    /// The mailbox name (the part before the `@`).
    pub mailbox_name: Option<String>,
    /// The host name (the part after the `@`).
    pub host_name: Option<String>,
}

impl Address {
    /// Decode an address from its wire fields.
    pub fn parse(fields: Vec<Value>) -> Result<Address> {
        if fields.len() < 4 {
            return Err(ParseError::MissingArguments("address").into());
        }
        let mut fields = fields.into_iter();
        Ok(Address {
            personal_name: fields.next().unwrap().as_text().map(|s| s.into_owned()),
            at_domain_list: fields.next().unwrap().as_text().map(|s| s.into_owned()),
            mailbox_name: fields.next().unwrap().as_text().map(|s| s.into_owned()),
            host_name: fields.next().unwrap().as_text().map(|s| s.into_owned()),
        })
    }

    /// Encode this address as its wire fields.
    pub fn format(&self) -> Vec<Value> {
        vec![
            opt_string(&self.personal_name),
            opt_string(&self.at_domain_list),
            opt_string(&self.mailbox_name),
            opt_string(&self.host_name),
        ]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.mailbox_name.as_deref().unwrap_or(""),
            self.host_name.as_deref().unwrap_or("")
        )
    }
}

/// Decode an address list; malformed entries are skipped.
pub fn parse_address_list(value: Value) -> Vec<Address> {
    match value {
        Value::List(fields) => fields
            .into_iter()
            .filter_map(|f| match f {
                Value::List(addr) => Address::parse(addr).ok(),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Encode an address list; an empty list becomes `NIL`.
pub fn format_address_list(addrs: &[Address]) -> Value {
    if addrs.is_empty() {
        return Value::Nil;
    }
    Value::List(
        addrs
            .iter()
            .map(|a| Value::List(a.format()))
            .collect(),
    )
}

/// Decode a parameter list: a flat list of alternating keys and values.
pub fn parse_param_list(fields: Vec<Value>) -> Result<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    let mut fields = fields.into_iter();
    loop {
        let key = match fields.next() {
            Some(key) => key.expect_text("a parameter name")?.into_owned(),
            None => return Ok(params),
        };
        let value = fields
            .next()
            .ok_or(ParseError::MissingArguments("parameter list"))?
            .expect_text("a parameter value")?
            .into_owned();
        params.insert(key, value);
    }
}

/// Encode a parameter list.
pub fn format_param_list(params: &BTreeMap<String, String>) -> Vec<Value> {
    let mut fields = Vec::with_capacity(params.len() * 2);
    for (key, value) in params {
        fields.push(Value::string(key.clone()));
        fields.push(Value::string(value.clone()));
    }
    fields
}

/// A message body structure, basic or multipart, with the optional
/// extension data.
///
/// See [RFC 3501 section 7.4.2](https://tools.ietf.org/html/rfc3501#section-7.4.2).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BodyStructure {
    /// The MIME type.
    pub mime_type: String,
    /// The MIME subtype.
    pub mime_sub_type: String,
    /// The Content-Type parameters.
    pub params: BTreeMap<String, String>,
    /// The Content-Id header.
    pub id: Option<String>,
    /// The Content-Description header.
    pub description: Option<String>,
    /// The Content-Transfer-Encoding header.
    pub encoding: Option<String>,
    /// The part size in bytes.
    pub size: u32,
    /// The number of lines, for text and message parts.
    pub lines: u32,
    /// The envelope of an embedded message/rfc822 part.
    pub envelope: Option<Box<Envelope>>,
    /// The body structure of an embedded message/rfc822 part.
    pub body_structure: Option<Box<BodyStructure>>,
    /// The child parts of a multipart body.
    pub parts: Vec<BodyStructure>,
    /// True when the extension data below was present on the wire.
    pub extended: bool,
    /// The Content-MD5 value.
    pub md5: Option<String>,
    /// The Content-Disposition value.
    pub disposition: Option<String>,
    /// The Content-Language values.
    pub language: Vec<String>,
    /// The Content-Location values.
    pub location: Vec<String>,
}

impl BodyStructure {
    /// Decode a body structure from its wire fields.
    pub fn parse(fields: Vec<Value>) -> Result<BodyStructure> {
        let mut bs = BodyStructure::default();
        if fields.is_empty() {
            return Ok(bs);
        }

        match &fields[0] {
            Value::List(_) => bs.parse_multipart(fields)?,
            _ => bs.parse_basic(fields)?,
        }
        Ok(bs)
    }

    fn parse_multipart(&mut self, fields: Vec<Value>) -> Result<()> {
        self.mime_type = "multipart".to_string();

        let mut fields = fields.into_iter().peekable();
        while let Some(Value::List(_)) = fields.peek() {
            let part = fields.next().unwrap().expect_list("a body part")?;
            self.parts.push(BodyStructure::parse(part)?);
        }

        self.mime_sub_type = fields
            .next()
            .ok_or(ParseError::MissingArguments("multipart body structure"))?
            .expect_text("a MIME subtype")?
            .into_owned();

        if let Some(params) = fields.next() {
            self.extended = true;
            if let Some(list) = params.as_list() {
                self.params = parse_param_list(list.to_vec())?;
            }
            self.parse_extension_tail(&mut fields)?;
        }
        Ok(())
    }

    fn parse_basic(&mut self, fields: Vec<Value>) -> Result<()> {
        if fields.len() < 7 {
            return Err(ParseError::MissingArguments("body structure").into());
        }

        let mut fields = fields.into_iter();
        self.mime_type = fields
            .next()
            .unwrap()
            .expect_text("a MIME type")?
            .into_owned();
        self.mime_sub_type = fields
            .next()
            .unwrap()
            .expect_text("a MIME subtype")?
            .into_owned();
        if let Some(list) = fields.next().unwrap().as_list() {
            self.params = parse_param_list(list.to_vec())?;
        }
        self.id = fields.next().unwrap().as_text().map(|s| s.into_owned());
        self.description = fields.next().unwrap().as_text().map(|s| s.into_owned());
        self.encoding = fields.next().unwrap().as_text().map(|s| s.into_owned());
        self.size = fields.next().unwrap().expect_number("a body part size")?;

        let mut fields = fields.peekable();
        if self.mime_type.eq_ignore_ascii_case("message")
            && self.mime_sub_type.eq_ignore_ascii_case("rfc822")
        {
            if let Some(envelope) = fields.next() {
                self.envelope = Some(Box::new(Envelope::parse(
                    envelope.expect_list("an embedded envelope")?,
                )?));
                let inner = fields
                    .next()
                    .ok_or(ParseError::MissingArguments("message/rfc822 body structure"))?;
                self.body_structure = Some(Box::new(BodyStructure::parse(
                    inner.expect_list("an embedded body structure")?,
                )?));
                let lines = fields
                    .next()
                    .ok_or(ParseError::MissingArguments("message/rfc822 body structure"))?;
                self.lines = lines.expect_number("a line count")?;
            }
        } else if self.mime_type.eq_ignore_ascii_case("text") {
            if let Some(n) = fields.peek().and_then(|f| f.as_number()) {
                self.lines = n;
                fields.next();
            }
        }

        if let Some(md5) = fields.next() {
            self.extended = true;
            self.md5 = md5.as_text().map(|s| s.into_owned());
            self.parse_extension_tail(&mut fields)?;
        }
        Ok(())
    }

    // disposition, language, location: shared by the basic and multipart
    // extension forms
    fn parse_extension_tail(
        &mut self,
        fields: &mut impl Iterator<Item = Value>,
    ) -> Result<()> {
        if let Some(disposition) = fields.next() {
            self.disposition = match disposition {
                Value::List(inner) => inner
                    .first()
                    .and_then(|v| v.as_text())
                    .map(|s| s.into_owned()),
                other => other.as_text().map(|s| s.into_owned()),
            };
        }
        if let Some(language) = fields.next() {
            self.language = string_list(language);
        }
        if let Some(location) = fields.next() {
            self.location = string_list(location);
        }
        Ok(())
    }

    /// Encode this body structure as its wire fields.
    pub fn format(&self) -> Vec<Value> {
        if self.mime_type.eq_ignore_ascii_case("multipart") {
            let mut fields: Vec<Value> =
                self.parts.iter().map(|p| Value::List(p.format())).collect();
            fields.push(Value::string(self.mime_sub_type.clone()));
            if self.extended {
                fields.push(Value::List(format_param_list(&self.params)));
                fields.push(opt_string(&self.disposition));
                fields.push(format_string_list(&self.language));
                fields.push(format_string_list(&self.location));
            }
            return fields;
        }

        let mut fields = vec![
            Value::string(self.mime_type.clone()),
            Value::string(self.mime_sub_type.clone()),
            Value::List(format_param_list(&self.params)),
            opt_string(&self.id),
            opt_string(&self.description),
            opt_string(&self.encoding),
            Value::Number(self.size),
        ];
        if let (Some(envelope), Some(bs)) = (&self.envelope, &self.body_structure) {
            fields.push(Value::List(envelope.format()));
            fields.push(Value::List(bs.format()));
            fields.push(Value::Number(self.lines));
        } else if self.mime_type.eq_ignore_ascii_case("text") && self.lines > 0 {
            fields.push(Value::Number(self.lines));
        }
        if self.extended {
            fields.push(opt_string(&self.md5));
            fields.push(opt_string(&self.disposition));
            fields.push(format_string_list(&self.language));
            fields.push(format_string_list(&self.location));
        }
        fields
    }
}

fn string_list(value: Value) -> Vec<String> {
    match value {
        Value::List(fields) => fields
            .into_iter()
            .filter_map(|f| f.as_text().map(|s| s.into_owned()))
            .collect(),
        other => other
            .as_text()
            .map(|s| vec![s.into_owned()])
            .unwrap_or_default(),
    }
}

fn format_string_list(list: &[String]) -> Value {
    Value::List(list.iter().map(|s| Value::string(s.clone())).collect())
}

/// The specifier part of a body section name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartSpecifier {
    /// The entire part.
    Entire,
    /// The part headers.
    Header,
    /// The part's MIME headers.
    Mime,
    /// The part body text.
    Text,
}

impl Default for PartSpecifier {
    fn default() -> PartSpecifier {
        PartSpecifier::Entire
    }
}

/// The part-addressing half of a body section name: a dotted path and a
/// specifier, plus the header-field filter of `HEADER.FIELDS` /
/// `HEADER.FIELDS.NOT`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BodyPartName {
    /// The specifier, `HEADER`, `MIME`, `TEXT`, or the entire part.
    pub specifier: PartSpecifier,
    /// The dotted part path.
    pub path: Vec<u32>,
    /// The header fields listed by `HEADER.FIELDS (...)`.
    pub fields: Vec<String>,
    /// True for `HEADER.FIELDS.NOT`: `fields` lists exclusions.
    pub not_fields: bool,
}

/// A FETCH body section name such as `BODY.PEEK[1.2.HEADER]<0.512>`.
///
/// `RFC822`, `RFC822.HEADER` and `RFC822.TEXT` parse as their `BODY[...]`
/// equivalents (with `RFC822.HEADER` picking up the peek bit, as it never
/// implied `\Seen`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BodySectionName {
    /// Which part of the message this names.
    pub part: BodyPartName,
    /// True for `BODY.PEEK[...]`: fetching must not set `\Seen`.
    pub peek: bool,
    /// The `<offset.length>` partial range.
    pub partial: Option<(u32, u32)>,
}

impl BodySectionName {
    /// Decode a section name from its textual form.
    pub fn parse(raw: &str) -> Result<BodySectionName> {
        let upper = raw.to_ascii_uppercase();
        match upper.as_str() {
            "RFC822" => return Ok(BodySectionName::default()),
            "RFC822.HEADER" => {
                return Ok(BodySectionName {
                    part: BodyPartName {
                        specifier: PartSpecifier::Header,
                        ..BodyPartName::default()
                    },
                    peek: true,
                    partial: None,
                })
            }
            "RFC822.TEXT" => {
                return Ok(BodySectionName {
                    part: BodyPartName {
                        specifier: PartSpecifier::Text,
                        ..BodyPartName::default()
                    },
                    peek: false,
                    partial: None,
                })
            }
            _ => {}
        }

        let bad = || ParseError::BadSectionName(raw.to_string());

        let (peek, rest) = if upper.starts_with("BODY.PEEK[") {
            (true, &raw["BODY.PEEK[".len()..])
        } else if upper.starts_with("BODY[") {
            (false, &raw["BODY[".len()..])
        } else {
            return Err(bad().into());
        };

        let close = rest.rfind(']').ok_or_else(bad)?;
        let inner = &rest[..close];
        let tail = &rest[close + 1..];

        let partial = if tail.is_empty() {
            None
        } else {
            let range = tail
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .ok_or_else(bad)?;
            let mut bounds = range.splitn(2, '.');
            let offset = bounds
                .next()
                .and_then(|n| n.parse().ok())
                .ok_or_else(bad)?;
            let length = bounds
                .next()
                .and_then(|n| n.parse().ok())
                .ok_or_else(bad)?;
            Some((offset, length))
        };

        Ok(BodySectionName {
            part: BodyPartName::parse(inner).ok_or_else(bad)?,
            peek,
            partial,
        })
    }

    /// The canonical key under which a server reports this section in a
    /// FETCH response: the peek bit is dropped and only the partial offset
    /// survives.
    pub fn resp_key(&self) -> String {
        let mut key = format!("BODY[{}]", self.part);
        if let Some((offset, _)) = self.partial {
            key.push_str(&format!("<{}>", offset));
        }
        key
    }
}

impl BodyPartName {
    fn parse(inner: &str) -> Option<BodyPartName> {
        let mut name = BodyPartName::default();
        if inner.is_empty() {
            return Some(name);
        }

        // split off a field list: "HEADER.FIELDS (From To)"
        let (spec_part, fields) = match inner.find(" (") {
            Some(at) => {
                let list = inner[at + 2..].strip_suffix(')')?;
                let fields = list
                    .split(' ')
                    .filter(|f| !f.is_empty())
                    .map(|f| f.to_string())
                    .collect();
                (&inner[..at], fields)
            }
            None => (inner, Vec::new()),
        };
        name.fields = fields;

        let mut segments = spec_part.split('.').peekable();
        while let Some(seg) = segments.peek() {
            match seg.parse::<u32>() {
                Ok(n) => {
                    name.path.push(n);
                    segments.next();
                }
                Err(_) => break,
            }
        }

        let specifier: Vec<&str> = segments.collect();
        name.specifier = match specifier
            .join(".")
            .to_ascii_uppercase()
            .as_str()
        {
            "" => PartSpecifier::Entire,
            "HEADER" => PartSpecifier::Header,
            "HEADER.FIELDS" => PartSpecifier::Header,
            "HEADER.FIELDS.NOT" => {
                name.not_fields = true;
                PartSpecifier::Header
            }
            "MIME" => PartSpecifier::Mime,
            "TEXT" => PartSpecifier::Text,
            _ => return None,
        };
        if !name.fields.is_empty()
            && !(name.specifier == PartSpecifier::Header)
        {
            return None;
        }
        Some(name)
    }
}

impl fmt::Display for BodyPartName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut need_dot = false;
        for (i, seg) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", seg)?;
            need_dot = true;
        }
        let specifier = match self.specifier {
            PartSpecifier::Entire => "",
            PartSpecifier::Header if !self.fields.is_empty() && self.not_fields => {
                "HEADER.FIELDS.NOT"
            }
            PartSpecifier::Header if !self.fields.is_empty() => "HEADER.FIELDS",
            PartSpecifier::Header => "HEADER",
            PartSpecifier::Mime => "MIME",
            PartSpecifier::Text => "TEXT",
        };
        if !specifier.is_empty() {
            if need_dot {
                f.write_str(".")?;
            }
            f.write_str(specifier)?;
            if !self.fields.is_empty() {
                write!(f, " ({})", self.fields.join(" "))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for BodySectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.peek {
            f.write_str("BODY.PEEK[")?;
        } else {
            f.write_str("BODY[")?;
        }
        write!(f, "{}]", self.part)?;
        if let Some((offset, length)) = self.partial {
            write!(f, "<{}.{}>", offset, length)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dates() {
        let tests = [
            ("21-Nov-1997 09:55:06 -0600", true),
            ("1-Jan-2020 00:00:00 +0000", true),
            ("garbage", false),
        ];
        for (raw, ok) in &tests {
            assert_eq!(parse_internal_date(raw).is_ok(), *ok, "{}", raw);
        }

        let date = parse_internal_date("21-Nov-1997 09:55:06 -0600").unwrap();
        assert_eq!(format_internal_date(&date), "21-Nov-1997 09:55:06 -0600");
    }

    #[test]
    fn parse_message_dates() {
        for raw in &[
            "Fri, 21 Nov 1997 09:55:06 -0600",
            "21 Nov 97 09:55:06 GMT",
            "Fri, 21 Nov 1997 09:55 -0600",
            "Thu, 13 Feb 1969 23:32:54 -0330 (Newfoundland Time)",
            "Mon, 2 Jan 2006 15:04:05 MST",
        ] {
            assert!(parse_message_date(raw).is_ok(), "{}", raw);
        }
        assert!(parse_message_date("not a date").is_err());

        let date = parse_message_date("Fri, 21 Nov 1997 09:55:06 -0600").unwrap();
        assert_eq!(format_internal_date(&date), "21-Nov-1997 09:55:06 -0600");
    }

    #[test]
    fn search_dates() {
        let date = parse_search_date("1-Feb-1994").unwrap();
        assert_eq!(format_search_date(&date), "1-Feb-1994");
        assert!(parse_search_date("Feb-1994").is_err());
    }

    #[test]
    fn body_section_names() {
        let tests: Vec<(&str, BodySectionName)> = vec![
            ("BODY[]", BodySectionName::default()),
            ("RFC822", BodySectionName::default()),
            (
                "BODY[HEADER]",
                BodySectionName {
                    part: BodyPartName {
                        specifier: PartSpecifier::Header,
                        ..BodyPartName::default()
                    },
                    ..BodySectionName::default()
                },
            ),
            (
                "BODY.PEEK[]",
                BodySectionName {
                    peek: true,
                    ..BodySectionName::default()
                },
            ),
            (
                "BODY[TEXT]",
                BodySectionName {
                    part: BodyPartName {
                        specifier: PartSpecifier::Text,
                        ..BodyPartName::default()
                    },
                    ..BodySectionName::default()
                },
            ),
            (
                "RFC822.HEADER",
                BodySectionName {
                    part: BodyPartName {
                        specifier: PartSpecifier::Header,
                        ..BodyPartName::default()
                    },
                    peek: true,
                    ..BodySectionName::default()
                },
            ),
            (
                "BODY[]<0.512>",
                BodySectionName {
                    partial: Some((0, 512)),
                    ..BodySectionName::default()
                },
            ),
            (
                "BODY[1.2.3]",
                BodySectionName {
                    part: BodyPartName {
                        path: vec![1, 2, 3],
                        ..BodyPartName::default()
                    },
                    ..BodySectionName::default()
                },
            ),
            (
                "BODY[1.2.3.HEADER]",
                BodySectionName {
                    part: BodyPartName {
                        specifier: PartSpecifier::Header,
                        path: vec![1, 2, 3],
                        ..BodyPartName::default()
                    },
                    ..BodySectionName::default()
                },
            ),
            (
                "BODY[5.MIME]",
                BodySectionName {
                    part: BodyPartName {
                        specifier: PartSpecifier::Mime,
                        path: vec![5],
                        ..BodyPartName::default()
                    },
                    ..BodySectionName::default()
                },
            ),
            (
                "BODY[HEADER.FIELDS (From To)]",
                BodySectionName {
                    part: BodyPartName {
                        specifier: PartSpecifier::Header,
                        fields: vec!["From".to_string(), "To".to_string()],
                        ..BodyPartName::default()
                    },
                    ..BodySectionName::default()
                },
            ),
            (
                "BODY[HEADER.FIELDS.NOT (Content-Id)]",
                BodySectionName {
                    part: BodyPartName {
                        specifier: PartSpecifier::Header,
                        fields: vec!["Content-Id".to_string()],
                        not_fields: true,
                        ..BodyPartName::default()
                    },
                    ..BodySectionName::default()
                },
            ),
        ];

        for (raw, parsed) in &tests {
            let got = BodySectionName::parse(raw)
                .unwrap_or_else(|e| panic!("cannot parse {}: {}", raw, e));
            assert_eq!(&got, parsed, "{}", raw);
        }

        assert!(BodySectionName::parse("HEADER").is_err());
        assert!(BodySectionName::parse("BODY[").is_err());
    }

    #[test]
    fn body_section_display() {
        for raw in &[
            "BODY[]",
            "BODY.PEEK[HEADER]",
            "BODY[1.2.3.HEADER]",
            "BODY[HEADER.FIELDS (From To)]<0.512>",
            "BODY[5.MIME]",
        ] {
            assert_eq!(
                BodySectionName::parse(raw).unwrap().to_string(),
                raw.to_string()
            );
        }

        let section = BodySectionName::parse("BODY.PEEK[TEXT]<4.32>").unwrap();
        assert_eq!(section.resp_key(), "BODY[TEXT]<4>");
    }

    #[test]
    fn addresses() {
        let fields = vec![
            Value::Quoted("The NSA".into()),
            Value::Nil,
            Value::Atom("root".into()),
            Value::Atom("nsa.gov".into()),
        ];
        let addr = Address::parse(fields.clone()).unwrap();
        assert_eq!(addr.personal_name.as_deref(), Some("The NSA"));
        assert_eq!(addr.at_domain_list, None);
        assert_eq!(addr.to_string(), "root@nsa.gov");

        let formatted = addr.format();
        assert_eq!(formatted[0], Value::Quoted("The NSA".into()));
        assert_eq!(formatted[1], Value::Nil);
        assert_eq!(Address::parse(formatted).unwrap(), addr);
    }

    #[test]
    fn param_lists() {
        let params = parse_param_list(vec![
            Value::Quoted("cc".into()),
            Value::Quoted("dille".into()),
            Value::Quoted("cc dille".into()),
            Value::Quoted("CC DILLE".into()),
        ])
        .unwrap();
        assert_eq!(params.get("cc").map(String::as_str), Some("dille"));
        assert_eq!(params.get("cc dille").map(String::as_str), Some("CC DILLE"));

        let fields = format_param_list(&params);
        assert_eq!(parse_param_list(fields).unwrap(), params);

        // odd-length and nested lists are malformed
        assert!(parse_param_list(vec![Value::Quoted("cc".into())]).is_err());
        assert!(parse_param_list(vec![
            Value::Quoted("cc".into()),
            Value::List(vec![Value::Quoted("dille".into())]),
        ])
        .is_err());
    }

    fn round_trip(bs: &BodyStructure) -> BodyStructure {
        BodyStructure::parse(bs.format()).unwrap()
    }

    #[test]
    fn body_structure_basic() {
        let mut bs = BodyStructure {
            mime_type: "image".into(),
            mime_sub_type: "jpeg".into(),
            id: Some("<foo4%25foo1@bar.net>".into()),
            description: Some("A picture of cat".into()),
            encoding: Some("base64".into()),
            size: 4242,
            ..BodyStructure::default()
        };
        assert_eq!(round_trip(&bs), bs);

        bs.extended = true;
        bs.md5 = Some("e0323a9039add2978bf5b49550572c7c".into());
        bs.disposition = Some("attachment".into());
        bs.language = vec!["en-US".into()];
        assert_eq!(round_trip(&bs), bs);
    }

    #[test]
    fn body_structure_text_lines() {
        let mut params = BTreeMap::new();
        params.insert("charset".to_string(), "utf-8".to_string());
        let bs = BodyStructure {
            mime_type: "text".into(),
            mime_sub_type: "plain".into(),
            params,
            encoding: Some("us-ascii".into()),
            size: 42,
            lines: 2,
            ..BodyStructure::default()
        };
        assert_eq!(round_trip(&bs), bs);
    }

    #[test]
    fn body_structure_embedded_message() {
        let bs = BodyStructure {
            mime_type: "message".into(),
            mime_sub_type: "rfc822".into(),
            encoding: Some("us-ascii".into()),
            size: 42,
            lines: 67,
            envelope: Some(Box::new(Envelope::default())),
            body_structure: Some(Box::new(BodyStructure::default())),
            ..BodyStructure::default()
        };
        let parsed = round_trip(&bs);
        assert_eq!(parsed.lines, 67);
        assert!(parsed.envelope.is_some());
        assert!(parsed.body_structure.is_some());
    }

    #[test]
    fn body_structure_multipart() {
        let part = BodyStructure {
            mime_type: "text".into(),
            mime_sub_type: "plain".into(),
            encoding: Some("us-ascii".into()),
            size: 87,
            lines: 22,
            ..BodyStructure::default()
        };
        let mut multipart = BodyStructure {
            mime_type: "multipart".into(),
            mime_sub_type: "alternative".into(),
            parts: vec![part.clone(), part],
            ..BodyStructure::default()
        };
        assert_eq!(round_trip(&multipart), multipart);

        multipart.extended = true;
        multipart.disposition = Some("inline".into());
        multipart.language = vec!["en-US".into()];
        assert_eq!(round_trip(&multipart), multipart);
    }

    #[test]
    fn message_parse_and_format() {
        let mut msg = Message::new(2);
        msg.parse(vec![
            Value::Atom("UID".into()),
            Value::Number(42),
            Value::Atom("FLAGS".into()),
            Value::List(vec![Value::Atom("\\Seen".into())]),
            Value::Atom("RFC822.SIZE".into()),
            Value::Number(16),
            Value::Atom("BODY[]".into()),
            Value::Literal(b"I love potatoes.".to_vec()),
        ])
        .unwrap();

        assert_eq!(msg.uid, Some(42));
        assert_eq!(msg.flags, Some(vec![Flag::Seen]));
        assert_eq!(msg.size, Some(16));
        assert_eq!(msg.body_section("BODY[]"), Some(&b"I love potatoes."[..]));

        let mut parsed = Message::new(2);
        parsed.parse(msg.fields()).unwrap();
        assert_eq!(parsed, msg);
    }
}
