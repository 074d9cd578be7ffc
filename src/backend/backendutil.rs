//! Helpers for implementing backends: a light RFC 5322 entity view,
//! the SEARCH criteria evaluator, and FETCH item extraction.
//!
//! The entity here is deliberately shallow: headers are split and
//! unfolded, the body is raw bytes. Full MIME decoding (multipart trees,
//! transfer encodings) belongs to an external parser; these helpers cover
//! exactly what SEARCH and FETCH need.

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::flag::Flag;
use crate::message::{
    parse_message_date, Address, BodySectionName, BodyStructure, Envelope, PartSpecifier,
};
use crate::search::SearchCriteria;

/// A parsed message: unfolded headers plus the raw body.
pub struct Entity {
    headers: Vec<(String, String)>,
    raw: Vec<u8>,
    body_start: usize,
}

impl Entity {
    /// Split a raw message into headers and body.
    pub fn parse(raw: &[u8]) -> Entity {
        let body_start = find_body_start(raw);
        let header_block = &raw[..body_start.min(raw.len())];

        let mut headers: Vec<(String, String)> = Vec::new();
        for line in split_lines(header_block) {
            if line.is_empty() {
                continue;
            }
            if line.starts_with(b" ") || line.starts_with(b"\t") {
                // folded continuation of the previous header
                if let Some(last) = headers.last_mut() {
                    last.1.push(' ');
                    last.1
                        .push_str(String::from_utf8_lossy(line).trim());
                }
                continue;
            }
            let line = String::from_utf8_lossy(line);
            if let Some(colon) = line.find(':') {
                let name = line[..colon].trim().to_string();
                let value = line[colon + 1..].trim().to_string();
                headers.push((name, value));
            }
        }

        Entity {
            headers,
            raw: raw.to_vec(),
            body_start,
        }
    }

    /// The whole message, headers included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The header block, including the blank separator line.
    pub fn header_bytes(&self) -> &[u8] {
        &self.raw[..self.body_start.min(self.raw.len())]
    }

    /// The body bytes.
    pub fn body(&self) -> &[u8] {
        if self.body_start >= self.raw.len() {
            &[]
        } else {
            &self.raw[self.body_start..]
        }
    }

    /// The message size in bytes.
    pub fn size(&self) -> u32 {
        self.raw.len() as u32
    }

    /// All values of the named header, in order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The first value of the named header.
    pub fn header<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        self.header_values(name).next()
    }
}

fn find_body_start(raw: &[u8]) -> usize {
    if let Some(at) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
        return at + 4;
    }
    if let Some(at) = raw.windows(2).position(|w| w == b"\n\n") {
        return at + 2;
    }
    raw.len()
}

fn split_lines(block: &[u8]) -> impl Iterator<Item = &[u8]> {
    block.split(|&b| b == b'\n').map(|line| {
        if line.ends_with(b"\r") {
            &line[..line.len() - 1]
        } else {
            line
        }
    })
}

fn contains_ci(haystack: &[u8], needle: &str) -> bool {
    let needle = needle.to_lowercase();
    let haystack = String::from_utf8_lossy(haystack).to_lowercase();
    haystack.contains(&needle)
}

fn day(date: &DateTime<FixedOffset>) -> NaiveDate {
    date.date_naive()
}

// Day-granularity comparisons matching the evaluator's historical test
// suite: BEFORE is strictly-earlier, SINCE is not-after.
fn matches_before(date: &DateTime<FixedOffset>, bound: &DateTime<FixedOffset>) -> bool {
    day(date) < day(bound)
}

fn matches_since(date: &DateTime<FixedOffset>, bound: &DateTime<FixedOffset>) -> bool {
    day(date) <= day(bound)
}

/// Evaluate the entity-level parts of `criteria` (headers, body, text,
/// dates, size) against a message: `date` is the server-assigned internal
/// date, the Date header covers the SENT criteria. Flag and
/// sequence-number criteria are the business of [`match_flags`] and
/// [`match_seq_num_and_uid`].
pub fn match_message(
    entity: &Entity,
    date: &DateTime<FixedOffset>,
    criteria: &SearchCriteria,
) -> bool {
    for (name, pattern) in &criteria.header {
        let mut values = entity.header_values(name);
        if pattern.is_empty() {
            // the empty pattern matches a present header with any value,
            // and also an absent header
            continue;
        }
        if !values.any(|v| contains_ci(v.as_bytes(), pattern)) {
            return false;
        }
    }

    for pattern in &criteria.body {
        if !contains_ci(entity.body(), pattern) {
            return false;
        }
    }
    for pattern in &criteria.text {
        if !contains_ci(entity.raw(), pattern) {
            return false;
        }
    }

    if let Some(bound) = &criteria.before {
        if !matches_before(date, bound) {
            return false;
        }
    }
    if let Some(bound) = &criteria.since {
        if !matches_since(date, bound) {
            return false;
        }
    }
    if criteria.sent_before.is_some() || criteria.sent_since.is_some() {
        let sent = match entity.header("Date").map(parse_message_date) {
            Some(Ok(sent)) => sent,
            _ => return false,
        };
        if let Some(bound) = &criteria.sent_before {
            if !matches_before(&sent, bound) {
                return false;
            }
        }
        if let Some(bound) = &criteria.sent_since {
            if !matches_since(&sent, bound) {
                return false;
            }
        }
    }

    if let Some(larger) = criteria.larger {
        if entity.size() <= larger {
            return false;
        }
    }
    if let Some(smaller) = criteria.smaller {
        if entity.size() >= smaller {
            return false;
        }
    }

    for not in &criteria.not {
        if match_message(entity, date, not) {
            return false;
        }
    }
    for (left, right) in &criteria.or {
        if !match_message(entity, date, left) && !match_message(entity, date, right) {
            return false;
        }
    }
    true
}

/// Evaluate the flag parts of `criteria` against a message's flag set.
pub fn match_flags(flags: &[Flag], criteria: &SearchCriteria) -> bool {
    for wanted in &criteria.with_flags {
        if !flags.contains(wanted) {
            return false;
        }
    }
    for unwanted in &criteria.without_flags {
        if flags.contains(unwanted) {
            return false;
        }
    }

    for not in &criteria.not {
        if match_flags(flags, not) {
            return false;
        }
    }
    for (left, right) in &criteria.or {
        if !match_flags(flags, left) && !match_flags(flags, right) {
            return false;
        }
    }
    true
}

/// Evaluate the identifier parts of `criteria` against a message's
/// sequence number and UID. An empty sequence set matches nothing.
pub fn match_seq_num_and_uid(seq_num: u32, uid: u32, criteria: &SearchCriteria) -> bool {
    if let Some(set) = &criteria.seq_num {
        if !set.contains(seq_num) {
            return false;
        }
    }
    if let Some(set) = &criteria.uid {
        if !set.contains(uid) {
            return false;
        }
    }

    for not in &criteria.not {
        if match_seq_num_and_uid(seq_num, uid, not) {
            return false;
        }
    }
    for (left, right) in &criteria.or {
        if !match_seq_num_and_uid(seq_num, uid, left)
            && !match_seq_num_and_uid(seq_num, uid, right)
        {
            return false;
        }
    }
    true
}

/// Extract the bytes a FETCH body section names from a raw message.
///
/// Part paths address MIME subparts; without a MIME decoder only the
/// trivial path (`[]`, or `1` on a single-part message) resolves, and any
/// other path yields an empty section.
pub fn fetch_body_section(raw: &[u8], section: &BodySectionName) -> Vec<u8> {
    let entity = Entity::parse(raw);

    let addressable = section.part.path.is_empty() || section.part.path == [1];
    let content: Vec<u8> = if !addressable {
        Vec::new()
    } else {
        match section.part.specifier {
            PartSpecifier::Entire => entity.raw().to_vec(),
            PartSpecifier::Text => entity.body().to_vec(),
            PartSpecifier::Mime => entity.header_bytes().to_vec(),
            PartSpecifier::Header if section.part.fields.is_empty() => {
                entity.header_bytes().to_vec()
            }
            PartSpecifier::Header => {
                let keep = |name: &str| {
                    let listed = section
                        .part
                        .fields
                        .iter()
                        .any(|f| f.eq_ignore_ascii_case(name));
                    listed != section.part.not_fields
                };
                let mut out = Vec::new();
                for (name, value) in &entity.headers {
                    if keep(name) {
                        out.extend_from_slice(name.as_bytes());
                        out.extend_from_slice(b": ");
                        out.extend_from_slice(value.as_bytes());
                        out.extend_from_slice(b"\r\n");
                    }
                }
                out.extend_from_slice(b"\r\n");
                out
            }
        }
    };

    match section.partial {
        None => content,
        Some((offset, length)) => {
            let start = (offset as usize).min(content.len());
            let end = (start + length as usize).min(content.len());
            content[start..end].to_vec()
        }
    }
}

/// Build a message envelope from an entity's headers.
pub fn envelope(entity: &Entity) -> Envelope {
    let addresses = |name: &str| {
        entity
            .header(name)
            .map(parse_addresses)
            .unwrap_or_default()
    };

    let from = addresses("From");
    let mut sender = addresses("Sender");
    if sender.is_empty() {
        sender = from.clone();
    }
    let mut reply_to = addresses("Reply-To");
    if reply_to.is_empty() {
        reply_to = from.clone();
    }

    Envelope {
        date: entity.header("Date").and_then(|d| parse_message_date(d).ok()),
        subject: entity.header("Subject").map(|s| s.to_string()),
        from,
        sender,
        reply_to,
        to: addresses("To"),
        cc: addresses("Cc"),
        bcc: addresses("Bcc"),
        in_reply_to: entity.header("In-Reply-To").map(|s| s.to_string()),
        message_id: entity.header("Message-Id").map(|s| s.to_string()),
    }
}

/// Parse a comma-separated address header value. Only the common `name
/// <box@host>` and bare `box@host` shapes are understood.
pub fn parse_addresses(value: &str) -> Vec<Address> {
    value
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }

            let (name, addr) = match (part.find('<'), part.rfind('>')) {
                (Some(open), Some(close)) if open < close => {
                    let name = part[..open].trim().trim_matches('"').trim();
                    (name, &part[open + 1..close])
                }
                _ => ("", part),
            };

            let mut halves = addr.splitn(2, '@');
            let mailbox = halves.next().unwrap_or("").trim();
            let host = halves.next().unwrap_or("").trim();
            if mailbox.is_empty() {
                return None;
            }

            Some(Address {
                personal_name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                at_domain_list: None,
                mailbox_name: Some(mailbox.to_string()),
                host_name: if host.is_empty() {
                    None
                } else {
                    Some(host.to_string())
                },
            })
        })
        .collect()
}

/// Build a single-part body structure from an entity's headers.
pub fn body_structure(entity: &Entity) -> BodyStructure {
    let mut bs = BodyStructure {
        mime_type: "text".to_string(),
        mime_sub_type: "plain".to_string(),
        ..BodyStructure::default()
    };

    if let Some(content_type) = entity.header("Content-Type") {
        let mut parts = content_type.split(';');
        if let Some(mime) = parts.next() {
            let mut halves = mime.trim().splitn(2, '/');
            if let (Some(t), Some(s)) = (halves.next(), halves.next()) {
                bs.mime_type = t.trim().to_string();
                bs.mime_sub_type = s.trim().to_string();
            }
        }
        for param in parts {
            let mut halves = param.splitn(2, '=');
            if let (Some(k), Some(v)) = (halves.next(), halves.next()) {
                bs.params.insert(
                    k.trim().to_string(),
                    v.trim().trim_matches('"').to_string(),
                );
            }
        }
    }

    bs.encoding = entity
        .header("Content-Transfer-Encoding")
        .map(|e| e.to_string());
    bs.size = entity.body().len() as u32;
    if bs.mime_type.eq_ignore_ascii_case("text") {
        bs.lines = entity.body().iter().filter(|&&b| b == b'\n').count() as u32;
    }
    bs
}
