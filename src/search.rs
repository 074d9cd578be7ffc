use std::iter::Peekable;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

use crate::error::{Error, ParseError, Result};
use crate::flag::Flag;
use crate::message::parse_search_date;
use crate::seq_set::SeqSet;
use crate::value::Value;

/// A SEARCH criteria tree.
///
/// A criterion with several populated fields is a conjunction across them;
/// [`not`](SearchCriteria::not) entries must all fail to match, and each
/// [`or`](SearchCriteria::or) pair requires at least one side to match.
/// Evaluation lives in [`backendutil`](crate::backend::backendutil).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchCriteria {
    /// Sequence numbers the message must be in. An empty set matches
    /// nothing.
    pub seq_num: Option<SeqSet>,
    /// UIDs the message must be in. An empty set matches nothing.
    pub uid: Option<SeqSet>,
    /// The internal date must be strictly earlier than this day.
    pub before: Option<DateTime<FixedOffset>>,
    /// The internal date must be no later than this day (the evaluator
    /// keeps the legacy not-after reading of SINCE).
    pub since: Option<DateTime<FixedOffset>>,
    /// The Date header must be strictly earlier than this day.
    pub sent_before: Option<DateTime<FixedOffset>>,
    /// The Date header must be no later than this day.
    pub sent_since: Option<DateTime<FixedOffset>>,
    /// `(header name, pattern)` pairs. Every pattern must appear as a
    /// case-insensitive substring of some value of its header; the empty
    /// pattern also matches when the header is absent.
    pub header: Vec<(String, String)>,
    /// Substrings that must appear in the message body.
    pub body: Vec<String>,
    /// Substrings that must appear in the full message, headers included.
    pub text: Vec<String>,
    /// Flags that must all be present.
    pub with_flags: Vec<Flag>,
    /// Flags that must all be absent.
    pub without_flags: Vec<Flag>,
    /// The message size must be strictly greater than this.
    pub larger: Option<u32>,
    /// The message size must be strictly smaller than this.
    pub smaller: Option<u32>,
    /// Criteria that must all fail to match.
    pub not: Vec<SearchCriteria>,
    /// Pairs of criteria of which at least one side must match.
    pub or: Vec<(SearchCriteria, SearchCriteria)>,
}

type Fields = Peekable<std::vec::IntoIter<Value>>;

impl SearchCriteria {
    /// Decode the argument fields of a SEARCH command: an optional
    /// `CHARSET <name>` prefix followed by one or more search keys.
    pub fn parse(fields: Vec<Value>) -> Result<(Option<String>, SearchCriteria)> {
        let mut fields = fields.into_iter().peekable();

        let mut charset = None;
        if fields
            .peek()
            .map(|f| f.eq_keyword("CHARSET"))
            .unwrap_or(false)
        {
            fields.next();
            let name = fields
                .next()
                .ok_or(ParseError::MissingArguments("SEARCH CHARSET"))?;
            charset = Some(name.expect_text("a charset name")?.into_owned());
        }

        if fields.peek().is_none() {
            return Err(ParseError::MissingArguments("SEARCH").into());
        }
        let criteria = SearchCriteria::parse_keys(&mut fields)?;
        Ok((charset, criteria))
    }

    fn parse_keys(fields: &mut Fields) -> Result<SearchCriteria> {
        let mut criteria = SearchCriteria::default();
        while fields.peek().is_some() {
            let key = SearchCriteria::parse_one(fields)?;
            criteria.and(key);
        }
        Ok(criteria)
    }

    // Decode exactly one search key (with its arguments) into a fresh
    // criteria.
    fn parse_one(fields: &mut Fields) -> Result<SearchCriteria> {
        let mut c = SearchCriteria::default();
        let field = fields
            .next()
            .ok_or(ParseError::MissingArguments("SEARCH key"))?;

        // a parenthesized group is a conjunction of keys
        if let Value::List(inner) = field {
            let mut inner = inner.into_iter().peekable();
            return SearchCriteria::parse_keys(&mut inner);
        }

        let key = field.expect_text("a SEARCH key")?.to_ascii_uppercase();

        // a bare sequence set
        if key
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b':' || b == b',' || b == b'*')
        {
            c.seq_num = Some(SeqSet::new(&key)?);
            return Ok(c);
        }

        match key.as_str() {
            "ALL" => {}
            "ANSWERED" => c.with_flags.push(Flag::Answered),
            "UNANSWERED" => c.without_flags.push(Flag::Answered),
            "DELETED" => c.with_flags.push(Flag::Deleted),
            "UNDELETED" => c.without_flags.push(Flag::Deleted),
            "DRAFT" => c.with_flags.push(Flag::Draft),
            "UNDRAFT" => c.without_flags.push(Flag::Draft),
            "FLAGGED" => c.with_flags.push(Flag::Flagged),
            "UNFLAGGED" => c.without_flags.push(Flag::Flagged),
            "SEEN" => c.with_flags.push(Flag::Seen),
            "UNSEEN" => c.without_flags.push(Flag::Seen),
            "RECENT" => c.with_flags.push(Flag::Recent),
            "OLD" => c.without_flags.push(Flag::Recent),
            "NEW" => {
                c.with_flags.push(Flag::Recent);
                c.without_flags.push(Flag::Seen);
            }
            "KEYWORD" => c.with_flags.push(parse_flag_arg(fields)?),
            "UNKEYWORD" => c.without_flags.push(parse_flag_arg(fields)?),
            "BCC" => c.header.push(("Bcc".into(), parse_string_arg(fields)?)),
            "CC" => c.header.push(("Cc".into(), parse_string_arg(fields)?)),
            "FROM" => c.header.push(("From".into(), parse_string_arg(fields)?)),
            "TO" => c.header.push(("To".into(), parse_string_arg(fields)?)),
            "SUBJECT" => c
                .header
                .push(("Subject".into(), parse_string_arg(fields)?)),
            "HEADER" => {
                let name = parse_string_arg(fields)?;
                let pattern = parse_string_arg(fields)?;
                c.header.push((name, pattern));
            }
            "BODY" => c.body.push(parse_string_arg(fields)?),
            "TEXT" => c.text.push(parse_string_arg(fields)?),
            "BEFORE" => c.before = Some(parse_date_arg(fields)?),
            "SINCE" => c.since = Some(parse_date_arg(fields)?),
            "SENTBEFORE" => c.sent_before = Some(parse_date_arg(fields)?),
            "SENTSINCE" => c.sent_since = Some(parse_date_arg(fields)?),
            "ON" => {
                let day = parse_date_arg(fields)?;
                c.since = Some(day);
                c.before = Some(next_day(day));
            }
            "SENTON" => {
                let day = parse_date_arg(fields)?;
                c.sent_since = Some(day);
                c.sent_before = Some(next_day(day));
            }
            "LARGER" => c.larger = Some(parse_number_arg(fields)?),
            "SMALLER" => c.smaller = Some(parse_number_arg(fields)?),
            "UID" => {
                let set = fields
                    .next()
                    .ok_or(ParseError::MissingArguments("SEARCH UID"))?;
                c.uid = Some(SeqSet::new(&set.expect_text("a UID set")?)?);
            }
            "NOT" => c.not.push(SearchCriteria::parse_one(fields)?),
            "OR" => {
                let left = SearchCriteria::parse_one(fields)?;
                let right = SearchCriteria::parse_one(fields)?;
                c.or.push((left, right));
            }
            _ => return Err(Error::Parse(ParseError::Syntax("unknown SEARCH key"))),
        }
        Ok(c)
    }

    // Conjoin `other` onto `self`. Scalar slots that are already occupied
    // are tightened where the semantics allow it and double-negated
    // otherwise (NOT of NOT of a criterion matches exactly when the
    // criterion does).
    fn and(&mut self, mut other: SearchCriteria) {
        self.header.append(&mut other.header);
        self.body.append(&mut other.body);
        self.text.append(&mut other.text);
        self.with_flags.append(&mut other.with_flags);
        self.without_flags.append(&mut other.without_flags);
        self.not.append(&mut other.not);
        self.or.append(&mut other.or);

        // every date slot narrows toward the earlier bound: BEFORE is
        // strictly-earlier and SINCE is not-after, so the smaller bound is
        // always the stricter constraint
        tighten(&mut self.before, other.before, earlier);
        tighten(&mut self.since, other.since, earlier);
        tighten(&mut self.sent_before, other.sent_before, earlier);
        tighten(&mut self.sent_since, other.sent_since, earlier);
        tighten(&mut self.larger, other.larger, std::cmp::max);
        tighten(&mut self.smaller, other.smaller, std::cmp::min);

        // a second membership constraint cannot be merged into an occupied
        // slot; double negation keeps it conjunctive
        if let Some(set) = other.seq_num {
            match self.seq_num {
                None => self.seq_num = Some(set),
                Some(_) => self.not.push(double_not(SearchCriteria {
                    seq_num: Some(set),
                    ..SearchCriteria::default()
                })),
            }
        }
        if let Some(set) = other.uid {
            match self.uid {
                None => self.uid = Some(set),
                Some(_) => self.not.push(double_not(SearchCriteria {
                    uid: Some(set),
                    ..SearchCriteria::default()
                })),
            }
        }
    }
}

fn double_not(criteria: SearchCriteria) -> SearchCriteria {
    SearchCriteria {
        not: vec![criteria],
        ..SearchCriteria::default()
    }
}

fn tighten<T: Copy, F: Fn(T, T) -> T>(slot: &mut Option<T>, other: Option<T>, pick: F) {
    if let Some(b) = other {
        *slot = Some(match *slot {
            Some(a) => pick(a, b),
            None => b,
        });
    }
}

fn earlier(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    a.min(b)
}

fn parse_string_arg(fields: &mut Fields) -> Result<String> {
    let value = fields
        .next()
        .ok_or(ParseError::MissingArguments("SEARCH key"))?;
    Ok(value.expect_text("a SEARCH string")?.into_owned())
}

fn parse_flag_arg(fields: &mut Fields) -> Result<Flag> {
    Ok(Flag::from(parse_string_arg(fields)?))
}

fn parse_number_arg(fields: &mut Fields) -> Result<u32> {
    let value = fields
        .next()
        .ok_or(ParseError::MissingArguments("SEARCH key"))?;
    value.expect_number("a SEARCH number")
}

fn parse_date_arg(fields: &mut Fields) -> Result<DateTime<FixedOffset>> {
    let raw = parse_string_arg(fields)?;
    let date = parse_search_date(&raw)?;
    Ok(midnight(date))
}

fn midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap();
    FixedOffset::east_opt(0).unwrap().from_utc_datetime(&naive)
}

fn next_day(date: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    date + chrono::Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> (Option<String>, SearchCriteria) {
        let mut input = line.to_string();
        input.push_str("\r\n");
        let fields = crate::read::Reader::new(input.as_bytes())
            .read_line()
            .unwrap();
        SearchCriteria::parse(fields).unwrap()
    }

    #[test]
    fn charset_and_flags() {
        let (charset, c) = parse("CHARSET UTF-8 FLAGGED UNSEEN");
        assert_eq!(charset.as_deref(), Some("UTF-8"));
        assert_eq!(c.with_flags, vec![Flag::Flagged]);
        assert_eq!(c.without_flags, vec![Flag::Seen]);
    }

    #[test]
    fn the_rfc_example() {
        // FLAGGED SINCE 1-Feb-1994 NOT FROM "Smith"
        let (charset, c) = parse("FLAGGED SINCE 1-Feb-1994 NOT FROM \"Smith\"");
        assert_eq!(charset, None);
        assert_eq!(c.with_flags, vec![Flag::Flagged]);
        assert_eq!(
            c.since,
            Some(
                FixedOffset::east_opt(0)
                    .unwrap()
                    .with_ymd_and_hms(1994, 2, 1, 0, 0, 0)
                    .unwrap()
            )
        );
        assert_eq!(c.not.len(), 1);
        assert_eq!(
            c.not[0].header,
            vec![("From".to_string(), "Smith".to_string())]
        );
    }

    #[test]
    fn or_and_groups() {
        let (_, c) = parse("OR (SEEN LARGER 50) UNSEEN 2:4");
        assert_eq!(c.or.len(), 1);
        let (left, right) = &c.or[0];
        assert_eq!(left.with_flags, vec![Flag::Seen]);
        assert_eq!(left.larger, Some(50));
        assert_eq!(right.without_flags, vec![Flag::Seen]);
        assert_eq!(c.seq_num, Some(SeqSet::new("2:4").unwrap()));
    }

    #[test]
    fn uid_and_header() {
        let (_, c) = parse("UID 100:200 HEADER Message-Id \"<x@y>\" BODY potato");
        assert_eq!(c.uid, Some(SeqSet::new("100:200").unwrap()));
        assert_eq!(
            c.header,
            vec![("Message-Id".to_string(), "<x@y>".to_string())]
        );
        assert_eq!(c.body, vec!["potato".to_string()]);
    }

    #[test]
    fn on_is_a_day_window() {
        let (_, c) = parse("ON 1-Feb-1994");
        let since = c.since.unwrap();
        let before = c.before.unwrap();
        assert_eq!(before - since, chrono::Duration::days(1));
    }

    #[test]
    fn repeated_dates_tighten() {
        let (_, c) = parse("SINCE 1-Feb-1994 SINCE 5-Feb-1994 BEFORE 9-Feb-1994 BEFORE 7-Feb-1994");
        // the smaller bound is the stricter one for both key kinds
        assert_eq!(c.since, Some(midnight(parse_search_date("1-Feb-1994").unwrap())));
        assert_eq!(c.before, Some(midnight(parse_search_date("7-Feb-1994").unwrap())));
    }

    #[test]
    fn conjoined_since_narrows_like_the_matcher() {
        use crate::backend::backendutil::{match_message, Entity};
        use crate::message::parse_message_date;

        let raw = b"Date: Thu, 3 Feb 1994 12:00:00 +0000\r\n\r\nhello\r\n";
        let entity = Entity::parse(raw);
        let date = parse_message_date("Thu, 3 Feb 1994 12:00:00 +0000").unwrap();

        let (_, first) = parse("SINCE 1-Feb-1994");
        let (_, second) = parse("SINCE 5-Feb-1994");
        let (_, both) = parse("SINCE 1-Feb-1994 SINCE 5-Feb-1994");

        // 3-Feb is after the first bound, so the conjunction must fail
        assert!(!match_message(&entity, &date, &first));
        assert!(match_message(&entity, &date, &second));
        assert_eq!(
            match_message(&entity, &date, &both),
            match_message(&entity, &date, &first) && match_message(&entity, &date, &second)
        );
    }

    #[test]
    fn unknown_key_is_an_error() {
        let fields = vec![Value::Atom("XSNAIL".into())];
        assert!(SearchCriteria::parse(fields).is_err());
    }
}
