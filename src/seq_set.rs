use std::fmt;

use crate::error::{ParseError, Result};

/// The wire spelling of the `*` sentinel, meaning "the largest sequence
/// number or UID in the mailbox".
const STAR: u32 = u32::MAX;

/// A sequence set: a list of inclusive ranges over message sequence numbers
/// or UIDs, as used by FETCH, STORE, COPY and SEARCH
/// ([RFC 3501 section 9, `sequence-set`](https://tools.ietf.org/html/rfc3501#section-9)).
///
/// Ranges are kept in insertion order and are not normalized, because the
/// textual form is significant to some consumers (EXPUNGE replay being the
/// canonical example). Membership testing accepts ranges in any order.
///
/// The `*` endpoint is stored as `u32::MAX` and treated as +∞ by
/// [`contains`](SeqSet::contains); use [`resolve`](SeqSet::resolve) to pin
/// it to a concrete mailbox size first when exact semantics matter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeqSet {
    ranges: Vec<(u32, u32)>,
}

impl SeqSet {
    /// Parse a sequence set expression such as `1,3:5,8:*`.
    pub fn new(expr: &str) -> Result<SeqSet> {
        let mut set = SeqSet::default();
        for part in expr.split(',') {
            if part.is_empty() {
                return Err(ParseError::BadSeqSet(expr.to_string()).into());
            }
            let mut bounds = part.splitn(2, ':');
            let lo = parse_seq_number(bounds.next().unwrap_or(""))
                .ok_or_else(|| ParseError::BadSeqSet(expr.to_string()))?;
            match bounds.next() {
                Some(hi) => {
                    let hi = parse_seq_number(hi)
                        .ok_or_else(|| ParseError::BadSeqSet(expr.to_string()))?;
                    set.add_range(lo, hi);
                }
                None => set.add_num(lo),
            }
        }
        Ok(set)
    }

    /// A sequence set with no ranges. An empty set contains nothing.
    pub fn empty() -> SeqSet {
        SeqSet::default()
    }

    /// Append a single number to the set.
    pub fn add_num(&mut self, n: u32) {
        self.ranges.push((n, n));
    }

    /// Append a range to the set. Inverted bounds are tolerated and
    /// swapped.
    pub fn add_range(&mut self, lo: u32, hi: u32) {
        if lo > hi {
            self.ranges.push((hi, lo));
        } else {
            self.ranges.push((lo, hi));
        }
    }

    /// Does the set contain `n`? A range whose upper endpoint is `*` is
    /// open-ended.
    pub fn contains(&self, n: u32) -> bool {
        self.ranges
            .iter()
            .any(|&(lo, hi)| n >= lo && (hi == STAR || n <= hi))
    }

    /// True when the set holds no ranges at all.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Replace `*` endpoints with `largest`, the highest sequence number
    /// or UID currently in the mailbox, and drop ranges that fall entirely
    /// above it.
    pub fn resolve(&self, largest: u32) -> SeqSet {
        let mut out = SeqSet::default();
        for &(lo, hi) in &self.ranges {
            let lo = if lo == STAR { largest } else { lo };
            let hi = if hi == STAR { largest } else { hi };
            if lo > largest {
                continue;
            }
            out.add_range(lo, hi.min(largest));
        }
        out
    }

    /// Iterate over the stored ranges in insertion order.
    pub fn ranges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.ranges.iter().copied()
    }
}

fn parse_seq_number(s: &str) -> Option<u32> {
    if s == "*" {
        Some(STAR)
    } else {
        // 0 is not a valid sequence number and MAX is reserved for `*`
        match s.parse::<u32>() {
            Ok(0) => None,
            Ok(n) if n != STAR => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for SeqSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &(lo, hi)) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if lo == hi {
                write_seq_number(f, lo)?;
            } else {
                write_seq_number(f, lo)?;
                f.write_str(":")?;
                write_seq_number(f, hi)?;
            }
        }
        Ok(())
    }
}

fn write_seq_number(f: &mut fmt::Formatter<'_>, n: u32) -> fmt::Result {
    if n == STAR {
        f.write_str("*")
    } else {
        write!(f, "{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_format_preserves_order() {
        for expr in &["1", "1,3:5,8:*", "5:3", "*", "4,4,4", "*:10"] {
            let set = SeqSet::new(expr).unwrap();
            // inverted bounds are the only normalization applied
            let expected = match *expr {
                "5:3" => "3:5",
                "*:10" => "10:*",
                other => other,
            };
            assert_eq!(set.to_string(), expected);
        }
    }

    #[test]
    fn rejects_garbage() {
        for expr in &["", "a", "1,", "1:2:3", "0", "1:"] {
            assert!(SeqSet::new(expr).is_err(), "{:?} should not parse", expr);
        }
    }

    #[test]
    fn contains_ignores_order() {
        let set = SeqSet::new("8:6,1,3:5").unwrap();
        for n in &[1, 3, 4, 5, 6, 7, 8] {
            assert!(set.contains(*n));
        }
        for n in &[2, 9, 100] {
            assert!(!set.contains(*n));
        }
    }

    #[test]
    fn star_is_open_ended() {
        let set = SeqSet::new("4:*").unwrap();
        assert!(set.contains(4));
        assert!(set.contains(u32::MAX - 1));
        assert!(!set.contains(3));

        assert!(SeqSet::empty().is_empty());
        assert!(!SeqSet::empty().contains(1));
    }

    #[test]
    fn resolve_pins_star() {
        let set = SeqSet::new("2,4:*").unwrap().resolve(6);
        assert_eq!(set.to_string(), "2,4:6");

        let lone = SeqSet::new("*").unwrap().resolve(9);
        assert_eq!(lone.to_string(), "9");

        // a range strictly above the mailbox size disappears
        let high = SeqSet::new("8:10").unwrap().resolve(4);
        assert!(high.is_empty());
    }
}
