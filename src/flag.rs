use std::fmt;

use crate::error::{Error, ParseError, Result};
use crate::value::Value;

/// With the exception of [`Flag::Custom`], these flags are system flags that
/// are pre-defined in [RFC 3501 section
/// 2.3.2](https://tools.ietf.org/html/rfc3501#section-2.3.2). All system
/// flags begin with `\` in the IMAP protocol. Certain system flags
/// (`\Deleted` and `\Seen`) have special semantics described elsewhere.
///
/// A flag can be permanent or session-only on a per-flag basis. Permanent
/// flags are those which the client can add or remove from the message flags
/// permanently; that is, concurrent and subsequent sessions will see any
/// change in permanent flags. Changes to session flags are valid only in
/// that session.
///
/// > Note: The `\Recent` system flag is a special case of a session flag.
/// > `\Recent` can not be used as an argument in a `STORE` or `APPEND`
/// > command, and thus can not be changed at all.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum Flag {
    /// Message has been read.
    Seen,
    /// Message has been answered.
    Answered,
    /// Message is "flagged" for urgent/special attention.
    Flagged,
    /// Message is "deleted" for removal by later EXPUNGE.
    Deleted,
    /// Message has not completed composition (marked as a draft).
    Draft,
    /// Message has "recently" arrived in this mailbox. This flag can not be
    /// altered by the client.
    Recent,
    /// The permanent-flags list can include this special flag (`\*`), which
    /// indicates that it is possible to create new keywords by attempting
    /// to store those flags in the mailbox.
    MayCreate,
    /// A non-standard user- or server-defined keyword.
    Custom(String),
}

impl Flag {
    fn system(s: &str) -> Option<Flag> {
        match s {
            "\\Seen" => Some(Flag::Seen),
            "\\Answered" => Some(Flag::Answered),
            "\\Flagged" => Some(Flag::Flagged),
            "\\Deleted" => Some(Flag::Deleted),
            "\\Draft" => Some(Flag::Draft),
            "\\Recent" => Some(Flag::Recent),
            "\\*" => Some(Flag::MayCreate),
            _ => None,
        }
    }

    /// Decode a flag list from a parenthesized wire value.
    pub fn list_from_value(value: &Value) -> Result<Vec<Flag>> {
        let fields = value.as_list().ok_or(ParseError::UnexpectedValue {
            expected: "a flag list",
            found: value.kind(),
        })?;
        fields
            .iter()
            .map(|f| {
                f.expect_text("a flag")
                    .map(|text| Flag::from(text.as_ref()))
            })
            .collect()
    }

    /// Encode a flag list as a parenthesized wire value.
    pub fn list_to_value(flags: &[Flag]) -> Value {
        Value::List(flags.iter().map(|f| Value::Atom(f.to_string())).collect())
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Seen => f.write_str("\\Seen"),
            Flag::Answered => f.write_str("\\Answered"),
            Flag::Flagged => f.write_str("\\Flagged"),
            Flag::Deleted => f.write_str("\\Deleted"),
            Flag::Draft => f.write_str("\\Draft"),
            Flag::Recent => f.write_str("\\Recent"),
            Flag::MayCreate => f.write_str("\\*"),
            Flag::Custom(s) => f.write_str(s),
        }
    }
}

impl From<String> for Flag {
    fn from(s: String) -> Flag {
        Flag::system(&s).unwrap_or(Flag::Custom(s))
    }
}

impl From<&str> for Flag {
    fn from(s: &str) -> Flag {
        Flag::system(s).unwrap_or_else(|| Flag::Custom(s.to_string()))
    }
}

/// What a STORE command does with the flags it carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagsOp {
    /// Replace the message flags (`FLAGS`).
    Set,
    /// Add to the message flags (`+FLAGS`).
    Add,
    /// Remove from the message flags (`-FLAGS`).
    Remove,
}

impl FlagsOp {
    /// Decode a STORE data item name such as `+FLAGS.SILENT`. Returns the
    /// operation and whether the `.SILENT` suffix was present.
    pub fn parse_item(item: &str) -> Result<(FlagsOp, bool)> {
        let upper = item.to_ascii_uppercase();
        let (name, silent) = match upper.strip_suffix(".SILENT") {
            Some(name) => (name, true),
            None => (upper.as_str(), false),
        };
        let op = match name {
            "FLAGS" => FlagsOp::Set,
            "+FLAGS" => FlagsOp::Add,
            "-FLAGS" => FlagsOp::Remove,
            _ => return Err(Error::Parse(ParseError::Syntax("unknown STORE data item"))),
        };
        Ok((op, silent))
    }
}

impl fmt::Display for FlagsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagsOp::Set => f.write_str("FLAGS"),
            FlagsOp::Add => f.write_str("+FLAGS"),
            FlagsOp::Remove => f.write_str("-FLAGS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_flags_round_trip() {
        for raw in &["\\Seen", "\\Answered", "\\Deleted", "\\Recent", "\\*"] {
            assert_eq!(Flag::from(*raw).to_string(), *raw);
        }
        assert_eq!(Flag::from("$Phishing"), Flag::Custom("$Phishing".into()));
    }

    #[test]
    fn store_items() {
        assert_eq!(FlagsOp::parse_item("FLAGS").unwrap(), (FlagsOp::Set, false));
        assert_eq!(
            FlagsOp::parse_item("+flags.silent").unwrap(),
            (FlagsOp::Add, true)
        );
        assert_eq!(
            FlagsOp::parse_item("-FLAGS").unwrap(),
            (FlagsOp::Remove, false)
        );
        assert!(FlagsOp::parse_item("COLORS").is_err());
    }
}
