//! Commands that require a selected mailbox.

use crate::command::Command;
use crate::error::{ParseError, Result};
use crate::flag::{Flag, FlagsOp};
use crate::names;
use crate::seq_set::SeqSet;
use crate::value::Value;

/// The CHECK command.
/// See [RFC 3501 section 6.4.1](https://tools.ietf.org/html/rfc3501#section-6.4.1).
#[derive(Default)]
pub(crate) struct Check;

impl Check {
    pub fn command(&self) -> Command {
        Command::new(names::CHECK)
    }

    pub fn parse(&mut self, _fields: Vec<Value>) -> Result<()> {
        Ok(())
    }
}

/// The CLOSE command.
/// See [RFC 3501 section 6.4.2](https://tools.ietf.org/html/rfc3501#section-6.4.2).
#[derive(Default)]
pub(crate) struct Close;

impl Close {
    pub fn command(&self) -> Command {
        Command::new(names::CLOSE)
    }

    pub fn parse(&mut self, _fields: Vec<Value>) -> Result<()> {
        Ok(())
    }
}

/// The EXPUNGE command.
/// See [RFC 3501 section 6.4.3](https://tools.ietf.org/html/rfc3501#section-6.4.3).
#[derive(Default)]
pub(crate) struct Expunge;

impl Expunge {
    pub fn command(&self) -> Command {
        Command::new(names::EXPUNGE)
    }

    pub fn parse(&mut self, _fields: Vec<Value>) -> Result<()> {
        Ok(())
    }
}

/// The SEARCH command.
///
/// The criteria travel as raw fields; the server turns them into a
/// [`SearchCriteria`](crate::search::SearchCriteria) tree (charset
/// included) when it handles the command.
/// See [RFC 3501 section 6.4.4](https://tools.ietf.org/html/rfc3501#section-6.4.4).
#[derive(Default)]
pub(crate) struct Search {
    pub charset: Option<String>,
    pub criteria: Vec<Value>,
}

impl Search {
    pub fn command(&self) -> Command {
        let mut args = Vec::with_capacity(self.criteria.len() + 2);
        if let Some(charset) = &self.charset {
            args.push(Value::Atom("CHARSET".into()));
            args.push(Value::Atom(charset.clone()));
        }
        args.extend(self.criteria.iter().cloned());
        Command::with_args(names::SEARCH, args)
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        if fields.is_empty() {
            return Err(ParseError::MissingArguments(names::SEARCH).into());
        }
        self.criteria = fields;
        Ok(())
    }
}

/// The FETCH command.
/// See [RFC 3501 section 6.4.5](https://tools.ietf.org/html/rfc3501#section-6.4.5).
#[derive(Default)]
pub(crate) struct Fetch {
    pub seq_set: SeqSet,
    pub items: Vec<String>,
}

impl Fetch {
    pub fn command(&self) -> Command {
        Command::with_args(
            names::FETCH,
            vec![
                Value::Atom(self.seq_set.to_string()),
                Value::List(self.items.iter().map(|i| Value::Atom(i.clone())).collect()),
            ],
        )
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        if fields.len() < 2 {
            return Err(ParseError::MissingArguments(names::FETCH).into());
        }

        let seq_set = fields[0].expect_text("a sequence set")?;
        self.seq_set = SeqSet::new(&seq_set)?;

        match &fields[1] {
            Value::List(items) => {
                self.items = items
                    .iter()
                    .map(|i| i.expect_text("a FETCH item").map(|s| s.into_owned()))
                    .collect::<Result<_>>()?;
            }
            // a macro, or a single bare item
            other => {
                let item = other.expect_text("a FETCH item")?;
                self.items = match item.to_ascii_uppercase().as_str() {
                    "ALL" => all_items(&["FLAGS", "INTERNALDATE", "RFC822.SIZE", "ENVELOPE"]),
                    "FAST" => all_items(&["FLAGS", "INTERNALDATE", "RFC822.SIZE"]),
                    "FULL" => all_items(&[
                        "FLAGS",
                        "INTERNALDATE",
                        "RFC822.SIZE",
                        "ENVELOPE",
                        "BODY",
                    ]),
                    _ => vec![item.into_owned()],
                };
            }
        }
        Ok(())
    }
}

fn all_items(items: &[&str]) -> Vec<String> {
    items.iter().map(|i| i.to_string()).collect()
}

/// The STORE command.
/// See [RFC 3501 section 6.4.6](https://tools.ietf.org/html/rfc3501#section-6.4.6).
pub(crate) struct Store {
    pub seq_set: SeqSet,
    pub op: FlagsOp,
    pub silent: bool,
    pub flags: Vec<Flag>,
}

impl Default for Store {
    fn default() -> Store {
        Store {
            seq_set: SeqSet::empty(),
            op: FlagsOp::Set,
            silent: false,
            flags: Vec::new(),
        }
    }
}

impl Store {
    pub fn command(&self) -> Command {
        let mut item = self.op.to_string();
        if self.silent {
            item.push_str(".SILENT");
        }
        Command::with_args(
            names::STORE,
            vec![
                Value::Atom(self.seq_set.to_string()),
                Value::Atom(item),
                Flag::list_to_value(&self.flags),
            ],
        )
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        if fields.len() < 3 {
            return Err(ParseError::MissingArguments(names::STORE).into());
        }

        let seq_set = fields[0].expect_text("a sequence set")?;
        self.seq_set = SeqSet::new(&seq_set)?;

        let item = fields[1].expect_text("a STORE data item")?;
        let (op, silent) = FlagsOp::parse_item(&item)?;
        self.op = op;
        self.silent = silent;

        // flags may be parenthesized or spread over the remaining fields
        match &fields[2] {
            Value::List(_) => self.flags = Flag::list_from_value(&fields[2])?,
            _ => {
                self.flags = fields[2..]
                    .iter()
                    .map(|f| f.expect_text("a flag").map(|s| Flag::from(s.as_ref())))
                    .collect::<Result<_>>()?;
            }
        }
        Ok(())
    }
}

/// The COPY command.
/// See [RFC 3501 section 6.4.7](https://tools.ietf.org/html/rfc3501#section-6.4.7).
#[derive(Default)]
pub(crate) struct Copy {
    pub seq_set: SeqSet,
    pub mailbox: String,
}

impl Copy {
    pub fn command(&self) -> Command {
        Command::with_args(
            names::COPY,
            vec![
                Value::Atom(self.seq_set.to_string()),
                Value::string(self.mailbox.clone()),
            ],
        )
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        if fields.len() < 2 {
            return Err(ParseError::MissingArguments(names::COPY).into());
        }
        let seq_set = fields[0].expect_text("a sequence set")?;
        self.seq_set = SeqSet::new(&seq_set)?;
        self.mailbox = fields[1].expect_text("a mailbox name")?.into_owned();
        Ok(())
    }
}

/// The UID command: a prefix that retargets FETCH, SEARCH, STORE and COPY
/// at UIDs instead of sequence numbers.
/// See [RFC 3501 section 6.4.8](https://tools.ietf.org/html/rfc3501#section-6.4.8).
#[derive(Default)]
pub(crate) struct Uid {
    pub name: String,
    pub arguments: Vec<Value>,
}

impl Uid {
    pub fn command(&self) -> Command {
        let mut args = Vec::with_capacity(self.arguments.len() + 1);
        args.push(Value::Atom(self.name.clone()));
        args.extend(self.arguments.iter().cloned());
        Command::with_args(names::UID, args)
    }

    pub fn parse(&mut self, mut fields: Vec<Value>) -> Result<()> {
        if fields.is_empty() {
            return Err(ParseError::MissingArguments(names::UID).into());
        }
        self.arguments = fields.split_off(1);
        self.name = fields
            .remove(0)
            .expect_text("a UID subcommand")?
            .to_ascii_uppercase();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_macros_expand() {
        let mut cmd = Fetch::default();
        cmd.parse(vec![
            Value::Atom("1:5".into()),
            Value::Atom("FAST".into()),
        ])
        .unwrap();
        assert_eq!(cmd.seq_set, SeqSet::new("1:5").unwrap());
        assert_eq!(cmd.items, vec!["FLAGS", "INTERNALDATE", "RFC822.SIZE"]);
    }

    #[test]
    fn fetch_item_list() {
        let mut cmd = Fetch::default();
        cmd.parse(vec![
            Value::Atom("2:3".into()),
            Value::List(vec![
                Value::Atom("UID".into()),
                Value::Atom("BODY[]".into()),
            ]),
        ])
        .unwrap();
        assert_eq!(cmd.items, vec!["UID", "BODY[]"]);
    }

    #[test]
    fn store_forms() {
        let mut cmd = Store::default();
        cmd.parse(vec![
            Value::Atom("2:4".into()),
            Value::Atom("+FLAGS.SILENT".into()),
            Value::List(vec![Value::Atom("\\Deleted".into())]),
        ])
        .unwrap();
        assert_eq!(cmd.op, FlagsOp::Add);
        assert!(cmd.silent);
        assert_eq!(cmd.flags, vec![Flag::Deleted]);

        let mut spread = Store::default();
        spread
            .parse(vec![
                Value::Atom("1".into()),
                Value::Atom("FLAGS".into()),
                Value::Atom("\\Seen".into()),
                Value::Atom("\\Answered".into()),
            ])
            .unwrap();
        assert_eq!(spread.flags, vec![Flag::Seen, Flag::Answered]);
    }

    #[test]
    fn uid_splits_the_subcommand() {
        let mut cmd = Uid::default();
        cmd.parse(vec![
            Value::Atom("fetch".into()),
            Value::Atom("1:*".into()),
            Value::List(vec![Value::Atom("UID".into())]),
        ])
        .unwrap();
        assert_eq!(cmd.name, "FETCH");
        assert_eq!(cmd.arguments.len(), 2);
    }
}
