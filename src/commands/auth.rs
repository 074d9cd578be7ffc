//! Commands that require an authenticated connection.

use chrono::{DateTime, FixedOffset};

use crate::command::Command;
use crate::error::{ParseError, Result};
use crate::flag::Flag;
use crate::message::{format_internal_date, parse_internal_date};
use crate::names;
use crate::value::Value;

fn mailbox_arg(fields: &[Value], command: &'static str) -> Result<String> {
    let mailbox = fields.first().ok_or(ParseError::MissingArguments(command))?;
    Ok(mailbox.expect_text("a mailbox name")?.into_owned())
}

/// The SELECT and EXAMINE commands; read-only access is the handler's
/// concern, the wire arguments are identical.
/// See [RFC 3501 section 6.3.1](https://tools.ietf.org/html/rfc3501#section-6.3.1).
#[derive(Default)]
pub(crate) struct Select {
    pub mailbox: String,
}

impl Select {
    pub fn command(&self, read_only: bool) -> Command {
        let name = if read_only {
            names::EXAMINE
        } else {
            names::SELECT
        };
        Command::with_args(name, vec![Value::string(self.mailbox.clone())])
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        self.mailbox = mailbox_arg(&fields, names::SELECT)?;
        Ok(())
    }
}

/// The CREATE command.
/// See [RFC 3501 section 6.3.3](https://tools.ietf.org/html/rfc3501#section-6.3.3).
#[derive(Default)]
pub(crate) struct Create {
    pub mailbox: String,
}

impl Create {
    pub fn command(&self) -> Command {
        Command::with_args(names::CREATE, vec![Value::string(self.mailbox.clone())])
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        self.mailbox = mailbox_arg(&fields, names::CREATE)?;
        Ok(())
    }
}

/// The DELETE command.
/// See [RFC 3501 section 6.3.4](https://tools.ietf.org/html/rfc3501#section-6.3.4).
#[derive(Default)]
pub(crate) struct Delete {
    pub mailbox: String,
}

impl Delete {
    pub fn command(&self) -> Command {
        Command::with_args(names::DELETE, vec![Value::string(self.mailbox.clone())])
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        self.mailbox = mailbox_arg(&fields, names::DELETE)?;
        Ok(())
    }
}

/// The RENAME command.
/// See [RFC 3501 section 6.3.5](https://tools.ietf.org/html/rfc3501#section-6.3.5).
#[derive(Default)]
pub(crate) struct Rename {
    pub existing: String,
    pub new_name: String,
}

impl Rename {
    pub fn command(&self) -> Command {
        Command::with_args(
            names::RENAME,
            vec![
                Value::string(self.existing.clone()),
                Value::string(self.new_name.clone()),
            ],
        )
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        if fields.len() < 2 {
            return Err(ParseError::MissingArguments(names::RENAME).into());
        }
        self.existing = fields[0].expect_text("a mailbox name")?.into_owned();
        self.new_name = fields[1].expect_text("a mailbox name")?.into_owned();
        Ok(())
    }
}

/// The SUBSCRIBE command.
/// See [RFC 3501 section 6.3.6](https://tools.ietf.org/html/rfc3501#section-6.3.6).
#[derive(Default)]
pub(crate) struct Subscribe {
    pub mailbox: String,
}

impl Subscribe {
    pub fn command(&self) -> Command {
        Command::with_args(names::SUBSCRIBE, vec![Value::string(self.mailbox.clone())])
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        self.mailbox = mailbox_arg(&fields, names::SUBSCRIBE)?;
        Ok(())
    }
}

/// The UNSUBSCRIBE command.
/// See [RFC 3501 section 6.3.7](https://tools.ietf.org/html/rfc3501#section-6.3.7).
#[derive(Default)]
pub(crate) struct Unsubscribe {
    pub mailbox: String,
}

impl Unsubscribe {
    pub fn command(&self) -> Command {
        Command::with_args(
            names::UNSUBSCRIBE,
            vec![Value::string(self.mailbox.clone())],
        )
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        self.mailbox = mailbox_arg(&fields, names::UNSUBSCRIBE)?;
        Ok(())
    }
}

/// The LIST and LSUB commands.
/// See [RFC 3501 section 6.3.8](https://tools.ietf.org/html/rfc3501#section-6.3.8).
#[derive(Default)]
pub(crate) struct List {
    pub reference: String,
    pub mailbox: String,
    pub subscribed: bool,
}

impl List {
    pub fn command(&self) -> Command {
        let name = if self.subscribed {
            names::LSUB
        } else {
            names::LIST
        };
        Command::with_args(
            name,
            vec![
                Value::Quoted(self.reference.clone()),
                Value::Quoted(self.mailbox.clone()),
            ],
        )
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        if fields.len() < 2 {
            return Err(ParseError::MissingArguments(names::LIST).into());
        }
        self.reference = fields[0].expect_text("a reference name")?.into_owned();
        self.mailbox = fields[1].expect_text("a mailbox pattern")?.into_owned();
        Ok(())
    }
}

/// The STATUS command.
/// See [RFC 3501 section 6.3.10](https://tools.ietf.org/html/rfc3501#section-6.3.10).
#[derive(Default)]
pub(crate) struct Status {
    pub mailbox: String,
    pub items: Vec<String>,
}

impl Status {
    pub fn command(&self) -> Command {
        Command::with_args(
            names::STATUS,
            vec![
                Value::string(self.mailbox.clone()),
                Value::List(
                    self.items
                        .iter()
                        .map(|i| Value::Atom(i.to_ascii_uppercase()))
                        .collect(),
                ),
            ],
        )
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        if fields.len() < 2 {
            return Err(ParseError::MissingArguments(names::STATUS).into());
        }
        self.mailbox = fields[0].expect_text("a mailbox name")?.into_owned();
        let items = fields[1].as_list().ok_or(ParseError::UnexpectedValue {
            expected: "a STATUS item list",
            found: fields[1].kind(),
        })?;
        self.items = items
            .iter()
            .map(|i| {
                i.expect_text("a STATUS item")
                    .map(|s| s.to_ascii_uppercase())
            })
            .collect::<Result<_>>()?;
        Ok(())
    }
}

/// The APPEND command.
/// See [RFC 3501 section 6.3.11](https://tools.ietf.org/html/rfc3501#section-6.3.11).
#[derive(Default)]
pub(crate) struct Append {
    pub mailbox: String,
    pub flags: Vec<Flag>,
    pub date: Option<DateTime<FixedOffset>>,
    pub message: Vec<u8>,
}

impl Append {
    pub fn command(&self) -> Command {
        let mut args = vec![Value::string(self.mailbox.clone())];
        if !self.flags.is_empty() {
            args.push(Flag::list_to_value(&self.flags));
        }
        if let Some(date) = &self.date {
            args.push(Value::Quoted(format_internal_date(date)));
        }
        args.push(Value::Literal(self.message.clone()));
        Command::with_args(names::APPEND, args)
    }

    pub fn parse(&mut self, mut fields: Vec<Value>) -> Result<()> {
        if fields.len() < 2 {
            return Err(ParseError::MissingArguments(names::APPEND).into());
        }

        let message = fields.pop().unwrap();
        self.message = message
            .as_bytes()
            .ok_or(ParseError::UnexpectedValue {
                expected: "a message literal",
                found: message.kind(),
            })?
            .to_vec();

        let mut fields = fields.into_iter();
        self.mailbox = fields
            .next()
            .unwrap()
            .expect_text("a mailbox name")?
            .into_owned();

        for field in fields {
            match &field {
                Value::List(_) => self.flags = Flag::list_from_value(&field)?,
                other => {
                    let raw = other.expect_text("an APPEND date")?;
                    self.date = Some(parse_internal_date(&raw)?);
                }
            }
        }
        Ok(())
    }
}
