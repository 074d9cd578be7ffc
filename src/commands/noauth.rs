//! Commands valid only before authentication.

use crate::command::Command;
use crate::error::{ParseError, Result};
use crate::names;
use crate::value::Value;

/// The STARTTLS command.
/// See [RFC 3501 section 6.2.1](https://tools.ietf.org/html/rfc3501#section-6.2.1).
#[derive(Default)]
pub(crate) struct StartTls;

impl StartTls {
    pub fn command(&self) -> Command {
        Command::new(names::STARTTLS)
    }

    pub fn parse(&mut self, _fields: Vec<Value>) -> Result<()> {
        Ok(())
    }
}

/// The LOGIN command.
/// See [RFC 3501 section 6.2.3](https://tools.ietf.org/html/rfc3501#section-6.2.3).
#[derive(Default)]
pub(crate) struct Login {
    pub username: String,
    pub password: String,
}

impl Login {
    pub fn command(&self) -> Command {
        Command::with_args(
            names::LOGIN,
            vec![
                Value::string(self.username.clone()),
                Value::string(self.password.clone()),
            ],
        )
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        if fields.len() < 2 {
            return Err(ParseError::MissingArguments(names::LOGIN).into());
        }
        self.username = fields[0].expect_text("a username")?.into_owned();
        self.password = fields[1].expect_text("a password")?.into_owned();
        Ok(())
    }
}

/// The AUTHENTICATE command.
///
/// Only the mechanism name travels with the command; the SASL exchange
/// itself is driven over continuation lines by the connection.
/// See [RFC 3501 section 6.2.2](https://tools.ietf.org/html/rfc3501#section-6.2.2).
#[derive(Default)]
pub(crate) struct Authenticate {
    pub mechanism: String,
}

impl Authenticate {
    pub fn command(&self) -> Command {
        Command::with_args(
            names::AUTHENTICATE,
            vec![Value::Atom(self.mechanism.to_ascii_uppercase())],
        )
    }

    pub fn parse(&mut self, fields: Vec<Value>) -> Result<()> {
        let mechanism = fields
            .first()
            .ok_or(ParseError::MissingArguments(names::AUTHENTICATE))?;
        self.mechanism = mechanism
            .expect_text("an authentication mechanism")?
            .to_ascii_uppercase();
        Ok(())
    }
}
