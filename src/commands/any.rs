//! Commands valid in any state.

use crate::command::Command;
use crate::error::Result;
use crate::names;
use crate::value::Value;

/// The CAPABILITY command.
/// See [RFC 3501 section 6.1.1](https://tools.ietf.org/html/rfc3501#section-6.1.1).
#[derive(Default)]
pub(crate) struct Capability;

impl Capability {
    pub fn command(&self) -> Command {
        Command::new(names::CAPABILITY)
    }

    pub fn parse(&mut self, _fields: Vec<Value>) -> Result<()> {
        Ok(())
    }
}

/// The NOOP command.
/// See [RFC 3501 section 6.1.2](https://tools.ietf.org/html/rfc3501#section-6.1.2).
#[derive(Default)]
pub(crate) struct Noop;

impl Noop {
    pub fn command(&self) -> Command {
        Command::new(names::NOOP)
    }

    pub fn parse(&mut self, _fields: Vec<Value>) -> Result<()> {
        Ok(())
    }
}

/// The LOGOUT command.
/// See [RFC 3501 section 6.1.3](https://tools.ietf.org/html/rfc3501#section-6.1.3).
#[derive(Default)]
pub(crate) struct Logout;

impl Logout {
    pub fn command(&self) -> Command {
        Command::new(names::LOGOUT)
    }

    pub fn parse(&mut self, _fields: Vec<Value>) -> Result<()> {
        Ok(())
    }
}
