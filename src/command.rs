use crate::error::{ParseError, Result};
use crate::value::Value;

/// A client command: a tag, an uppercased verb, and its argument values.
///
/// The tag format is opaque to the protocol; it only has to be unique per
/// outstanding command, and the server echoes it back on the final status
/// response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    /// The client-generated tag.
    pub tag: String,
    /// The command verb, always uppercase.
    pub name: String,
    /// The command arguments.
    pub arguments: Vec<Value>,
}

impl Command {
    /// A command with no arguments and no tag yet.
    pub fn new(name: &str) -> Command {
        Command {
            tag: String::new(),
            name: name.to_ascii_uppercase(),
            arguments: Vec::new(),
        }
    }

    /// A command with arguments and no tag yet.
    pub fn with_args(name: &str, arguments: Vec<Value>) -> Command {
        Command {
            tag: String::new(),
            name: name.to_ascii_uppercase(),
            arguments,
        }
    }

    /// Decode a command from the fields of one line.
    pub fn parse(mut fields: Vec<Value>) -> Result<Command> {
        if fields.len() < 2 {
            return Err(ParseError::MissingArguments("command").into());
        }
        let arguments = fields.split_off(2);
        let mut fields = fields.into_iter();
        let tag = fields
            .next()
            .unwrap()
            .expect_text("a command tag")?
            .into_owned();
        let name = fields
            .next()
            .unwrap()
            .expect_text("a command name")?
            .to_ascii_uppercase();
        Ok(Command {
            tag,
            name,
            arguments,
        })
    }

    /// Encode this command as the fields of one line.
    pub fn fields(&self) -> Vec<Value> {
        let mut fields = Vec::with_capacity(2 + self.arguments.len());
        fields.push(Value::Atom(self.tag.clone()));
        fields.push(Value::Atom(self.name.clone()));
        fields.extend(self.arguments.iter().cloned());
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uppercases_the_name() {
        let cmd = Command::parse(vec![
            Value::Atom("a1".into()),
            Value::Atom("select".into()),
            Value::Atom("INBOX".into()),
        ])
        .unwrap();
        assert_eq!(cmd.tag, "a1");
        assert_eq!(cmd.name, "SELECT");
        assert_eq!(cmd.arguments, vec![Value::Atom("INBOX".into())]);
    }

    #[test]
    fn parse_needs_a_tag_and_a_name() {
        assert!(Command::parse(vec![Value::Atom("a1".into())]).is_err());
        assert!(Command::parse(vec![]).is_err());
        assert!(Command::parse(vec![Value::List(vec![]), Value::Atom("NOOP".into())]).is_err());
    }
}
