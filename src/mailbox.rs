use crate::error::{ParseError, Result};
use crate::flag::Flag;
use crate::value::Value;

/// STATUS data item: the number of messages in the mailbox.
pub const STATUS_MESSAGES: &str = "MESSAGES";
/// STATUS data item: the number of messages with the `\Recent` flag set.
pub const STATUS_RECENT: &str = "RECENT";
/// STATUS data item: the next UID to be assigned.
pub const STATUS_UIDNEXT: &str = "UIDNEXT";
/// STATUS data item: the UID validity value.
pub const STATUS_UIDVALIDITY: &str = "UIDVALIDITY";
/// STATUS data item: the number of messages without the `\Seen` flag.
pub const STATUS_UNSEEN: &str = "UNSEEN";

/// One row of a LIST or LSUB response: name attributes, hierarchy
/// delimiter, mailbox name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MailboxInfo {
    /// The mailbox name attributes (`\Noselect`, `\HasChildren`, ...).
    pub flags: Vec<Flag>,
    /// The hierarchy delimiter.
    pub delimiter: String,
    /// The mailbox name.
    pub name: String,
}

impl MailboxInfo {
    /// Decode a LIST row from its fields (everything after the response
    /// name).
    pub fn parse(fields: Vec<Value>) -> Result<MailboxInfo> {
        if fields.len() < 3 {
            return Err(ParseError::MissingArguments("LIST response").into());
        }
        let mut fields = fields.into_iter();
        let flags = Flag::list_from_value(&fields.next().unwrap())?;
        let delimiter = fields
            .next()
            .unwrap()
            .expect_text("a hierarchy delimiter")?
            .into_owned();
        let name = fields
            .next()
            .unwrap()
            .expect_text("a mailbox name")?
            .into_owned();
        Ok(MailboxInfo {
            flags,
            delimiter,
            name,
        })
    }

    /// Encode a LIST row (everything after the response name).
    pub fn format(&self) -> Vec<Value> {
        vec![
            Flag::list_to_value(&self.flags),
            Value::Quoted(self.delimiter.clone()),
            Value::string(self.name.clone()),
        ]
    }
}

/// A mailbox status, as assembled by SELECT/EXAMINE or STATUS.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MailboxStatus {
    /// The mailbox name.
    pub name: String,
    /// True when the mailbox was selected read-only.
    pub read_only: bool,
    /// The flags defined in the mailbox.
    pub flags: Vec<Flag>,
    /// The flags that a client can change permanently.
    pub permanent_flags: Vec<Flag>,
    /// The number of messages (the EXISTS value).
    pub messages: u32,
    /// The number of messages with the `\Recent` flag set.
    pub recent: u32,
    /// The sequence number of the first unseen message.
    pub unseen: Option<u32>,
    /// The next UID to be assigned.
    pub uid_next: u32,
    /// The UID validity value.
    pub uid_validity: u32,
}

impl MailboxStatus {
    /// A status for the named mailbox with all counters at zero.
    pub fn new(name: &str) -> MailboxStatus {
        MailboxStatus {
            name: name.to_string(),
            ..MailboxStatus::default()
        }
    }

    /// Encode the requested STATUS items as the parenthesized list of a
    /// STATUS response.
    pub fn format_items(&self, items: &[String]) -> Vec<Value> {
        let mut fields = Vec::with_capacity(items.len() * 2);
        for item in items {
            let upper = item.to_ascii_uppercase();
            let value = match upper.as_str() {
                STATUS_MESSAGES => Value::Number(self.messages),
                STATUS_RECENT => Value::Number(self.recent),
                STATUS_UIDNEXT => Value::Number(self.uid_next),
                STATUS_UIDVALIDITY => Value::Number(self.uid_validity),
                STATUS_UNSEEN => Value::Number(self.unseen.unwrap_or(0)),
                _ => continue,
            };
            fields.push(Value::Atom(upper));
            fields.push(value);
        }
        fields
    }

    /// Decode the item list of a STATUS response into this status.
    pub fn parse_items(&mut self, fields: Vec<Value>) -> Result<()> {
        let mut fields = fields.into_iter();
        loop {
            let item = match fields.next() {
                Some(item) => item.expect_text("a STATUS item name")?.to_ascii_uppercase(),
                None => return Ok(()),
            };
            let value = fields
                .next()
                .ok_or(ParseError::MissingArguments("STATUS response"))?
                .expect_number("a STATUS item value")?;
            match item.as_str() {
                STATUS_MESSAGES => self.messages = value,
                STATUS_RECENT => self.recent = value,
                STATUS_UIDNEXT => self.uid_next = value,
                STATUS_UIDVALIDITY => self.uid_validity = value,
                STATUS_UNSEEN => self.unseen = Some(value),
                _ => {}
            }
        }
    }
}
