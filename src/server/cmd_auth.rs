//! Handlers for the authenticated state.

use std::sync::Arc;

use crate::backend::{BackendError, User};
use crate::commands;
use crate::mailbox::MailboxInfo;
use crate::response::{Resp, StatusRespCode, StatusRespType};
use crate::responses;
use crate::value::Value;
use crate::ConnState;

use super::{
    finish_stream, status_with_code, stream_responses, CommandHandler, Conn, HandlerError,
    HandlerResult,
};

fn authenticated(conn: &Conn) -> Result<Arc<dyn User>, HandlerError> {
    conn.ctx
        .user
        .clone()
        .ok_or_else(|| HandlerError::No("Not authenticated".to_string()))
}

#[derive(Default)]
pub(crate) struct Select {
    cmd: commands::Select,
    read_only: bool,
}

impl Select {
    pub(crate) fn read_only() -> Select {
        Select {
            read_only: true,
            ..Select::default()
        }
    }
}

impl CommandHandler for Select {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let user = authenticated(conn)?;

        // any previous selection ends here, even if this SELECT fails
        conn.ctx.mailbox = None;
        conn.ctx.mailbox_read_only = false;
        if conn.ctx.state == ConnState::Selected {
            conn.ctx.state = ConnState::Authenticated;
        }

        let mailbox = user.get_mailbox(&self.cmd.mailbox)?;
        let mut status = mailbox.status()?;
        status.read_only = self.read_only;

        conn.ctx.mailbox = Some(mailbox);
        conn.ctx.mailbox_read_only = self.read_only;
        conn.ctx.state = ConnState::Selected;

        for resp in responses::select_responses(&status) {
            conn.write_resp(&resp)?;
        }

        let (code, verb) = if self.read_only {
            (StatusRespCode::ReadOnly, "EXAMINE")
        } else {
            (StatusRespCode::ReadWrite, "SELECT")
        };
        Err(status_with_code(
            StatusRespType::Ok,
            code,
            &format!("{} completed", verb),
        ))
    }
}

#[derive(Default)]
pub(crate) struct Create {
    cmd: commands::Create,
}

impl CommandHandler for Create {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let user = authenticated(conn)?;
        user.create_mailbox(&self.cmd.mailbox)?;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Delete {
    cmd: commands::Delete,
}

impl CommandHandler for Delete {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let user = authenticated(conn)?;
        user.delete_mailbox(&self.cmd.mailbox)?;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Rename {
    cmd: commands::Rename,
}

impl CommandHandler for Rename {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let user = authenticated(conn)?;
        user.rename_mailbox(&self.cmd.existing, &self.cmd.new_name)?;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Subscribe {
    cmd: commands::Subscribe,
}

impl CommandHandler for Subscribe {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let user = authenticated(conn)?;
        user.get_mailbox(&self.cmd.mailbox)?.set_subscribed(true)?;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Unsubscribe {
    cmd: commands::Unsubscribe,
}

impl CommandHandler for Unsubscribe {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let user = authenticated(conn)?;
        user.get_mailbox(&self.cmd.mailbox)?.set_subscribed(false)?;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct List {
    cmd: commands::List,
    subscribed: bool,
}

impl List {
    pub(crate) fn subscribed() -> List {
        List {
            subscribed: true,
            ..List::default()
        }
    }
}

impl CommandHandler for List {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let user = authenticated(conn)?;

        let pattern = self.cmd.mailbox.clone();
        if (pattern.contains('*') || pattern.contains('%')) && pattern != "*" && pattern != "%"
        {
            // mixed wildcard patterns stay unsupported until the matching
            // rules are settled
            return Err(HandlerError::Bad("Unsupported LIST pattern".to_string()));
        }

        // an empty pattern only asks for the hierarchy delimiter
        if pattern.is_empty() {
            let root = MailboxInfo {
                flags: vec![crate::flag::Flag::Custom("\\Noselect".to_string())],
                delimiter: "/".to_string(),
                name: "".to_string(),
            };
            conn.write_data(&responses::list_resp(&root, self.subscribed))?;
            return Ok(());
        }

        let subscribed = self.subscribed;
        let (tx, consumer) = stream_responses(conn, move |info: &MailboxInfo| {
            responses::list_resp(info, subscribed)
        });

        let mut reference = self.cmd.reference.clone();
        let produced: Result<(), HandlerError> = (|| {
            for mailbox in user.list_mailboxes(self.subscribed)? {
                let info = mailbox.info()?;

                let mut name = info.name.clone();
                if !reference.is_empty() {
                    if !reference.ends_with(&info.delimiter) {
                        reference.push_str(&info.delimiter);
                    }
                    match info.name.strip_prefix(&reference) {
                        Some(stripped) => name = stripped.to_string(),
                        None => continue,
                    }
                }

                let matches = match pattern.as_str() {
                    "*" => true,
                    "%" => !name.contains(&info.delimiter),
                    exact => exact == name,
                };
                if !matches {
                    continue;
                }

                if tx.send(info).is_err() {
                    break;
                }
            }
            Ok(())
        })();

        drop(tx);
        finish_stream(consumer)?;
        produced
    }
}

#[derive(Default)]
pub(crate) struct Status {
    cmd: commands::Status,
}

impl CommandHandler for Status {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let user = authenticated(conn)?;
        let mailbox = user.get_mailbox(&self.cmd.mailbox)?;
        let status = mailbox.status()?;
        conn.write_data(&responses::status_resp(&status, &self.cmd.items))?;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Append {
    cmd: commands::Append,
}

impl CommandHandler for Append {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let user = authenticated(conn)?;

        let mailbox = match user.get_mailbox(&self.cmd.mailbox) {
            Ok(mailbox) => mailbox,
            Err(err @ BackendError::NoSuchMailbox(_)) => {
                return Err(status_with_code(
                    StatusRespType::No,
                    StatusRespCode::TryCreate,
                    &err.to_string(),
                ))
            }
            Err(err) => return Err(err.into()),
        };

        mailbox.create_message(&self.cmd.flags, self.cmd.date, &self.cmd.message)?;

        // when the backend publishes its own updates the client hears
        // about the new message that way instead
        if !conn.server().publishes_updates() {
            if let Some(selected) = &conn.ctx.mailbox {
                if selected.name() == mailbox.name() {
                    let status = mailbox.status()?;
                    conn.write_data(&Resp::new(vec![
                        Value::Number(status.messages),
                        Value::Atom("EXISTS".into()),
                    ]))?;
                }
            }
        }
        Ok(())
    }
}
