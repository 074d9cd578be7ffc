//! Handlers for the selected state.

use std::sync::Arc;

use crate::backend::{BackendError, Mailbox};
use crate::commands;
use crate::message::Message;
use crate::response::{StatusRespCode, StatusRespType};
use crate::responses;
use crate::search::SearchCriteria;
use crate::value::Value;
use crate::ConnState;

use super::{
    finish_stream, status_with_code, stream_responses, CommandHandler, Conn, HandlerError,
    HandlerResult,
};

fn selected(conn: &Conn) -> Result<Arc<dyn Mailbox>, HandlerError> {
    if conn.ctx.state != ConnState::Selected {
        return Err(HandlerError::No("No mailbox selected".to_string()));
    }
    conn.ctx
        .mailbox
        .clone()
        .ok_or_else(|| HandlerError::No("No mailbox selected".to_string()))
}

fn writable(conn: &Conn) -> Result<Arc<dyn Mailbox>, HandlerError> {
    let mailbox = selected(conn)?;
    if conn.ctx.mailbox_read_only {
        return Err(HandlerError::No("Mailbox is read-only".to_string()));
    }
    Ok(mailbox)
}

#[derive(Default)]
pub(crate) struct Check {
    cmd: commands::Check,
}

impl CommandHandler for Check {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let mailbox = selected(conn)?;
        mailbox.check()?;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Close {
    cmd: commands::Close,
}

impl CommandHandler for Close {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let mailbox = selected(conn)?;

        // CLOSE expunges silently, but never from a read-only selection
        if !conn.ctx.mailbox_read_only {
            mailbox.expunge(None)?;
        }

        conn.ctx.mailbox = None;
        conn.ctx.mailbox_read_only = false;
        conn.ctx.state = ConnState::Authenticated;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Expunge {
    cmd: commands::Expunge,
}

impl CommandHandler for Expunge {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let mailbox = writable(conn)?;

        let (tx, consumer) = stream_responses(conn, |seq: &u32| responses::expunge_resp(*seq));
        let produced = mailbox.expunge(Some(&tx));
        drop(tx);
        finish_stream(consumer)?;
        produced?;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Search {
    cmd: commands::Search,
    uid: bool,
}

impl Search {
    fn uid() -> Search {
        Search {
            uid: true,
            ..Search::default()
        }
    }
}

impl CommandHandler for Search {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let mailbox = selected(conn)?;

        let (charset, criteria) = SearchCriteria::parse(self.cmd.criteria.clone())
            .map_err(|err| HandlerError::Bad(err.to_string()))?;
        if let Some(charset) = charset {
            if !charset.eq_ignore_ascii_case("UTF-8")
                && !charset.eq_ignore_ascii_case("US-ASCII")
            {
                return Err(status_with_code(
                    StatusRespType::No,
                    StatusRespCode::BadCharset,
                    "Only UTF-8 and US-ASCII are supported",
                ));
            }
        }

        let ids = mailbox.search_messages(self.uid, &criteria)?;
        conn.write_data(&responses::search_resp(&ids))?;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Fetch {
    cmd: commands::Fetch,
    uid: bool,
}

impl Fetch {
    fn uid() -> Fetch {
        Fetch {
            uid: true,
            ..Fetch::default()
        }
    }
}

impl CommandHandler for Fetch {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let mailbox = selected(conn)?;

        let mut items = self.cmd.items.clone();
        // UID FETCH always reports the UID
        if self.uid && !items.iter().any(|i| i.eq_ignore_ascii_case("UID")) {
            items.push("UID".to_string());
        }

        let (tx, consumer) =
            stream_responses(conn, |msg: &Message| responses::fetch_resp(msg));
        let produced = mailbox.list_messages(self.uid, &self.cmd.seq_set, &items, &tx);
        drop(tx);
        finish_stream(consumer)?;
        produced?;
        Ok(())
    }
}

pub(crate) struct Store {
    cmd: commands::Store,
    uid: bool,
}

impl Default for Store {
    fn default() -> Store {
        Store {
            cmd: commands::Store::default(),
            uid: false,
        }
    }
}

impl Store {
    fn uid() -> Store {
        Store {
            uid: true,
            ..Store::default()
        }
    }
}

impl CommandHandler for Store {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let mailbox = writable(conn)?;

        if self.cmd.silent {
            mailbox.update_flags(
                self.uid,
                &self.cmd.seq_set,
                self.cmd.op,
                &self.cmd.flags,
                None,
            )?;
            return Ok(());
        }

        let (tx, consumer) =
            stream_responses(conn, |msg: &Message| responses::fetch_resp(msg));
        let produced = mailbox.update_flags(
            self.uid,
            &self.cmd.seq_set,
            self.cmd.op,
            &self.cmd.flags,
            Some(&tx),
        );
        drop(tx);
        finish_stream(consumer)?;
        produced?;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Copy {
    cmd: commands::Copy,
    uid: bool,
}

impl Copy {
    fn uid() -> Copy {
        Copy {
            uid: true,
            ..Copy::default()
        }
    }
}

impl CommandHandler for Copy {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let mailbox = selected(conn)?;
        match mailbox.copy_messages(self.uid, &self.cmd.seq_set, &self.cmd.mailbox) {
            Ok(()) => Ok(()),
            Err(err @ BackendError::NoSuchMailbox(_)) => Err(status_with_code(
                StatusRespType::No,
                StatusRespCode::TryCreate,
                &err.to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Default)]
pub(crate) struct Uid {
    cmd: commands::Uid,
}

impl CommandHandler for Uid {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let mut inner: Box<dyn CommandHandler> = match self.cmd.name.as_str() {
            crate::names::FETCH => Box::new(Fetch::uid()),
            crate::names::SEARCH => Box::new(Search::uid()),
            crate::names::STORE => Box::new(Store::uid()),
            crate::names::COPY => Box::new(Copy::uid()),
            _ => {
                return Err(HandlerError::Bad(format!(
                    "Unsupported UID command: {}",
                    self.cmd.name
                )))
            }
        };

        inner
            .parse(self.cmd.arguments.clone())
            .map_err(|err| HandlerError::Bad(err.to_string()))?;
        inner.handle(conn)
    }
}
