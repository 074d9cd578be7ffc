//! Handlers for commands valid in any state.

use crate::commands;
use crate::response::{StatusResp, StatusRespType};
use crate::responses;
use crate::value::Value;
use crate::ConnState;

use super::{CommandHandler, Conn, HandlerResult};

#[derive(Default)]
pub(crate) struct Capability {
    cmd: commands::Capability,
}

impl CommandHandler for Capability {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let caps = conn.capabilities();
        conn.write_data(&responses::capability_resp(&caps))?;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Noop {
    cmd: commands::Noop,
}

impl CommandHandler for Noop {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, _conn: &mut Conn) -> HandlerResult {
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Logout {
    cmd: commands::Logout,
}

impl CommandHandler for Logout {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        let bye = StatusResp {
            tag: "*".to_string(),
            typ: StatusRespType::Bye,
            code: None,
            arguments: Vec::new(),
            info: "Closing connection".to_string(),
        };
        conn.write_status(&bye)?;

        conn.ctx.state = ConnState::Logout;
        conn.ctx.mailbox = None;
        conn.ctx.mailbox_read_only = false;
        Ok(())
    }
}
