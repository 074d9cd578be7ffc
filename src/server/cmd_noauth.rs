//! Handlers for the not-authenticated state.

use crate::commands;
use crate::response::ContinuationResp;
use crate::value::Value;
use crate::ConnState;

use super::{CommandHandler, Conn, HandlerError, HandlerResult};

#[derive(Default)]
pub(crate) struct StartTls {
    cmd: commands::StartTls,
}

impl CommandHandler for StartTls {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    #[cfg(feature = "tls")]
    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        if conn.ctx.state != ConnState::NotAuthenticated {
            return Err(HandlerError::No("Already authenticated".to_string()));
        }
        if conn.is_tls() {
            return Err(HandlerError::Bad("TLS is already enabled".to_string()));
        }
        if conn.server().tls_acceptor().is_none() {
            return Err(HandlerError::No("TLS support not enabled".to_string()));
        }

        // the handshake happens after the tagged OK is on the wire
        conn.request_upgrade();
        Ok(())
    }

    #[cfg(not(feature = "tls"))]
    fn handle(&mut self, _conn: &mut Conn) -> HandlerResult {
        Err(HandlerError::No("TLS support not enabled".to_string()))
    }
}

#[derive(Default)]
pub(crate) struct Login {
    cmd: commands::Login,
}

impl CommandHandler for Login {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        if conn.ctx.state != ConnState::NotAuthenticated {
            return Err(HandlerError::No("Already authenticated".to_string()));
        }
        if !conn.can_auth() {
            return Err(HandlerError::No(
                "Authentication disabled on insecure connections".to_string(),
            ));
        }

        let user = conn
            .server()
            .backend()
            .login(&self.cmd.username, &self.cmd.password)?;
        conn.ctx.user = Some(user);
        conn.ctx.state = ConnState::Authenticated;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct Authenticate {
    cmd: commands::Authenticate,
}

impl CommandHandler for Authenticate {
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()> {
        self.cmd.parse(fields)
    }

    fn handle(&mut self, conn: &mut Conn) -> HandlerResult {
        if conn.ctx.state != ConnState::NotAuthenticated {
            return Err(HandlerError::No("Already authenticated".to_string()));
        }
        if !conn.can_auth() {
            return Err(HandlerError::No(
                "Authentication disabled on insecure connections".to_string(),
            ));
        }

        let factory = conn
            .server()
            .auth_factory(&self.cmd.mechanism)
            .ok_or_else(|| {
                HandlerError::No(format!(
                    "Unsupported authentication mechanism: {}",
                    self.cmd.mechanism
                ))
            })?;
        let mut mechanism = factory(conn.server().backend());

        let mut response: Option<Vec<u8>> = None;
        loop {
            match mechanism.next(response.as_deref())? {
                crate::sasl::SaslStep::Continue(challenge) => {
                    let encoded = base64::encode(&challenge);
                    let cont = ContinuationResp::new(&encoded);
                    {
                        let writer = conn.writer_handle();
                        let mut w = writer.lock().unwrap();
                        cont.write_to(&mut *w)?;
                    }

                    let line = conn.read_auth_line()?;
                    if line.trim() == "*" {
                        return Err(HandlerError::Bad(
                            "Authentication aborted".to_string(),
                        ));
                    }
                    let decoded = base64::decode(line.trim()).map_err(|_| {
                        HandlerError::Bad("Invalid base64 in authentication".to_string())
                    })?;
                    response = Some(decoded);
                }
                crate::sasl::SaslStep::Done(user) => {
                    conn.ctx.user = Some(user);
                    conn.ctx.state = ConnState::Authenticated;
                    return Ok(());
                }
            }
        }
    }
}
