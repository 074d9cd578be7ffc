//! Server-side SASL mechanism plug-ins for AUTHENTICATE.

use std::sync::Arc;

use crate::backend::{Backend, BackendError, User};

/// One step of a SASL exchange, as seen by the server.
pub enum SaslStep {
    /// Send this challenge (base64-framed by the connection) and wait for
    /// the client's response.
    Continue(Vec<u8>),
    /// The exchange succeeded and yielded a logged-in user.
    Done(Arc<dyn User>),
}

/// A server-side SASL mechanism.
///
/// The AUTHENTICATE handler calls [`next`](SaslServer::next) with `None`
/// first, then with each decoded client response, until the mechanism
/// reports [`SaslStep::Done`] or an error.
pub trait SaslServer: Send {
    /// Advance the exchange with the client's latest response.
    fn next(&mut self, response: Option<&[u8]>) -> Result<SaslStep, BackendError>;
}

/// Creates a fresh [`SaslServer`] for each AUTHENTICATE command.
pub type SaslServerFactory = Arc<dyn Fn(Arc<dyn Backend>) -> Box<dyn SaslServer> + Send + Sync>;

/// The PLAIN mechanism ([RFC 4616](https://tools.ietf.org/html/rfc4616)):
/// one `authzid\0authcid\0password` response checked against the backend.
pub struct Plain {
    backend: Arc<dyn Backend>,
}

impl Plain {
    /// A PLAIN server over the given backend.
    pub fn new(backend: Arc<dyn Backend>) -> Plain {
        Plain { backend }
    }
}

impl SaslServer for Plain {
    fn next(&mut self, response: Option<&[u8]>) -> Result<SaslStep, BackendError> {
        let response = match response {
            None => return Ok(SaslStep::Continue(Vec::new())),
            Some(response) => response,
        };

        let parts: Vec<&[u8]> = response.split(|&b| b == 0).collect();
        if parts.len() != 3 {
            return Err(BackendError::Custom(
                "malformed PLAIN response".to_string(),
            ));
        }
        let identity = String::from_utf8_lossy(parts[0]);
        let username = String::from_utf8_lossy(parts[1]);
        let password = String::from_utf8_lossy(parts[2]);

        if !identity.is_empty() && identity != username {
            return Err(BackendError::Custom("identities not supported".to_string()));
        }

        let user = self.backend.login(&username, &password)?;
        Ok(SaslStep::Done(user))
    }
}
