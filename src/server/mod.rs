//! An embeddable IMAP server.
//!
//! [`Server`] owns the command registry, the SASL mechanism registry and a
//! [`Backend`]; it accepts TCP connections and runs one dispatch loop per
//! connection on its own thread. Command handlers never touch the socket
//! directly: they stream untagged responses through the connection's
//! mutexed writer and report their outcome, and the dispatch loop turns
//! that outcome into exactly one tagged status per command.
//!
//! ```no_run
//! # use std::sync::Arc;
//! use imap_engine::backend::memory::MemoryBackend;
//! use imap_engine::server::Server;
//!
//! let backend = Arc::new(MemoryBackend::with_user("taki", "password"));
//! Server::new(backend)
//!     .allow_insecure_auth(true)
//!     .listen("127.0.0.1:1143")
//!     .unwrap();
//! ```

mod cmd_any;
mod cmd_auth;
mod cmd_noauth;
mod cmd_selected;
mod conn;

pub use self::conn::{Conn, Context};

use std::collections::HashMap;
use std::io;
use std::net::{TcpListener, ToSocketAddrs};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use log::debug;
#[cfg(feature = "tls")]
use log::warn;

use crate::backend::{Backend, BackendError};
use crate::error::Error;
use crate::response::{Resp, StatusResp, StatusRespType};
use crate::sasl::{self, SaslServerFactory};
use crate::value::Value;
use crate::{names, ConnState};

/// How a command handler failed; the dispatch loop renders this as the
/// command's tagged status.
#[derive(Debug)]
pub enum HandlerError {
    /// The command is semantically unacceptable: tagged `NO`.
    No(String),
    /// The command is malformed or not allowed at all: tagged `BAD`.
    Bad(String),
    /// A prebuilt status response, forwarded verbatim with the tag filled
    /// in. Used to attach response codes such as `[TRYCREATE]`.
    Status(StatusResp),
    /// The connection is no longer usable; the dispatch loop terminates.
    Io(Error),
}

impl From<BackendError> for HandlerError {
    fn from(err: BackendError) -> HandlerError {
        HandlerError::No(err.to_string())
    }
}

impl From<Error> for HandlerError {
    fn from(err: Error) -> HandlerError {
        HandlerError::Io(err)
    }
}

/// The outcome of handling one command.
pub type HandlerResult = Result<(), HandlerError>;

/// A server-side command implementation: parse the argument fields, then
/// run against the connection.
pub trait CommandHandler: Send {
    /// Decode the command arguments. A failure becomes a tagged `BAD`.
    fn parse(&mut self, fields: Vec<Value>) -> crate::error::Result<()>;

    /// Execute the command, streaming any untagged responses through the
    /// connection.
    fn handle(&mut self, conn: &mut Conn) -> HandlerResult;
}

/// Creates a fresh handler for each received command.
pub type HandlerFactory = fn() -> Box<dyn CommandHandler>;

/// An IMAP server bound to a [`Backend`].
pub struct Server {
    backend: Arc<dyn Backend>,
    commands: HashMap<String, HandlerFactory>,
    auths: HashMap<String, SaslServerFactory>,
    #[cfg(feature = "tls")]
    tls: Option<native_tls::TlsAcceptor>,
    allow_insecure_auth: bool,
    publish_updates: bool,
}

impl Server {
    /// A server with the standard RFC 3501 command set and a PLAIN SASL
    /// mechanism backed by `backend`.
    pub fn new(backend: Arc<dyn Backend>) -> Server {
        let mut commands: HashMap<String, HandlerFactory> = HashMap::new();

        commands.insert(names::CAPABILITY.into(), || {
            Box::new(cmd_any::Capability::default())
        });
        commands.insert(names::NOOP.into(), || Box::new(cmd_any::Noop::default()));
        commands.insert(names::LOGOUT.into(), || {
            Box::new(cmd_any::Logout::default())
        });

        commands.insert(names::STARTTLS.into(), || {
            Box::new(cmd_noauth::StartTls::default())
        });
        commands.insert(names::LOGIN.into(), || {
            Box::new(cmd_noauth::Login::default())
        });
        commands.insert(names::AUTHENTICATE.into(), || {
            Box::new(cmd_noauth::Authenticate::default())
        });

        commands.insert(names::SELECT.into(), || {
            Box::new(cmd_auth::Select::default())
        });
        commands.insert(names::EXAMINE.into(), || {
            Box::new(cmd_auth::Select::read_only())
        });
        commands.insert(names::CREATE.into(), || {
            Box::new(cmd_auth::Create::default())
        });
        commands.insert(names::DELETE.into(), || {
            Box::new(cmd_auth::Delete::default())
        });
        commands.insert(names::RENAME.into(), || {
            Box::new(cmd_auth::Rename::default())
        });
        commands.insert(names::SUBSCRIBE.into(), || {
            Box::new(cmd_auth::Subscribe::default())
        });
        commands.insert(names::UNSUBSCRIBE.into(), || {
            Box::new(cmd_auth::Unsubscribe::default())
        });
        commands.insert(names::LIST.into(), || Box::new(cmd_auth::List::default()));
        commands.insert(names::LSUB.into(), || Box::new(cmd_auth::List::subscribed()));
        commands.insert(names::STATUS.into(), || {
            Box::new(cmd_auth::Status::default())
        });
        commands.insert(names::APPEND.into(), || {
            Box::new(cmd_auth::Append::default())
        });

        commands.insert(names::CHECK.into(), || {
            Box::new(cmd_selected::Check::default())
        });
        commands.insert(names::CLOSE.into(), || {
            Box::new(cmd_selected::Close::default())
        });
        commands.insert(names::EXPUNGE.into(), || {
            Box::new(cmd_selected::Expunge::default())
        });
        commands.insert(names::SEARCH.into(), || {
            Box::new(cmd_selected::Search::default())
        });
        commands.insert(names::FETCH.into(), || {
            Box::new(cmd_selected::Fetch::default())
        });
        commands.insert(names::STORE.into(), || {
            Box::new(cmd_selected::Store::default())
        });
        commands.insert(names::COPY.into(), || {
            Box::new(cmd_selected::Copy::default())
        });
        commands.insert(names::UID.into(), || Box::new(cmd_selected::Uid::default()));

        let mut auths: HashMap<String, SaslServerFactory> = HashMap::new();
        auths.insert(
            "PLAIN".to_string(),
            Arc::new(|backend| -> Box<dyn sasl::SaslServer> {
                Box::new(sasl::Plain::new(backend))
            }),
        );

        Server {
            backend,
            commands,
            auths,
            #[cfg(feature = "tls")]
            tls: None,
            allow_insecure_auth: false,
            publish_updates: false,
        }
    }

    /// Permit LOGIN and plaintext SASL mechanisms on unencrypted
    /// connections. Off by default; without it, cleartext connections
    /// advertise `LOGINDISABLED`.
    pub fn allow_insecure_auth(mut self, allow: bool) -> Server {
        self.allow_insecure_auth = allow;
        self
    }

    /// Offer STARTTLS (and implicit TLS listeners) with this acceptor.
    #[cfg(feature = "tls")]
    pub fn with_tls(mut self, acceptor: native_tls::TlsAcceptor) -> Server {
        self.tls = Some(acceptor);
        self
    }

    /// Declare that the backend publishes its own mailbox updates. When
    /// set, APPEND does not synthesize an untagged `EXISTS` for the
    /// selected mailbox.
    pub fn publish_updates(mut self) -> Server {
        self.publish_updates = true;
        self
    }

    /// Register (or replace) a SASL mechanism.
    pub fn enable_auth(&mut self, name: &str, factory: SaslServerFactory) {
        self.auths.insert(name.to_ascii_uppercase(), factory);
    }

    pub(crate) fn backend(&self) -> Arc<dyn Backend> {
        self.backend.clone()
    }

    pub(crate) fn publishes_updates(&self) -> bool {
        self.publish_updates
    }

    pub(crate) fn auth_factory(&self, mechanism: &str) -> Option<SaslServerFactory> {
        self.auths.get(mechanism).cloned()
    }

    pub(crate) fn command_factory(&self, name: &str) -> Option<HandlerFactory> {
        self.commands.get(name).copied()
    }

    pub(crate) fn can_auth(&self, is_tls: bool) -> bool {
        is_tls || self.allow_insecure_auth
    }

    #[cfg(feature = "tls")]
    pub(crate) fn tls_acceptor(&self) -> Option<&native_tls::TlsAcceptor> {
        self.tls.as_ref()
    }

    // Capability advertisement depends on the connection state and
    // transport.
    pub(crate) fn capabilities(&self, state: ConnState, is_tls: bool) -> Vec<String> {
        let mut caps = vec!["IMAP4rev1".to_string()];
        if state == ConnState::NotAuthenticated {
            #[cfg(feature = "tls")]
            {
                if !is_tls && self.tls.is_some() {
                    caps.push("STARTTLS".to_string());
                }
            }
            if !self.can_auth(is_tls) {
                caps.push("LOGINDISABLED".to_string());
            } else {
                let mut mechanisms: Vec<&String> = self.auths.keys().collect();
                mechanisms.sort();
                for mechanism in mechanisms {
                    caps.push(format!("AUTH={}", mechanism));
                }
            }
        }
        caps
    }

    /// Accept connections on `listener` forever, one thread per
    /// connection.
    pub fn serve(self: Arc<Server>, listener: TcpListener) -> io::Result<()> {
        loop {
            let (stream, addr) = listener.accept()?;
            debug!("accepted connection from {}", addr);
            let server = self.clone();
            thread::spawn(move || {
                let mut conn = Conn::new(server, stream);
                conn.run();
            });
        }
    }

    /// Bind `addr` and serve forever.
    pub fn listen<A: ToSocketAddrs>(self, addr: A) -> io::Result<()> {
        let listener = TcpListener::bind(addr)?;
        Arc::new(self).serve(listener)
    }

    /// Accept implicit-TLS connections on `listener` forever. The server
    /// must have been given an acceptor with
    /// [`with_tls`](Server::with_tls).
    #[cfg(feature = "tls")]
    pub fn serve_tls(self: Arc<Server>, listener: TcpListener) -> io::Result<()> {
        let acceptor = self.tls.clone().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no TLS acceptor configured")
        })?;
        loop {
            let (stream, addr) = listener.accept()?;
            debug!("accepted connection from {}", addr);
            let server = self.clone();
            let acceptor = acceptor.clone();
            thread::spawn(move || match conn::tls_accept(&acceptor, stream) {
                Ok(tls) => Conn::new_tls(server, tls).run(),
                Err(err) => warn!("TLS handshake failed: {}", err),
            });
        }
    }

    /// Bind `addr` and serve implicit TLS forever.
    #[cfg(feature = "tls")]
    pub fn listen_tls<A: ToSocketAddrs>(self, addr: A) -> io::Result<()> {
        let listener = TcpListener::bind(addr)?;
        Arc::new(self).serve_tls(listener)
    }
}

// Spawn the consumer side of a streaming command: items arrive over a
// bounded channel (the producer blocks when the writer is slow, which is
// the backpressure) and each one is serialized under the writer mutex.
pub(crate) fn stream_responses<T, F>(
    conn: &Conn,
    format: F,
) -> (
    mpsc::SyncSender<T>,
    thread::JoinHandle<crate::error::Result<()>>,
)
where
    T: Send + 'static,
    F: Fn(&T) -> Resp + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(10);
    let writer = conn.writer_handle();
    let consumer = thread::spawn(move || {
        for item in rx.iter() {
            let mut w = writer.lock().unwrap();
            format(&item).write_to(&mut *w)?;
        }
        Ok(())
    });
    (tx, consumer)
}

// Collect a streaming command's consumer outcome after the producer is
// done and the channel closed.
pub(crate) fn finish_stream(
    consumer: thread::JoinHandle<crate::error::Result<()>>,
) -> Result<(), HandlerError> {
    match consumer.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(HandlerError::Io(err)),
        Err(_) => Err(HandlerError::Bad("response writer panicked".to_string())),
    }
}

pub(crate) fn status_with_code(
    typ: StatusRespType,
    code: crate::response::StatusRespCode,
    info: &str,
) -> HandlerError {
    HandlerError::Status(StatusResp {
        tag: String::new(),
        typ,
        code: Some(code),
        arguments: Vec::new(),
        info: info.to_string(),
    })
}
