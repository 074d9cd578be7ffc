use std::io::{self, BufReader, BufWriter, Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, error, warn};

use crate::backend::{Mailbox, User};
use crate::command::Command;
use crate::error::Error;
use crate::read::{continuation_channel, ContinuationSender, Reader};
use crate::response::{
    ContinuationResp, Resp, Response, StatusResp, StatusRespCode, StatusRespType,
};
use crate::value::Value;
use crate::write::Writer;
use crate::ConnState;

use super::{HandlerError, Server};

/// The per-connection state a command handler can inspect and update.
pub struct Context {
    /// The connection's current state.
    pub state: ConnState,
    /// The logged-in user, once authenticated.
    pub user: Option<Arc<dyn User>>,
    /// The selected mailbox, present exactly while the connection is in
    /// the selected state.
    pub mailbox: Option<Arc<dyn Mailbox>>,
    /// True when the selected mailbox was opened read-only (EXAMINE).
    pub mailbox_read_only: bool,
}

enum StreamInner {
    Tcp(TcpStream),
    #[cfg(feature = "tls")]
    Tls(native_tls::TlsStream<TcpStream>),
    // placeholder while a STARTTLS handshake owns the socket
    Upgrading,
}

/// A cloneable handle on the connection's socket. Reads and writes lock
/// per call; the literal-continuation rendezvous guarantees the reader is
/// parked (not holding the lock) whenever the continuation writer needs
/// it.
#[derive(Clone)]
pub(crate) struct SharedStream(Arc<Mutex<StreamInner>>);

impl SharedStream {
    fn new(stream: TcpStream) -> SharedStream {
        SharedStream(Arc::new(Mutex::new(StreamInner::Tcp(stream))))
    }

    pub(crate) fn is_tls(&self) -> bool {
        #[cfg(feature = "tls")]
        {
            matches!(&*self.0.lock().unwrap(), StreamInner::Tls(_))
        }
        #[cfg(not(feature = "tls"))]
        {
            false
        }
    }

    #[cfg(feature = "tls")]
    fn new_tls(stream: native_tls::TlsStream<TcpStream>) -> SharedStream {
        SharedStream(Arc::new(Mutex::new(StreamInner::Tls(stream))))
    }

    // Swap the transport under every handle: take the TCP stream out, run
    // the TLS handshake, put the encrypted stream back.
    #[cfg(feature = "tls")]
    fn upgrade(&self, acceptor: &native_tls::TlsAcceptor) -> crate::error::Result<()> {
        let mut inner = self.0.lock().unwrap();
        let tcp = match std::mem::replace(&mut *inner, StreamInner::Upgrading) {
            StreamInner::Tcp(tcp) => tcp,
            other => {
                *inner = other;
                return Err(Error::Bad("TLS is already enabled".to_string()));
            }
        };

        *inner = StreamInner::Tls(tls_accept(acceptor, tcp)?);
        Ok(())
    }
}

/// Run a server-side TLS handshake to completion on a blocking socket.
#[cfg(feature = "tls")]
pub(crate) fn tls_accept(
    acceptor: &native_tls::TlsAcceptor,
    tcp: TcpStream,
) -> crate::error::Result<native_tls::TlsStream<TcpStream>> {
    let mut pending = match acceptor.accept(tcp) {
        Ok(tls) => return Ok(tls),
        Err(native_tls::HandshakeError::Failure(e)) => return Err(Error::Tls(e)),
        Err(native_tls::HandshakeError::WouldBlock(mid)) => mid,
    };
    loop {
        match pending.handshake() {
            Ok(tls) => return Ok(tls),
            Err(native_tls::HandshakeError::Failure(e)) => return Err(Error::Tls(e)),
            Err(native_tls::HandshakeError::WouldBlock(mid)) => pending = mid,
        }
    }
}

impl Read for SharedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut *self.0.lock().unwrap() {
            StreamInner::Tcp(s) => s.read(buf),
            #[cfg(feature = "tls")]
            StreamInner::Tls(s) => s.read(buf),
            StreamInner::Upgrading => Err(upgrading_error()),
        }
    }
}

impl Write for SharedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut *self.0.lock().unwrap() {
            StreamInner::Tcp(s) => s.write(buf),
            #[cfg(feature = "tls")]
            StreamInner::Tls(s) => s.write(buf),
            StreamInner::Upgrading => Err(upgrading_error()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.0.lock().unwrap() {
            StreamInner::Tcp(s) => s.flush(),
            #[cfg(feature = "tls")]
            StreamInner::Tls(s) => s.flush(),
            StreamInner::Upgrading => Err(upgrading_error()),
        }
    }
}

fn upgrading_error() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "stream is mid-upgrade")
}

pub(crate) type ConnWriter = Arc<Mutex<Writer<BufWriter<SharedStream>>>>;

/// One server-side connection: the dispatch loop, the reader, the mutexed
/// writer, and the continuation writer thread that services the reader's
/// literal rendezvous.
pub struct Conn {
    server: Arc<Server>,
    stream: SharedStream,
    reader: Reader<BufReader<SharedStream>>,
    writer: ConnWriter,
    continues: ContinuationSender,
    pending_upgrade: bool,
    /// The connection's command-visible state.
    pub ctx: Context,
}

impl Conn {
    pub(crate) fn new(server: Arc<Server>, stream: TcpStream) -> Conn {
        Conn::from_shared(server, SharedStream::new(stream))
    }

    #[cfg(feature = "tls")]
    pub(crate) fn new_tls(server: Arc<Server>, stream: native_tls::TlsStream<TcpStream>) -> Conn {
        Conn::from_shared(server, SharedStream::new_tls(stream))
    }

    fn from_shared(server: Arc<Server>, stream: SharedStream) -> Conn {
        let writer: ConnWriter = Arc::new(Mutex::new(Writer::new(BufWriter::new(
            stream.clone(),
        ))));

        let (continues, continuation_requests) = continuation_channel();

        // services the reader's literal rendezvous: one `+` per pending
        // literal, written under the writer mutex, acknowledged so the
        // reader can go on to consume the literal bytes
        let continuation_writer = writer.clone();
        thread::spawn(move || {
            for ack in continuation_requests.iter() {
                let mut w = continuation_writer.lock().unwrap();
                if let Err(err) = ContinuationResp::new("send literal").write_to(&mut *w) {
                    warn!("cannot send continuation request: {}", err);
                }
                drop(w);
                let _ = ack.send(());
            }
        });

        let reader = Reader::new_server(BufReader::new(stream.clone()), continues.clone());

        Conn {
            server,
            stream,
            reader,
            writer,
            continues,
            pending_upgrade: false,
            ctx: Context {
                state: ConnState::NotAuthenticated,
                user: None,
                mailbox: None,
                mailbox_read_only: false,
            },
        }
    }

    /// The server this connection belongs to.
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Is this connection encrypted?
    pub fn is_tls(&self) -> bool {
        self.stream.is_tls()
    }

    /// Can this connection use plaintext authentication?
    pub fn can_auth(&self) -> bool {
        self.server.can_auth(self.is_tls())
    }

    /// The capabilities currently advertised to this connection.
    pub fn capabilities(&self) -> Vec<String> {
        self.server.capabilities(self.ctx.state, self.is_tls())
    }

    pub(crate) fn writer_handle(&self) -> ConnWriter {
        self.writer.clone()
    }

    /// Write one response under the connection's write lock.
    pub fn write_resp(&self, resp: &Response) -> crate::error::Result<()> {
        let mut w = self.writer.lock().unwrap();
        resp.write_to(&mut *w)
    }

    /// Write one untagged data response under the connection's write lock.
    pub fn write_data(&self, resp: &Resp) -> crate::error::Result<()> {
        let mut w = self.writer.lock().unwrap();
        resp.write_to(&mut *w)
    }

    /// Write one status response under the connection's write lock.
    pub fn write_status(&self, resp: &StatusResp) -> crate::error::Result<()> {
        let mut w = self.writer.lock().unwrap();
        resp.write_to(&mut *w)
    }

    // AUTHENTICATE consumes raw base64 lines between continuations.
    pub(crate) fn read_auth_line(&mut self) -> crate::error::Result<String> {
        self.reader.read_info()
    }

    // STARTTLS cannot upgrade mid-command: the handler requests it, the
    // dispatch loop performs it right after the tagged OK.
    pub(crate) fn request_upgrade(&mut self) {
        self.pending_upgrade = true;
    }

    #[cfg(feature = "tls")]
    fn do_upgrade(&mut self) -> crate::error::Result<()> {
        let acceptor = self
            .server
            .tls_acceptor()
            .cloned()
            .ok_or_else(|| Error::Bad("TLS support not enabled".to_string()))?;
        self.stream.upgrade(&acceptor)?;
        // any cleartext read buffer is stale after the handshake
        self.reader =
            Reader::new_server(BufReader::new(self.stream.clone()), self.continues.clone());
        debug!("connection upgraded to TLS");
        Ok(())
    }

    fn greet(&self) -> crate::error::Result<()> {
        let caps: Vec<Value> = self
            .capabilities()
            .into_iter()
            .map(Value::Atom)
            .collect();
        let greeting = StatusResp::ok("IMAP4rev1 Service Ready")
            .with_code(StatusRespCode::Capability, caps);
        self.write_status(&greeting)
    }

    /// Run the dispatch loop until LOGOUT or the connection goes away.
    pub(crate) fn run(&mut self) {
        if let Err(err) = self.greet() {
            error!("cannot send greeting: {}", err);
            return;
        }

        loop {
            if self.ctx.state == ConnState::Logout {
                return;
            }

            let fields = match self.reader.read_line() {
                Ok(fields) => fields,
                Err(Error::ConnectionLost) => return,
                Err(Error::Io(err)) => {
                    if err.kind() != io::ErrorKind::UnexpectedEof {
                        error!("error reading command: {}", err);
                    }
                    return;
                }
                Err(err) => {
                    // recoverable framing error: resynchronize on the next
                    // line and tell the client
                    if self.reader.skip_line().is_err() {
                        return;
                    }
                    let bad = StatusResp {
                        tag: "*".to_string(),
                        typ: StatusRespType::Bad,
                        code: None,
                        arguments: Vec::new(),
                        info: err.to_string(),
                    };
                    if self.write_status(&bad).is_err() {
                        return;
                    }
                    continue;
                }
            };

            if fields.is_empty() {
                continue;
            }

            let tag_hint = fields
                .first()
                .and_then(|f| f.as_text())
                .map(|t| t.into_owned());
            let cmd = match Command::parse(fields) {
                Ok(cmd) => cmd,
                Err(err) => {
                    let bad = StatusResp {
                        tag: tag_hint.unwrap_or_else(|| "*".to_string()),
                        typ: StatusRespType::Bad,
                        code: None,
                        arguments: Vec::new(),
                        info: err.to_string(),
                    };
                    if self.write_status(&bad).is_err() {
                        return;
                    }
                    continue;
                }
            };

            if let Err(err) = self.handle_command(cmd) {
                if self.ctx.state != ConnState::Logout {
                    error!("connection error: {}", err);
                }
                return;
            }
        }
    }

    fn handle_command(&mut self, mut cmd: Command) -> crate::error::Result<()> {
        let arguments = std::mem::take(&mut cmd.arguments);

        let status = match self.server.command_factory(&cmd.name) {
            None => StatusResp {
                tag: cmd.tag.clone(),
                typ: StatusRespType::Bad,
                code: None,
                arguments: Vec::new(),
                info: "Unknown command".to_string(),
            },
            Some(factory) => {
                let mut handler = factory();
                match handler.parse(arguments) {
                    Err(err) => StatusResp {
                        tag: cmd.tag.clone(),
                        typ: StatusRespType::Bad,
                        code: None,
                        arguments: Vec::new(),
                        info: err.to_string(),
                    },
                    Ok(()) => match handler.handle(self) {
                        Ok(()) => StatusResp::completed(&cmd.tag, &cmd.name),
                        Err(HandlerError::No(info)) => StatusResp {
                            tag: cmd.tag.clone(),
                            typ: StatusRespType::No,
                            code: None,
                            arguments: Vec::new(),
                            info,
                        },
                        Err(HandlerError::Bad(info)) => StatusResp {
                            tag: cmd.tag.clone(),
                            typ: StatusRespType::Bad,
                            code: None,
                            arguments: Vec::new(),
                            info,
                        },
                        Err(HandlerError::Status(mut status)) => {
                            status.tag = cmd.tag.clone();
                            status
                        }
                        Err(HandlerError::Io(err)) => return Err(err),
                    },
                }
            }
        };

        self.write_status(&status)?;

        if self.pending_upgrade {
            self.pending_upgrade = false;
            #[cfg(feature = "tls")]
            self.do_upgrade()?;
        }
        Ok(())
    }
}
