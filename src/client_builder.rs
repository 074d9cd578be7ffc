#[cfg(feature = "tls")]
use std::io::{Read, Write};
use std::net::TcpStream;

#[cfg(feature = "tls")]
use bufstream::BufStream;
#[cfg(feature = "tls")]
use native_tls::{TlsConnector, TlsStream};

use crate::client::Client;
#[cfg(feature = "tls")]
use crate::commands;
#[cfg(feature = "tls")]
use crate::error::{Error, ParseError};
use crate::error::Result;
#[cfg(feature = "tls")]
use crate::read::Reader;
#[cfg(feature = "tls")]
use crate::response::{Response, StatusRespType};
#[cfg(feature = "tls")]
use crate::write::Writer;

/// A convenience builder for [`Client`] structs over various transports.
///
/// Connecting over implicit TLS:
/// ```no_run
/// # fn main() -> Result<(), imap_engine::Error> {
/// let client = imap_engine::ClientBuilder::new("imap.example.com", 993).native_tls()?;
/// # Ok(())
/// # }
/// ```
///
/// To upgrade a cleartext connection with `STARTTLS`, call
/// [`starttls`](ClientBuilder::starttls) first; the builder performs the
/// upgrade exchange before the session exists:
/// ```no_run
/// # fn main() -> Result<(), imap_engine::Error> {
/// let client = imap_engine::ClientBuilder::new("imap.example.com", 143)
///     .starttls()
///     .native_tls()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder<D>
where
    D: AsRef<str>,
{
    domain: D,
    port: u16,
    starttls: bool,
}

impl<D> ClientBuilder<D>
where
    D: AsRef<str>,
{
    /// Make a new `ClientBuilder` using the given domain and port.
    pub fn new(domain: D, port: u16) -> Self {
        ClientBuilder {
            domain,
            port,
            starttls: false,
        }
    }

    /// Use `STARTTLS` for this connection.
    #[cfg(feature = "tls")]
    pub fn starttls(&mut self) -> &mut Self {
        self.starttls = true;
        self
    }

    /// Return a new [`Client`] over plain TCP, greeting consumed.
    pub fn plain(&mut self) -> Result<Client<TcpStream>> {
        let tcp = TcpStream::connect((self.domain.as_ref(), self.port))?;
        let mut client = Client::new(tcp);
        client.read_greeting()?;
        Ok(client)
    }

    /// Return a new [`Client`] using a `native-tls` transport: implicit
    /// TLS by default, or a `STARTTLS` upgrade when
    /// [`starttls`](ClientBuilder::starttls) was called.
    #[cfg(feature = "tls")]
    pub fn native_tls(&mut self) -> Result<Client<TlsStream<TcpStream>>> {
        self.connect(|domain, tcp| {
            let connector = TlsConnector::builder().build()?;
            connector
                .connect(domain, tcp)
                .map_err(|e| match e {
                    native_tls::HandshakeError::Failure(e) => Error::Tls(e),
                    e @ native_tls::HandshakeError::WouldBlock(_) => {
                        Error::TlsHandshake(e)
                    }
                })
        })
    }

    /// Make a [`Client`] using a custom TLS initialization over the
    /// connected (and, with `STARTTLS`, already upgraded-to-ready) TCP
    /// socket. The `handshake` closure only performs the TLS negotiation
    /// and returns the encrypted stream.
    #[cfg(feature = "tls")]
    pub fn connect<F, C>(&mut self, handshake: F) -> Result<Client<C>>
    where
        F: FnOnce(&str, TcpStream) -> Result<C>,
        C: Read + Write,
    {
        let tcp = TcpStream::connect((self.domain.as_ref(), self.port))?;

        if self.starttls {
            let tcp = starttls_exchange(tcp)?;
            let stream = handshake(self.domain.as_ref(), tcp)?;
            // the cleartext greeting is gone; capabilities must be
            // re-requested on the encrypted stream
            Ok(Client::new_upgraded(stream))
        } else {
            let stream = handshake(self.domain.as_ref(), tcp)?;
            let mut client = Client::new(stream);
            client.read_greeting()?;
            Ok(client)
        }
    }
}

/// Consume the cleartext greeting, issue STARTTLS, and wait for the OK
/// that green-lights the handshake.
#[cfg(feature = "tls")]
fn starttls_exchange(tcp: TcpStream) -> Result<TcpStream> {
    let mut stream = BufStream::new(tcp);

    {
        let mut reader = Reader::new(&mut stream);
        match Response::read_from(&mut reader)? {
            Response::Status(status) if status.tag == "*" => match status.typ {
                StatusRespType::Ok | StatusRespType::PreAuth => {}
                _ => return Err(Error::Bye(status.info)),
            },
            other => {
                return Err(ParseError::Unexpected(format!("greeting {:?}", other)).into())
            }
        }
    }

    let mut cmd = commands::StartTls.command();
    cmd.tag = "S1".to_string();
    {
        let mut writer = Writer::new(&mut stream);
        writer.write_fields(&cmd.fields())?;
        writer.end_line()?;
    }

    loop {
        let mut reader = Reader::new(&mut stream);
        match Response::read_from(&mut reader)? {
            Response::Status(status) if status.tag == cmd.tag => {
                status.err()?;
                break;
            }
            _ => continue,
        }
    }

    Ok(stream.into_inner()?)
}
