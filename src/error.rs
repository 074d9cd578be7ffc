//! IMAP error types.

use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;
#[cfg(feature = "tls")]
use std::net::TcpStream;
use std::result;
use std::str::Utf8Error;
use std::sync::mpsc;

use base64::DecodeError;
use bufstream::IntoInnerError as BufError;
#[cfg(feature = "tls")]
use native_tls::Error as TlsError;
#[cfg(feature = "tls")]
use native_tls::HandshakeError as TlsHandshakeError;

use crate::value::ValueKind;

/// A convenience wrapper around `Result` for [`Error`].
pub type Result<T> = result::Result<T, Error>;

/// A set of errors that can occur while speaking IMAP.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An `io::Error` that occurred while trying to read or write to a
    /// network stream.
    Io(IoError),
    /// An error from the `native_tls` library during the TLS handshake.
    #[cfg(feature = "tls")]
    TlsHandshake(TlsHandshakeError<TcpStream>),
    /// An error from the `native_tls` library while managing the socket.
    #[cfg(feature = "tls")]
    Tls(TlsError),
    /// A BAD response from the peer.
    Bad(String),
    /// A NO response from the peer.
    No(String),
    /// The server closed the session with an untagged BYE.
    Bye(String),
    /// The connection was terminated unexpectedly.
    ConnectionLost,
    /// Error parsing data received from the peer.
    Parse(ParseError),
    /// Command inputs were not valid [IMAP
    /// strings](https://tools.ietf.org/html/rfc3501#section-4.3).
    Validate(ValidateError),
    /// Returned when trying to read a greeting multiple times.
    GreetingAlreadyRead,
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl<T> From<BufError<T>> for Error {
    fn from(err: BufError<T>) -> Error {
        Error::Io(err.into())
    }
}

#[cfg(feature = "tls")]
impl From<TlsHandshakeError<TcpStream>> for Error {
    fn from(err: TlsHandshakeError<TcpStream>) -> Error {
        Error::TlsHandshake(err)
    }
}

#[cfg(feature = "tls")]
impl From<TlsError> for Error {
    fn from(err: TlsError) -> Error {
        Error::Tls(err)
    }
}

impl<T> From<mpsc::SendError<T>> for Error {
    fn from(_: mpsc::SendError<T>) -> Error {
        Error::ConnectionLost
    }
}

impl From<mpsc::RecvError> for Error {
    fn from(_: mpsc::RecvError) -> Error {
        Error::ConnectionLost
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => fmt::Display::fmt(e, f),
            #[cfg(feature = "tls")]
            Error::Tls(e) => fmt::Display::fmt(e, f),
            #[cfg(feature = "tls")]
            Error::TlsHandshake(e) => fmt::Display::fmt(e, f),
            Error::Parse(e) => fmt::Display::fmt(e, f),
            Error::Validate(e) => fmt::Display::fmt(e, f),
            Error::Bad(data) => write!(f, "BAD response: {}", data),
            Error::No(data) => write!(f, "NO response: {}", data),
            Error::Bye(data) => write!(f, "BYE: {}", data),
            Error::ConnectionLost => f.write_str("Connection lost"),
            Error::GreetingAlreadyRead => f.write_str("Greeting can only be read once"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            #[cfg(feature = "tls")]
            Error::Tls(e) => Some(e),
            #[cfg(feature = "tls")]
            Error::TlsHandshake(e) => Some(e),
            Error::Parse(e) => Some(e),
            _ => None,
        }
    }
}

/// An error occurred while trying to parse data received from the peer.
///
/// Every variant is tagged with the construct that failed to decode, so a
/// server can answer with a tagged `BAD` naming the problem and keep the
/// connection alive.
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseError {
    /// A token violated the wire grammar; the message names the offending
    /// construct ("atom contains a forbidden character", "list doesn't end
    /// with a close parenthesis", ...).
    Syntax(&'static str),
    /// A parser expected one kind of value and found another.
    UnexpectedValue {
        /// What the parser was looking for.
        expected: &'static str,
        /// The kind of value it found instead.
        found: ValueKind,
    },
    /// A command or response was missing required arguments.
    MissingArguments(&'static str),
    /// An unexpected response was encountered.
    Unexpected(String),
    /// A number failed to decode as an unsigned 32-bit integer.
    BadNumber(String),
    /// A sequence set expression failed to decode.
    BadSeqSet(String),
    /// A date failed to decode in any of the known layouts.
    BadDate(String),
    /// A body section name failed to decode.
    BadSectionName(String),
    /// The peer could not find or decode a base64 authentication exchange.
    Authentication(String, Option<DecodeError>),
    /// The peer sent data that was not UTF-8 encoded where text was
    /// required.
    DataNotUtf8(Utf8Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax(msg) => f.write_str(msg),
            ParseError::UnexpectedValue { expected, found } => {
                write!(f, "expected {}, got {}", expected, found)
            }
            ParseError::MissingArguments(what) => write!(f, "{}: not enough arguments", what),
            ParseError::Unexpected(resp) => write!(f, "unexpected response: {}", resp),
            ParseError::BadNumber(s) => write!(f, "invalid number: {}", s),
            ParseError::BadSeqSet(s) => write!(f, "invalid sequence set: {}", s),
            ParseError::BadDate(s) => write!(f, "cannot parse date: {}", s),
            ParseError::BadSectionName(s) => write!(f, "invalid body section name: {}", s),
            ParseError::Authentication(s, _) => {
                write!(f, "cannot parse authentication exchange: {}", s)
            }
            ParseError::DataNotUtf8(_) => f.write_str("data is not valid UTF-8"),
        }
    }
}

impl StdError for ParseError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ParseError::Authentication(_, Some(e)) => Some(e),
            ParseError::DataNotUtf8(e) => Some(e),
            _ => None,
        }
    }
}

/// An [invalid character](https://tools.ietf.org/html/rfc3501#section-4.3)
/// was found in an input string.
#[derive(Debug)]
pub struct ValidateError(pub char);

impl fmt::Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // print the character in debug form because invalid ones are often
        // whitespace
        write!(f, "invalid character in input: {:?}", self.0)
    }
}

impl StdError for ValidateError {}
