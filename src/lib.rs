//! This crate is an IMAP4rev1 ([RFC 3501](https://tools.ietf.org/html/rfc3501))
//! protocol engine usable by both ends of the protocol: a transport-agnostic
//! wire codec (reader, writer, command and response models), a synchronous
//! [`Client`], and an embeddable [`Server`](server::Server) that routes
//! commands to a pluggable mailbox [`backend`].
//!
//! The codec works on plain [`std::io::Read`]/[`std::io::Write`] streams, so
//! it can be driven over TCP, TLS (with the default `tls` feature), or any
//! in-memory stream. Synchronizing literals are handled on both sides: a
//! server-mode [`Reader`](read::Reader) asks the connection to emit a `+`
//! continuation before it consumes literal bytes, and the client suspends
//! mid-command until the server's continuation arrives.
//!
//! To talk to an IMAP server:
//!
//! ```no_run
//! # fn main() -> Result<(), imap_engine::Error> {
//! let mut client = imap_engine::Client::connect("imap.example.org:143")?;
//! client.login("ayats", "hunter2")?;
//! let mailbox = client.select("INBOX")?;
//! println!("{} messages", mailbox.messages);
//! client.logout()?;
//! # Ok(())
//! # }
//! ```
//!
//! To serve IMAP, implement [`backend::Backend`] (or start from
//! [`backend::memory`]) and hand it to [`server::Server`].

#![warn(missing_docs)]

#[macro_use]
extern crate lazy_static;

pub mod authenticator;
pub mod backend;
mod client;
mod client_builder;
mod command;
pub mod error;
mod flag;
mod handle;
mod mailbox;
mod message;
pub mod read;
mod response;
pub mod responses;
pub mod sasl;
mod search;
mod seq_set;
pub mod server;
mod value;
pub mod write;

pub(crate) mod commands;

#[cfg(test)]
mod mock_stream;

pub use crate::client::{Client, UnsolicitedResponse};
pub use crate::client_builder::ClientBuilder;
pub use crate::command::Command;
pub use crate::error::{Error, ParseError, Result};
pub use crate::flag::{Flag, FlagsOp};
pub use crate::handle::{accept_named, Handling, ResponseHandler};
pub use crate::mailbox::{MailboxInfo, MailboxStatus};
pub use crate::message::{
    format_internal_date, format_search_date, parse_internal_date, parse_message_date,
    parse_search_date, Address, BodyPartName, BodySectionName, BodyStructure, Envelope, Message,
    PartSpecifier,
};
pub use crate::response::{
    ContinuationResp, Resp, Response, StatusResp, StatusRespCode, StatusRespType,
};
pub use crate::search::SearchCriteria;
pub use crate::seq_set::SeqSet;
pub use crate::value::{Value, ValueKind};

/// The state a connection is in, per [RFC 3501 section
/// 3](https://tools.ietf.org/html/rfc3501#section-3).
///
/// Transitions are gated by commands (LOGIN/AUTHENTICATE, SELECT/EXAMINE,
/// CLOSE, LOGOUT) and, for capability purposes, by the TLS upgrade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnState {
    /// The connection has been established but nothing else has happened.
    NotAuthenticated,
    /// The client has authenticated but no mailbox is selected.
    Authenticated,
    /// A mailbox is selected; message-level commands are available.
    Selected,
    /// A LOGOUT has been requested (or the server is shutting the
    /// connection down); only the connection teardown remains.
    Logout,
}

/// Command names defined by RFC 3501, as the dispatcher and the client spell
/// them on the wire.
pub mod names {
    /// CAPABILITY, any state.
    pub const CAPABILITY: &str = "CAPABILITY";
    /// NOOP, any state.
    pub const NOOP: &str = "NOOP";
    /// LOGOUT, any state.
    pub const LOGOUT: &str = "LOGOUT";
    /// STARTTLS, not-authenticated state.
    pub const STARTTLS: &str = "STARTTLS";
    /// LOGIN, not-authenticated state.
    pub const LOGIN: &str = "LOGIN";
    /// AUTHENTICATE, not-authenticated state.
    pub const AUTHENTICATE: &str = "AUTHENTICATE";
    /// SELECT, authenticated state.
    pub const SELECT: &str = "SELECT";
    /// EXAMINE, authenticated state.
    pub const EXAMINE: &str = "EXAMINE";
    /// CREATE, authenticated state.
    pub const CREATE: &str = "CREATE";
    /// DELETE, authenticated state.
    pub const DELETE: &str = "DELETE";
    /// RENAME, authenticated state.
    pub const RENAME: &str = "RENAME";
    /// SUBSCRIBE, authenticated state.
    pub const SUBSCRIBE: &str = "SUBSCRIBE";
    /// UNSUBSCRIBE, authenticated state.
    pub const UNSUBSCRIBE: &str = "UNSUBSCRIBE";
    /// LIST, authenticated state.
    pub const LIST: &str = "LIST";
    /// LSUB, authenticated state.
    pub const LSUB: &str = "LSUB";
    /// STATUS, authenticated state.
    pub const STATUS: &str = "STATUS";
    /// APPEND, authenticated state.
    pub const APPEND: &str = "APPEND";
    /// CHECK, selected state.
    pub const CHECK: &str = "CHECK";
    /// CLOSE, selected state.
    pub const CLOSE: &str = "CLOSE";
    /// EXPUNGE, selected state.
    pub const EXPUNGE: &str = "EXPUNGE";
    /// SEARCH, selected state.
    pub const SEARCH: &str = "SEARCH";
    /// FETCH, selected state.
    pub const FETCH: &str = "FETCH";
    /// STORE, selected state.
    pub const STORE: &str = "STORE";
    /// COPY, selected state.
    pub const COPY: &str = "COPY";
    /// UID, selected state; prefixes FETCH, SEARCH, STORE and COPY.
    pub const UID: &str = "UID";
}
