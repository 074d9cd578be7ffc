//! Typed parse/format pairs for the RFC 3501 commands, grouped by the
//! connection state that permits them. The client formats these into
//! [`Command`](crate::command::Command)s; the server parses received
//! argument fields back into them.

mod any;
mod auth;
mod noauth;
mod selected;

pub(crate) use self::any::{Capability, Logout, Noop};
pub(crate) use self::auth::{
    Append, Create, Delete, List, Rename, Select, Status, Subscribe, Unsubscribe,
};
pub(crate) use self::noauth::{Authenticate, Login, StartTls};
pub(crate) use self::selected::{Check, Close, Copy, Expunge, Fetch, Search, Store, Uid};
