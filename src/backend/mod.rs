//! The contract between the server and its mailbox store.
//!
//! A [`Backend`] authenticates users; a [`User`] owns a mailbox hierarchy;
//! a [`Mailbox`] holds messages. The server never touches storage except
//! through these traits. [`memory`] is the built-in demo store used by the
//! test suite; real deployments implement their own.

pub mod backendutil;
pub mod memory;

use std::error::Error as StdError;
use std::fmt;
use std::sync::mpsc;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::flag::{Flag, FlagsOp};
use crate::mailbox::{MailboxInfo, MailboxStatus};
use crate::message::Message;
use crate::search::SearchCriteria;
use crate::seq_set::SeqSet;

/// An error reported by a backend operation. The server turns these into
/// tagged `NO` responses (with `[TRYCREATE]` where the command allows it).
#[derive(Debug)]
#[non_exhaustive]
pub enum BackendError {
    /// The username/password pair was not accepted.
    InvalidCredentials,
    /// The named mailbox does not exist.
    NoSuchMailbox(String),
    /// A mailbox with that name already exists.
    MailboxAlreadyExists(String),
    /// The operation is not allowed on this mailbox (INBOX deletion, a
    /// read-only store, ...).
    NotAllowed(&'static str),
    /// Anything else, described for the client.
    Custom(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::InvalidCredentials => f.write_str("Invalid credentials"),
            BackendError::NoSuchMailbox(name) => write!(f, "No such mailbox: {}", name),
            BackendError::MailboxAlreadyExists(name) => {
                write!(f, "Mailbox already exists: {}", name)
            }
            BackendError::NotAllowed(what) => f.write_str(what),
            BackendError::Custom(msg) => f.write_str(msg),
        }
    }
}

impl StdError for BackendError {}

/// A mail storage system that can authenticate users.
pub trait Backend: Send + Sync {
    /// Authenticate a user and return their storage handle.
    fn login(&self, username: &str, password: &str) -> Result<Arc<dyn User>, BackendError>;
}

/// A user in the mail storage system. A user operation always deals with
/// mailboxes.
pub trait User: Send + Sync {
    /// This user's name.
    fn username(&self) -> String;

    /// The user's mailboxes; with `subscribed_only`, just the subscribed
    /// ones.
    fn list_mailboxes(&self, subscribed_only: bool) -> Result<Vec<Arc<dyn Mailbox>>, BackendError>;

    /// Get a mailbox by name.
    fn get_mailbox(&self, name: &str) -> Result<Arc<dyn Mailbox>, BackendError>;

    /// Create a new mailbox.
    ///
    /// If the mailbox already exists, an error must be returned. A name
    /// suffixed with the hierarchy separator declares a parent for later
    /// names and creates the mailbox without the suffix. If the separator
    /// appears elsewhere in the name, missing superior names are created
    /// too: creating `foo/bar/zap` creates `foo` and `foo/bar` as needed.
    ///
    /// If a new mailbox is created with the same name as one that was
    /// deleted, its unique identifiers must be greater than any used in
    /// the previous incarnation, unless the new incarnation has a
    /// different UID validity value.
    fn create_mailbox(&self, name: &str) -> Result<(), BackendError>;

    /// Permanently remove the named mailbox. Deleting `INBOX` or a
    /// missing mailbox is an error, and inferior hierarchical names are
    /// left alone.
    ///
    /// The highest-used UID of the deleted mailbox must be preserved so
    /// a later mailbox with the same name does not reuse identifiers,
    /// unless it carries a different UID validity value.
    fn delete_mailbox(&self, name: &str) -> Result<(), BackendError>;

    /// Change the name of a mailbox; inferior hierarchical names are
    /// renamed along with it.
    ///
    /// Renaming `INBOX` is special: it moves all messages in `INBOX` to
    /// the new mailbox and leaves an empty `INBOX` behind.
    fn rename_mailbox(&self, existing: &str, new_name: &str) -> Result<(), BackendError>;
}

/// A single mailbox belonging to a user.
///
/// Implementations provide their own locking discipline: one user may have
/// the same mailbox selected on several connections at once.
pub trait Mailbox: Send + Sync {
    /// The mailbox name.
    fn name(&self) -> String;

    /// The LIST row for this mailbox.
    fn info(&self) -> Result<MailboxInfo, BackendError>;

    /// The current status counters.
    fn status(&self) -> Result<MailboxStatus, BackendError>;

    /// Add or remove this mailbox from the subscription list.
    fn set_subscribed(&self, subscribed: bool) -> Result<(), BackendError>;

    /// Request a checkpoint of this mailbox's state.
    fn check(&self) -> Result<(), BackendError>;

    /// Produce the requested items for every message in `seq_set`,
    /// sending each assembled [`Message`] into `messages`. The channel is
    /// bounded; a slow consumer applies backpressure here.
    fn list_messages(
        &self,
        uid: bool,
        seq_set: &SeqSet,
        items: &[String],
        messages: &mpsc::SyncSender<Message>,
    ) -> Result<(), BackendError>;

    /// Sequence numbers (or, with `uid`, UIDs) of the messages matching
    /// `criteria`.
    fn search_messages(
        &self,
        uid: bool,
        criteria: &SearchCriteria,
    ) -> Result<Vec<u32>, BackendError>;

    /// Append a message to this mailbox.
    fn create_message(
        &self,
        flags: &[Flag],
        date: Option<DateTime<FixedOffset>>,
        body: &[u8],
    ) -> Result<(), BackendError>;

    /// Apply a flag operation to the messages in `seq_set`. Unless the
    /// store was silent, each updated message (its flags item) is sent
    /// into `updates`.
    fn update_flags(
        &self,
        uid: bool,
        seq_set: &SeqSet,
        op: FlagsOp,
        flags: &[Flag],
        updates: Option<&mpsc::SyncSender<Message>>,
    ) -> Result<(), BackendError>;

    /// Copy the messages in `seq_set` to the end of `dest`, preserving
    /// flags and internal date.
    fn copy_messages(&self, uid: bool, seq_set: &SeqSet, dest: &str)
        -> Result<(), BackendError>;

    /// Permanently remove every message carrying `\Deleted`, reporting
    /// each removal's current sequence number into `expunged` (when
    /// given) in removal order.
    fn expunge(&self, expunged: Option<&mpsc::SyncSender<u32>>) -> Result<(), BackendError>;
}
