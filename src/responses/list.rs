use std::sync::mpsc;

use crate::error::Result;
use crate::handle::{accept_named, Handling, ResponseHandler};
use crate::mailbox::MailboxInfo;
use crate::names;
use crate::response::{Resp, Response};
use crate::value::Value;

/// Streams LIST (or, with `subscribed`, LSUB) rows into the caller's
/// channel.
///
/// See [RFC 3501 section 7.2.2](https://tools.ietf.org/html/rfc3501#section-7.2.2).
pub struct List {
    /// Where decoded rows are delivered.
    pub mailboxes: mpsc::SyncSender<MailboxInfo>,
    /// Match `LSUB` rows instead of `LIST` rows.
    pub subscribed: bool,
}

impl ResponseHandler for List {
    fn handle_resp(&mut self, resp: Response) -> Result<Handling> {
        let name = if self.subscribed {
            names::LSUB
        } else {
            names::LIST
        };
        match accept_named(resp, name) {
            Ok(fields) => {
                self.mailboxes.send(MailboxInfo::parse(fields)?)?;
                Ok(Handling::Accepted)
            }
            Err(resp) => Ok(Handling::Rejected(resp)),
        }
    }
}

/// Build one `* LIST` (or `* LSUB`) row.
pub fn list_resp(info: &MailboxInfo, subscribed: bool) -> Resp {
    let name = if subscribed { names::LSUB } else { names::LIST };
    let mut fields = vec![Value::Atom(name.into())];
    fields.extend(info.format());
    Resp::new(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::Flag;

    #[test]
    fn list_row_round_trip() {
        let info = MailboxInfo {
            flags: vec![Flag::from("\\Noselect")],
            delimiter: "/".to_string(),
            name: "foo".to_string(),
        };

        let (tx, rx) = mpsc::sync_channel(1);
        let mut handler = List {
            mailboxes: tx,
            subscribed: false,
        };
        handler
            .handle_resp(Response::Data(list_resp(&info, false)))
            .unwrap();
        assert_eq!(rx.recv().unwrap(), info);
    }

    #[test]
    fn lsub_rows_are_distinct() {
        let info = MailboxInfo {
            flags: Vec::new(),
            delimiter: "/".to_string(),
            name: "foo".to_string(),
        };

        let (tx, _rx) = mpsc::sync_channel(1);
        let mut handler = List {
            mailboxes: tx,
            subscribed: true,
        };
        // a LIST row is not for an LSUB handler
        match handler
            .handle_resp(Response::Data(list_resp(&info, false)))
            .unwrap()
        {
            Handling::Rejected(_) => {}
            other => panic!("accepted: {:?}", other),
        }
    }
}
