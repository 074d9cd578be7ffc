//! Typed handlers and formatters for the untagged responses that carry
//! command results.
//!
//! Each type here plays both sides of the wire: as a
//! [`ResponseHandler`](crate::handle::ResponseHandler) it decodes the
//! responses a client receives while its command is in flight, and its
//! formatting functions build the same responses for the server to send.
//! Streaming families (LIST, FETCH, EXPUNGE) push decoded items into a
//! bounded channel supplied by the caller, which is where the consumer
//! applies backpressure.

mod fetch;
mod list;
mod select;

pub use self::fetch::{fetch_resp, Fetch};
pub use self::list::{list_resp, List};
pub use self::select::{select_responses, Select};

use std::sync::mpsc;

use crate::error::Result;
use crate::handle::{accept_named, Handling, ResponseHandler};
use crate::mailbox::MailboxStatus;
use crate::names;
use crate::response::{Resp, Response};
use crate::value::Value;

/// Collects `* CAPABILITY` responses.
#[derive(Default)]
pub struct Capability {
    /// The capability names announced by the server.
    pub caps: Vec<String>,
}

impl ResponseHandler for Capability {
    fn handle_resp(&mut self, resp: Response) -> Result<Handling> {
        match accept_named(resp, names::CAPABILITY) {
            Ok(fields) => {
                for field in fields {
                    self.caps.push(field.expect_text("a capability")?.into_owned());
                }
                Ok(Handling::Accepted)
            }
            Err(resp) => Ok(Handling::Rejected(resp)),
        }
    }
}

/// Build a `* CAPABILITY` response.
pub fn capability_resp(caps: &[String]) -> Resp {
    let mut fields = vec![Value::Atom(names::CAPABILITY.into())];
    fields.extend(caps.iter().map(|c| Value::Atom(c.clone())));
    Resp::new(fields)
}

/// Streams `* <n> EXPUNGE` sequence numbers into the caller's channel.
pub struct Expunge {
    /// Where expunged sequence numbers are delivered, in wire order.
    pub seq_nums: mpsc::SyncSender<u32>,
}

impl ResponseHandler for Expunge {
    fn handle_resp(&mut self, resp: Response) -> Result<Handling> {
        if let Response::Data(data) = &resp {
            if data.fields.len() == 2 && data.fields[1].eq_keyword(names::EXPUNGE) {
                let seq_num = data.fields[0].expect_number("an EXPUNGE sequence number")?;
                self.seq_nums.send(seq_num)?;
                return Ok(Handling::Accepted);
            }
        }
        Ok(Handling::Rejected(resp))
    }
}

/// Build a `* <n> EXPUNGE` response.
pub fn expunge_resp(seq_num: u32) -> Resp {
    Resp::new(vec![
        Value::Number(seq_num),
        Value::Atom(names::EXPUNGE.into()),
    ])
}

/// Collects `* SEARCH` result identifiers.
#[derive(Default)]
pub struct Search {
    /// The matching sequence numbers (or UIDs, for `UID SEARCH`).
    pub ids: Vec<u32>,
}

impl ResponseHandler for Search {
    fn handle_resp(&mut self, resp: Response) -> Result<Handling> {
        match accept_named(resp, names::SEARCH) {
            Ok(fields) => {
                for field in fields {
                    self.ids.push(field.expect_number("a SEARCH result")?);
                }
                Ok(Handling::Accepted)
            }
            Err(resp) => Ok(Handling::Rejected(resp)),
        }
    }
}

/// Build a `* SEARCH` response.
pub fn search_resp(ids: &[u32]) -> Resp {
    let mut fields = vec![Value::Atom(names::SEARCH.into())];
    fields.extend(ids.iter().map(|id| Value::Number(*id)));
    Resp::new(fields)
}

/// Collects one `* STATUS` response.
#[derive(Default)]
pub struct Status {
    /// The decoded mailbox status.
    pub mailbox: MailboxStatus,
}

impl ResponseHandler for Status {
    fn handle_resp(&mut self, resp: Response) -> Result<Handling> {
        match accept_named(resp, names::STATUS) {
            Ok(mut fields) => {
                if fields.len() < 2 {
                    return Ok(Handling::Accepted);
                }
                let items = fields.pop().unwrap();
                let name = fields.remove(0);
                self.mailbox.name = name.expect_text("a mailbox name")?.into_owned();
                self.mailbox
                    .parse_items(items.expect_list("a STATUS item list")?)?;
                Ok(Handling::Accepted)
            }
            Err(resp) => Ok(Handling::Rejected(resp)),
        }
    }
}

/// Build a `* STATUS` response for the requested items.
pub fn status_resp(status: &MailboxStatus, items: &[String]) -> Resp {
    Resp::new(vec![
        Value::Atom(names::STATUS.into()),
        Value::string(status.name.clone()),
        Value::List(status.format_items(items)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_round_trip() {
        let resp = Response::Data(search_resp(&[2, 84, 882]));
        let mut handler = Search::default();
        match handler.handle_resp(resp).unwrap() {
            Handling::Accepted => {}
            other => panic!("rejected: {:?}", other),
        }
        assert_eq!(handler.ids, vec![2, 84, 882]);
    }

    #[test]
    fn expunge_streams_in_order() {
        let (tx, rx) = mpsc::sync_channel(4);
        let mut handler = Expunge { seq_nums: tx };
        for n in &[3, 3, 5, 8] {
            handler
                .handle_resp(Response::Data(expunge_resp(*n)))
                .unwrap();
        }
        drop(handler);
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![3, 3, 5, 8]);
    }

    #[test]
    fn status_round_trip() {
        let mut status = MailboxStatus::new("blurdybloop");
        status.messages = 231;
        status.uid_next = 44292;

        let items = vec!["MESSAGES".to_string(), "UIDNEXT".to_string()];
        let resp = Response::Data(status_resp(&status, &items));

        let mut handler = Status::default();
        handler.handle_resp(resp).unwrap();
        assert_eq!(handler.mailbox.name, "blurdybloop");
        assert_eq!(handler.mailbox.messages, 231);
        assert_eq!(handler.mailbox.uid_next, 44292);
    }
}
