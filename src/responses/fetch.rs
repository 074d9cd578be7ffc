use std::sync::mpsc;

use crate::error::Result;
use crate::handle::{Handling, ResponseHandler};
use crate::message::Message;
use crate::names;
use crate::response::{Resp, Response};
use crate::value::Value;

/// Streams `* <n> FETCH (<items>)` responses into the caller's channel.
///
/// See [RFC 3501 section 7.4.2](https://tools.ietf.org/html/rfc3501#section-7.4.2).
pub struct Fetch {
    /// Where decoded messages are delivered.
    pub messages: mpsc::SyncSender<Message>,
}

impl ResponseHandler for Fetch {
    fn handle_resp(&mut self, resp: Response) -> Result<Handling> {
        let data = match &resp {
            Response::Data(data)
                if data.fields.len() >= 3 && data.fields[1].eq_keyword(names::FETCH) =>
            {
                data
            }
            _ => return Ok(Handling::Rejected(resp)),
        };

        let id = data.fields[0].expect_number("a FETCH sequence number")?;
        let items = data.fields[2].clone().expect_list("a FETCH item list")?;

        let mut msg = Message::new(id);
        msg.parse(items)?;
        self.messages.send(msg)?;
        Ok(Handling::Accepted)
    }
}

/// Build one `* <n> FETCH` response from the populated items of `msg`.
pub fn fetch_resp(msg: &Message) -> Resp {
    Resp::new(vec![
        Value::Number(msg.id),
        Value::Atom(names::FETCH.into()),
        Value::List(msg.fields()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::Flag;

    #[test]
    fn fetch_round_trip() {
        let mut msg = Message::new(2);
        msg.uid = Some(42);
        msg.flags = Some(vec![Flag::Seen]);
        msg.body
            .insert("BODY[]".to_string(), b"I love potatoes.".to_vec());

        let (tx, rx) = mpsc::sync_channel(1);
        let mut handler = Fetch { messages: tx };
        handler
            .handle_resp(Response::Data(fetch_resp(&msg)))
            .unwrap();

        let decoded = rx.recv().unwrap();
        assert_eq!(decoded.id, 2);
        assert_eq!(decoded.uid, Some(42));
        assert_eq!(
            decoded.body_section("BODY[]"),
            Some(&b"I love potatoes."[..])
        );
    }

    #[test]
    fn other_numbered_responses_are_rejected(){
        let (tx, _rx) = mpsc::sync_channel(1);
        let mut handler = Fetch { messages: tx };
        let resp = Response::Data(Resp::new(vec![
            Value::Number(3),
            Value::Atom("EXPUNGE".into()),
        ]));
        match handler.handle_resp(resp).unwrap() {
            Handling::Rejected(_) => {}
            other => panic!("accepted: {:?}", other),
        }
    }
}
