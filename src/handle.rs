//! Routing untagged responses to interested consumers.
//!
//! While a command is in flight, every incoming untagged response is offered
//! to the command's handler first. The handler either consumes it or hands
//! it back, and anything handed back falls through to the connection's
//! unsolicited sink. Exactly one consumer sees each response.

use crate::error::Result;
use crate::response::{Resp, Response};
use crate::value::Value;

/// What a handler did with an offered response.
#[derive(Debug)]
pub enum Handling {
    /// The handler consumed the response; keep reading.
    Accepted,
    /// The response was not for this handler; route it elsewhere. Ownership
    /// travels back with the rejection.
    Rejected(Response),
}

/// A consumer of untagged responses, installed for the duration of one
/// command.
pub trait ResponseHandler {
    /// Offer one response to this handler.
    fn handle_resp(&mut self, resp: Response) -> Result<Handling>;
}

/// Accept `resp` if it is a data response whose first field equals `name`
/// (ASCII-case-insensitively), yielding the remaining fields. Everything
/// else is handed back for further routing.
///
/// Responses that lead with a message number (`* 2 FETCH …`, `* 3 EXPUNGE`)
/// carry their name in the second field; their handlers match manually.
pub fn accept_named(resp: Response, name: &str) -> std::result::Result<Vec<Value>, Response> {
    match resp {
        Response::Data(Resp { mut fields }) if !fields.is_empty() && fields[0].eq_keyword(name) => {
            fields.remove(0);
            Ok(fields)
        }
        other => Err(other),
    }
}

/// A handler for commands that stream nothing: every response is rejected
/// and ends up at the unsolicited sink.
pub struct RejectAll;

impl ResponseHandler for RejectAll {
    fn handle_resp(&mut self, resp: Response) -> Result<Handling> {
        Ok(Handling::Rejected(resp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_named_matches_the_leading_field() {
        let resp = Response::Data(Resp::new(vec![
            Value::Atom("SEARCH".into()),
            Value::Number(2),
            Value::Number(84),
        ]));
        let fields = accept_named(resp, "SEARCH").unwrap();
        assert_eq!(fields, vec![Value::Number(2), Value::Number(84)]);
    }

    #[test]
    fn accept_named_hands_back_everything_else() {
        let resp = Response::Data(Resp::new(vec![
            Value::Number(3),
            Value::Atom("EXPUNGE".into()),
        ]));
        assert!(accept_named(resp, "SEARCH").is_err());
    }
}
