use crate::error::Result;
use crate::flag::Flag;
use crate::handle::{Handling, ResponseHandler};
use crate::mailbox::MailboxStatus;
use crate::response::{Resp, Response, StatusResp, StatusRespCode, StatusRespType};
use crate::value::Value;

/// Accumulates the untagged responses of SELECT and EXAMINE into a
/// [`MailboxStatus`]: FLAGS, EXISTS and RECENT data plus the untagged OK
/// statuses carrying UNSEEN, PERMANENTFLAGS, UIDNEXT and UIDVALIDITY.
///
/// See [RFC 3501 section 6.3.1](https://tools.ietf.org/html/rfc3501#section-6.3.1).
#[derive(Default)]
pub struct Select {
    /// The status being assembled.
    pub mailbox: MailboxStatus,
}

impl ResponseHandler for Select {
    fn handle_resp(&mut self, resp: Response) -> Result<Handling> {
        match &resp {
            Response::Data(data) => {
                if data.fields.len() == 2 && data.fields[0].eq_keyword("FLAGS") {
                    self.mailbox.flags = Flag::list_from_value(&data.fields[1])?;
                    return Ok(Handling::Accepted);
                }
                if data.fields.len() == 2 {
                    if let Some(n) = data.fields[0].as_number() {
                        if data.fields[1].eq_keyword("EXISTS") {
                            self.mailbox.messages = n;
                            return Ok(Handling::Accepted);
                        }
                        if data.fields[1].eq_keyword("RECENT") {
                            self.mailbox.recent = n;
                            return Ok(Handling::Accepted);
                        }
                    }
                }
            }
            Response::Status(status)
                if status.tag == "*" && status.typ == StatusRespType::Ok =>
            {
                match &status.code {
                    Some(StatusRespCode::Unseen) => {
                        self.mailbox.unseen = first_number(&status.arguments);
                        return Ok(Handling::Accepted);
                    }
                    Some(StatusRespCode::PermanentFlags) => {
                        if let Some(flags) = status.arguments.first() {
                            self.mailbox.permanent_flags = Flag::list_from_value(flags)?;
                        }
                        return Ok(Handling::Accepted);
                    }
                    Some(StatusRespCode::UidNext) => {
                        self.mailbox.uid_next = first_number(&status.arguments).unwrap_or(0);
                        return Ok(Handling::Accepted);
                    }
                    Some(StatusRespCode::UidValidity) => {
                        self.mailbox.uid_validity =
                            first_number(&status.arguments).unwrap_or(0);
                        return Ok(Handling::Accepted);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        Ok(Handling::Rejected(resp))
    }
}

fn first_number(arguments: &[Value]) -> Option<u32> {
    arguments.first().and_then(|v| v.as_number())
}

/// Build the standard untagged response sequence of a SELECT or EXAMINE,
/// in the order RFC 3501 shows it: FLAGS, EXISTS, RECENT, then the OK
/// statuses for UNSEEN (when known), PERMANENTFLAGS, UIDNEXT and
/// UIDVALIDITY.
pub fn select_responses(mailbox: &MailboxStatus) -> Vec<Response> {
    let mut out = Vec::with_capacity(7);

    out.push(Response::Data(Resp::new(vec![
        Value::Atom("FLAGS".into()),
        Flag::list_to_value(&mailbox.flags),
    ])));
    out.push(Response::Data(Resp::new(vec![
        Value::Number(mailbox.messages),
        Value::Atom("EXISTS".into()),
    ])));
    out.push(Response::Data(Resp::new(vec![
        Value::Number(mailbox.recent),
        Value::Atom("RECENT".into()),
    ])));

    if let Some(unseen) = mailbox.unseen {
        out.push(Response::Status(
            StatusResp::ok(&format!("Message {} is first unseen", unseen))
                .with_code(StatusRespCode::Unseen, vec![Value::Number(unseen)]),
        ));
    }
    out.push(Response::Status(
        StatusResp::ok("Flags permitted").with_code(
            StatusRespCode::PermanentFlags,
            vec![Flag::list_to_value(&mailbox.permanent_flags)],
        ),
    ));
    out.push(Response::Status(
        StatusResp::ok("Predicted next UID").with_code(
            StatusRespCode::UidNext,
            vec![Value::Number(mailbox.uid_next)],
        ),
    ));
    out.push(Response::Status(
        StatusResp::ok("UIDs valid").with_code(
            StatusRespCode::UidValidity,
            vec![Value::Number(mailbox.uid_validity)],
        ),
    ));
    out
}
