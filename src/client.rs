use std::collections::HashSet;
use std::io::{BufRead, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc;

use bufstream::BufStream;

use crate::authenticator::Authenticator;
use crate::command::Command;
use crate::commands;
use crate::error::{Error, ParseError, Result, ValidateError};
use crate::flag::{Flag, FlagsOp};
use crate::handle::{Handling, RejectAll, ResponseHandler};
use crate::mailbox::{MailboxInfo, MailboxStatus};
use crate::message::Message;
use crate::names;
use crate::read::Reader;
use crate::response::{Resp, Response, StatusResp, StatusRespCode, StatusRespType};
use crate::responses;
use crate::seq_set::SeqSet;
use crate::value::Value;
use crate::write::Writer;
use crate::ConnState;

static TAG_PREFIX: &str = "a";

/// A server response that was not claimed by any in-flight command and
/// instead updated (and is reported through) the connection-level
/// unsolicited channel.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum UnsolicitedResponse {
    /// `* <n> EXISTS`: the selected mailbox now holds `n` messages.
    Exists(u32),
    /// `* <n> RECENT`: `n` messages carry `\Recent`.
    Recent(u32),
    /// `* <n> EXPUNGE`: the message at sequence number `n` is gone.
    Expunge(u32),
    /// `* FLAGS (...)`: the flags applicable in the selected mailbox.
    Flags(Vec<Flag>),
    /// `* CAPABILITY ...`: the server's capability list changed.
    Capabilities(Vec<String>),
    /// `* BYE ...`: the server is closing the session.
    Bye(String),
    /// Anything else the connection did not interpret.
    Other(Response),
}

/// A synchronous IMAP client over any duplex byte stream.
///
/// One [`Command`] is outstanding at a time: [`Client::execute`]-driven
/// methods write the command (suspending at each literal until the
/// server's `+` continuation arrives), then read responses until the
/// matching tagged status, offering every untagged response first to the
/// command's handler and then to the unsolicited sink.
pub struct Client<T: Read + Write> {
    stream: BufStream<T>,
    tag: u32,
    state: ConnState,
    mailbox: Option<MailboxStatus>,
    capabilities: HashSet<String>,
    greeting_read: bool,
    unsolicited_tx: mpsc::Sender<UnsolicitedResponse>,
    /// Unsolicited responses observed on this connection, in arrival
    /// order. Reading this channel is optional; it is never blocking for
    /// the connection.
    pub unsolicited_responses: mpsc::Receiver<UnsolicitedResponse>,
}

impl Client<TcpStream> {
    /// Connect over plain TCP and read the server greeting.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Client<TcpStream>> {
        let stream = TcpStream::connect(addr)?;
        let mut client = Client::new(stream);
        client.read_greeting()?;
        Ok(client)
    }
}

impl<T: Read + Write> Client<T> {
    /// Wrap an established stream. The greeting has not been read yet;
    /// call [`Client::read_greeting`] before issuing commands.
    pub fn new(stream: T) -> Client<T> {
        let (unsolicited_tx, unsolicited_responses) = mpsc::channel();
        Client {
            stream: BufStream::new(stream),
            tag: 0,
            state: ConnState::NotAuthenticated,
            mailbox: None,
            capabilities: HashSet::new(),
            greeting_read: false,
            unsolicited_tx,
            unsolicited_responses,
        }
    }

    /// Wrap a stream whose greeting was already consumed (the STARTTLS
    /// path of the builder).
    pub(crate) fn new_upgraded(stream: T) -> Client<T> {
        let mut client = Client::new(stream);
        client.greeting_read = true;
        client
    }

    /// The connection state, as tracked from this side of the wire.
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// The currently selected mailbox, if any.
    pub fn mailbox(&self) -> Option<&MailboxStatus> {
        self.mailbox.as_ref()
    }

    /// The most recently announced capability set.
    pub fn capabilities(&self) -> &HashSet<String> {
        &self.capabilities
    }

    /// Read the server greeting: an untagged OK (or PREAUTH, which skips
    /// straight to the authenticated state), possibly carrying the
    /// capability list as a response code.
    pub fn read_greeting(&mut self) -> Result<()> {
        if self.greeting_read {
            return Err(Error::GreetingAlreadyRead);
        }

        match self.read_response()? {
            Response::Status(status) if status.tag == "*" => {
                self.note_status(&status);
                match status.typ {
                    StatusRespType::Ok => self.state = ConnState::NotAuthenticated,
                    StatusRespType::PreAuth => self.state = ConnState::Authenticated,
                    StatusRespType::Bye => return Err(Error::Bye(status.info)),
                    _ => {
                        return Err(ParseError::Unexpected(format!(
                            "greeting is a {} status",
                            status.typ
                        ))
                        .into())
                    }
                }
            }
            other => {
                return Err(ParseError::Unexpected(format!("greeting {:?}", other)).into())
            }
        }
        self.greeting_read = true;
        Ok(())
    }

    /// Issue a tagged command and route its responses: untagged ones to
    /// `handler` (rejections fall through to the unsolicited sink), the
    /// matching tagged status back to the caller.
    fn execute<H: ResponseHandler>(
        &mut self,
        mut cmd: Command,
        handler: &mut H,
    ) -> Result<StatusResp> {
        cmd.tag = self.next_tag();

        let pending = self.send_command(&cmd)?;
        for resp in pending {
            self.dispatch(resp, handler)?;
        }

        loop {
            match self.read_response()? {
                Response::Status(status) if status.tag == cmd.tag => {
                    self.note_status(&status);
                    return Ok(status);
                }
                resp => self.dispatch(resp, handler)?,
            }
        }
    }

    fn run_command_and_check_ok(&mut self, cmd: Command) -> Result<()> {
        self.execute(cmd, &mut RejectAll)?.err()
    }

    fn next_tag(&mut self) -> String {
        self.tag += 1;
        format!("{}{}", TAG_PREFIX, self.tag)
    }

    // Write one command line. Any literal suspends the write until the
    // server's continuation arrives; untagged responses read while waiting
    // are returned for routing.
    fn send_command(&mut self, cmd: &Command) -> Result<Vec<Response>> {
        let fields = cmd.fields();
        let mut pending = Vec::new();
        let mut writer = Writer::new(&mut self.stream);
        writer.write_fields_with(&fields, &mut |stream| {
            wait_for_continuation(stream, &mut pending)
        })?;
        writer.end_line()?;
        Ok(pending)
    }

    fn read_response(&mut self) -> Result<Response> {
        let mut reader = Reader::new(&mut self.stream);
        Response::read_from(&mut reader)
    }

    fn dispatch<H: ResponseHandler>(&mut self, resp: Response, handler: &mut H) -> Result<()> {
        match handler.handle_resp(resp)? {
            Handling::Accepted => Ok(()),
            Handling::Rejected(resp) => {
                self.unsolicited(resp);
                Ok(())
            }
        }
    }

    fn note_status(&mut self, status: &StatusResp) {
        if status.code == Some(StatusRespCode::Capability) {
            self.capabilities = text_set(&status.arguments);
        }
    }

    // The connection-level sink for responses no handler claimed.
    fn unsolicited(&mut self, resp: Response) {
        let unsolicited = match resp {
            Response::Data(data) => self.unsolicited_data(data),
            Response::Status(status) if status.tag == "*" => {
                self.note_status(&status);
                match status.typ {
                    StatusRespType::Bye => {
                        self.state = ConnState::Logout;
                        UnsolicitedResponse::Bye(status.info)
                    }
                    _ => UnsolicitedResponse::Other(Response::Status(status)),
                }
            }
            other => UnsolicitedResponse::Other(other),
        };
        let _ = self.unsolicited_tx.send(unsolicited);
    }

    fn unsolicited_data(&mut self, data: Resp) -> UnsolicitedResponse {
        if data.fields.len() == 2 {
            if let Some(n) = data.fields[0].as_number() {
                if data.fields[1].eq_keyword("EXISTS") {
                    if let Some(mailbox) = &mut self.mailbox {
                        mailbox.messages = n;
                    }
                    return UnsolicitedResponse::Exists(n);
                }
                if data.fields[1].eq_keyword("RECENT") {
                    if let Some(mailbox) = &mut self.mailbox {
                        mailbox.recent = n;
                    }
                    return UnsolicitedResponse::Recent(n);
                }
                if data.fields[1].eq_keyword(names::EXPUNGE) {
                    if let Some(mailbox) = &mut self.mailbox {
                        mailbox.messages = mailbox.messages.saturating_sub(1);
                    }
                    return UnsolicitedResponse::Expunge(n);
                }
            }
        }
        if !data.fields.is_empty() && data.fields[0].eq_keyword(names::CAPABILITY) {
            self.capabilities = text_set(&data.fields[1..]);
            let mut caps: Vec<String> = self.capabilities.iter().cloned().collect();
            caps.sort();
            return UnsolicitedResponse::Capabilities(caps);
        }
        if data.fields.len() == 2 && data.fields[0].eq_keyword("FLAGS") {
            if let Ok(flags) = Flag::list_from_value(&data.fields[1]) {
                if let Some(mailbox) = &mut self.mailbox {
                    mailbox.flags = flags.clone();
                }
                return UnsolicitedResponse::Flags(flags);
            }
        }
        UnsolicitedResponse::Other(Response::Data(data))
    }

    fn check_state(&self, wanted: &[ConnState], action: &'static str) -> Result<()> {
        if wanted.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::No(format!("{}: connection is in the wrong state", action)))
        }
    }

    // --- any state ---

    /// Request the server's capability list.
    pub fn capability(&mut self) -> Result<Vec<String>> {
        let mut handler = responses::Capability::default();
        self.execute(commands::Capability.command(), &mut handler)?
            .err()?;
        self.capabilities = handler.caps.iter().cloned().collect();
        Ok(handler.caps)
    }

    /// Do nothing, but give the server a chance to deliver unsolicited
    /// updates.
    pub fn noop(&mut self) -> Result<()> {
        self.run_command_and_check_ok(commands::Noop.command())
    }

    /// End the session. The server replies with an untagged BYE before
    /// the tagged OK.
    pub fn logout(&mut self) -> Result<()> {
        self.run_command_and_check_ok(commands::Logout.command())?;
        self.state = ConnState::Logout;
        self.mailbox = None;
        Ok(())
    }

    // --- not-authenticated state ---

    /// Authenticate with a plaintext username and password.
    pub fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.check_state(&[ConnState::NotAuthenticated], names::LOGIN)?;
        let cmd = commands::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.run_command_and_check_ok(cmd.command())?;
        self.state = ConnState::Authenticated;
        Ok(())
    }

    /// Authenticate with a SASL mechanism, driving the base64 challenge
    /// exchange over continuation lines.
    pub fn authenticate<A: Authenticator>(
        &mut self,
        mechanism: &str,
        authenticator: &A,
    ) -> Result<()> {
        self.check_state(&[ConnState::NotAuthenticated], names::AUTHENTICATE)?;
        if let Some(bad) = mechanism
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(Error::Validate(ValidateError(bad)));
        }

        let mut cmd = commands::Authenticate {
            mechanism: mechanism.to_string(),
        }
        .command();
        cmd.tag = self.next_tag();
        self.send_command(&cmd)?;

        loop {
            match self.read_response()? {
                Response::Continuation(cont) => {
                    let challenge = base64::decode(cont.info.trim()).map_err(|e| {
                        ParseError::Authentication(cont.info.clone(), Some(e))
                    })?;
                    let response = authenticator.process(&challenge);
                    let encoded = base64::encode(response.as_ref());
                    let mut writer = Writer::new(&mut self.stream);
                    writer.write_raw(&encoded)?;
                    writer.end_line()?;
                }
                Response::Status(status) if status.tag == cmd.tag => {
                    self.note_status(&status);
                    status.err()?;
                    self.state = ConnState::Authenticated;
                    return Ok(());
                }
                resp => self.dispatch(resp, &mut RejectAll)?,
            }
        }
    }

    // --- authenticated state ---

    /// Select a mailbox for read-write access.
    pub fn select(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.do_select(mailbox, false)
    }

    /// Select a mailbox for read-only access.
    pub fn examine(&mut self, mailbox: &str) -> Result<MailboxStatus> {
        self.do_select(mailbox, true)
    }

    fn do_select(&mut self, mailbox: &str, read_only: bool) -> Result<MailboxStatus> {
        self.check_state(
            &[ConnState::Authenticated, ConnState::Selected],
            names::SELECT,
        )?;

        // attempting a new selection ends the old one, even on failure
        if self.state == ConnState::Selected {
            self.state = ConnState::Authenticated;
            self.mailbox = None;
        }

        let cmd = commands::Select {
            mailbox: mailbox.to_string(),
        };
        let mut handler = responses::Select::default();
        let status = self.execute(cmd.command(read_only), &mut handler)?;
        status.err()?;

        let mut selected = handler.mailbox;
        selected.name = mailbox.to_string();
        selected.read_only = read_only || status.code == Some(StatusRespCode::ReadOnly);

        self.state = ConnState::Selected;
        self.mailbox = Some(selected.clone());
        Ok(selected)
    }

    /// Create a mailbox.
    pub fn create(&mut self, mailbox: &str) -> Result<()> {
        self.run_command_and_check_ok(
            commands::Create {
                mailbox: mailbox.to_string(),
            }
            .command(),
        )
    }

    /// Permanently remove a mailbox.
    pub fn delete(&mut self, mailbox: &str) -> Result<()> {
        self.run_command_and_check_ok(
            commands::Delete {
                mailbox: mailbox.to_string(),
            }
            .command(),
        )
    }

    /// Rename a mailbox.
    pub fn rename(&mut self, existing: &str, new_name: &str) -> Result<()> {
        self.run_command_and_check_ok(
            commands::Rename {
                existing: existing.to_string(),
                new_name: new_name.to_string(),
            }
            .command(),
        )
    }

    /// Add a mailbox to the subscription list.
    pub fn subscribe(&mut self, mailbox: &str) -> Result<()> {
        self.run_command_and_check_ok(
            commands::Subscribe {
                mailbox: mailbox.to_string(),
            }
            .command(),
        )
    }

    /// Remove a mailbox from the subscription list.
    pub fn unsubscribe(&mut self, mailbox: &str) -> Result<()> {
        self.run_command_and_check_ok(
            commands::Unsubscribe {
                mailbox: mailbox.to_string(),
            }
            .command(),
        )
    }

    /// List mailboxes matching `pattern` under `reference`, streaming each
    /// row into `mailboxes` as it arrives. The channel closes when the
    /// command completes.
    pub fn list(
        &mut self,
        reference: &str,
        pattern: &str,
        mailboxes: mpsc::SyncSender<MailboxInfo>,
    ) -> Result<()> {
        self.do_list(reference, pattern, false, mailboxes)
    }

    /// Like [`Client::list`], but for the subscription list.
    pub fn lsub(
        &mut self,
        reference: &str,
        pattern: &str,
        mailboxes: mpsc::SyncSender<MailboxInfo>,
    ) -> Result<()> {
        self.do_list(reference, pattern, true, mailboxes)
    }

    fn do_list(
        &mut self,
        reference: &str,
        pattern: &str,
        subscribed: bool,
        mailboxes: mpsc::SyncSender<MailboxInfo>,
    ) -> Result<()> {
        let cmd = commands::List {
            reference: reference.to_string(),
            mailbox: pattern.to_string(),
            subscribed,
        };
        let mut handler = responses::List {
            mailboxes,
            subscribed,
        };
        self.execute(cmd.command(), &mut handler)?.err()
    }

    /// Request status items for a mailbox that need not be selected.
    pub fn status(&mut self, mailbox: &str, items: &[&str]) -> Result<MailboxStatus> {
        let cmd = commands::Status {
            mailbox: mailbox.to_string(),
            items: items.iter().map(|i| i.to_string()).collect(),
        };
        let mut handler = responses::Status::default();
        self.execute(cmd.command(), &mut handler)?.err()?;
        Ok(handler.mailbox)
    }

    /// Append a message to a mailbox. The message travels as a
    /// synchronizing literal.
    pub fn append(
        &mut self,
        mailbox: &str,
        flags: &[Flag],
        date: Option<chrono::DateTime<chrono::FixedOffset>>,
        message: &[u8],
    ) -> Result<()> {
        let cmd = commands::Append {
            mailbox: mailbox.to_string(),
            flags: flags.to_vec(),
            date,
            message: message.to_vec(),
        };
        self.run_command_and_check_ok(cmd.command())
    }

    // --- selected state ---

    /// Request a checkpoint of the selected mailbox.
    pub fn check(&mut self) -> Result<()> {
        self.run_command_and_check_ok(commands::Check.command())
    }

    /// Expunge silently and return to the authenticated state.
    pub fn close(&mut self) -> Result<()> {
        self.run_command_and_check_ok(commands::Close.command())?;
        self.state = ConnState::Authenticated;
        self.mailbox = None;
        Ok(())
    }

    /// Permanently remove all `\Deleted` messages, streaming each expunged
    /// sequence number into `seq_nums` in wire order.
    pub fn expunge(&mut self, seq_nums: mpsc::SyncSender<u32>) -> Result<()> {
        let mut handler = responses::Expunge { seq_nums };
        self.execute(commands::Expunge.command(), &mut handler)?
            .err()
    }

    /// Search the selected mailbox. `criteria` are raw search keys; the
    /// command always announces a UTF-8 charset. Returns matching
    /// sequence numbers.
    pub fn search(&mut self, criteria: Vec<Value>) -> Result<Vec<u32>> {
        self.do_search(false, criteria)
    }

    /// Like [`Client::search`], but matches and returns UIDs.
    pub fn uid_search(&mut self, criteria: Vec<Value>) -> Result<Vec<u32>> {
        self.do_search(true, criteria)
    }

    fn do_search(&mut self, uid: bool, criteria: Vec<Value>) -> Result<Vec<u32>> {
        let cmd = commands::Search {
            charset: Some("UTF-8".to_string()),
            criteria,
        }
        .command();
        let cmd = if uid { uid_command(cmd) } else { cmd };

        let mut handler = responses::Search::default();
        self.execute(cmd, &mut handler)?.err()?;
        Ok(handler.ids)
    }

    /// Fetch `items` for the messages in `seq_set`, streaming each decoded
    /// message into `messages` as it arrives.
    pub fn fetch(
        &mut self,
        seq_set: &SeqSet,
        items: &[&str],
        messages: mpsc::SyncSender<Message>,
    ) -> Result<()> {
        self.do_fetch(false, seq_set, items, messages)
    }

    /// Like [`Client::fetch`], but `seq_set` holds UIDs.
    pub fn uid_fetch(
        &mut self,
        seq_set: &SeqSet,
        items: &[&str],
        messages: mpsc::SyncSender<Message>,
    ) -> Result<()> {
        self.do_fetch(true, seq_set, items, messages)
    }

    fn do_fetch(
        &mut self,
        uid: bool,
        seq_set: &SeqSet,
        items: &[&str],
        messages: mpsc::SyncSender<Message>,
    ) -> Result<()> {
        let cmd = commands::Fetch {
            seq_set: seq_set.clone(),
            items: items.iter().map(|i| i.to_string()).collect(),
        }
        .command();
        let cmd = if uid { uid_command(cmd) } else { cmd };

        let mut handler = responses::Fetch { messages };
        self.execute(cmd, &mut handler)?.err()
    }

    /// Alter message flags. Unless `silent`, the server streams the
    /// updated messages into `updates`.
    pub fn store(
        &mut self,
        seq_set: &SeqSet,
        op: FlagsOp,
        silent: bool,
        flags: &[Flag],
        updates: Option<mpsc::SyncSender<Message>>,
    ) -> Result<()> {
        self.do_store(false, seq_set, op, silent, flags, updates)
    }

    /// Like [`Client::store`], but `seq_set` holds UIDs.
    pub fn uid_store(
        &mut self,
        seq_set: &SeqSet,
        op: FlagsOp,
        silent: bool,
        flags: &[Flag],
        updates: Option<mpsc::SyncSender<Message>>,
    ) -> Result<()> {
        self.do_store(true, seq_set, op, silent, flags, updates)
    }

    fn do_store(
        &mut self,
        uid: bool,
        seq_set: &SeqSet,
        op: FlagsOp,
        silent: bool,
        flags: &[Flag],
        updates: Option<mpsc::SyncSender<Message>>,
    ) -> Result<()> {
        let cmd = commands::Store {
            seq_set: seq_set.clone(),
            op,
            silent,
            flags: flags.to_vec(),
        }
        .command();
        let cmd = if uid { uid_command(cmd) } else { cmd };

        match updates {
            Some(messages) => {
                let mut handler = responses::Fetch { messages };
                self.execute(cmd, &mut handler)?.err()
            }
            None => self.run_command_and_check_ok(cmd),
        }
    }

    /// Copy the messages in `seq_set` to another mailbox.
    pub fn copy(&mut self, seq_set: &SeqSet, mailbox: &str) -> Result<()> {
        self.do_copy(false, seq_set, mailbox)
    }

    /// Like [`Client::copy`], but `seq_set` holds UIDs.
    pub fn uid_copy(&mut self, seq_set: &SeqSet, mailbox: &str) -> Result<()> {
        self.do_copy(true, seq_set, mailbox)
    }

    fn do_copy(&mut self, uid: bool, seq_set: &SeqSet, mailbox: &str) -> Result<()> {
        let cmd = commands::Copy {
            seq_set: seq_set.clone(),
            mailbox: mailbox.to_string(),
        }
        .command();
        let cmd = if uid { uid_command(cmd) } else { cmd };
        self.run_command_and_check_ok(cmd)
    }
}

fn uid_command(inner: Command) -> Command {
    commands::Uid {
        name: inner.name,
        arguments: inner.arguments,
    }
    .command()
}

fn text_set(fields: &[Value]) -> HashSet<String> {
    fields
        .iter()
        .filter_map(|f| f.as_text().map(|s| s.into_owned()))
        .collect()
}

// Consume responses until the server's `+` continuation. A tagged status
// here means the command was refused before its literal was accepted.
fn wait_for_continuation<S: BufRead + Write>(
    stream: &mut S,
    pending: &mut Vec<Response>,
) -> Result<()> {
    loop {
        let mut reader = Reader::new(&mut *stream);
        match Response::read_from(&mut reader)? {
            Response::Continuation(_) => return Ok(()),
            Response::Status(status) if status.tag != "*" => {
                status.err()?;
                return Err(ParseError::Unexpected(
                    "tagged status while waiting for a literal continuation".to_string(),
                )
                .into());
            }
            other => pending.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_stream::MockStream;

    fn client_with(response: &str) -> Client<MockStream> {
        Client::new(MockStream::new(response.as_bytes().to_vec()))
    }

    fn written(client: Client<MockStream>) -> String {
        let stream = client.stream.into_inner().ok().unwrap();
        String::from_utf8(stream.written_buf).unwrap()
    }

    #[test]
    fn read_greeting() {
        let mut client = client_with("* OK Dovecot ready.\r\n");
        client.read_greeting().unwrap();
        assert_eq!(client.state(), ConnState::NotAuthenticated);
        assert!(matches!(
            client.read_greeting(),
            Err(Error::GreetingAlreadyRead)
        ));
    }

    #[test]
    fn greeting_capabilities_and_preauth() {
        let mut client =
            client_with("* PREAUTH [CAPABILITY IMAP4rev1 XTEST] Logged in as anonymous\r\n");
        client.read_greeting().unwrap();
        assert_eq!(client.state(), ConnState::Authenticated);
        assert!(client.capabilities().contains("XTEST"));
    }

    #[test]
    fn greeting_bye() {
        let mut client = client_with("* BYE Too many connections\r\n");
        assert!(matches!(client.read_greeting(), Err(Error::Bye(_))));
    }

    #[test]
    fn tags_increment() {
        let mut client = client_with("");
        assert_eq!(client.next_tag(), "a1");
        assert_eq!(client.next_tag(), "a2");
    }

    #[test]
    fn check() {
        let mut client = client_with("a1 OK CHECK completed\r\n");
        client.check().unwrap();
        assert_eq!(written(client), "a1 CHECK\r\n");
    }

    #[test]
    fn close_returns_to_authenticated() {
        let mut client = client_with("a1 OK CLOSE completed\r\n");
        client.state = ConnState::Selected;
        client.mailbox = Some(MailboxStatus::new("INBOX"));

        client.close().unwrap();
        assert_eq!(client.state(), ConnState::Authenticated);
        assert!(client.mailbox().is_none());

        assert_eq!(written(client), "a1 CLOSE\r\n");
    }

    #[test]
    fn capability() {
        let mut client =
            client_with("* CAPABILITY IMAP4rev1 XTEST\r\na1 OK CAPABILITY completed\r\n");
        let caps = client.capability().unwrap();
        assert_eq!(caps, vec!["IMAP4rev1".to_string(), "XTEST".to_string()]);
        assert!(client.capabilities().contains("XTEST"));
        assert_eq!(written(client), "a1 CAPABILITY\r\n");
    }

    #[test]
    fn login_moves_to_authenticated() {
        let mut client = client_with("a1 OK LOGIN completed\r\n");
        client.login("user", "hello gopher").unwrap();
        assert_eq!(client.state(), ConnState::Authenticated);
        assert_eq!(written(client), "a1 LOGIN user \"hello gopher\"\r\n");
    }

    #[test]
    fn login_failure_stays_not_authenticated() {
        let mut client = client_with("a1 NO [AUTHENTICATIONFAILED] nope\r\n");
        assert!(matches!(client.login("user", "pw"), Err(Error::No(_))));
        assert_eq!(client.state(), ConnState::NotAuthenticated);
    }

    #[test]
    fn select_assembles_the_mailbox() {
        let response = "\
            * FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
            * 172 EXISTS\r\n\
            * 1 RECENT\r\n\
            * OK [UNSEEN 12] Message 12 is first unseen\r\n\
            * OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited\r\n\
            * OK [UIDNEXT 4392] Predicted next UID\r\n\
            * OK [UIDVALIDITY 3857529045] UIDs valid\r\n\
            a1 OK [READ-WRITE] SELECT completed\r\n";
        let mut client = client_with(response);
        client.state = ConnState::Authenticated;

        let mailbox = client.select("INBOX").unwrap();
        assert_eq!(mailbox.name, "INBOX");
        assert_eq!(mailbox.messages, 172);
        assert_eq!(mailbox.recent, 1);
        assert_eq!(mailbox.unseen, Some(12));
        assert_eq!(mailbox.uid_next, 4392);
        assert_eq!(mailbox.uid_validity, 3857529045);
        assert!(!mailbox.read_only);
        assert_eq!(client.state(), ConnState::Selected);
        assert_eq!(written(client), "a1 SELECT INBOX\r\n");
    }

    #[test]
    fn examine_is_read_only() {
        let response = "\
            * 0 EXISTS\r\n\
            * 0 RECENT\r\n\
            a1 OK [READ-ONLY] EXAMINE completed\r\n";
        let mut client = client_with(response);
        client.state = ConnState::Authenticated;

        let mailbox = client.examine("INBOX").unwrap();
        assert!(mailbox.read_only);
        assert_eq!(written(client), "a1 EXAMINE INBOX\r\n");
    }

    #[test]
    fn fetch_with_literal_bodies() {
        let response = "\
            * 2 FETCH (UID 42 BODY[] {16}\r\nI love potatoes.)\r\n\
            * 3 FETCH (UID 28 BODY[] {12}\r\nHello World!)\r\n\
            a1 OK FETCH completed\r\n";
        let mut client = client_with(response);
        client.state = ConnState::Selected;

        let (tx, rx) = mpsc::sync_channel(2);
        client
            .fetch(&SeqSet::new("2:3").unwrap(), &["UID", "BODY[]"], tx)
            .unwrap();

        let first = rx.recv().unwrap();
        assert_eq!(first.uid, Some(42));
        assert_eq!(first.body_section("BODY[]"), Some(&b"I love potatoes."[..]));

        let second = rx.recv().unwrap();
        assert_eq!(second.uid, Some(28));
        assert_eq!(second.body_section("BODY[]"), Some(&b"Hello World!"[..]));

        assert!(rx.recv().is_err());
        assert_eq!(written(client), "a1 FETCH 2:3 (UID BODY[])\r\n");
    }

    #[test]
    fn expunge_streams_in_wire_order() {
        let response = "\
            * 3 EXPUNGE\r\n\
            * 3 EXPUNGE\r\n\
            * 5 EXPUNGE\r\n\
            * 8 EXPUNGE\r\n\
            a1 OK EXPUNGE completed\r\n";
        let mut client = client_with(response);
        client.state = ConnState::Selected;

        let (tx, rx) = mpsc::sync_channel(4);
        client.expunge(tx).unwrap();
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![3, 3, 5, 8]);
        assert_eq!(written(client), "a1 EXPUNGE\r\n");
    }

    #[test]
    fn search_formats_criteria_and_parses_results() {
        let mut client = client_with("* SEARCH 2 84 882\r\na1 OK SEARCH completed\r\n");
        client.state = ConnState::Selected;

        let criteria = vec![
            Value::Atom("FLAGGED".into()),
            Value::Atom("SINCE".into()),
            Value::Atom("1-Feb-1994".into()),
            Value::Atom("NOT".into()),
            Value::Atom("FROM".into()),
            Value::Atom("Smith".into()),
        ];
        let results = client.search(criteria).unwrap();
        assert_eq!(results, vec![2, 84, 882]);
        assert_eq!(
            written(client),
            "a1 SEARCH CHARSET UTF-8 FLAGGED SINCE 1-Feb-1994 NOT FROM Smith\r\n"
        );
    }

    #[test]
    fn uid_prefix() {
        let mut client = client_with("* SEARCH 42\r\na1 OK UID SEARCH completed\r\n");
        client.state = ConnState::Selected;

        let results = client
            .uid_search(vec![Value::Atom("ALL".into())])
            .unwrap();
        assert_eq!(results, vec![42]);
        assert_eq!(written(client), "a1 UID SEARCH CHARSET UTF-8 ALL\r\n");
    }

    #[test]
    fn append_waits_for_the_continuation() {
        let mut client = client_with("+ send literal\r\na1 OK APPEND completed\r\n");
        client.state = ConnState::Authenticated;

        client
            .append("saved-messages", &[Flag::Seen], None, b"a message")
            .unwrap();
        assert_eq!(
            written(client),
            "a1 APPEND saved-messages (\\Seen) {9}\r\na message\r\n"
        );
    }

    #[test]
    fn unsolicited_updates_reach_the_sink() {
        let response = "\
            * 23 EXISTS\r\n\
            * 1 RECENT\r\n\
            a1 OK NOOP completed\r\n";
        let mut client = client_with(response);
        client.state = ConnState::Selected;
        client.mailbox = Some(MailboxStatus::new("INBOX"));

        client.noop().unwrap();
        assert_eq!(client.mailbox().unwrap().messages, 23);
        assert_eq!(client.mailbox().unwrap().recent, 1);
        assert_eq!(
            client.unsolicited_responses.try_iter().collect::<Vec<_>>(),
            vec![
                UnsolicitedResponse::Exists(23),
                UnsolicitedResponse::Recent(1)
            ]
        );
    }

    #[test]
    fn bye_moves_to_logout() {
        let mut client = client_with("* BYE server shutting down\r\na1 OK NOOP completed\r\n");
        client.greeting_read = true;
        client.noop().unwrap();
        assert_eq!(client.state(), ConnState::Logout);
    }

    #[test]
    fn store_silent() {
        let mut client = client_with("a1 OK STORE completed\r\n");
        client.state = ConnState::Selected;
        client
            .store(
                &SeqSet::new("2:4").unwrap(),
                FlagsOp::Add,
                true,
                &[Flag::Deleted],
                None,
            )
            .unwrap();
        assert_eq!(
            written(client),
            "a1 STORE 2:4 +FLAGS.SILENT (\\Deleted)\r\n"
        );
    }

    #[test]
    fn copy_command() {
        let mut client = client_with("a1 OK COPY completed\r\n");
        client.state = ConnState::Selected;
        client
            .copy(&SeqSet::new("2:4").unwrap(), "meeting minutes")
            .unwrap();
        assert_eq!(written(client), "a1 COPY 2:4 \"meeting minutes\"\r\n");
    }
}
