//! End-to-end tests: the crate's server (with the in-memory backend) on a
//! loopback listener, driven by the crate's client.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{mpsc, Arc};
use std::thread;

use imap_engine::authenticator;
use imap_engine::backend::memory::MemoryBackend;
use imap_engine::server::Server;
use imap_engine::{Client, ConnState, Error, Flag, FlagsOp, SeqSet, UnsolicitedResponse, Value};

const USER: &str = "mitsuha";
const PASSWORD: &str = "kimi no na wa";

const MAIL: &[u8] = b"From: Mitsuha Miyamizu <mitsuha.miyamizu@example.org>\r\n\
To: Taki Tachibana <taki.tachibana@example.org>\r\n\
Subject: your name.\r\n\
Date: Wed, 11 May 2016 14:31:59 +0000\r\n\
\r\n\
Who are you? I seem to remember your name.\r\n";

fn start_server() -> SocketAddr {
    start_server_with(Arc::new(MemoryBackend::with_user(USER, PASSWORD)))
}

fn start_server_with(backend: Arc<MemoryBackend>) -> SocketAddr {
    let server = Server::new(backend).allow_insecure_auth(true);
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let _ = Arc::new(server).serve(listener);
    });
    addr
}

fn session() -> Client<TcpStream> {
    let mut client = Client::connect(start_server()).unwrap();
    client.login(USER, PASSWORD).unwrap();
    client
}

#[test]
fn greeting_line() {
    let addr = start_server();
    let stream = TcpStream::connect(addr).unwrap();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    assert_eq!(
        line,
        "* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] IMAP4rev1 Service Ready\r\n"
    );
}

#[test]
fn capability() {
    let mut client = Client::connect(start_server()).unwrap();
    let caps = client.capability().unwrap();
    assert_eq!(caps, vec!["IMAP4rev1".to_string(), "AUTH=PLAIN".to_string()]);
    client.logout().unwrap();
    assert_eq!(client.state(), ConnState::Logout);
}

#[test]
fn login_rejects_bad_credentials() {
    let mut client = Client::connect(start_server()).unwrap();
    match client.login(USER, "wrong") {
        Err(Error::No(_)) => {}
        other => panic!("unexpected login result: {:?}", other),
    }
    client.login(USER, PASSWORD).unwrap();
    assert_eq!(client.state(), ConnState::Authenticated);
}

#[test]
fn login_with_a_literal_password() {
    let backend = Arc::new(MemoryBackend::with_user(USER, "päßword"));
    let mut client = Client::connect(start_server_with(backend)).unwrap();
    // the 8-bit password travels as a synchronizing literal, exercising
    // the server's mid-line continuation
    client.login(USER, "päßword").unwrap();
    assert_eq!(client.state(), ConnState::Authenticated);
}

#[test]
fn authenticate_plain() {
    let mut client = Client::connect(start_server()).unwrap();
    client
        .authenticate("PLAIN", &authenticator::Plain::new(USER, PASSWORD))
        .unwrap();
    assert_eq!(client.state(), ConnState::Authenticated);
}

#[test]
fn authenticate_unknown_mechanism() {
    let mut client = Client::connect(start_server()).unwrap();
    match client.authenticate("XOAUTH2", &authenticator::Plain::new(USER, PASSWORD)) {
        Err(Error::No(_)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn select_empty_inbox() {
    let mut client = session();
    let mailbox = client.select("INBOX").unwrap();
    assert_eq!(mailbox.messages, 0);
    assert_eq!(mailbox.recent, 0);
    assert_eq!(mailbox.uid_validity, 1);
    assert!(!mailbox.read_only);
    assert_eq!(client.state(), ConnState::Selected);

    let missing = client.select("no-such-mailbox");
    assert!(matches!(missing, Err(Error::No(_))));
    // a failed reselect leaves no mailbox selected
    assert!(client.mailbox().is_none());
}

#[test]
fn append_fetch_roundtrip() {
    let mut client = session();
    client.select("INBOX").unwrap();
    client.append("INBOX", &[Flag::Seen], None, MAIL).unwrap();

    let (tx, rx) = mpsc::sync_channel(4);
    client
        .fetch(
            &SeqSet::new("1").unwrap(),
            &["UID", "FLAGS", "RFC822.SIZE", "BODY[]"],
            tx,
        )
        .unwrap();

    let msg = rx.recv().unwrap();
    assert_eq!(msg.id, 1);
    assert_eq!(msg.uid, Some(1));
    assert_eq!(msg.size, Some(MAIL.len() as u32));
    assert!(msg.flags.as_ref().unwrap().contains(&Flag::Seen));
    assert_eq!(msg.body_section("BODY[]"), Some(MAIL));
    assert!(rx.recv().is_err());
}

#[test]
fn append_to_selected_mailbox_reports_exists() {
    let mut client = session();
    client.select("INBOX").unwrap();
    client.append("INBOX", &[], None, MAIL).unwrap();
    assert_eq!(client.mailbox().unwrap().messages, 1);
    assert!(client
        .unsolicited_responses
        .try_iter()
        .any(|u| u == UnsolicitedResponse::Exists(1)));
}

#[test]
fn append_to_missing_mailbox_suggests_create() {
    let mut client = session();
    match client.append("no-such-mailbox", &[], None, MAIL) {
        Err(Error::No(info)) => assert!(info.contains("No such mailbox")),
        other => panic!("unexpected append result: {:?}", other),
    }
}

#[test]
fn fetch_envelope_and_structure() {
    let mut client = session();
    client.select("INBOX").unwrap();
    client.append("INBOX", &[], None, MAIL).unwrap();

    let (tx, rx) = mpsc::sync_channel(1);
    client
        .fetch(
            &SeqSet::new("1").unwrap(),
            &["ENVELOPE", "BODYSTRUCTURE", "INTERNALDATE"],
            tx,
        )
        .unwrap();

    let msg = rx.recv().unwrap();
    let envelope = msg.envelope.unwrap();
    assert_eq!(envelope.subject.as_deref(), Some("your name."));
    assert_eq!(envelope.from[0].to_string(), "mitsuha.miyamizu@example.org");
    let bs = msg.body_structure.unwrap();
    assert_eq!(bs.mime_type, "text");
    assert!(msg.internal_date.is_some());
}

#[test]
fn search_returns_matches() {
    let mut client = session();
    client.select("INBOX").unwrap();
    client.append("INBOX", &[Flag::Seen], None, MAIL).unwrap();
    client.append("INBOX", &[], None, MAIL).unwrap();

    let unseen = client.search(vec![Value::Atom("UNSEEN".into())]).unwrap();
    assert_eq!(unseen, vec![2]);

    let from = client
        .search(vec![
            Value::Atom("FROM".into()),
            Value::Atom("Mitsuha".into()),
        ])
        .unwrap();
    assert_eq!(from, vec![1, 2]);

    let nobody = client
        .search(vec![
            Value::Atom("HEADER".into()),
            Value::Atom("Message-Id".into()),
            Value::Quoted("43@example.org".into()),
        ])
        .unwrap();
    assert!(nobody.is_empty());
}

#[test]
fn store_streams_updates_and_expunge_renumbers() {
    let mut client = session();
    client.select("INBOX").unwrap();
    for _ in 0..4 {
        client.append("INBOX", &[], None, MAIL).unwrap();
    }

    let (tx, rx) = mpsc::sync_channel(8);
    client
        .store(
            &SeqSet::new("1,3").unwrap(),
            FlagsOp::Add,
            false,
            &[Flag::Deleted],
            Some(tx),
        )
        .unwrap();
    let updated: Vec<_> = rx.iter().collect();
    assert_eq!(updated.len(), 2);
    assert!(updated
        .iter()
        .all(|m| m.flags.as_ref().unwrap().contains(&Flag::Deleted)));

    let (tx, rx) = mpsc::sync_channel(8);
    client.expunge(tx).unwrap();
    // the memory backend removes from the highest original position down
    assert_eq!(rx.iter().collect::<Vec<_>>(), vec![3, 1]);

    let left = client.search(vec![Value::Atom("ALL".into())]).unwrap();
    assert_eq!(left, vec![1, 2]);
}

#[test]
fn uid_commands() {
    let mut client = session();
    client.select("INBOX").unwrap();
    for _ in 0..3 {
        client.append("INBOX", &[], None, MAIL).unwrap();
    }

    // expunge the first message so UIDs and sequence numbers diverge
    client
        .store(
            &SeqSet::new("1").unwrap(),
            FlagsOp::Add,
            true,
            &[Flag::Deleted],
            None,
        )
        .unwrap();
    let (tx, rx) = mpsc::sync_channel(4);
    client.expunge(tx).unwrap();
    assert_eq!(rx.iter().collect::<Vec<_>>(), vec![1]);

    let uids = client.uid_search(vec![Value::Atom("ALL".into())]).unwrap();
    assert_eq!(uids, vec![2, 3]);

    let (tx, rx) = mpsc::sync_channel(4);
    client
        .uid_fetch(&SeqSet::new("3").unwrap(), &["FLAGS"], tx)
        .unwrap();
    let msgs: Vec<_> = rx.iter().collect();
    assert_eq!(msgs.len(), 1);
    // response identifiers remain sequence numbers; the UID rides along
    assert_eq!(msgs[0].id, 2);
    assert_eq!(msgs[0].uid, Some(3));
}

#[test]
fn mailbox_management() {
    let mut client = session();

    client.create("archive/2016/may").unwrap();
    assert!(matches!(
        client.create("archive/2016/may"),
        Err(Error::No(_))
    ));

    let (tx, rx) = mpsc::sync_channel(16);
    client.list("", "*", tx).unwrap();
    let names: Vec<String> = rx.iter().map(|info| info.name).collect();
    assert!(names.contains(&"INBOX".to_string()));
    assert!(names.contains(&"archive".to_string()));
    assert!(names.contains(&"archive/2016".to_string()));
    assert!(names.contains(&"archive/2016/may".to_string()));

    // a single-level wildcard stops at the hierarchy delimiter
    let (tx, rx) = mpsc::sync_channel(16);
    client.list("", "%", tx).unwrap();
    let names: Vec<String> = rx.iter().map(|info| info.name).collect();
    assert_eq!(names, vec!["INBOX".to_string(), "archive".to_string()]);

    // mixed patterns are rejected until their matching rules are settled
    let (tx, _rx) = mpsc::sync_channel(16);
    assert!(matches!(
        client.list("", "arch*ve", tx),
        Err(Error::Bad(_))
    ));

    client.rename("archive", "attic").unwrap();
    let status = client.status("attic/2016/may", &["MESSAGES"]).unwrap();
    assert_eq!(status.name, "attic/2016/may");

    client.delete("attic/2016/may").unwrap();
    assert!(matches!(
        client.status("attic/2016/may", &["MESSAGES"]),
        Err(Error::No(_))
    ));
    assert!(matches!(client.delete("INBOX"), Err(Error::No(_))));
}

#[test]
fn subscriptions_show_in_lsub() {
    let mut client = session();
    client.create("letters").unwrap();
    client.subscribe("letters").unwrap();

    let (tx, rx) = mpsc::sync_channel(16);
    client.lsub("", "*", tx).unwrap();
    let names: Vec<String> = rx.iter().map(|info| info.name).collect();
    assert_eq!(names, vec!["letters".to_string()]);

    client.unsubscribe("letters").unwrap();
    let (tx, rx) = mpsc::sync_channel(16);
    client.lsub("", "*", tx).unwrap();
    assert_eq!(rx.iter().count(), 0);
}

#[test]
fn copy_and_trycreate() {
    let mut client = session();
    client.select("INBOX").unwrap();
    client.append("INBOX", &[], None, MAIL).unwrap();

    assert!(matches!(
        client.copy(&SeqSet::new("1").unwrap(), "saved"),
        Err(Error::No(_))
    ));

    client.create("saved").unwrap();
    client.copy(&SeqSet::new("1").unwrap(), "saved").unwrap();
    let status = client.status("saved", &["MESSAGES"]).unwrap();
    assert_eq!(status.messages, 1);
}

#[test]
fn status_need_not_select() {
    let mut client = session();
    let status = client
        .status("INBOX", &["MESSAGES", "UIDNEXT", "UIDVALIDITY", "UNSEEN"])
        .unwrap();
    assert_eq!(status.name, "INBOX");
    assert_eq!(status.messages, 0);
    assert_eq!(status.uid_next, 1);
}

#[test]
fn close_returns_to_authenticated_and_expunges() {
    let mut client = session();
    client.select("INBOX").unwrap();
    client.append("INBOX", &[], None, MAIL).unwrap();
    client
        .store(
            &SeqSet::new("1").unwrap(),
            FlagsOp::Add,
            true,
            &[Flag::Deleted],
            None,
        )
        .unwrap();

    client.check().unwrap();
    client.close().unwrap();
    assert_eq!(client.state(), ConnState::Authenticated);

    let status = client.status("INBOX", &["MESSAGES"]).unwrap();
    assert_eq!(status.messages, 0);
}

#[test]
fn commands_in_the_wrong_state_are_refused() {
    let mut client = Client::connect(start_server()).unwrap();
    // CHECK before authentication
    match client.check() {
        Err(Error::No(_)) => {}
        other => panic!("unexpected result: {:?}", other),
    }

    let mut client = session();
    // FETCH without a selected mailbox: the server answers NO
    let (tx, _rx) = mpsc::sync_channel(1);
    match client.fetch(&SeqSet::new("1").unwrap(), &["FLAGS"], tx) {
        Err(Error::No(_)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn malformed_lines_get_bad_responses() {
    let addr = start_server();
    let stream = TcpStream::connect(addr).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut line = String::new();
    reader.read_line(&mut line).unwrap(); // greeting

    let mut w = stream.try_clone().unwrap();

    // a command with no verb
    w.write_all(b"a1\r\n").unwrap();
    line.clear();
    reader.read_line(&mut line).unwrap();
    assert!(line.starts_with("a1 BAD") || line.starts_with("* BAD"), "{}", line);

    // an unknown command
    w.write_all(b"a2 FROBNICATE\r\n").unwrap();
    line.clear();
    reader.read_line(&mut line).unwrap();
    assert!(line.starts_with("a2 BAD"), "{}", line);

    // the connection is still usable
    w.write_all(b"a3 NOOP\r\n").unwrap();
    line.clear();
    reader.read_line(&mut line).unwrap();
    assert_eq!(line, "a3 OK NOOP completed\r\n");
}

#[test]
fn logout_sends_bye() {
    let addr = start_server();
    let stream = TcpStream::connect(addr).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut line = String::new();
    reader.read_line(&mut line).unwrap(); // greeting

    let mut w = stream.try_clone().unwrap();
    w.write_all(b"a1 LOGOUT\r\n").unwrap();

    line.clear();
    reader.read_line(&mut line).unwrap();
    assert!(line.starts_with("* BYE"), "{}", line);
    line.clear();
    reader.read_line(&mut line).unwrap();
    assert_eq!(line, "a1 OK LOGOUT completed\r\n");

    // the server closes after LOGOUT
    line.clear();
    assert_eq!(reader.read_line(&mut line).unwrap(), 0);
}
