//! An in-memory backend: a demo store for tests and examples, not a real
//! mail spool. Everything lives in process memory and is lost on drop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::sync::mpsc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::backend::backendutil;
use crate::backend::{Backend, BackendError, Mailbox, User};
use crate::flag::{Flag, FlagsOp};
use crate::mailbox::{MailboxInfo, MailboxStatus};
use crate::message::Message;
use crate::search::SearchCriteria;
use crate::seq_set::SeqSet;

const DELIMITER: &str = "/";

fn standard_flags() -> Vec<Flag> {
    vec![
        Flag::Answered,
        Flag::Flagged,
        Flag::Deleted,
        Flag::Seen,
        Flag::Draft,
    ]
}

fn now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&FixedOffset::east_opt(0).unwrap())
}

/// The in-memory [`Backend`].
#[derive(Default)]
pub struct MemoryBackend {
    users: Mutex<HashMap<String, (String, Arc<MemoryUser>)>>,
}

impl MemoryBackend {
    /// An empty backend with no users.
    pub fn new() -> MemoryBackend {
        MemoryBackend::default()
    }

    /// A backend with a single user (and their INBOX).
    pub fn with_user(username: &str, password: &str) -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.add_user(username, password);
        backend
    }

    /// Register a user; their INBOX is created on the spot.
    pub fn add_user(&self, username: &str, password: &str) -> Arc<MemoryUser> {
        let user = Arc::new(MemoryUser {
            username: username.to_string(),
            state: Mutex::new(UserState::default()),
        });
        user.state
            .lock()
            .unwrap()
            .insert_mailbox(&user, "INBOX".to_string());
        self.users
            .lock()
            .unwrap()
            .insert(username.to_string(), (password.to_string(), user.clone()));
        user
    }
}

impl Backend for MemoryBackend {
    fn login(&self, username: &str, password: &str) -> Result<Arc<dyn User>, BackendError> {
        let users = self.users.lock().unwrap();
        match users.get(username) {
            Some((stored, user)) if stored == password => Ok(user.clone()),
            _ => Err(BackendError::InvalidCredentials),
        }
    }
}

/// A user in the in-memory store.
pub struct MemoryUser {
    username: String,
    state: Mutex<UserState>,
}

#[derive(Default)]
struct UserState {
    mailboxes: HashMap<String, Arc<MemoryMailbox>>,
    // highest-used uid_next of deleted mailboxes, so a recreated mailbox
    // never reuses identifiers
    uid_floors: HashMap<String, u32>,
    uid_validity_counter: u32,
}

impl UserState {
    fn insert_mailbox(&mut self, user: &Arc<MemoryUser>, name: String) -> Arc<MemoryMailbox> {
        self.uid_validity_counter += 1;
        let uid_next = self.uid_floors.get(&name).copied().unwrap_or(1).max(1);
        let mailbox = Arc::new(MemoryMailbox {
            user: Arc::downgrade(user),
            state: Mutex::new(MailboxState {
                name: name.clone(),
                subscribed: false,
                uid_validity: self.uid_validity_counter,
                uid_next,
                messages: Vec::new(),
            }),
        });
        self.mailboxes.insert(name, mailbox.clone());
        mailbox
    }
}

impl MemoryUser {
    fn with_self(&self) -> Arc<MemoryUser> {
        // mailboxes hold a weak reference back; any live mailbox can
        // upgrade it, and users are always handed out inside an Arc
        self.state
            .lock()
            .unwrap()
            .mailboxes
            .values()
            .next()
            .and_then(|m| m.user.upgrade())
            .expect("user has no mailboxes")
    }
}

impl User for MemoryUser {
    fn username(&self) -> String {
        self.username.clone()
    }

    fn list_mailboxes(
        &self,
        subscribed_only: bool,
    ) -> Result<Vec<Arc<dyn Mailbox>>, BackendError> {
        let state = self.state.lock().unwrap();
        let mut named: Vec<(String, Arc<MemoryMailbox>)> = state
            .mailboxes
            .iter()
            .filter(|(_, m)| !subscribed_only || m.state.lock().unwrap().subscribed)
            .map(|(name, m)| (name.clone(), m.clone()))
            .collect();
        named.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(named
            .into_iter()
            .map(|(_, m)| m as Arc<dyn Mailbox>)
            .collect())
    }

    fn get_mailbox(&self, name: &str) -> Result<Arc<dyn Mailbox>, BackendError> {
        let state = self.state.lock().unwrap();
        state
            .mailboxes
            .get(name)
            .cloned()
            .map(|m| m as Arc<dyn Mailbox>)
            .ok_or_else(|| BackendError::NoSuchMailbox(name.to_string()))
    }

    fn create_mailbox(&self, name: &str) -> Result<(), BackendError> {
        let this = self.with_self();
        let mut state = self.state.lock().unwrap();

        // a trailing separator only declares the name as a parent
        let (name, declaration) = match name.strip_suffix(DELIMITER) {
            Some(stripped) => (stripped, true),
            None => (name, false),
        };
        if name.is_empty() {
            return Err(BackendError::Custom("empty mailbox name".to_string()));
        }

        if state.mailboxes.contains_key(name) {
            if declaration {
                return Ok(());
            }
            return Err(BackendError::MailboxAlreadyExists(name.to_string()));
        }

        // create missing superior names along the way
        let mut path = String::new();
        for segment in name.split(DELIMITER) {
            if !path.is_empty() {
                path.push_str(DELIMITER);
            }
            path.push_str(segment);
            if !state.mailboxes.contains_key(&path) {
                state.insert_mailbox(&this, path.clone());
            }
        }
        Ok(())
    }

    fn delete_mailbox(&self, name: &str) -> Result<(), BackendError> {
        if name == "INBOX" {
            return Err(BackendError::NotAllowed("Cannot delete INBOX"));
        }
        let mut state = self.state.lock().unwrap();
        let mailbox = state
            .mailboxes
            .remove(name)
            .ok_or_else(|| BackendError::NoSuchMailbox(name.to_string()))?;
        let uid_next = mailbox.state.lock().unwrap().uid_next;
        state.uid_floors.insert(name.to_string(), uid_next);
        Ok(())
    }

    fn rename_mailbox(&self, existing: &str, new_name: &str) -> Result<(), BackendError> {
        let this = self.with_self();
        let mut state = self.state.lock().unwrap();

        if !state.mailboxes.contains_key(existing) {
            return Err(BackendError::NoSuchMailbox(existing.to_string()));
        }
        if state.mailboxes.contains_key(new_name) {
            return Err(BackendError::MailboxAlreadyExists(new_name.to_string()));
        }

        if existing == "INBOX" {
            // renaming INBOX moves its messages and leaves it empty
            let inbox = state.mailboxes.get("INBOX").unwrap().clone();
            let target = state.insert_mailbox(&this, new_name.to_string());
            let mut inbox_state = inbox.state.lock().unwrap();
            let mut target_state = target.state.lock().unwrap();
            for mut message in inbox_state.messages.drain(..) {
                message.uid = target_state.uid_next;
                target_state.uid_next += 1;
                target_state.messages.push(message);
            }
            return Ok(());
        }

        // rename the mailbox and its inferior names
        let prefix = format!("{}{}", existing, DELIMITER);
        let renames: Vec<String> = state
            .mailboxes
            .keys()
            .filter(|k| *k == existing || k.starts_with(&prefix))
            .cloned()
            .collect();
        for old in renames {
            let mailbox = state.mailboxes.remove(&old).unwrap();
            let renamed = format!("{}{}", new_name, &old[existing.len()..]);
            mailbox.state.lock().unwrap().name = renamed.clone();
            state.mailboxes.insert(renamed, mailbox);
        }
        Ok(())
    }
}

struct MemoryMessage {
    uid: u32,
    date: DateTime<FixedOffset>,
    flags: Vec<Flag>,
    body: Vec<u8>,
}

struct MailboxState {
    name: String,
    subscribed: bool,
    uid_validity: u32,
    uid_next: u32,
    messages: Vec<MemoryMessage>,
}

impl MailboxState {
    fn max_uid(&self) -> u32 {
        self.messages.last().map(|m| m.uid).unwrap_or(0)
    }
}

/// A mailbox in the in-memory store.
pub struct MemoryMailbox {
    user: Weak<MemoryUser>,
    state: Mutex<MailboxState>,
}

impl Mailbox for MemoryMailbox {
    fn name(&self) -> String {
        self.state.lock().unwrap().name.clone()
    }

    fn info(&self) -> Result<MailboxInfo, BackendError> {
        Ok(MailboxInfo {
            flags: Vec::new(),
            delimiter: DELIMITER.to_string(),
            name: self.name(),
        })
    }

    fn status(&self) -> Result<MailboxStatus, BackendError> {
        let state = self.state.lock().unwrap();
        let mut status = MailboxStatus::new(&state.name);
        status.flags = standard_flags();
        status.permanent_flags = {
            let mut flags = standard_flags();
            flags.push(Flag::MayCreate);
            flags
        };
        status.messages = state.messages.len() as u32;
        status.recent = state
            .messages
            .iter()
            .filter(|m| m.flags.contains(&Flag::Recent))
            .count() as u32;
        status.unseen = state
            .messages
            .iter()
            .position(|m| !m.flags.contains(&Flag::Seen))
            .map(|i| i as u32 + 1);
        status.uid_next = state.uid_next;
        status.uid_validity = state.uid_validity;
        Ok(status)
    }

    fn set_subscribed(&self, subscribed: bool) -> Result<(), BackendError> {
        self.state.lock().unwrap().subscribed = subscribed;
        Ok(())
    }

    fn check(&self) -> Result<(), BackendError> {
        Ok(())
    }

    fn list_messages(
        &self,
        uid: bool,
        seq_set: &SeqSet,
        items: &[String],
        messages: &mpsc::SyncSender<Message>,
    ) -> Result<(), BackendError> {
        // snapshot the matching messages under the lock, stream after
        struct Row {
            seq: u32,
            uid: u32,
            date: DateTime<FixedOffset>,
            flags: Vec<Flag>,
            body: Vec<u8>,
        }

        let sections: Vec<crate::message::BodySectionName> = items
            .iter()
            .filter_map(|item| {
                let upper = item.to_ascii_uppercase();
                if upper.contains('[') || upper.starts_with("RFC822") {
                    crate::message::BodySectionName::parse(item).ok()
                } else {
                    None
                }
            })
            .collect();
        let marks_seen = sections.iter().any(|s| !s.peek);

        let rows: Vec<Row> = {
            let mut state = self.state.lock().unwrap();
            let resolved = seq_set.resolve(if uid {
                state.max_uid()
            } else {
                state.messages.len() as u32
            });

            let mut rows = Vec::new();
            for (i, message) in state.messages.iter_mut().enumerate() {
                let seq = i as u32 + 1;
                let id = if uid { message.uid } else { seq };
                if !resolved.contains(id) {
                    continue;
                }
                if marks_seen && !message.flags.contains(&Flag::Seen) {
                    message.flags.push(Flag::Seen);
                }
                rows.push(Row {
                    seq,
                    uid: message.uid,
                    date: message.date,
                    flags: message.flags.clone(),
                    body: message.body.clone(),
                });
            }
            rows
        };

        for row in rows {
            let mut msg = Message::new(row.seq);
            let entity = backendutil::Entity::parse(&row.body);
            for item in items {
                match item.to_ascii_uppercase().as_str() {
                    "FLAGS" => msg.flags = Some(row.flags.clone()),
                    "INTERNALDATE" => msg.internal_date = Some(row.date),
                    "RFC822.SIZE" => msg.size = Some(entity.size()),
                    "ENVELOPE" => msg.envelope = Some(backendutil::envelope(&entity)),
                    "BODY" | "BODYSTRUCTURE" => {
                        msg.body_structure = Some(backendutil::body_structure(&entity))
                    }
                    "UID" => msg.uid = Some(row.uid),
                    _ => {}
                }
            }
            for section in &sections {
                msg.body.insert(
                    section.resp_key(),
                    backendutil::fetch_body_section(&row.body, section),
                );
            }
            messages
                .send(msg)
                .map_err(|_| BackendError::Custom("fetch consumer went away".to_string()))?;
        }
        Ok(())
    }

    fn search_messages(
        &self,
        uid: bool,
        criteria: &SearchCriteria,
    ) -> Result<Vec<u32>, BackendError> {
        let state = self.state.lock().unwrap();
        let criteria = resolve_sets(criteria, state.messages.len() as u32, state.max_uid());

        let mut ids = Vec::new();
        for (i, message) in state.messages.iter().enumerate() {
            let seq = i as u32 + 1;
            let entity = backendutil::Entity::parse(&message.body);
            if backendutil::match_message(&entity, &message.date, &criteria)
                && backendutil::match_flags(&message.flags, &criteria)
                && backendutil::match_seq_num_and_uid(seq, message.uid, &criteria)
            {
                ids.push(if uid { message.uid } else { seq });
            }
        }
        Ok(ids)
    }

    fn create_message(
        &self,
        flags: &[Flag],
        date: Option<DateTime<FixedOffset>>,
        body: &[u8],
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        let uid = state.uid_next;
        state.uid_next += 1;

        let mut flags: Vec<Flag> = flags
            .iter()
            .filter(|f| !matches!(f, Flag::Recent | Flag::MayCreate))
            .cloned()
            .collect();
        flags.push(Flag::Recent);

        state.messages.push(MemoryMessage {
            uid,
            date: date.unwrap_or_else(now),
            flags,
            body: body.to_vec(),
        });
        Ok(())
    }

    fn update_flags(
        &self,
        uid: bool,
        seq_set: &SeqSet,
        op: FlagsOp,
        flags: &[Flag],
        updates: Option<&mpsc::SyncSender<Message>>,
    ) -> Result<(), BackendError> {
        let updated: Vec<(u32, u32, Vec<Flag>)> = {
            let mut state = self.state.lock().unwrap();
            let resolved = seq_set.resolve(if uid {
                state.max_uid()
            } else {
                state.messages.len() as u32
            });

            let mut updated = Vec::new();
            for (i, message) in state.messages.iter_mut().enumerate() {
                let seq = i as u32 + 1;
                let id = if uid { message.uid } else { seq };
                if !resolved.contains(id) {
                    continue;
                }
                match op {
                    FlagsOp::Set => {
                        let recent = message.flags.contains(&Flag::Recent);
                        message.flags = flags.to_vec();
                        if recent && !message.flags.contains(&Flag::Recent) {
                            message.flags.push(Flag::Recent);
                        }
                    }
                    FlagsOp::Add => {
                        for flag in flags {
                            if !message.flags.contains(flag) {
                                message.flags.push(flag.clone());
                            }
                        }
                    }
                    FlagsOp::Remove => {
                        message.flags.retain(|f| !flags.contains(f));
                    }
                }
                updated.push((seq, message.uid, message.flags.clone()));
            }
            updated
        };

        if let Some(updates) = updates {
            for (seq, msg_uid, flags) in updated {
                let mut msg = Message::new(seq);
                msg.flags = Some(flags);
                if uid {
                    msg.uid = Some(msg_uid);
                }
                updates
                    .send(msg)
                    .map_err(|_| BackendError::Custom("store consumer went away".to_string()))?;
            }
        }
        Ok(())
    }

    fn copy_messages(
        &self,
        uid: bool,
        seq_set: &SeqSet,
        dest: &str,
    ) -> Result<(), BackendError> {
        let user = self
            .user
            .upgrade()
            .ok_or_else(|| BackendError::Custom("user is gone".to_string()))?;
        let dest = user.get_mailbox(dest)?;

        let copies: Vec<(Vec<Flag>, DateTime<FixedOffset>, Vec<u8>)> = {
            let state = self.state.lock().unwrap();
            let resolved = seq_set.resolve(if uid {
                state.max_uid()
            } else {
                state.messages.len() as u32
            });
            state
                .messages
                .iter()
                .enumerate()
                .filter(|(i, m)| {
                    let id = if uid { m.uid } else { *i as u32 + 1 };
                    resolved.contains(id)
                })
                .map(|(_, m)| (m.flags.clone(), m.date, m.body.clone()))
                .collect()
        };

        for (flags, date, body) in copies {
            dest.create_message(&flags, Some(date), &body)?;
        }
        Ok(())
    }

    fn expunge(&self, expunged: Option<&mpsc::SyncSender<u32>>) -> Result<(), BackendError> {
        let removed: Vec<u32> = {
            let mut state = self.state.lock().unwrap();
            let mut removed = Vec::new();
            // walk from the top so each removal reports its own (current)
            // sequence number
            for i in (0..state.messages.len()).rev() {
                if state.messages[i].flags.contains(&Flag::Deleted) {
                    state.messages.remove(i);
                    removed.push(i as u32 + 1);
                }
            }
            removed
        };

        if let Some(expunged) = expunged {
            for seq in removed {
                expunged
                    .send(seq)
                    .map_err(|_| BackendError::Custom("expunge consumer went away".to_string()))?;
            }
        }
        Ok(())
    }
}

fn resolve_sets(criteria: &SearchCriteria, max_seq: u32, max_uid: u32) -> SearchCriteria {
    let mut criteria = criteria.clone();
    if let Some(set) = &criteria.seq_num {
        criteria.seq_num = Some(set.resolve(max_seq));
    }
    if let Some(set) = &criteria.uid {
        criteria.uid = Some(set.resolve(max_uid));
    }
    criteria.not = criteria
        .not
        .iter()
        .map(|c| resolve_sets(c, max_seq, max_uid))
        .collect();
    criteria.or = criteria
        .or
        .iter()
        .map(|(a, b)| {
            (
                resolve_sets(a, max_seq, max_uid),
                resolve_sets(b, max_seq, max_uid),
            )
        })
        .collect();
    criteria
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIL: &[u8] = b"From: mitsuha@example.org\r\n\
To: taki@example.org\r\n\
Subject: hello\r\n\
Date: Wed, 11 May 2016 14:31:59 +0000\r\n\
\r\n\
Where are you now?\r\n";

    fn user_with_mail() -> Arc<MemoryUser> {
        let backend = MemoryBackend::new();
        let user = backend.add_user("mitsuha", "pw");
        let inbox = user.get_mailbox("INBOX").unwrap();
        inbox.create_message(&[], None, MAIL).unwrap();
        inbox.create_message(&[Flag::Seen], None, MAIL).unwrap();
        user
    }

    #[test]
    fn login_checks_credentials() {
        let backend = MemoryBackend::with_user("mitsuha", "pw");
        assert!(backend.login("mitsuha", "pw").is_ok());
        assert!(matches!(
            backend.login("mitsuha", "nope"),
            Err(BackendError::InvalidCredentials)
        ));
        assert!(backend.login("taki", "pw").is_err());
    }

    #[test]
    fn status_counts() {
        let user = user_with_mail();
        let inbox = user.get_mailbox("INBOX").unwrap();
        let status = inbox.status().unwrap();
        assert_eq!(status.messages, 2);
        assert_eq!(status.recent, 2);
        assert_eq!(status.unseen, Some(1));
        assert_eq!(status.uid_next, 3);
    }

    #[test]
    fn create_auto_creates_parents() {
        let backend = MemoryBackend::new();
        let user = backend.add_user("mitsuha", "pw");
        user.create_mailbox("archive/2016/may").unwrap();
        assert!(user.get_mailbox("archive").is_ok());
        assert!(user.get_mailbox("archive/2016").is_ok());
        assert!(user.get_mailbox("archive/2016/may").is_ok());

        // a trailing separator is only a declaration
        user.create_mailbox("archive/").unwrap();
        assert!(user.create_mailbox("archive").is_err());
    }

    #[test]
    fn delete_preserves_uid_floor() {
        let backend = MemoryBackend::new();
        let user = backend.add_user("mitsuha", "pw");
        user.create_mailbox("tmp").unwrap();
        let tmp = user.get_mailbox("tmp").unwrap();
        tmp.create_message(&[], None, MAIL).unwrap();
        tmp.create_message(&[], None, MAIL).unwrap();

        user.delete_mailbox("tmp").unwrap();
        assert!(user.get_mailbox("tmp").is_err());

        user.create_mailbox("tmp").unwrap();
        let status = user.get_mailbox("tmp").unwrap().status().unwrap();
        assert_eq!(status.uid_next, 3);

        assert!(user.delete_mailbox("INBOX").is_err());
    }

    #[test]
    fn rename_inbox_moves_messages() {
        let user = user_with_mail();
        user.rename_mailbox("INBOX", "old-mail").unwrap();

        let inbox = user.get_mailbox("INBOX").unwrap();
        assert_eq!(inbox.status().unwrap().messages, 0);
        let moved = user.get_mailbox("old-mail").unwrap();
        assert_eq!(moved.status().unwrap().messages, 2);
    }

    #[test]
    fn rename_carries_inferior_names() {
        let backend = MemoryBackend::new();
        let user = backend.add_user("mitsuha", "pw");
        user.create_mailbox("work/reports").unwrap();
        user.rename_mailbox("work", "job").unwrap();
        assert!(user.get_mailbox("job").is_ok());
        assert!(user.get_mailbox("job/reports").is_ok());
        assert!(user.get_mailbox("work").is_err());
        assert_eq!(user.get_mailbox("job/reports").unwrap().name(), "job/reports");
    }

    #[test]
    fn fetch_marks_seen_unless_peek() {
        let user = user_with_mail();
        let inbox = user.get_mailbox("INBOX").unwrap();

        let (tx, rx) = mpsc::sync_channel(4);
        inbox
            .list_messages(
                false,
                &SeqSet::new("1").unwrap(),
                &["BODY.PEEK[]".to_string()],
                &tx,
            )
            .unwrap();
        let msg = rx.recv().unwrap();
        assert_eq!(msg.body_section("BODY[]"), Some(&MAIL[..]));
        assert_eq!(inbox.status().unwrap().unseen, Some(1));

        inbox
            .list_messages(
                false,
                &SeqSet::new("1").unwrap(),
                &["BODY[]".to_string()],
                &tx,
            )
            .unwrap();
        rx.recv().unwrap();
        assert_eq!(inbox.status().unwrap().unseen, None);
    }

    #[test]
    fn uid_fetch_keeps_sequence_ids() {
        let user = user_with_mail();
        let inbox = user.get_mailbox("INBOX").unwrap();

        let (tx, rx) = mpsc::sync_channel(4);
        inbox
            .list_messages(
                true,
                &SeqSet::new("2").unwrap(),
                &["UID".to_string()],
                &tx,
            )
            .unwrap();
        drop(tx);
        let msgs: Vec<Message> = rx.iter().collect();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].id, 2);
        assert_eq!(msgs[0].uid, Some(2));
    }

    #[test]
    fn search_with_criteria() {
        let user = user_with_mail();
        let inbox = user.get_mailbox("INBOX").unwrap();

        let criteria = SearchCriteria {
            without_flags: vec![Flag::Seen],
            ..SearchCriteria::default()
        };
        assert_eq!(inbox.search_messages(false, &criteria).unwrap(), vec![1]);

        let criteria = SearchCriteria {
            header: vec![("From".to_string(), "mitsuha".to_string())],
            ..SearchCriteria::default()
        };
        assert_eq!(
            inbox.search_messages(false, &criteria).unwrap(),
            vec![1, 2]
        );

        let criteria = SearchCriteria {
            seq_num: Some(SeqSet::new("2:*").unwrap()),
            ..SearchCriteria::default()
        };
        assert_eq!(inbox.search_messages(true, &criteria).unwrap(), vec![2]);
    }

    #[test]
    fn store_and_expunge_descending() {
        let user = user_with_mail();
        let inbox = user.get_mailbox("INBOX").unwrap();
        inbox.create_message(&[], None, MAIL).unwrap();
        inbox.create_message(&[], None, MAIL).unwrap();

        let (tx, rx) = mpsc::sync_channel(8);
        inbox
            .update_flags(
                false,
                &SeqSet::new("1,3").unwrap(),
                FlagsOp::Add,
                &[Flag::Deleted],
                Some(&tx),
            )
            .unwrap();
        drop(tx);
        let updated: Vec<Message> = rx.iter().collect();
        assert_eq!(updated.len(), 2);
        assert!(updated[0].flags.as_ref().unwrap().contains(&Flag::Deleted));

        let (tx, rx) = mpsc::sync_channel(8);
        inbox.expunge(Some(&tx)).unwrap();
        drop(tx);
        // descending original positions: 3 first, then 1
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(inbox.status().unwrap().messages, 2);
    }

    #[test]
    fn copy_to_missing_mailbox_fails() {
        let user = user_with_mail();
        let inbox = user.get_mailbox("INBOX").unwrap();
        assert!(matches!(
            inbox.copy_messages(false, &SeqSet::new("1").unwrap(), "nowhere"),
            Err(BackendError::NoSuchMailbox(_))
        ));

        user.create_mailbox("copies").unwrap();
        inbox
            .copy_messages(false, &SeqSet::new("1:2").unwrap(), "copies")
            .unwrap();
        assert_eq!(
            user.get_mailbox("copies").unwrap().status().unwrap().messages,
            2
        );
    }
}
