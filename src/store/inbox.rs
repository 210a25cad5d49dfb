use nanoid::nanoid;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::{collections::HashMap, sync::Arc};

use super::clock::{Clock, Millis};
use crate::{
    errors::ServerError,
    models::inbox::{GeneratedInbox, IncomingMessage, Inbox, InboxMessage},
};

const DOMAINS: [&str; 6] = [
    "tempmail.com",
    "quickmail.net",
    "disposable.email",
    "student.edu",
    "university.edu",
    "college.edu",
];

const LOCAL_PART: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

fn random_address() -> String {
    let domain = DOMAINS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DOMAINS[0]);
    format!("{}@{}", nanoid!(10, &LOCAL_PART), domain)
}

/// Disposable inboxes keyed by address.
pub struct InboxRelay {
    inboxes: Mutex<HashMap<String, Inbox>>,
    clock: Arc<dyn Clock>,
    ttl: Millis,
}

impl InboxRelay {
    pub fn new(clock: Arc<dyn Clock>, ttl: Millis) -> Self {
        InboxRelay {
            inboxes: Mutex::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    pub fn generate(&self) -> GeneratedInbox {
        let expires_at = self.clock.now_millis().saturating_add(self.ttl);
        let mut inboxes = self.inboxes.lock();

        // 36^10 local parts per domain; a clash just means another draw
        let email = loop {
            let address = random_address();
            if !inboxes.contains_key(&address) {
                break address;
            }
        };
        inboxes.insert(
            email.clone(),
            Inbox {
                messages: vec![],
                expires_at,
            },
        );
        log::info!("inbox {} generated", email);

        GeneratedInbox {
            email,
            expires_in: self.ttl,
        }
    }

    fn with_inbox<R>(
        &self,
        address: &str,
        f: impl FnOnce(&mut Inbox) -> Result<R, ServerError>,
    ) -> Result<R, ServerError> {
        let now = self.clock.now_millis();
        let mut inboxes = self.inboxes.lock();

        let expired = match inboxes.get(address) {
            Some(inbox) => inbox.is_expired(now),
            None => return Err(ServerError::NotFound(address.to_string())),
        };
        if expired {
            inboxes.remove(address);
            return Err(ServerError::NotFound(address.to_string()));
        }

        match inboxes.get_mut(address) {
            Some(inbox) => f(inbox),
            None => Err(ServerError::NotFound(address.to_string())),
        }
    }

    pub fn messages(&self, address: &str) -> Result<Vec<InboxMessage>, ServerError> {
        self.with_inbox(address, |inbox| Ok(inbox.messages.clone()))
    }

    pub fn push_message(
        &self,
        address: &str,
        message: IncomingMessage,
    ) -> Result<InboxMessage, ServerError> {
        let now = self.clock.now_millis();
        self.with_inbox(address, |inbox| {
            let stored = InboxMessage {
                id: nanoid!(),
                from: message.from,
                subject: message.subject,
                body: message.body,
                timestamp: message.timestamp.unwrap_or(now),
                read: false,
                is_reply: message.is_reply,
            };
            inbox.messages.push(stored.clone());
            Ok(stored)
        })
    }

    /// Simulated delivery from the outside world.
    pub fn receive(
        &self,
        to: &str,
        from: Option<String>,
        subject: Option<String>,
        body: Option<String>,
    ) -> Result<InboxMessage, ServerError> {
        self.push_message(
            to,
            IncomingMessage {
                from: from.unwrap_or_else(|| "demo@example.com".to_string()),
                subject: subject.unwrap_or_else(|| "Demo Email".to_string()),
                body: body.unwrap_or_else(|| "This is a demo email.".to_string()),
                timestamp: None,
                is_reply: false,
            },
        )
    }

    pub fn mark_read(&self, address: &str, message_id: &str) -> Result<(), ServerError> {
        self.with_inbox(address, |inbox| {
            match inbox.messages.iter_mut().find(|m| m.id == message_id) {
                Some(message) => {
                    message.read = true;
                    Ok(())
                }
                None => Err(ServerError::NotFound(message_id.to_string())),
            }
        })
    }

    pub fn delete(&self, address: &str, message_id: &str) -> Result<(), ServerError> {
        self.with_inbox(address, |inbox| {
            match inbox.messages.iter().position(|m| m.id == message_id) {
                Some(index) => {
                    inbox.messages.remove(index);
                    Ok(())
                }
                None => Err(ServerError::NotFound(message_id.to_string())),
            }
        })
    }

    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut inboxes = self.inboxes.lock();
        let before = inboxes.len();
        inboxes.retain(|_, inbox| !inbox.is_expired(now));
        before - inboxes.len()
    }
}
