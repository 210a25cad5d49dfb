use serde_derive::Serialize;

use crate::store::clock::Millis;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxMessage {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub timestamp: Millis,
    pub read: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_reply: bool,
}

/// A message on its way into an inbox.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub from: String,
    pub subject: String,
    pub body: String,
    pub timestamp: Option<Millis>,
    pub is_reply: bool,
}

#[derive(Clone, Debug)]
pub struct Inbox {
    pub messages: Vec<InboxMessage>,
    pub expires_at: Millis,
}

impl Inbox {
    pub fn is_expired(&self, now: Millis) -> bool {
        self.expires_at <= now
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedInbox {
    pub email: String,
    pub expires_in: Millis,
}
