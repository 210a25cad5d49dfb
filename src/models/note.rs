use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::net::IpAddr;

use crate::{
    crypto::NoteKey,
    errors::{CommonError, Fields, ServerError},
    store::clock::Millis,
};

pub const DEFAULT_MAX_VIEWS: u32 = 1;
pub const MAX_VIEWS: i64 = 100;
pub const MAX_PASSWORD_LEN: usize = 1024;

/// The email a note is made from. This is what ends up encrypted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmailPayload {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub timestamp: Millis,
    pub attachments: Vec<Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct IncomingEmail {
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub timestamp: Option<Millis>,
    pub attachments: Option<Vec<Value>>,
}

fn required(
    value: Option<String>,
    field: fn(CommonError) -> Fields,
    errs: &mut Vec<Fields>,
) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            errs.push(field(CommonError::Missing));
            String::new()
        }
    }
}

impl IncomingEmail {
    pub fn into_payload(self, now: Millis) -> Result<EmailPayload, ServerError> {
        let mut errs = vec![];
        let from = required(self.from, Fields::From, &mut errs);
        let subject = required(self.subject, Fields::Subject, &mut errs);
        let body = required(self.body, Fields::Body, &mut errs);

        if !errs.is_empty() {
            return Err(ServerError::UserError(errs));
        }

        Ok(EmailPayload {
            from,
            to: self
                .to
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            subject,
            body,
            timestamp: self.timestamp.unwrap_or(now),
            attachments: self.attachments.unwrap_or_default(),
        })
    }
}

// no Debug: it carries the plaintext password
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteOptions {
    pub expires_in: Option<u64>,
    pub max_views: Option<i64>,
    pub require_password: Option<bool>,
    pub password: Option<String>,
    pub notify_on_read: Option<bool>,
    pub notify_email: Option<String>,
    pub ip_restriction: Option<String>,
}

/// Options that passed validation.
pub struct NotePolicy {
    pub ttl: Option<Millis>,
    pub max_views: u32,
    pub password: Option<String>,
    pub ip_restriction: Option<IpAddr>,
    pub notify_target: Option<String>,
}

impl NoteOptions {
    pub fn validate(&self, max_ttl: Millis) -> Result<NotePolicy, ServerError> {
        let mut errs = vec![];

        let ttl = match self.expires_in {
            Some(0) => {
                errs.push(Fields::ExpiresIn(CommonError::TooShort));
                None
            }
            Some(ms) if ms > max_ttl => {
                errs.push(Fields::ExpiresIn(CommonError::TooLong));
                None
            }
            other => other,
        };

        let max_views = match self.max_views {
            None => DEFAULT_MAX_VIEWS,
            Some(n) if n < 1 => {
                errs.push(Fields::MaxViews(CommonError::Invalid));
                DEFAULT_MAX_VIEWS
            }
            Some(n) if n > MAX_VIEWS => {
                errs.push(Fields::MaxViews(CommonError::TooLong));
                DEFAULT_MAX_VIEWS
            }
            Some(n) => n as u32,
        };

        let password = match (&self.password, self.require_password.unwrap_or(false)) {
            (Some(p), _) if p.len() > MAX_PASSWORD_LEN => {
                errs.push(Fields::Password(CommonError::TooLong));
                None
            }
            (Some(p), _) if !p.is_empty() => Some(p.clone()),
            (_, true) => {
                errs.push(Fields::Password(CommonError::Missing));
                None
            }
            _ => None,
        };

        let ip_restriction = match self.ip_restriction.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => match text.parse::<IpAddr>() {
                Ok(ip) => Some(crate::utils::canonical_ip(ip)),
                Err(_) => {
                    errs.push(Fields::IpRestriction(CommonError::Invalid));
                    None
                }
            },
        };

        let notify_target = if self.notify_on_read.unwrap_or(false) {
            match self.notify_email.as_deref().map(str::trim) {
                Some(addr) if addr.contains('@') => Some(addr.to_string()),
                Some(addr) if !addr.is_empty() => {
                    errs.push(Fields::NotifyEmail(CommonError::Invalid));
                    None
                }
                _ => {
                    errs.push(Fields::NotifyEmail(CommonError::Missing));
                    None
                }
            }
        } else {
            None
        };

        if !errs.is_empty() {
            return Err(ServerError::UserError(errs));
        }

        Ok(NotePolicy {
            ttl,
            max_views,
            password,
            ip_restriction,
            notify_target,
        })
    }
}

/// Where a note came from. Only ever logged, never shown to viewers.
#[derive(Clone, Debug, Default)]
pub struct Creator {
    pub address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EncryptedNote {
    pub id: String,
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
    pub created_at: Millis,
    pub expires_at: Option<Millis>,
    pub view_count: u32,
    pub max_views: u32,
    pub password_hash: Option<String>,
    pub ip_restriction: Option<IpAddr>,
    /// Inbox to notify once the note is destroyed by a view.
    pub notify_target: Option<String>,
    pub creator: Creator,
}

impl EncryptedNote {
    /// The one expiry predicate. Lazy checks, stats and the sweep all go
    /// through here so they can never disagree.
    pub fn is_expired(&self, now: Millis) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }

    pub fn views_remaining(&self) -> u32 {
        self.max_views.saturating_sub(self.view_count)
    }
}

pub struct CreatedNote {
    pub id: String,
    pub key: NoteKey,
    pub expires_at: Option<Millis>,
    pub max_views: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoteStatus {
    Missing,
    Expired,
    Active {
        requires_password: bool,
        expires_at: Option<Millis>,
        views_remaining: u32,
        created_at: Millis,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewMetadata {
    pub created_at: Millis,
    pub view_count: u32,
    pub max_views: u32,
    pub will_destroy: bool,
    pub views_remaining: u32,
}

#[derive(Debug)]
pub struct ViewOutcome<T> {
    pub content: T,
    pub metadata: ViewMetadata,
    /// Set only when this view destroyed a note that asked for a read notice.
    pub notify_target: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStats {
    pub total_notes: usize,
    pub active_notes: usize,
}
