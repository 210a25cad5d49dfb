use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use parking_lot::Mutex;
use rand::Rng;
use rand_core::OsRng;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::{hash_map::Entry, HashMap},
    net::IpAddr,
    sync::Arc,
};

use super::clock::{Clock, Millis};
use crate::{
    crypto::{self, NoteKey},
    errors::ServerError,
    models::note::{
        CreatedNote, Creator, EncryptedNote, NoteOptions, NoteStats, NoteStatus, ViewMetadata,
        ViewOutcome,
    },
    utils::canonical_ip,
};

const ID_BYTES: usize = 16;
const ID_ATTEMPTS: usize = 4;

fn new_note_id() -> String {
    let mut bytes = [0u8; ID_BYTES];
    rand::thread_rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// In-memory table of encrypted notes.
///
/// A view's final check, decrypt, count and delete happen under one table
/// lock, so they are one step as far as other requests (and the sweeper) can
/// tell. Password hashes are verified before that step with the lock released.
pub struct NoteStore {
    notes: Mutex<HashMap<String, EncryptedNote>>,
    clock: Arc<dyn Clock>,
    hasher: Argon2<'static>,
    max_ttl: Millis,
}

impl NoteStore {
    pub fn new(clock: Arc<dyn Clock>, max_ttl: Millis) -> Self {
        NoteStore {
            notes: Mutex::new(HashMap::new()),
            clock,
            hasher: Argon2::default(),
            max_ttl,
        }
    }

    #[cfg(test)]
    pub fn with_hasher(mut self, hasher: Argon2<'static>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn now_millis(&self) -> Millis {
        self.clock.now_millis()
    }

    pub fn create<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        options: &NoteOptions,
        creator: Creator,
    ) -> Result<CreatedNote, ServerError> {
        let policy = options.validate(self.max_ttl)?;

        let password_hash = match &policy.password {
            Some(password) => Some(
                self.hasher
                    .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))?
                    .to_string(),
            ),
            None => None,
        };

        let key = NoteKey::generate()?;
        let sealed = crypto::encrypt(payload, &key)?;

        let now = self.clock.now_millis();
        let expires_at = policy.ttl.map(|ttl| now.saturating_add(ttl));

        let mut notes = self.notes.lock();
        for _ in 0..ID_ATTEMPTS {
            let id = new_note_id();
            if let Entry::Vacant(slot) = notes.entry(id.clone()) {
                log::info!(
                    "note {} created (max views {}, expires {:?}, from {})",
                    id,
                    policy.max_views,
                    expires_at,
                    creator.address.as_deref().unwrap_or("unknown"),
                );
                log::debug!(
                    "note {} user agent: {}",
                    id,
                    creator.user_agent.as_deref().unwrap_or("-")
                );
                slot.insert(EncryptedNote {
                    id: id.clone(),
                    ciphertext: sealed.ciphertext,
                    iv: sealed.iv.to_vec(),
                    created_at: now,
                    expires_at,
                    view_count: 0,
                    max_views: policy.max_views,
                    password_hash,
                    ip_restriction: policy.ip_restriction,
                    notify_target: policy.notify_target,
                    creator,
                });
                return Ok(CreatedNote {
                    id,
                    key,
                    expires_at,
                    max_views: policy.max_views,
                });
            }
            log::warn!("note id collision, retrying");
        }

        Err(ServerError::IdExhausted)
    }

    pub fn peek(&self, id: &str) -> NoteStatus {
        let now = self.clock.now_millis();
        let mut notes = self.notes.lock();

        let status = match notes.get(id) {
            None => return NoteStatus::Missing,
            Some(note) if note.is_expired(now) => NoteStatus::Expired,
            Some(note) => NoteStatus::Active {
                requires_password: note.password_hash.is_some(),
                expires_at: note.expires_at,
                views_remaining: note.views_remaining(),
                created_at: note.created_at,
            },
        };

        if status == NoteStatus::Expired {
            notes.remove(id);
            log::info!("note {} expired", id);
        }
        status
    }

    pub fn view<T: DeserializeOwned>(
        &self,
        id: &str,
        key: &str,
        password: Option<&str>,
        client: Option<IpAddr>,
    ) -> Result<ViewOutcome<T>, ServerError> {
        // the hash is checked with the table unlocked so a slow Argon2 run on
        // one note never stalls requests for any other note
        let checked_hash = match self.password_hash_of(id)? {
            Some(hash) => {
                self.verify_password(&hash, password)?;
                Some(hash)
            }
            None => None,
        };

        let mut notes = self.notes.lock();
        let note = self.live_note_in(&mut notes, id)?;

        // the record we verified against must be the one we are about to open
        if note.password_hash != checked_hash {
            return Err(ServerError::NotFound(id.to_string()));
        }

        if let Some(required) = note.ip_restriction {
            if client.map(canonical_ip) != Some(required) {
                return Err(ServerError::Forbidden(
                    "this note can only be viewed from a specific address",
                ));
            }
        }

        // nothing has been touched yet, so a bad key leaves the note as it was
        let key = NoteKey::from_hex(key)?;
        let content: T = crypto::decrypt(&note.ciphertext, &key, &note.iv)?;

        note.view_count += 1;
        let will_destroy = note.view_count >= note.max_views;
        let metadata = ViewMetadata {
            created_at: note.created_at,
            view_count: note.view_count,
            max_views: note.max_views,
            will_destroy,
            views_remaining: note.views_remaining(),
        };
        let notify_target = if will_destroy {
            note.notify_target.clone()
        } else {
            None
        };

        if will_destroy {
            if let Some(note) = notes.remove(id) {
                log::info!(
                    "note {} destroyed after {} views (created from {})",
                    note.id,
                    note.view_count,
                    note.creator.address.as_deref().unwrap_or("unknown"),
                );
            }
        } else {
            log::debug!("note {} viewed, {} left", id, metadata.views_remaining);
        }

        Ok(ViewOutcome {
            content,
            metadata,
            notify_target,
        })
    }

    fn password_hash_of(&self, id: &str) -> Result<Option<String>, ServerError> {
        let mut notes = self.notes.lock();
        let note = self.live_note_in(&mut notes, id)?;
        Ok(note.password_hash.clone())
    }

    // expiry wins over everything else, including an unused view budget
    fn live_note_in<'a>(
        &self,
        notes: &'a mut HashMap<String, EncryptedNote>,
        id: &str,
    ) -> Result<&'a mut EncryptedNote, ServerError> {
        let now = self.clock.now_millis();
        let expired = match notes.get(id) {
            Some(note) => note.is_expired(now),
            None => return Err(ServerError::NotFound(id.to_string())),
        };
        if expired {
            notes.remove(id);
            log::info!("note {} expired", id);
            return Err(ServerError::Gone(id.to_string()));
        }
        notes
            .get_mut(id)
            .ok_or_else(|| ServerError::NotFound(id.to_string()))
    }

    fn verify_password(&self, hash: &str, password: Option<&str>) -> Result<(), ServerError> {
        let supplied = match password {
            Some(p) if !p.is_empty() => p,
            _ => return Err(ServerError::PasswordRequired),
        };
        let parsed = PasswordHash::new(hash)?;
        self.hasher
            .verify_password(supplied.as_bytes(), &parsed)
            .map_err(|_| ServerError::Forbidden("invalid password"))
    }

    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut notes = self.notes.lock();
        let before = notes.len();
        notes.retain(|_, note| {
            let expired = note.is_expired(now);
            if expired {
                log::debug!("note {} expired", note.id);
            }
            !expired
        });
        before - notes.len()
    }

    pub fn stats(&self) -> NoteStats {
        let now = self.clock.now_millis();
        let notes = self.notes.lock();
        NoteStats {
            total_notes: notes.len(),
            active_notes: notes.values().filter(|n| !n.is_expired(now)).count(),
        }
    }

    /// Drops every note. Used on shutdown and in test teardown.
    pub fn close(&self) -> usize {
        let mut notes = self.notes.lock();
        let drained = notes.len();
        notes.clear();
        drained
    }

    #[cfg(test)]
    fn view_count(&self, id: &str) -> Option<u32> {
        self.notes.lock().get(id).map(|n| n.view_count)
    }
}
