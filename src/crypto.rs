//! Payload encryption for notes.
//!
//! Notes are sealed with AES-256-GCM under a random per-note key. The key is
//! handed back to the creator and never kept by the server; only the
//! ciphertext and the IV are stored.

use derive_more::Display;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{de::DeserializeOwned, Serialize};

pub const KEY_LEN: usize = 32;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[display(fmt = "encryption failed")]
    Encryption,
    /// Wrong key, malformed key, bad iv, tampered ciphertext or undecodable
    /// payload. Deliberately a single variant.
    #[display(fmt = "decryption failed")]
    Decryption,
}

#[derive(Clone, PartialEq, Eq)]
pub struct NoteKey([u8; KEY_LEN]);

impl NoteKey {
    pub fn generate() -> Result<Self, CodecError> {
        let mut bytes = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| CodecError::Encryption)?;
        Ok(NoteKey(bytes))
    }

    pub fn from_hex(text: &str) -> Result<Self, CodecError> {
        let mut bytes = [0u8; KEY_LEN];
        hex::decode_to_slice(text.trim(), &mut bytes).map_err(|_| CodecError::Decryption)?;
        Ok(NoteKey(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn sealing_key(&self) -> Result<LessSafeKey, ring::error::Unspecified> {
        Ok(LessSafeKey::new(UnboundKey::new(&AES_256_GCM, &self.0)?))
    }
}

impl std::fmt::Debug for NoteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NoteKey(..)")
    }
}

#[derive(Debug, Clone)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; NONCE_LEN],
}

pub fn encrypt<T: Serialize + ?Sized>(payload: &T, key: &NoteKey) -> Result<Sealed, CodecError> {
    let mut in_out = serde_json::to_vec(payload).map_err(|_| CodecError::Encryption)?;

    let mut iv = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut iv)
        .map_err(|_| CodecError::Encryption)?;

    key.sealing_key()
        .and_then(|k| {
            k.seal_in_place_append_tag(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut in_out)
        })
        .map_err(|_| CodecError::Encryption)?;

    Ok(Sealed {
        ciphertext: in_out,
        iv,
    })
}

pub fn decrypt<T: DeserializeOwned>(
    ciphertext: &[u8],
    key: &NoteKey,
    iv: &[u8],
) -> Result<T, CodecError> {
    let nonce = Nonce::try_assume_unique_for_key(iv).map_err(|_| CodecError::Decryption)?;
    let sealing_key = key.sealing_key().map_err(|_| CodecError::Decryption)?;

    let mut buf = ciphertext.to_vec();
    let plain = sealing_key
        .open_in_place(nonce, Aad::empty(), &mut buf)
        .map_err(|_| CodecError::Decryption)?;

    serde_json::from_slice(plain).map_err(|_| CodecError::Decryption)
}
