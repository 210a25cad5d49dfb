use serde_derive::Deserialize;

use crate::models::note::{IncomingEmail, NoteOptions};

pub mod mutate;
pub mod query;

#[derive(Deserialize)]
pub struct NewNote {
    #[serde(default)]
    pub email: Option<IncomingEmail>,
    #[serde(default)]
    pub options: NoteOptions,
}

#[derive(Deserialize)]
pub struct ViewRequest {
    // a missing key is just another bad key
    #[serde(default)]
    pub key: String,
    pub password: Option<String>,
}
