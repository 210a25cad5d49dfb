use actix_web::{http::StatusCode, HttpResponse};
use derive_more::Display;
use serde_derive::Serialize;
use serde_json::json;

use crate::crypto::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommonError {
    Missing,
    TooShort,
    TooLong,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", content = "reason", rename_all = "camelCase")]
pub enum Fields {
    From(CommonError),
    To(CommonError),
    Subject(CommonError),
    Body(CommonError),
    ExpiresIn(CommonError),
    MaxViews(CommonError),
    Password(CommonError),
    NotifyEmail(CommonError),
    IpRestriction(CommonError),
}

#[derive(Debug, Display)]
pub enum ServerError {
    #[display(fmt = "Invalid request")]
    UserError(Vec<Fields>),
    #[display(fmt = "'{}' was not found", _0)]
    NotFound(String),
    #[display(fmt = "'{}' has expired", _0)]
    Gone(String),
    #[display(fmt = "Password required")]
    PasswordRequired,
    #[display(fmt = "Access denied: {}", _0)]
    Forbidden(&'static str),
    #[display(fmt = "Invalid encryption key")]
    BadKey,
    CryptoError,
    HashError,
    EnvironmentError,
    IdExhausted,
    BlockingError,
}

impl From<CodecError> for ServerError {
    fn from(err: CodecError) -> ServerError {
        match err {
            CodecError::Decryption => ServerError::BadKey,
            CodecError::Encryption => ServerError::CryptoError,
        }
    }
}

impl From<argon2::password_hash::Error> for ServerError {
    fn from(_: argon2::password_hash::Error) -> ServerError {
        ServerError::HashError
    }
}

impl From<actix_web::error::BlockingError> for ServerError {
    fn from(_: actix_web::error::BlockingError) -> ServerError {
        ServerError::BlockingError
    }
}

impl From<std::env::VarError> for ServerError {
    fn from(_: std::env::VarError) -> ServerError {
        ServerError::EnvironmentError
    }
}

impl From<std::num::ParseIntError> for ServerError {
    fn from(_: std::num::ParseIntError) -> ServerError {
        ServerError::EnvironmentError
    }
}

impl From<std::str::ParseBoolError> for ServerError {
    fn from(_: std::str::ParseBoolError) -> ServerError {
        ServerError::EnvironmentError
    }
}

impl actix_web::error::ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::UserError(_) | ServerError::BadKey => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Gone(_) => StatusCode::GONE,
            ServerError::PasswordRequired => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::CryptoError
            | ServerError::HashError
            | ServerError::EnvironmentError
            | ServerError::IdExhausted
            | ServerError::BlockingError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            ServerError::UserError(fields) => HttpResponse::build(status).json(json!({
                "error": self.to_string(),
                "fields": fields,
            })),
            // same body for every note-ish 404 so nobody learns whether it ever existed
            ServerError::NotFound(_) => HttpResponse::build(status).json(json!({
                "error": "Not found",
                "message": "This has already been read and destroyed, or never existed.",
            })),
            ServerError::Gone(_) => HttpResponse::build(status).json(json!({
                "error": "Expired",
                "message": "This has expired and been destroyed.",
            })),
            ServerError::PasswordRequired => HttpResponse::build(status).json(json!({
                "error": self.to_string(),
                "requirePassword": true,
            })),
            ServerError::Forbidden(_) => HttpResponse::build(status).json(json!({
                "error": self.to_string(),
            })),
            ServerError::BadKey => HttpResponse::build(status).json(json!({
                "error": self.to_string(),
                "message": "The link appears to be corrupted or incomplete.",
            })),
            _ => {
                log::error!("internal error: {:?}", self);
                HttpResponse::build(status).json(json!({ "error": "Internal server error" }))
            }
        }
    }
}
