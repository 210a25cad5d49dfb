use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{errors::ServerError, models::note::NoteStatus, store::NoteStore};

pub async fn check(
    note_id: web::Path<String>,
    notes: web::Data<NoteStore>,
) -> Result<HttpResponse, ServerError> {
    let body = match notes.peek(&note_id) {
        NoteStatus::Missing => json!({ "exists": false }),
        NoteStatus::Expired => json!({ "exists": false, "expired": true }),
        NoteStatus::Active {
            requires_password,
            expires_at,
            views_remaining,
            created_at,
        } => json!({
            "exists": true,
            "requirePassword": requires_password,
            "expiresAt": expires_at,
            "viewsRemaining": views_remaining,
            "createdAt": created_at,
        }),
    };

    Ok(HttpResponse::Ok().json(body))
}

pub async fn stats(notes: web::Data<NoteStore>) -> Result<HttpResponse, ServerError> {
    Ok(HttpResponse::Ok().json(notes.stats()))
}
