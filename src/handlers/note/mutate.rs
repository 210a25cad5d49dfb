use actix_web::{http::header::USER_AGENT, web, HttpRequest, HttpResponse};
use serde_json::json;

use super::{NewNote, ViewRequest};
use crate::{
    config::AppState,
    errors::ServerError,
    models::{
        inbox::IncomingMessage,
        note::{Creator, EmailPayload},
    },
    store::{InboxRelay, NoteStore},
    utils::{base_url, client_address, share_link},
};

pub async fn create(
    req: HttpRequest,
    input: web::Json<NewNote>,
    notes: web::Data<NoteStore>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServerError> {
    let input = input.into_inner();
    let payload = input
        .email
        .unwrap_or_default()
        .into_payload(notes.now_millis())?;

    let creator = Creator {
        address: client_address(&req, state.trust_proxy).map(|ip| ip.to_string()),
        user_agent: req
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    };

    // Argon2 runs inside create, keep it off the worker thread
    let store = notes.clone();
    let options = input.options;
    let created = web::block(move || store.create(&payload, &options, creator)).await??;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "noteId": created.id,
        "shareLink": share_link(&base_url(&req, &state), &created.id, &created.key.to_hex()),
        "expiresAt": created.expires_at,
        "maxViews": created.max_views,
    })))
}

pub async fn view(
    req: HttpRequest,
    note_id: web::Path<String>,
    input: web::Json<ViewRequest>,
    notes: web::Data<NoteStore>,
    inboxes: web::Data<InboxRelay>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServerError> {
    let client = client_address(&req, state.trust_proxy);
    let note_id = note_id.into_inner();
    let ViewRequest { key, password } = input.into_inner();

    let store = notes.clone();
    let id = note_id.clone();
    let outcome = web::block(move || {
        store.view::<EmailPayload>(&id, &key, password.as_deref(), client)
    })
    .await??;

    if let Some(target) = &outcome.notify_target {
        notify_read(&inboxes, target, &note_id);
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "content": outcome.content,
        "metadata": outcome.metadata,
    })))
}

// best effort: a failed notice never fails the view
fn notify_read(inboxes: &InboxRelay, target: &str, note_id: &str) {
    let notice = IncomingMessage {
        from: "NoteMail".to_string(),
        subject: "Your note was read".to_string(),
        body: format!("Note {} was opened and has been destroyed.", note_id),
        timestamp: None,
        is_reply: false,
    };
    match inboxes.push_message(target, notice) {
        Ok(_) => log::info!("read notice for note {} delivered", note_id),
        Err(e) => log::warn!("read notice for note {} not delivered: {}", note_id, e),
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{fixture, test_app};
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    fn email() -> Value {
        json!({
            "from": "boss@quickmail.net",
            "to": "me@tempmail.com",
            "subject": "Quarterly numbers",
            "body": "Do not forward.",
        })
    }

    fn split_link(link: &str) -> (String, String) {
        let (path, key) = link.split_once('#').unwrap();
        let id = path.rsplit('/').next().unwrap();
        (id.to_string(), key.to_string())
    }

    #[actix_web::test]
    async fn create_returns_link_with_key_in_fragment() {
        let fx = fixture();
        let app = test_app!(fx);

        let req = test::TestRequest::post()
            .uri("/api/notemail/create")
            .set_json(json!({ "email": email(), "options": { "expiresIn": 60_000 } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;

        let note_id = body["noteId"].as_str().unwrap();
        let link = body["shareLink"].as_str().unwrap();
        assert!(link.starts_with(&format!("https://notes.example/notemail/{}#", note_id)));
        let (_, key) = split_link(link);
        assert_eq!(key.len(), 64);
        assert_eq!(body["maxViews"], 1);
        assert_eq!(body["expiresAt"], 1_060_000);
    }

    #[actix_web::test]
    async fn create_rejects_missing_fields_and_zero_views() {
        let fx = fixture();
        let app = test_app!(fx);

        let req = test::TestRequest::post()
            .uri("/api/notemail/create")
            .set_json(json!({ "email": { "from": "a@b.c" }, "options": { "maxViews": 0 } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["fields"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::post()
            .uri("/api/notemail/create")
            .set_json(json!({ "email": email(), "options": { "maxViews": 0 } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert_eq!(fx.notes.stats().total_notes, 0);
    }

    #[actix_web::test]
    async fn view_lifecycle_over_http() {
        let fx = fixture();
        let app = test_app!(fx);

        let req = test::TestRequest::post()
            .uri("/api/notemail/create")
            .set_json(json!({ "email": email(), "options": { "maxViews": 2 } }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let (id, key) = split_link(body["shareLink"].as_str().unwrap());
        let uri = format!("/api/notemail/view/{}", id);

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({ "key": "00".repeat(32) }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({ "key": key }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["content"]["subject"], "Quarterly numbers");
        assert_eq!(body["content"]["attachments"], json!([]));
        assert_eq!(
            body["metadata"],
            json!({
                "createdAt": 1_000_000,
                "viewCount": 1,
                "maxViews": 2,
                "willDestroy": false,
                "viewsRemaining": 1,
            })
        );

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({ "key": key }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["metadata"]["willDestroy"], true);
        assert_eq!(body["metadata"]["viewsRemaining"], 0);

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({ "key": key }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn expired_note_is_410_then_404() {
        let fx = fixture();
        let app = test_app!(fx);

        let req = test::TestRequest::post()
            .uri("/api/notemail/create")
            .set_json(json!({ "email": email(), "options": { "expiresIn": 1_000 } }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let (id, key) = split_link(body["shareLink"].as_str().unwrap());
        let uri = format!("/api/notemail/view/{}", id);

        fx.clock.advance(1_500);
        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({ "key": key }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::GONE);

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({ "key": key }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn password_gate_status_codes() {
        let fx = fixture();
        let app = test_app!(fx);

        let req = test::TestRequest::post()
            .uri("/api/notemail/create")
            .set_json(json!({
                "email": email(),
                "options": { "requirePassword": true, "password": "abc" },
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let (id, key) = split_link(body["shareLink"].as_str().unwrap());
        let uri = format!("/api/notemail/view/{}", id);

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({ "key": key }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["requirePassword"], true);

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({ "key": key, "password": "xyz" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({ "key": key, "password": "abc" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn ip_restriction_uses_peer_address() {
        let fx = fixture();
        let app = test_app!(fx);

        let req = test::TestRequest::post()
            .uri("/api/notemail/create")
            .set_json(json!({ "email": email(), "options": { "ipRestriction": "127.0.0.1" } }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let (id, key) = split_link(body["shareLink"].as_str().unwrap());
        let uri = format!("/api/notemail/view/{}", id);

        let req = test::TestRequest::post()
            .uri(&uri)
            .peer_addr("10.9.9.9:5000".parse().unwrap())
            .set_json(json!({ "key": key }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri(&uri)
            .peer_addr("127.0.0.1:5000".parse().unwrap())
            .set_json(json!({ "key": key }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn destroying_view_notifies_owner_inbox() {
        let fx = fixture();
        let app = test_app!(fx);
        let owner = fx.inboxes.generate().email;

        let req = test::TestRequest::post()
            .uri("/api/notemail/create")
            .set_json(json!({
                "email": email(),
                "options": { "notifyOnRead": true, "notifyEmail": owner },
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let (id, key) = split_link(body["shareLink"].as_str().unwrap());

        let req = test::TestRequest::post()
            .uri(&format!("/api/notemail/view/{}", id))
            .set_json(json!({ "key": key }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let messages = fx.inboxes.messages(&owner).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].body.contains(&id));
    }

    #[actix_web::test]
    async fn undeliverable_notice_does_not_fail_the_view() {
        let fx = fixture();
        let app = test_app!(fx);

        let req = test::TestRequest::post()
            .uri("/api/notemail/create")
            .set_json(json!({
                "email": email(),
                "options": { "notifyOnRead": true, "notifyEmail": "gone@tempmail.com" },
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let (id, key) = split_link(body["shareLink"].as_str().unwrap());

        let req = test::TestRequest::post()
            .uri(&format!("/api/notemail/view/{}", id))
            .set_json(json!({ "key": key }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
