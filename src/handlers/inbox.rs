use actix_web::{web, HttpResponse};
use serde_derive::Deserialize;
use serde_json::json;

use crate::{
    errors::{CommonError, Fields, ServerError},
    models::inbox::IncomingMessage,
    store::InboxRelay,
};

pub async fn generate(inboxes: web::Data<InboxRelay>) -> Result<HttpResponse, ServerError> {
    let inbox = inboxes.generate();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "email": inbox.email,
        "expiresIn": inbox.expires_in,
    })))
}

pub async fn list(
    address: web::Path<String>,
    inboxes: web::Data<InboxRelay>,
) -> Result<HttpResponse, ServerError> {
    let emails = inboxes.messages(&address)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "emails": emails })))
}

#[derive(Deserialize)]
pub struct SimulatedEmail {
    to: String,
    from: Option<String>,
    subject: Option<String>,
    body: Option<String>,
}

pub async fn simulate_receive(
    input: web::Json<SimulatedEmail>,
    inboxes: web::Data<InboxRelay>,
) -> Result<HttpResponse, ServerError> {
    let input = input.into_inner();
    let message = inboxes.receive(&input.to, input.from, input.subject, input.body)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Email received",
        "email": message,
    })))
}

#[derive(Deserialize)]
pub struct Reply {
    to: Option<String>,
    from: Option<String>,
    subject: Option<String>,
    body: Option<String>,
}

pub async fn reply(
    input: web::Json<Reply>,
    inboxes: web::Data<InboxRelay>,
) -> Result<HttpResponse, ServerError> {
    let input = input.into_inner();
    let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

    let (to, subject, body) = match (
        present(input.to),
        present(input.subject),
        present(input.body),
    ) {
        (Some(to), Some(subject), Some(body)) => (to, subject, body),
        (to, subject, body) => {
            let mut errs = vec![];
            if to.is_none() {
                errs.push(Fields::To(CommonError::Missing));
            }
            if subject.is_none() {
                errs.push(Fields::Subject(CommonError::Missing));
            }
            if body.is_none() {
                errs.push(Fields::Body(CommonError::Missing));
            }
            return Err(ServerError::UserError(errs));
        }
    };

    let email = inboxes.push_message(
        &to,
        IncomingMessage {
            from: present(input.from).unwrap_or_else(|| "Anonymous Reply".to_string()),
            subject,
            body,
            timestamp: None,
            is_reply: true,
        },
    )?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "email": email })))
}

pub async fn mark_read(
    path: web::Path<(String, String)>,
    inboxes: web::Data<InboxRelay>,
) -> Result<HttpResponse, ServerError> {
    let (address, message_id) = path.into_inner();
    inboxes.mark_read(&address, &message_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Email marked as read",
    })))
}

pub async fn delete(
    path: web::Path<(String, String)>,
    inboxes: web::Data<InboxRelay>,
) -> Result<HttpResponse, ServerError> {
    let (address, message_id) = path.into_inner();
    inboxes.delete(&address, &message_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Email deleted",
    })))
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{fixture, test_app};
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn generate_then_receive_and_reply() {
        let fx = fixture();
        let app = test_app!(fx);

        let req = test::TestRequest::post().uri("/api/generate").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let address = body["email"].as_str().unwrap().to_string();
        assert_eq!(body["expiresIn"], 3_600_000);

        let req = test::TestRequest::post()
            .uri("/api/simulate-receive")
            .set_json(json!({ "to": address, "subject": "Welcome" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/reply")
            .set_json(json!({ "to": address, "subject": "Re: Welcome", "body": "thanks" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["email"]["from"], "Anonymous Reply");
        assert_eq!(body["email"]["isReply"], true);

        let req = test::TestRequest::get()
            .uri(&format!("/api/inbox/{}", address))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let emails = body["emails"].as_array().unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0]["subject"], "Welcome");
        assert_eq!(emails[0]["from"], "demo@example.com");
        assert!(emails[0].get("isReply").is_none());
    }

    #[actix_web::test]
    async fn reply_validation_and_unknown_inbox() {
        let fx = fixture();
        let app = test_app!(fx);

        let req = test::TestRequest::post()
            .uri("/api/reply")
            .set_json(json!({ "to": "x@tempmail.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/reply")
            .set_json(json!({ "to": "x@tempmail.com", "subject": "s", "body": "b" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn mark_read_and_delete_routes() {
        let fx = fixture();
        let app = test_app!(fx);
        let address = fx.inboxes.generate().email;
        let message = fx.inboxes.receive(&address, None, None, None).unwrap();
        let uri = format!("/api/email/{}/{}", address, message.id);

        let req = test::TestRequest::put()
            .uri(&format!("{}/read", uri))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(fx.inboxes.messages(&address).unwrap()[0].read);

        let req = test::TestRequest::delete().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::delete().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
