use actix_web::{error::InternalError, web, HttpResponse};
use serde_json::json;

pub mod inbox;
pub mod note;

pub async fn index() -> impl actix_web::Responder {
    actix_web::HttpResponse::Ok().finish()
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(json!({
                "error": "Invalid request body",
                "message": message,
            })),
        )
        .into()
    })
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(index))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(health))
                .route("/generate", web::post().to(inbox::generate))
                .route("/inbox/{email}", web::get().to(inbox::list))
                .route("/simulate-receive", web::post().to(inbox::simulate_receive))
                .route("/reply", web::post().to(inbox::reply))
                .route("/email/{address}/{id}/read", web::put().to(inbox::mark_read))
                .route("/email/{address}/{id}", web::delete().to(inbox::delete))
                .service(
                    web::scope("/notemail")
                        .route("/create", web::post().to(note::mutate::create))
                        .route("/view/{id}", web::post().to(note::mutate::view))
                        .route("/check/{id}", web::get().to(note::query::check))
                        .route("/stats", web::get().to(note::query::stats)),
                ),
        );
}
