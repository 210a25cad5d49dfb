use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;

mod config;
mod crypto;
mod errors;
mod handlers;
mod models;
mod store;
mod utils;

use config::AppConfig;
use store::{
    clock::{Clock, SystemClock},
    InboxRelay, NoteStore, Sweeper,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let config = AppConfig::from_env().expect("invalid environment configuration");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notes = Arc::new(NoteStore::new(
        clock.clone(),
        config.max_note_ttl.as_millis() as u64,
    ));
    let inboxes = Arc::new(InboxRelay::new(
        clock,
        config.inbox_ttl.as_millis() as u64,
    ));
    let sweeper = Sweeper::spawn(notes.clone(), inboxes.clone(), config.sweep_interval);

    let governor_conf = GovernorConfigBuilder::default()
        .per_millisecond(config.rate_limit_replenish_ms)
        .burst_size(config.rate_limit_burst)
        .finish()
        .expect("rate limit settings must be positive");

    let notes_data = web::Data::from(notes.clone());
    let inboxes_data = web::Data::from(inboxes);
    let state = web::Data::new(config.state());

    log::info!("notemail listening on {}:{}", config.host, config.port);

    let result = HttpServer::new(move || {
        App::new()
            .app_data(notes_data.clone())
            .app_data(inboxes_data.clone())
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Governor::new(&governor_conf))
            .wrap(Logger::default())
            .configure(handlers::routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await;

    sweeper.stop();
    log::info!("shutting down, dropped {} notes", notes.close());
    result
}
