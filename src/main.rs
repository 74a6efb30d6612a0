use actix_web::{web, App, HttpServer};
use log::{error, info, warn};
use std::io;
use std::sync::Arc;

use kitchencloud::bootstrap;
use kitchencloud::config::AppConfig;
use kitchencloud::events::EventPublisher;
use kitchencloud::kafka::{create_producer, KafkaConfig, KafkaProducer};
use kitchencloud::logger::setup_logger;
use kitchencloud::middleware::RequestLogger;
use kitchencloud::routes;
use kitchencloud::store::IdentityStore;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = AppConfig::from_env();
    setup_logger(config.log_level);

    if let Err(e) = config.validate() {
        error!("Configuration validation error: {}", e);
        return Err(io::Error::new(io::ErrorKind::InvalidInput, e));
    }

    let store = web::Data::new(IdentityStore::new());
    match bootstrap::provision_admin(&store, &config) {
        Ok(Some(admin)) => info!("Bootstrap administrator {} created", admin.email),
        Ok(None) => {}
        Err(e) => {
            error!("Failed to provision administrator: {}", e);
            return Err(io::Error::new(io::ErrorKind::Other, e.to_string()));
        }
    }

    let producer = create_producer(&KafkaConfig::from_env());
    if matches!(producer, KafkaProducer::Dummy(_)) {
        warn!("Event publishing disabled, events will only be logged");
    }
    let events = web::Data::new(EventPublisher::new(Arc::new(producer)));

    let host = config.host.clone();
    let port = config.port;
    let workers = config.workers;
    let shared_config = web::Data::new(config);

    info!("Starting HTTP server at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(store.clone())
            .app_data(shared_config.clone())
            .app_data(events.clone())
            .service(web::scope("/api").configure(routes::configure))
    })
    .workers(workers)
    .keep_alive(std::time::Duration::from_secs(75))
    .shutdown_timeout(30)
    .bind((host, port))?
    .run()
    .await
}
