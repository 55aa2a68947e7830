// src/api/routes.rs
use actix_web::web;
use super::handlers;
use crate::providers::VisionProvider;

pub fn configure_routes<P: VisionProvider + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health_check))
            .route("/grade/", web::post().to(handlers::grade_papers::<P>))
            .route("/grade", web::post().to(handlers::grade_papers::<P>))
    );
}
